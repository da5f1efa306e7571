use duolog_core::{Extra, Severity};

use crate::{Audience, LogRouter, Result};

/// Whether, and with which text, a message also goes to public sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Public {
    #[default]
    No,
    /// Public sinks receive the developer text.
    Same,
    /// Public sinks receive this text instead of the developer text.
    Text(String),
}

impl From<bool> for Public {
    fn from(yes: bool) -> Self {
        if yes { Public::Same } else { Public::No }
    }
}

impl From<&str> for Public {
    fn from(text: &str) -> Self {
        Public::Text(text.into())
    }
}

impl From<String> for Public {
    fn from(text: String) -> Self {
        Public::Text(text)
    }
}

/// A message to emit, with its routing options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    text: String,
    public: Public,
    extra: Extra,
    sinks: Vec<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
    /// Also send the text to public sinks.
    pub fn public(self) -> Self {
        Self {
            public: Public::Same,
            ..self
        }
    }
    /// Send `public` to public sinks: `true`, `false` or a distinct client-facing text.
    pub fn with_public<P: Into<Public>>(self, public: P) -> Self {
        Self {
            public: public.into(),
            ..self
        }
    }
    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
    pub fn with_metadata(self, extra: Extra) -> Self {
        Self { extra, ..self }
    }
    /// Restricts delivery to the sinks registered under these identifiers.
    pub fn with_sinks<I, S>(self, sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sinks: sinks.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text for public sinks, if any.
    pub fn public_text(&self) -> Option<&str> {
        match &self.public {
            Public::No => None,
            Public::Same => Some(&self.text),
            Public::Text(text) if text.is_empty() => None,
            Public::Text(text) => Some(text),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::new(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::new(text)
    }
}

impl LogRouter {
    /// Emits `message` at a raw level, using the default severity when the level is
    /// absent or not one of the six standard levels.
    pub fn emit(&self, message: impl Into<Message>, level: Option<u8>) -> Result<()> {
        self.log(Severity::resolve(level, self.default_severity()), message)
    }

    /// Emits `message` to the developer sinks, and to the public sinks when it has a public text.
    pub fn log(&self, severity: Severity, message: impl Into<Message>) -> Result<()> {
        let message = message.into();
        let extra = self.resolve_extra(&message.extra);
        if let Some(public) = message.public_text() {
            self.dispatch(
                Audience::Public,
                severity,
                public,
                &extra,
                &message.sinks,
                None,
            )?;
        }
        self.dispatch(
            Audience::Developer,
            severity,
            &message.text,
            &extra,
            &message.sinks,
            None,
        )
    }

    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.emit(message, Some(Severity::Debug.level()))
    }

    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.emit(message, Some(Severity::Info.level()))
    }

    pub fn warning(&self, message: impl Into<Message>) -> Result<()> {
        self.emit(message, Some(Severity::Warning.level()))
    }

    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.emit(message, Some(Severity::Error.level()))
    }

    pub fn critical(&self, message: impl Into<Message>) -> Result<()> {
        self.emit(message, Some(Severity::Critical.level()))
    }
}
