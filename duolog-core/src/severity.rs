use std::fmt;

use colored::{ColoredString, Colorize};

/// Severity of a log record, restricted to the six standard levels.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    NotSet = 0,
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::NotSet,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Maps a raw level to a severity. Values outside the six levels give `None`.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::NotSet),
            10 => Some(Self::Debug),
            20 => Some(Self::Info),
            30 => Some(Self::Warning),
            40 => Some(Self::Error),
            50 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Resolves an optional raw level, falling back silently when it is absent or invalid.
    pub fn resolve(level: Option<u8>, fallback: Severity) -> Self {
        level.and_then(Self::from_level).unwrap_or(fallback)
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotSet => "NOTSET",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn colored(self) -> ColoredString {
        match self {
            Self::NotSet => self.label().purple(),
            Self::Debug => self.label().blue(),
            Self::Info => self.label().green(),
            Self::Warning => self.label().yellow(),
            Self::Error => self.label().red(),
            Self::Critical => self.label().red().bold(),
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = u8;
    fn try_from(level: u8) -> Result<Self, u8> {
        Self::from_level(level).ok_or(level)
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.level()
    }
}

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Debug,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
