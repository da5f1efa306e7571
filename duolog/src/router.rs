use std::{
    collections::HashMap,
    fmt,
    path::{Component, Path},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Local;
use duolog_core::{
    DUOLOG_CONFIG, Extra, FailureContext, Layout, Record, Severity, Sink, SinkFactory, SinkSpec,
};

use crate::{Error, Result};

/// Prefix keeping developer sinks apart from public sinks in the sink namespace.
pub const DEVELOPER_PREFIX: &str = "developer_";

/// Who a sink is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Internal logs, always populated.
    Developer,
    /// Client-facing logs, populated only when a public message is given.
    Public,
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Developer => f.write_str("developer"),
            Audience::Public => f.write_str("public"),
        }
    }
}

/// Arguments of [`LogRouter::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    app_name: Option<String>,
    identifier: Option<String>,
    public: bool,
    format: Option<String>,
    level: Severity,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            app_name: None,
            identifier: None,
            public: false,
            format: None,
            level: Severity::Debug,
        }
    }
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the application name, replacing any cached one.
    pub fn with_app_name(self, app_name: &str) -> Self {
        Self {
            app_name: Some(app_name.into()),
            ..self
        }
    }
    /// Sets the identifier. Without one, a timestamp is used.
    pub fn with_identifier(self, identifier: &str) -> Self {
        Self {
            identifier: Some(identifier.into()),
            ..self
        }
    }
    /// Registers a public sink instead of a developer sink.
    pub fn public(self) -> Self {
        Self {
            public: true,
            ..self
        }
    }
    pub fn with_public(self, yes: bool) -> Self {
        Self {
            public: yes,
            ..self
        }
    }
    /// Sets the line format, see [`Layout`].
    pub fn with_format(self, pattern: &str) -> Self {
        Self {
            format: Some(pattern.into()),
            ..self
        }
    }
    /// Sets the sink threshold. Invalid levels are ignored.
    pub fn with_level(self, level: u8) -> Self {
        Self {
            level: Severity::resolve(Some(level), self.level),
            ..self
        }
    }

    pub fn audience(&self) -> Audience {
        if self.public {
            Audience::Public
        } else {
            Audience::Developer
        }
    }
}

#[derive(Default)]
struct Registry {
    developer: HashMap<String, Arc<dyn Sink>>,
    public: HashMap<String, Arc<dyn Sink>>,
    app_name: Option<String>,
    default_extra: Extra,
}

impl Registry {
    fn sinks(&self, audience: Audience) -> &HashMap<String, Arc<dyn Sink>> {
        match audience {
            Audience::Developer => &self.developer,
            Audience::Public => &self.public,
        }
    }

    fn sinks_mut(&mut self, audience: Audience) -> &mut HashMap<String, Arc<dyn Sink>> {
        match audience {
            Audience::Developer => &mut self.developer,
            Audience::Public => &mut self.public,
        }
    }
}

struct RouterInner {
    registry: Mutex<Registry>,
    factory: Box<dyn SinkFactory>,
    default_severity: Severity,
    error_severity: Severity,
}

/// Handle on a set of developer and public sinks.
///
/// Clones share the same registry. Registration and the lazy creation of default sinks
/// happen under a single lock; records are written to sinks outside of it.
#[derive(Clone)]
pub struct LogRouter {
    inner: Arc<RouterInner>,
}

impl Default for LogRouter {
    fn default() -> Self {
        crate::router_config().build()
    }
}

impl fmt::Debug for LogRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        let mut developer: Vec<_> = registry.developer.keys().collect();
        let mut public: Vec<_> = registry.public.keys().collect();
        developer.sort();
        public.sort();
        f.debug_struct("LogRouter")
            .field("app_name", &registry.app_name)
            .field("developer", &developer)
            .field("public", &public)
            .field("default_severity", &self.inner.default_severity)
            .field("error_severity", &self.inner.error_severity)
            .finish()
    }
}

impl LogRouter {
    pub(crate) fn new(
        factory: Box<dyn SinkFactory>,
        app_name: Option<String>,
        default_extra: Extra,
        default_severity: Severity,
        error_severity: Severity,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                registry: Mutex::new(Registry {
                    app_name,
                    default_extra,
                    ..Registry::default()
                }),
                factory,
                default_severity,
                error_severity,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Creates a sink and stores it under its identifier in the registration's audience.
    ///
    /// A sink already registered under the same identifier is replaced.
    pub fn register(&self, registration: Registration) -> Result<Arc<dyn Sink>> {
        let mut registry = self.lock();
        self.register_locked(&mut registry, registration)
    }

    fn register_locked(
        &self,
        registry: &mut Registry,
        registration: Registration,
    ) -> Result<Arc<dyn Sink>> {
        let audience = registration.audience();
        let Registration {
            app_name,
            identifier,
            public,
            format,
            level,
        } = registration;
        if app_name.is_some() {
            registry.app_name = app_name;
        } else if registry.app_name.is_none() {
            registry.app_name = inferred_app_name();
        }
        let identifier = identifier.unwrap_or_else(timestamp_identifier);
        let name = if public {
            identifier.clone()
        } else {
            format!("{DEVELOPER_PREFIX}{identifier}")
        };
        let layout = format.as_deref().map(Layout::parse);
        let sink = self.inner.factory.create(&SinkSpec {
            name: &name,
            identifier: &identifier,
            public,
            app_name: registry.app_name.as_deref(),
            layout: layout.as_ref(),
            level,
        })?;
        registry
            .sinks_mut(audience)
            .insert(identifier, Arc::clone(&sink));
        Ok(sink)
    }

    /// Sinks a record for `audience` goes to, creating a default sink when the audience has none.
    fn resolve(&self, audience: Audience, names: &[String]) -> Result<Vec<Arc<dyn Sink>>> {
        let mut registry = self.lock();
        if registry.sinks(audience).is_empty() {
            self.register_locked(
                &mut registry,
                Registration::new().with_public(audience == Audience::Public),
            )?;
        }
        let sinks = registry.sinks(audience);
        if names.is_empty() {
            return Ok(sinks.values().cloned().collect());
        }
        names
            .iter()
            .map(|name| {
                sinks.get(name).cloned().ok_or_else(|| Error::UnknownSink {
                    audience,
                    name: name.clone(),
                })
            })
            .collect()
    }

    /// Writes one record to the sinks of an audience. The first sink failure is returned.
    pub(crate) fn dispatch(
        &self,
        audience: Audience,
        severity: Severity,
        message: &str,
        extra: &Extra,
        names: &[String],
        failure: Option<&FailureContext>,
    ) -> Result<()> {
        let record = Record {
            severity,
            message,
            extra,
            failure,
        };
        for sink in self.resolve(audience, names)? {
            sink.log(&record)?;
        }
        Ok(())
    }

    /// `extra`, or the router's default metadata when `extra` is empty.
    pub(crate) fn resolve_extra(&self, extra: &Extra) -> Extra {
        if extra.is_empty() {
            self.lock().default_extra.clone()
        } else {
            extra.clone()
        }
    }

    pub fn sink(&self, audience: Audience, identifier: &str) -> Option<Arc<dyn Sink>> {
        self.lock().sinks(audience).get(identifier).cloned()
    }

    pub fn developer_sink(&self, identifier: &str) -> Option<Arc<dyn Sink>> {
        self.sink(Audience::Developer, identifier)
    }

    pub fn public_sink(&self, identifier: &str) -> Option<Arc<dyn Sink>> {
        self.sink(Audience::Public, identifier)
    }

    /// Sorted identifiers of the sinks registered for `audience`.
    pub fn identifiers(&self, audience: Audience) -> Vec<String> {
        let mut identifiers: Vec<String> = self.lock().sinks(audience).keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    pub fn developer_sinks(&self) -> Vec<String> {
        self.identifiers(Audience::Developer)
    }

    pub fn public_sinks(&self) -> Vec<String> {
        self.identifiers(Audience::Public)
    }

    pub fn app_name(&self) -> Option<String> {
        self.lock().app_name.clone()
    }

    pub fn default_extra(&self) -> Extra {
        self.lock().default_extra.clone()
    }

    /// Replaces the metadata used by messages that carry none.
    pub fn set_default_extra(&self, extra: Extra) {
        self.lock().default_extra = extra;
    }

    pub fn default_severity(&self) -> Severity {
        self.inner.default_severity
    }

    pub fn error_severity(&self) -> Severity {
        self.inner.error_severity
    }

    /// Unregisters and closes every sink, then closes the factory.
    /// Logging afterwards creates fresh default sinks.
    pub fn close(&self) {
        let (developer, public) = {
            let mut registry = self.lock();
            (
                std::mem::take(&mut registry.developer),
                std::mem::take(&mut registry.public),
            )
        };
        for sink in developer.values().chain(public.values()) {
            sink.close();
        }
        self.inner.factory.close();
    }
}

fn timestamp_identifier() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn inferred_app_name() -> Option<String> {
    let executable = std::env::current_exe().ok()?;
    infer_app_name(&DUOLOG_CONFIG.APP_ROOTS, &executable)
}

/// First path segment of `file` below the shortest root of `roots` containing it.
///
/// `roots` is a path list in the platform's `PATH` syntax.
pub fn infer_app_name(roots: &str, file: &Path) -> Option<String> {
    let root = std::env::split_paths(roots)
        .filter(|root| !root.as_os_str().is_empty() && file.starts_with(root))
        .min_by_key(|root| root.as_os_str().len())?;
    file.strip_prefix(&root)
        .ok()?
        .components()
        .find_map(|component| match component {
            Component::Normal(segment) => segment.to_str().map(String::from),
            _ => None,
        })
}
