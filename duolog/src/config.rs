use std::path::{Path, PathBuf};

use duolog_core::{DUOLOG_CONFIG, Extra, Severity, SinkFactory, ThreadedSinkFactory};
use log::LevelFilter;

use crate::{GLOBAL_ROUTER, LogRouter};

/// Builder for configuring and initializing a router.
pub struct ConfigBuilder {
    app_name: Option<String>,
    default_extra: Extra,
    default_severity: Severity,
    error_severity: Severity,
    log_dir: Option<PathBuf>,
    no_stdout: bool,
    factory: Option<Box<dyn SinkFactory>>,
    log_level: LevelFilter,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            app_name: None,
            default_extra: Extra::new(),
            default_severity: DUOLOG_CONFIG.default_severity(),
            error_severity: DUOLOG_CONFIG.error_severity(),
            log_dir: None,
            no_stdout: false,
            factory: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl ConfigBuilder {
    /// Builds a standalone router.
    pub fn build(self) -> LogRouter {
        let Self {
            app_name,
            default_extra,
            default_severity,
            error_severity,
            log_dir,
            no_stdout,
            factory,
            log_level: _,
        } = self;
        let factory: Box<dyn SinkFactory> = match factory {
            Some(factory) => factory,
            None => {
                let threaded = ThreadedSinkFactory::default().with_stdout(!no_stdout);
                Box::new(match log_dir {
                    Some(dir) => threaded.with_log_dir(dir),
                    None => threaded,
                })
            }
        };
        LogRouter::new(
            factory,
            app_name,
            default_extra,
            default_severity,
            error_severity,
        )
    }

    /// Sets the application name.
    pub fn with_app_name(self, app_name: &str) -> Self {
        Self {
            app_name: Some(app_name.into()),
            ..self
        }
    }
    /// Maybe sets the application name.
    pub fn maybe_with_app_name(self, app_name: Option<&str>) -> Self {
        Self {
            app_name: app_name.map(String::from),
            ..self
        }
    }
    /// Metadata used by messages that carry none.
    pub fn with_default_extra(self, default_extra: Extra) -> Self {
        Self {
            default_extra,
            ..self
        }
    }
    /// Adds one entry to the default metadata.
    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.default_extra.insert(key.into(), value.into());
        self
    }
    /// Severity used when none or an invalid one is given. Invalid values are ignored.
    pub fn with_default_severity(self, level: u8) -> Self {
        Self {
            default_severity: Severity::resolve(Some(level), self.default_severity),
            ..self
        }
    }
    /// Severity of failures of wrapped calls. Invalid values are ignored.
    pub fn with_error_severity(self, level: u8) -> Self {
        Self {
            error_severity: Severity::resolve(Some(level), self.error_severity),
            ..self
        }
    }
    /// Writes every sink to its own file in `dir`, created if needed.
    pub fn with_log_dir<P: AsRef<Path>>(self, dir: P) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            log_dir: Some(dir.as_ref().to_path_buf()),
            ..self
        })
    }
    /// Maybe sets a log directory.
    pub fn maybe_with_log_dir<P: AsRef<Path>>(
        self,
        dir: Option<P>,
    ) -> Result<Self, std::io::Error> {
        match dir {
            Some(dir) => self.with_log_dir(dir),
            None => Ok(Self {
                log_dir: None,
                ..self
            }),
        }
    }
    /// Ignore stdout logging
    pub fn no_stdout(self) -> Self {
        Self {
            no_stdout: true,
            ..self
        }
    }
    /// Dynamically set the stdout flag.
    pub fn with_stdout(self, yes: bool) -> Self {
        Self {
            no_stdout: !yes,
            ..self
        }
    }
    /// Replaces the default stdout/file sinks. Log directory and stdout flags are then unused.
    pub fn with_sink_factory<F: SinkFactory + 'static>(self, factory: F) -> Self {
        Self {
            factory: Some(Box::new(factory)),
            ..self
        }
    }
    /// Maximum level of `log` records forwarded to the global router.
    pub fn with_log_level(self, log_level: LevelFilter) -> Self {
        Self { log_level, ..self }
    }
    /// Installs the router as the process-wide router behind the free functions and the
    /// `log` macros. Returns a guard that closes the router when dropped.
    #[must_use = "LoggerGuard must be kept alive to ensure logging works. Do \"let _guard = router_config().init_global();\""]
    pub fn init_global(self) -> LoggerGuard {
        let log_level = self.log_level;
        let router = self.build();
        *GLOBAL_ROUTER.write().unwrap_or_else(|e| e.into_inner()) = router.clone();
        log::set_max_level(log_level);
        LoggerGuard { router }
    }
}

/// Returns a default ConfigBuilder for configuring a router.
pub fn router_config() -> ConfigBuilder {
    ConfigBuilder::default()
}

/// Guard that closes the global router, flushing its files, when dropped.
/// Hold this guard for the lifetime of your logging session.
pub struct LoggerGuard {
    router: LogRouter,
}

impl LoggerGuard {
    pub fn router(&self) -> &LogRouter {
        &self.router
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        self.router.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_severities_are_ignored() {
        let router = router_config()
            .with_default_severity(30)
            .with_error_severity(45)
            .with_sink_factory(duolog_core::CaptureFactory::new())
            .build();
        assert_eq!(router.default_severity(), Severity::Warning);
        assert_eq!(router.error_severity(), Severity::Critical);
    }

    #[test]
    fn test_default_extra() {
        let router = router_config()
            .with_extra("service", "checkout")
            .with_extra("region", "eu")
            .with_sink_factory(duolog_core::CaptureFactory::new())
            .build();
        let extra = router.default_extra();
        assert_eq!(extra.get("service").map(String::as_str), Some("checkout"));
        assert_eq!(extra.len(), 2);
    }

    #[test]
    fn test_log_dir_is_created() {
        let dir = std::env::temp_dir().join("duolog_test_config_dir").join("nested");
        std::fs::remove_dir_all(&dir).ok();
        let builder = router_config().no_stdout().with_log_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(builder.log_dir.as_deref(), Some(dir.as_path()));
        let builder = builder.maybe_with_log_dir(None::<&Path>).unwrap();
        assert!(builder.log_dir.is_none());
    }
}
