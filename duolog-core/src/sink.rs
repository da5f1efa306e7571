use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::{
    Layout, Record, Severity, SinkError,
    log_writer::{LogFile, LogStdout},
    utils::{LogMessage, LogSender, spawn_log_thread_file, spawn_log_thread_stdout},
};

/// A named destination for records.
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;
    fn log(&self, record: &Record<'_>) -> Result<(), SinkError>;
    /// Releases whatever the sink holds. Records logged afterwards may fail.
    fn close(&self) {}
}

/// Everything a factory needs to build a sink.
#[derive(Debug, Clone, Copy)]
pub struct SinkSpec<'a> {
    /// Name in the sink namespace, unique across audiences.
    pub name: &'a str,
    /// Name the sink is registered under in its audience.
    pub identifier: &'a str,
    pub public: bool,
    pub app_name: Option<&'a str>,
    pub layout: Option<&'a Layout>,
    /// Records below this severity are dropped.
    pub level: Severity,
}

/// Builds sinks from their specs.
pub trait SinkFactory: Send + Sync {
    fn create(&self, spec: &SinkSpec<'_>) -> Result<Arc<dyn Sink>, SinkError>;
    fn close(&self) {}
}

/// Sink formatting records into lines and handing them to writer threads.
pub struct LogSink {
    name: String,
    app_name: Option<String>,
    level: Severity,
    layout: Layout,
    sender_stdout: Option<Arc<LogSender>>,
    sender_file: Option<Arc<LogSender>>,
}

impl LogSink {
    fn send(&self, sender: &LogSender, message: Arc<LogMessage>) -> Result<(), SinkError> {
        sender.send(message).map_err(|_| SinkError::Disconnected {
            sink: self.name.clone(),
        })
    }
}

impl Sink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &Record<'_>) -> Result<(), SinkError> {
        if record.severity < self.level {
            return Ok(());
        }
        let line = self
            .layout
            .render(record, &self.name, self.app_name.as_deref());
        let message = Arc::new(LogMessage::Line(line));
        if let Some(sender) = &self.sender_stdout {
            self.send(sender, message.clone())?;
        }
        if let Some(sender) = &self.sender_file {
            self.send(sender, message)?;
        }
        Ok(())
    }

    fn close(&self) {
        // stdout is shared between sinks and closed by the factory
        if let Some(sender) = &self.sender_file {
            sender.shutdown();
        }
    }
}

/// Default factory: one shared stdout writer thread, plus one file per sink when a
/// log directory is set.
pub struct ThreadedSinkFactory {
    stdout: bool,
    log_dir: Option<PathBuf>,
    sender_stdout: Mutex<Option<Arc<LogSender>>>,
}

impl Default for ThreadedSinkFactory {
    fn default() -> Self {
        Self {
            stdout: true,
            log_dir: None,
            sender_stdout: Mutex::new(None),
        }
    }
}

impl ThreadedSinkFactory {
    /// Ignore stdout logging
    pub fn no_stdout(self) -> Self {
        Self {
            stdout: false,
            ..self
        }
    }
    /// Dynamically set the stdout flag.
    pub fn with_stdout(self, yes: bool) -> Self {
        Self {
            stdout: yes,
            ..self
        }
    }
    /// Writes each sink to `<dir>/<sink name>.log`.
    pub fn with_log_dir<P: Into<PathBuf>>(self, dir: P) -> Self {
        Self {
            log_dir: Some(dir.into()),
            ..self
        }
    }

    pub fn log_path(&self, name: &str) -> Option<PathBuf> {
        let file_name: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("{file_name}.log")))
    }

    fn stdout_sender(&self) -> Option<Arc<LogSender>> {
        if !self.stdout {
            return None;
        }
        let mut sender = self
            .sender_stdout
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Some(Arc::clone(sender.get_or_insert_with(|| {
            Arc::new(spawn_log_thread_stdout(LogStdout))
        })))
    }
}

impl SinkFactory for ThreadedSinkFactory {
    fn create(&self, spec: &SinkSpec<'_>) -> Result<Arc<dyn Sink>, SinkError> {
        let sender_file = self
            .log_path(spec.name)
            .map(LogFile::new)
            .transpose()?
            .map(|file| Arc::new(spawn_log_thread_file(file)));
        Ok(Arc::new(LogSink {
            name: spec.name.to_string(),
            app_name: spec.app_name.map(String::from),
            level: spec.level,
            layout: spec
                .layout
                .cloned()
                .unwrap_or_else(|| Layout::default_for(spec.app_name)),
            sender_stdout: self.stdout_sender(),
            sender_file,
        }))
    }

    fn close(&self) {
        let sender = self
            .sender_stdout
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(sender) = sender {
            sender.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Extra;

    fn spec<'a>(name: &'a str, layout: Option<&'a Layout>) -> SinkSpec<'a> {
        SinkSpec {
            name,
            identifier: name,
            public: false,
            app_name: Some("shop"),
            layout,
            level: Severity::Info,
        }
    }

    #[test]
    fn test_file_sink_filters_by_level() {
        let dir = std::env::temp_dir().join("duolog_test_file_sink");
        let factory = ThreadedSinkFactory::default()
            .no_stdout()
            .with_log_dir(&dir);
        let path = factory.log_path("developer_orders").unwrap();
        std::fs::remove_file(&path).ok();
        let layout = Layout::parse("{name} {message}");
        let sink = factory
            .create(&spec("developer_orders", Some(&layout)))
            .unwrap();
        let extra = Extra::new();
        for (severity, message) in [
            (Severity::Debug, "hidden"),
            (Severity::Info, "order created"),
            (Severity::Error, "order failed"),
        ] {
            sink.log(&Record {
                severity,
                message,
                extra: &extra,
                failure: None,
            })
            .unwrap();
        }
        sink.close();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "developer_orders order created\ndeveloper_orders order failed\n"
        );
    }

    #[test]
    fn test_trace_records_pass_debug_threshold() {
        let dir = std::env::temp_dir().join("duolog_test_trace_sink");
        let factory = ThreadedSinkFactory::default()
            .no_stdout()
            .with_log_dir(&dir);
        let path = factory.log_path("developer_trace").unwrap();
        std::fs::remove_file(&path).ok();
        let layout = Layout::parse("{name} {message}");
        let sink = factory
            .create(&SinkSpec {
                level: Severity::Debug,
                ..spec("developer_trace", Some(&layout))
            })
            .unwrap();
        sink.log(&Record {
            severity: log::Level::Trace.into(),
            message: "cache lookup",
            extra: &Extra::new(),
            failure: None,
        })
        .unwrap();
        sink.close();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "developer_trace cache lookup\n"
        );
    }

    #[test]
    fn test_closed_sink_reports_disconnection() {
        let dir = std::env::temp_dir().join("duolog_test_closed_sink");
        let factory = ThreadedSinkFactory::default()
            .no_stdout()
            .with_log_dir(&dir);
        let sink = factory.create(&spec("audit", None)).unwrap();
        sink.close();
        let extra = Extra::new();
        let result = sink.log(&Record {
            severity: Severity::Warning,
            message: "late",
            extra: &extra,
            failure: None,
        });
        assert!(matches!(result, Err(SinkError::Disconnected { sink }) if sink == "audit"));
    }

    #[test]
    fn test_log_path_is_sanitized() {
        let factory = ThreadedSinkFactory::default().with_log_dir("/tmp/duolog");
        assert_eq!(
            factory.log_path("developer_2024-01-01 10:00:00.5"),
            Some(PathBuf::from("/tmp/duolog/developer_2024-01-01_10_00_00.5.log"))
        );
        assert_eq!(ThreadedSinkFactory::default().log_path("x"), None);
    }

    #[test]
    fn test_stdout_sender_is_shared() {
        let factory = ThreadedSinkFactory::default();
        let first = factory.stdout_sender().unwrap();
        let second = factory.stdout_sender().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        factory.close();
        let third = factory.stdout_sender().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        factory.close();
    }
}
