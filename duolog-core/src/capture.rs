use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Extra, FailureContext, Record, Severity, Sink, SinkError, SinkFactory, SinkSpec};

/// Owned copy of a record received by a [`CaptureSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub sink: String,
    pub severity: Severity,
    pub message: String,
    pub extra: Extra,
    pub failure: Option<FailureContext>,
}

type Journal = Arc<Mutex<Vec<CapturedRecord>>>;

fn lock(journal: &Journal) -> MutexGuard<'_, Vec<CapturedRecord>> {
    journal.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory sink keeping every record regardless of level.
pub struct CaptureSink {
    name: String,
    journal: Journal,
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, record: &Record<'_>) -> Result<(), SinkError> {
        lock(&self.journal).push(CapturedRecord {
            sink: self.name.clone(),
            severity: record.severity,
            message: record.message.to_string(),
            extra: record.extra.clone(),
            failure: record.failure.cloned(),
        });
        Ok(())
    }
}

/// Factory of [`CaptureSink`]s sharing a single ordered journal.
#[derive(Clone, Default)]
pub struct CaptureFactory {
    journal: Journal,
    created: Arc<Mutex<Vec<String>>>,
}

impl CaptureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record captured so far, in logging order.
    pub fn records(&self) -> Vec<CapturedRecord> {
        lock(&self.journal).clone()
    }

    pub fn records_for(&self, sink: &str) -> Vec<CapturedRecord> {
        lock(&self.journal)
            .iter()
            .filter(|record| record.sink == sink)
            .cloned()
            .collect()
    }

    pub fn messages_for(&self, sink: &str) -> Vec<String> {
        self.records_for(sink)
            .into_iter()
            .map(|record| record.message)
            .collect()
    }

    /// Names of the sinks created by this factory, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        lock(&self.journal).clear();
    }
}

impl SinkFactory for CaptureFactory {
    fn create(&self, spec: &SinkSpec<'_>) -> Result<Arc<dyn Sink>, SinkError> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(spec.name.to_string());
        Ok(Arc::new(CaptureSink {
            name: spec.name.to_string(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

#[test]
fn test_capture_factory_journal() {
    let factory = CaptureFactory::new();
    let spec = |name: &'static str| SinkSpec {
        name,
        identifier: name,
        public: false,
        app_name: None,
        layout: None,
        level: Severity::Critical,
    };
    let first = factory.create(&spec("first")).unwrap();
    let second = factory.create(&spec("second")).unwrap();
    let extra = Extra::new();
    for (sink, message) in [(&first, "a"), (&second, "b"), (&first, "c")] {
        sink.log(&Record {
            severity: Severity::NotSet,
            message,
            extra: &extra,
            failure: None,
        })
        .unwrap();
    }
    assert_eq!(factory.created(), vec!["first", "second"]);
    assert_eq!(factory.messages_for("first"), vec!["a", "c"]);
    assert_eq!(factory.records().len(), 3);
    factory.clear();
    assert!(factory.records().is_empty());
}
