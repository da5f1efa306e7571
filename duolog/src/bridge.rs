use log::{Log, Metadata, Record};

use crate::{Message, global};

/// `log` implementation forwarding records to the developer sinks of the global router.
pub(crate) struct RouterLogger;

impl Log for RouterLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let router = global();
        let mut message = Message::new(record.args().to_string())
            .with_metadata(router.default_extra())
            .with_extra("target", record.target());
        if let Some(module_path) = record.module_path() {
            message = message.with_extra("module", module_path);
        }
        router.log(record.level().into(), message).ok();
    }

    fn flush(&self) {}
}
