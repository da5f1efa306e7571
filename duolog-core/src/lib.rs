//! # duolog-core
//! Core utilities for duolog - sinks, layouts and writer threads.

mod capture;
mod config;
mod error;
mod layout;
mod log_writer;
mod record;
mod severity;
mod sink;
mod utils;

pub use capture::{CaptureFactory, CaptureSink, CapturedRecord};
pub use config::{DUOLOG_CONFIG, DuologConfig};
pub use error::SinkError;
pub use layout::Layout;
pub use log_writer::{LogFile, LogStdout, LogWriter};
pub use record::{Extra, FailureContext, Record};
pub use severity::Severity;
pub use sink::{LogSink, Sink, SinkFactory, SinkSpec, ThreadedSinkFactory};
pub use utils::{LogMessage, LogSender, spawn_log_thread_file, spawn_log_thread_stdout};
