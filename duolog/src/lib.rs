//! # duolog
//! Dual-audience logging: developer logs that are always written, and public,
//! client-facing logs written only when a message is meant for them.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! duolog = "0.1.0"
//! ```
//!
//! ```rust
//! use duolog::{Message, router_config};
//!
//! let _guard = router_config()
//!     .with_app_name("shop")
//!     .init_global();
//! duolog::info("Hello, world!").unwrap();
//! duolog::warning(Message::new("payment gateway slow: 2.3s").with_public("Payments may be delayed"))
//!     .unwrap();
//! // `log` macros reach the developer sinks too
//! log::info!("Hello from the log facade");
//! // guard ensures logs are flushed when dropped
//! ```
//!
//! ## Registering sinks
//! Sinks are registered per audience under an identifier. Without any registration, the
//! first message of an audience creates a default sink for it.
//!
//! ```rust
//! use duolog::{Registration, router_config};
//!
//! let router = router_config().no_stdout().build();
//! router.register(Registration::new().with_identifier("orders")).unwrap();
//! router.register(Registration::new().with_identifier("orders").public()).unwrap();
//! assert_eq!(router.developer_sinks(), vec!["orders"]);
//! assert_eq!(router.public_sinks(), vec!["orders"]);
//! ```
//!
//! ## Wrapping calls
//! ```rust
//! use duolog::{router_config, wrap_config};
//!
//! fn parse_quantity(text: &str) -> Result<u32, std::num::ParseIntError> {
//!     text.parse()
//! }
//!
//! let router = router_config().build();
//! let parse = wrap_config()
//!     .with_client_message("Reading your basket")
//!     .non_fatal(0)
//!     .attach_to(&router, parse_quantity);
//! assert_eq!(parse.call("3").unwrap(), 3);
//! assert_eq!(parse.call("three").unwrap(), 0);
//! router.close();
//! ```
//!
//! ## Logging to files
//! Every sink can also write to its own file in a log directory. Files are created if
//! they do not exist and appended to if they do.
//!
//! ```rust
//! use duolog::{Registration, router_config};
//!
//! let router = router_config()
//!     .with_log_dir("/tmp/duolog_doc")
//!     .expect("Unable to create log directory")
//!     .no_stdout()
//!     .build();
//! router.register(Registration::new().with_identifier("app").with_format("{message}")).unwrap();
//! router.info("Hello, world!").unwrap();
//! router.close(); // flushes files
//! assert!(std::fs::read_to_string("/tmp/duolog_doc/developer_app.log").unwrap().ends_with("Hello, world!\n"));
//! ```

mod bridge;
mod config;
mod dispatch;
mod error;
mod router;
mod wrap;

pub use config::{ConfigBuilder, LoggerGuard, router_config};
pub use dispatch::{Message, Public};
pub use duolog_core::{
    CaptureFactory, CapturedRecord, Extra, FailureContext, Layout, Severity, Sink, SinkError,
    SinkFactory, SinkSpec, ThreadedSinkFactory,
};
pub use error::{Error, Result};
pub use router::{Audience, DEVELOPER_PREFIX, LogRouter, Registration, infer_app_name};
pub use wrap::{Bound, WrapConfig, WrapError, Wrapped, wrap_config};

use log::LevelFilter;
use std::sync::{Arc, LazyLock, RwLock};

use bridge::RouterLogger;

/// Process-wide router used by the free functions and the `log` macros.
static GLOBAL_ROUTER: LazyLock<RwLock<LogRouter>> = LazyLock::new(|| {
    if log::set_boxed_logger(Box::new(RouterLogger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
    RwLock::new(router_config().build())
});

/// Returns a handle on the process-wide router.
pub fn global() -> LogRouter {
    GLOBAL_ROUTER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Registers a sink on the global router.
pub fn register(registration: Registration) -> Result<Arc<dyn Sink>> {
    global().register(registration)
}

/// Emits on the global router, see [`LogRouter::emit`].
pub fn emit(message: impl Into<Message>, level: Option<u8>) -> Result<()> {
    global().emit(message, level)
}

pub fn debug(message: impl Into<Message>) -> Result<()> {
    global().debug(message)
}

pub fn info(message: impl Into<Message>) -> Result<()> {
    global().info(message)
}

pub fn warning(message: impl Into<Message>) -> Result<()> {
    global().warning(message)
}

pub fn error(message: impl Into<Message>) -> Result<()> {
    global().error(message)
}

pub fn critical(message: impl Into<Message>) -> Result<()> {
    global().critical(message)
}

/// Wraps `target` with the default configuration on the global router.
pub fn wrap<F, T>(target: F) -> Wrapped<F, T> {
    global().wrap(target)
}

#[test]
fn test_global_router_and_log_bridge() {
    let capture = CaptureFactory::new();
    let guard = router_config()
        .with_app_name("shop")
        .with_extra("service", "checkout")
        .with_sink_factory(capture.clone())
        .with_log_level(LevelFilter::Debug)
        .init_global();
    assert_eq!(global().app_name().as_deref(), Some("shop"));

    info(Message::new("order received").public()).unwrap();
    emit("odd level", Some(7)).unwrap();
    log::warn!(target: "checkout::payment", "gateway slow");
    log::trace!("filtered out by the level filter");
    let checked = wrap(|n: u32| Ok::<_, std::io::Error>(n * 2));
    assert_eq!(checked.call(21).unwrap(), 42);

    let developer = global().developer_sinks();
    assert_eq!(developer.len(), 1);
    let developer = format!("{DEVELOPER_PREFIX}{}", developer[0]);
    let records = capture.records_for(&developer);
    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages[0..3], ["order received", "odd level", "gateway slow"]);
    assert_eq!(records[1].severity, Severity::Info);
    assert_eq!(records[2].severity, Severity::Warning);
    assert_eq!(
        records[2].extra.get("target").map(String::as_str),
        Some("checkout::payment")
    );
    assert_eq!(
        records[2].extra.get("service").map(String::as_str),
        Some("checkout")
    );
    assert_eq!(records.len(), 5);
    assert_eq!(global().public_sinks().len(), 1);
    drop(guard);
    assert!(global().developer_sinks().is_empty());
}
