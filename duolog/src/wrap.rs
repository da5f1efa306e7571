//! Logging around function calls.
//!
//! A [`WrapConfig`] describes what to log; attaching it to a function gives a
//! [`Wrapped`] function that logs a "starting" message, runs the function, then logs
//! either a success message or an error message with the failure attached. Errors are
//! returned to the caller unchanged unless the configuration is non-fatal, in which case
//! the fallback value is returned instead.

use std::{error::Error as StdError, sync::Arc};

use duolog_core::{Extra, FailureContext, Severity};

use crate::{Audience, Error, LogRouter};

/// Error of a wrapped call.
#[derive(Debug, thiserror::Error)]
pub enum WrapError<E> {
    /// The error returned by the wrapped function, unchanged.
    #[error(transparent)]
    Call(E),
    /// Logging around the call failed. This takes precedence over the call outcome.
    #[error("logging around the wrapped call failed: {0}")]
    Log(#[from] Error),
}

impl<E> WrapError<E> {
    /// The wrapped function's error, if that is what this is.
    pub fn into_call(self) -> Option<E> {
        match self {
            WrapError::Call(error) => Some(error),
            WrapError::Log(_) => None,
        }
    }
}

/// Logging configuration of a wrapped function returning `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapConfig<T> {
    error_message: Option<String>,
    client_message: Option<String>,
    success_message: Option<String>,
    /// Value replacing a failure. Its presence makes the configuration non-fatal.
    fallback: Option<T>,
    severity: Option<Severity>,
    error_severity: Option<Severity>,
    extra: Extra,
    sinks: Vec<String>,
}

impl<T> Default for WrapConfig<T> {
    fn default() -> Self {
        Self {
            error_message: None,
            client_message: None,
            success_message: None,
            fallback: None,
            severity: None,
            error_severity: None,
            extra: Extra::new(),
            sinks: Vec::new(),
        }
    }
}

/// Returns a default WrapConfig: fatal, no custom messages, router severities.
pub fn wrap_config<T>() -> WrapConfig<T> {
    WrapConfig::default()
}

impl<T> WrapConfig<T> {
    /// Message logged when the call fails, in place of the generated one.
    pub fn with_error_message(self, message: &str) -> Self {
        Self {
            error_message: Some(message.into()),
            ..self
        }
    }
    /// Client-facing message. Setting it routes every message of the call to public sinks too.
    pub fn with_client_message(self, message: &str) -> Self {
        Self {
            client_message: Some(message.into()),
            ..self
        }
    }
    /// Message logged when the call succeeds, in place of the generated one.
    pub fn with_success_message(self, message: &str) -> Self {
        Self {
            success_message: Some(message.into()),
            ..self
        }
    }
    /// Makes the configuration non-fatal: failures are logged, then `value` is returned.
    pub fn non_fatal(self, value: T) -> Self {
        Self {
            fallback: Some(value),
            ..self
        }
    }
    /// Severity of the starting and success messages. Invalid levels are ignored.
    pub fn with_severity(self, level: u8) -> Self {
        Self {
            severity: Severity::from_level(level).or(self.severity),
            ..self
        }
    }
    /// Severity of the error message. Invalid levels are ignored.
    pub fn with_error_severity(self, level: u8) -> Self {
        Self {
            error_severity: Severity::from_level(level).or(self.error_severity),
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
    /// Restricts logging to the sinks registered under these identifiers.
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

    /// Whether failures are returned to the caller, the default.
    pub fn is_fatal(&self) -> bool {
        self.fallback.is_none()
    }

    pub fn fallback(&self) -> Option<&T> {
        self.fallback.as_ref()
    }

    pub fn client_message(&self) -> Option<&str> {
        self.client_message.as_deref()
    }

    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }

    /// Attaches the configuration to `target`, logging through the global router.
    pub fn attach<F>(self, target: F) -> Wrapped<F, T> {
        self.attach_to(&crate::global(), target)
    }

    /// Attaches the configuration to `target`, logging through `router`.
    pub fn attach_to<F>(self, router: &LogRouter, target: F) -> Wrapped<F, T> {
        Wrapped {
            router: router.clone(),
            config: Arc::new(self),
            origin: Origin::of::<F>(),
            target,
        }
    }

    /// Public then developer delivery of one message of the call.
    fn announce(
        &self,
        router: &LogRouter,
        severity: Severity,
        message: &str,
        extra: &Extra,
        failure: Option<&FailureContext>,
    ) -> Result<(), Error> {
        if self.client_message.is_some() {
            router.dispatch(
                Audience::Public,
                severity,
                message,
                extra,
                &self.sinks,
                failure,
            )?;
        }
        router.dispatch(
            Audience::Developer,
            severity,
            message,
            extra,
            &self.sinks,
            failure,
        )
    }

    fn run<E, I>(&self, router: &LogRouter, origin: &Origin, invoke: I) -> Result<T, WrapError<E>>
    where
        T: Clone,
        E: StdError,
        I: FnOnce() -> Result<T, E>,
    {
        let severity = self.severity.unwrap_or(router.default_severity());
        let extra = router.resolve_extra(&self.extra);
        if let Some(client_message) = &self.client_message {
            router.dispatch(
                Audience::Public,
                severity,
                client_message,
                &extra,
                &self.sinks,
                None,
            )?;
        }
        router.dispatch(
            Audience::Developer,
            severity,
            &origin.trying(),
            &extra,
            &self.sinks,
            None,
        )?;
        match invoke() {
            Ok(value) => {
                let message = self
                    .success_message
                    .clone()
                    .unwrap_or_else(|| origin.success());
                self.announce(router, severity, &message, &extra, None)?;
                Ok(value)
            }
            Err(error) => {
                let failure = FailureContext::capture(&error);
                let message = self
                    .error_message
                    .clone()
                    .unwrap_or_else(|| origin.error());
                let severity = self.error_severity.unwrap_or(router.error_severity());
                self.announce(router, severity, &message, &extra, Some(&failure))?;
                match &self.fallback {
                    Some(fallback) => Ok(fallback.clone()),
                    None => Err(WrapError::Call(error)),
                }
            }
        }
    }
}

/// `path` with every `<...>` argument list removed.
fn without_generics(path: &str) -> String {
    let mut depth = 0usize;
    path.chars()
        .filter(|c| match *c {
            '<' => {
                depth += 1;
                false
            }
            '>' if depth > 0 => {
                depth -= 1;
                false
            }
            _ => depth == 0,
        })
        .collect()
}

/// Where a wrapped function comes from, derived from its type name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Origin {
    module: String,
    function: String,
}

impl Origin {
    fn of<F>() -> Self {
        let path = without_generics(std::any::type_name::<F>());
        let mut path = path.as_str();
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        let (module, function) = path.rsplit_once("::").unwrap_or(("", path));
        Self {
            module: module.into(),
            function: function.into(),
        }
    }

    fn trying(&self) -> String {
        format!("Trying : {} / {}", self.module, self.function)
    }

    fn success(&self) -> String {
        format!("Success : {} / {}", self.module, self.function)
    }

    fn error(&self) -> String {
        format!("** Error ** : {} / {}", self.module, self.function)
    }
}

/// A function with logging attached.
///
/// Plain functions take their arguments as one value (use a tuple for several) and are
/// invoked with [`Wrapped::call`]. Methods, written as `Fn(&R, A)`, are first bound to a
/// receiver with [`Wrapped::bind`].
pub struct Wrapped<F, T> {
    router: LogRouter,
    config: Arc<WrapConfig<T>>,
    origin: Origin,
    target: F,
}

impl<F, T> Wrapped<F, T> {
    pub fn config(&self) -> &WrapConfig<T> {
        &self.config
    }

    pub fn router(&self) -> &LogRouter {
        &self.router
    }

    /// `module / function` of the wrapped target as it appears in generated messages.
    pub fn origin(&self) -> String {
        format!("{} / {}", self.origin.module, self.origin.function)
    }

    pub fn call<A, E>(&self, args: A) -> Result<T, WrapError<E>>
    where
        F: Fn(A) -> Result<T, E>,
        T: Clone,
        E: StdError,
    {
        self.config
            .run(&self.router, &self.origin, || (self.target)(args))
    }

    /// Binds a method to `receiver`, keeping this configuration.
    pub fn bind<'r, R: ?Sized>(&'r self, receiver: &'r R) -> Bound<'r, F, R, T> {
        Bound {
            router: self.router.clone(),
            config: Arc::clone(&self.config),
            origin: self.origin.clone(),
            target: &self.target,
            receiver,
        }
    }
}

/// A wrapped method bound to its receiver.
pub struct Bound<'r, F, R: ?Sized, T> {
    router: LogRouter,
    config: Arc<WrapConfig<T>>,
    origin: Origin,
    target: &'r F,
    receiver: &'r R,
}

impl<F, R: ?Sized, T> Bound<'_, F, R, T> {
    pub fn config(&self) -> &WrapConfig<T> {
        &self.config
    }

    pub fn receiver(&self) -> &R {
        self.receiver
    }

    pub fn call<A, E>(&self, args: A) -> Result<T, WrapError<E>>
    where
        F: Fn(&R, A) -> Result<T, E>,
        T: Clone,
        E: StdError,
    {
        self.config.run(&self.router, &self.origin, || {
            (self.target)(self.receiver, args)
        })
    }
}

impl LogRouter {
    /// Wraps `target` with the default configuration.
    pub fn wrap<F, T>(&self, target: F) -> Wrapped<F, T> {
        wrap_config().attach_to(self, target)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use duolog_core::{CaptureFactory, Record, Sink, SinkError, SinkFactory, SinkSpec};

    use super::*;
    use crate::{Registration, router_config};

    fn capture_router() -> (LogRouter, CaptureFactory) {
        let capture = CaptureFactory::new();
        let router = router_config()
            .with_app_name("shop")
            .with_default_severity(20)
            .with_error_severity(50)
            .with_sink_factory(capture.clone())
            .build();
        (router, capture)
    }

    fn parse_quantity(text: &str) -> Result<u32, io::Error> {
        text.trim()
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("bad quantity '{text}'")))
    }

    fn parse_as<T: std::str::FromStr>(text: &str) -> Result<T, io::Error>
    where
        T::Err: std::fmt::Display,
    {
        text.trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{e}")))
    }

    #[test]
    fn test_origin_of_generic_function() {
        let (router, capture) = capture_router();
        let wrapped: Wrapped<_, u32> = router.wrap(parse_as::<u32>);
        assert_eq!(wrapped.origin(), "duolog::wrap::tests / parse_as");
        assert_eq!(wrapped.call("12").unwrap(), 12);
        let messages: Vec<_> = capture.records().into_iter().map(|r| r.message).collect();
        assert_eq!(
            messages,
            vec![
                "Trying : duolog::wrap::tests / parse_as",
                "Success : duolog::wrap::tests / parse_as"
            ]
        );
    }

    #[test]
    fn test_origin_names_the_function() {
        let (router, _) = capture_router();
        let wrapped: Wrapped<_, u32> = router.wrap(parse_quantity);
        assert_eq!(wrapped.origin(), "duolog::wrap::tests / parse_quantity");
        let closure: Wrapped<_, u32> = router.wrap(|n: u32| Ok::<_, io::Error>(n));
        assert_eq!(closure.origin(), "duolog::wrap::tests / test_origin_names_the_function");
    }

    #[test]
    fn test_success_without_configuration() {
        let (router, capture) = capture_router();
        let wrapped = router.wrap(parse_quantity);
        assert_eq!(wrapped.call(" 12 ").unwrap(), 12);
        assert!(router.public_sinks().is_empty());
        let records = capture.records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].message,
            "Trying : duolog::wrap::tests / parse_quantity"
        );
        assert_eq!(
            records[1].message,
            "Success : duolog::wrap::tests / parse_quantity"
        );
        assert!(records.iter().all(|r| r.severity == Severity::Info));
        assert!(records.iter().all(|r| r.failure.is_none()));
    }

    #[test]
    fn test_non_fatal_failure_returns_fallback() {
        let (router, capture) = capture_router();
        let wrapped = wrap_config().non_fatal(0).attach_to(&router, parse_quantity);
        assert_eq!(wrapped.call("twelve").unwrap(), 0);
        let records = capture.records();
        assert_eq!(records.len(), 2);
        let error = &records[1];
        assert_eq!(
            error.message,
            "** Error ** : duolog::wrap::tests / parse_quantity"
        );
        assert_eq!(error.severity, Severity::Critical);
        let failure = error.failure.as_ref().unwrap();
        assert_eq!(failure.message, "bad quantity 'twelve'");
        assert!(failure.kind.contains("io::error::Error"));
    }

    #[test]
    fn test_fatal_failure_is_returned_unchanged() {
        let (router, capture) = capture_router();
        let wrapped = wrap_config().attach_to(&router, parse_quantity);
        let error = wrapped.call("x").unwrap_err().into_call().unwrap();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert_eq!(error.to_string(), "bad quantity 'x'");
        assert!(capture.records()[1].failure.is_some());
    }

    #[test]
    fn test_non_fatal_always_suppresses_failure() {
        let (router, capture) = capture_router();
        assert!(wrap_config::<u32>().is_fatal());
        let config = wrap_config().non_fatal(0);
        assert!(!config.is_fatal());
        let wrapped = config.attach_to(&router, parse_quantity);
        assert_eq!(wrapped.call("x").unwrap(), 0);
        assert!(capture.records()[1].failure.is_some());
    }

    #[test]
    fn test_client_message_routes_to_public() {
        let (router, capture) = capture_router();
        router
            .register(Registration::new().with_identifier("orders"))
            .unwrap();
        router
            .register(Registration::new().with_identifier("orders").public())
            .unwrap();
        let wrapped = wrap_config()
            .with_client_message("Placing your order")
            .with_success_message("Order placed")
            .with_error_message("Your order could not be placed")
            .non_fatal(0)
            .attach_to(&router, parse_quantity);
        wrapped.call("3").unwrap();
        wrapped.call("three").unwrap();
        assert_eq!(
            capture.messages_for("orders"),
            vec![
                "Placing your order",
                "Order placed",
                "Placing your order",
                "Your order could not be placed"
            ]
        );
        assert_eq!(
            capture.messages_for("developer_orders"),
            vec![
                "Trying : duolog::wrap::tests / parse_quantity",
                "Order placed",
                "Trying : duolog::wrap::tests / parse_quantity",
                "Your order could not be placed"
            ]
        );
        let public = capture.records_for("orders");
        assert!(public[3].failure.is_some());
    }

    #[test]
    fn test_severities_metadata_and_sinks() {
        let (router, capture) = capture_router();
        for identifier in ["audit", "debug"] {
            router
                .register(Registration::new().with_identifier(identifier))
                .unwrap();
        }
        let wrapped = wrap_config()
            .with_severity(10)
            .with_severity(12)
            .with_error_severity(40)
            .with_error_severity(99)
            .with_extra("job", "import")
            .with_sinks(["audit"])
            .non_fatal(0)
            .attach_to(&router, parse_quantity);
        wrapped.call("1").unwrap();
        wrapped.call("one").unwrap();
        assert!(capture.records_for("developer_debug").is_empty());
        let severities: Vec<_> = capture
            .records_for("developer_audit")
            .into_iter()
            .map(|r| {
                assert_eq!(r.extra.get("job").map(String::as_str), Some("import"));
                r.severity
            })
            .collect();
        assert_eq!(
            severities,
            vec![
                Severity::Debug,
                Severity::Debug,
                Severity::Debug,
                Severity::Error
            ]
        );
    }

    #[test]
    fn test_unknown_sink_is_a_log_error() {
        let (router, _) = capture_router();
        let calls = AtomicUsize::new(0);
        let wrapped = wrap_config()
            .with_sinks(["missing"])
            .attach_to(&router, |n: u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(n)
            });
        assert!(matches!(
            wrapped.call(1),
            Err(WrapError::Log(Error::UnknownSink { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct Counter {
        base: u32,
    }

    impl Counter {
        fn add(&self, n: u32) -> Result<u32, io::Error> {
            Ok(self.base + n)
        }
    }

    #[test]
    fn test_bound_methods_share_configuration() {
        let (router, capture) = capture_router();
        let wrapped = wrap_config()
            .with_success_message("added")
            .with_extra("unit", "items")
            .non_fatal(0)
            .attach_to(&router, Counter::add);
        let ten = Counter { base: 10 };
        let hundred = Counter { base: 100 };
        let first = wrapped.bind(&ten);
        let second = wrapped.bind(&hundred);
        assert_eq!(first.config(), second.config());
        assert_eq!(first.config(), wrapped.config());
        assert_eq!(first.call(1).unwrap(), 11);
        assert_eq!(second.call(1).unwrap(), 101);
        assert_eq!(first.receiver().base, 10);
        assert_eq!(capture.records().len(), 4);
        assert!(capture.records()[0].message.ends_with("Counter / add"));
    }

    #[test]
    fn test_config_is_reused_across_calls() {
        let (router, capture) = capture_router();
        let wrapped = wrap_config().non_fatal(0).attach_to(&router, parse_quantity);
        let results: Vec<_> = ["1", "x", "3"]
            .into_iter()
            .map(|text| wrapped.call(text).unwrap())
            .collect();
        assert_eq!(results, vec![1, 0, 3]);
        assert_eq!(capture.records().len(), 6);
        assert_eq!(capture.created().len(), 1);
    }

    struct FailOnError;

    impl Sink for FailOnError {
        fn name(&self) -> &str {
            "fail_on_error"
        }
        fn log(&self, record: &Record<'_>) -> Result<(), SinkError> {
            if record.failure.is_some() {
                return Err(SinkError::Disconnected {
                    sink: "fail_on_error".into(),
                });
            }
            Ok(())
        }
    }

    struct FailOnErrorFactory;

    impl SinkFactory for FailOnErrorFactory {
        fn create(&self, _spec: &SinkSpec<'_>) -> Result<Arc<dyn Sink>, SinkError> {
            Ok(Arc::new(FailOnError))
        }
    }

    #[test]
    fn test_log_failure_masks_outcome() {
        let router = router_config().with_sink_factory(FailOnErrorFactory).build();
        let wrapped = wrap_config().non_fatal(0).attach_to(&router, parse_quantity);
        assert_eq!(wrapped.call("5").unwrap(), 5);
        assert!(matches!(
            wrapped.call("five"),
            Err(WrapError::Log(Error::Sink(SinkError::Disconnected { .. })))
        ));
    }
}
