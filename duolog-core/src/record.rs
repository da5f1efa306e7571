use std::{
    backtrace::{Backtrace, BacktraceStatus},
    collections::BTreeMap,
    error::Error,
    fmt,
    sync::LazyLock,
};

use regex::Regex;

use crate::Severity;

/// Structured metadata attached to a record.
pub type Extra = BTreeMap<String, String>;

/// A single log call as handed to a sink.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub severity: Severity,
    pub message: &'a str,
    pub extra: &'a Extra,
    pub failure: Option<&'a FailureContext>,
}

/// Symbols of the frames that belong to the wrapping machinery rather than to the failing code.
const WRAPPER_FRAMES: [&str; 3] = [
    "duolog_core::record::FailureContext::capture",
    "duolog::wrap::",
    "std::backtrace::Backtrace::",
];

static FRAME_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+: ").unwrap());

/// Description of a failure captured where a wrapped call returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    pub kind: String,
    pub message: String,
    pub causes: Vec<String>,
    pub backtrace: Option<String>,
    pub hide_wrapper_frames: bool,
}

impl FailureContext {
    pub fn capture<E: Error>(error: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };
        Self {
            kind: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            causes,
            backtrace,
            hide_wrapper_frames: true,
        }
    }

    /// Backtrace frames, without the wrapper's own frames when `hide_wrapper_frames` is set.
    pub fn frames(&self) -> Vec<String> {
        let Some(backtrace) = &self.backtrace else {
            return Vec::new();
        };
        let mut frames: Vec<String> = Vec::new();
        for line in backtrace.lines() {
            if !FRAME_START.is_match(line)
                && let Some(frame) = frames.last_mut()
            {
                frame.push('\n');
                frame.push_str(line);
                continue;
            }
            frames.push(line.to_string());
        }
        if self.hide_wrapper_frames {
            frames.retain(|frame| !WRAPPER_FRAMES.iter().any(|symbol| frame.contains(symbol)));
        }
        frames
    }
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure ({}): {}", self.kind, self.message)?;
        for cause in &self.causes {
            write!(f, "\n  caused by: {cause}")?;
        }
        let frames = self.frames();
        if !frames.is_empty() {
            f.write_str("\nBacktrace:")?;
            for frame in frames {
                write!(f, "\n{frame}")?;
            }
        }
        Ok(())
    }
}
