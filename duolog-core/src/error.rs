use thiserror::Error;

/// Failure to hand a record to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The writer behind the sink has stopped.
    #[error("sink '{sink}' is disconnected from its writer")]
    Disconnected { sink: String },

    #[error("sink I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Raised by custom sinks.
    #[error("sink '{sink}' rejected the record: {message}")]
    Rejected { sink: String, message: String },
}
