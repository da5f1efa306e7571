use duolog_core::SinkError;
use thiserror::Error;

use crate::Audience;

#[derive(Debug, Error)]
pub enum Error {
    /// An explicit sink name is not registered for the audience being dispatched to.
    #[error("no {audience} sink registered under '{name}'")]
    UnknownSink { audience: Audience, name: String },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
