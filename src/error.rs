//! Error type of the controller client.
use crate::{protocol as proto, transport::TransportError};

/// Represents all possible errors of a controller client operation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wraps `proto::Error`.
    #[error(transparent)]
    Protocol(#[from] proto::Error),

    /// Wraps `TransportError`.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The active register catalog has no field of this name.
    #[error("Register {0} is not available on this controller")]
    UnknownField(String),

    /// The field lives in an input register block and cannot be written.
    #[error("Register {0} is read-only")]
    ReadOnlyField(String),
}

/// The result type of controller client operations.
pub type Result<T> = std::result::Result<T, Error>;
