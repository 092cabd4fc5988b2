use std::io;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },
    #[error("bad direction token: {0}")]
    BadDirection(String),
    #[error("bad number: {0}")]
    BadNumber(String),
    #[error("snapshot has {actual} fields, expected {expected}")]
    FieldCount { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("connection lost")]
    ConnectionLost,
    #[error("peer not connected")]
    NotConnected,
}
