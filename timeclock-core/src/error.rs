use thiserror::Error;

/// Errors produced when decoding persisted domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown punch kind: {0}")]
    UnknownPunchKind(String),

    #[error("unknown verification method: {0}")]
    UnknownVerificationMethod(String),
}
