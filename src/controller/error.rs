//! Failure taxonomy for a turn.

use std::fmt;

use crate::llm::client::LlmError;
use crate::transport::StartError;

/// What kind of failure happened, which decides what the controller does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The provider produced no usable command. Re-query after a delay.
    RecoverableFormat,
    /// The move did not reach the server. Resubmit the same command.
    RecoverableTransport,
    /// The server refused the move. Discard it and re-query.
    RecoverableRejection,
    /// Provider or environment failure. End the session, never retry.
    FatalInfrastructure,
}

impl ErrorClass {
    pub fn is_fatal(self) -> bool {
        self == ErrorClass::FatalInfrastructure
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::RecoverableFormat => write!(f, "format"),
            ErrorClass::RecoverableTransport => write!(f, "transport"),
            ErrorClass::RecoverableRejection => write!(f, "rejection"),
            ErrorClass::FatalInfrastructure => write!(f, "fatal"),
        }
    }
}

impl From<&LlmError> for ErrorClass {
    fn from(_: &LlmError) -> Self {
        ErrorClass::FatalInfrastructure
    }
}

impl From<&StartError> for ErrorClass {
    fn from(err: &StartError) -> Self {
        match err {
            StartError::Refused { .. } => ErrorClass::RecoverableRejection,
            StartError::Unreachable(_) | StartError::InvalidResponse(_) => {
                ErrorClass::FatalInfrastructure
            }
        }
    }
}
