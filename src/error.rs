// src/error.rs - Error taxonomy shared by the parser, executor and bridge
use thiserror::Error;

use crate::hardware::HardwareError;

/// Fieldless error classification, carried by error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidCommand,
    InvalidFunction,
    InvalidSubaction,
    InvalidParameterType,
    MissingParameter,
    HardwareError,
    QueueFull,
    SyncTimeout,
    Rejected,
    Deferred,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCommand => "invalid command",
            Self::InvalidFunction => "invalid function",
            Self::InvalidSubaction => "invalid sub-action",
            Self::InvalidParameterType => "invalid parameter type",
            Self::MissingParameter => "missing parameter",
            Self::HardwareError => "hardware error",
            Self::QueueFull => "queue full",
            Self::SyncTimeout => "sync timeout",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("unknown function '{0}'")]
    InvalidFunction(String),
    #[error("invalid sub-action '{sub_action}' for {function}")]
    InvalidSubaction { function: String, sub_action: String },
    #[error("invalid parameter type: {0}")]
    InvalidParameterType(String),
    #[error("missing parameter '{parameter}' for {command}")]
    MissingParameter { command: String, parameter: String },
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error("command queue full ({capacity} entries)")]
    QueueFull { capacity: usize },
    #[error("no result after {attempts} polls")]
    SyncTimeout { attempts: u32 },
    /// The command ran but answered with an `ERROR:` response.
    #[error("{0}")]
    Rejected(String),
    /// Inline execution was unsafe; the command went to the queue instead.
    #[error("command deferred to queue slot {pending}")]
    Deferred { pending: usize },
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCommand(_) => ErrorKind::InvalidCommand,
            Self::InvalidFunction(_) => ErrorKind::InvalidFunction,
            Self::InvalidSubaction { .. } => ErrorKind::InvalidSubaction,
            Self::InvalidParameterType(_) => ErrorKind::InvalidParameterType,
            Self::MissingParameter { .. } => ErrorKind::MissingParameter,
            Self::Hardware(_) => ErrorKind::HardwareError,
            Self::QueueFull { .. } => ErrorKind::QueueFull,
            Self::SyncTimeout { .. } => ErrorKind::SyncTimeout,
            Self::Rejected(_) => ErrorKind::Rejected,
            Self::Deferred { .. } => ErrorKind::Deferred,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        let err = CommandError::MissingParameter {
            command: "dac(set)".to_string(),
            parameter: "channel".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
        assert_eq!(err.to_string(), "missing parameter 'channel' for dac(set)");
        assert_eq!(CommandError::QueueFull { capacity: 5 }.kind(), ErrorKind::QueueFull);
    }
}
