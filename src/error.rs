//! Error taxonomy for the bot and its step engine.
//!
//! Step failures are persisted into the memo as a [`StepFailure`] and turned
//! back into the same [`Error`] variant when a run is replayed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by steps, registries and the protocol adapter
#[derive(Debug, Error)]
pub enum Error {
    /// A different outcome was recorded for a step that already has one
    #[error("Step '{step}' already has a different recorded outcome")]
    DuplicateStep { step: String },

    #[error("A workflow named '{0}' is already registered")]
    DuplicateWorkflowName(String),

    /// Completion backend unreachable or returned an unexpected shape
    #[error("Backend error: {0}")]
    Backend(String),

    /// Reply rejected by the chat platform
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Reaction add/remove rejected by the chat platform
    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Registration error: {0}")]
    Registration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable identifier for each error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateStep,
    DuplicateWorkflowName,
    Backend,
    Delivery,
    Platform,
    Publish,
    UnknownFunction,
    Registration,
    Config,
    Serialization,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateStep { .. } => ErrorKind::DuplicateStep,
            Self::DuplicateWorkflowName(_) => ErrorKind::DuplicateWorkflowName,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Delivery(_) => ErrorKind::Delivery,
            Self::Platform(_) => ErrorKind::Platform,
            Self::Publish(_) => ErrorKind::Publish,
            Self::UnknownFunction(_) => ErrorKind::UnknownFunction,
            Self::Registration(_) => ErrorKind::Registration,
            Self::Config(_) => ErrorKind::Config,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Inner message without the variant prefix
    fn detail(&self) -> String {
        match self {
            Self::DuplicateStep { step } => step.clone(),
            Self::DuplicateWorkflowName(msg)
            | Self::Backend(msg)
            | Self::Delivery(msg)
            | Self::Platform(msg)
            | Self::Publish(msg)
            | Self::UnknownFunction(msg)
            | Self::Registration(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Serialization(e) => e.to_string(),
        }
    }

    /// Snapshot of this error suitable for persisting in a step memo
    pub fn to_failure(&self) -> StepFailure {
        StepFailure {
            kind: self.kind(),
            message: self.detail(),
        }
    }
}

/// A persisted step failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<StepFailure> for Error {
    fn from(failure: StepFailure) -> Self {
        let StepFailure { kind, message } = failure;
        match kind {
            ErrorKind::DuplicateStep => Self::DuplicateStep { step: message },
            ErrorKind::DuplicateWorkflowName => Self::DuplicateWorkflowName(message),
            ErrorKind::Backend => Self::Backend(message),
            ErrorKind::Delivery => Self::Delivery(message),
            ErrorKind::Platform => Self::Platform(message),
            ErrorKind::Publish => Self::Publish(message),
            ErrorKind::UnknownFunction => Self::UnknownFunction(message),
            ErrorKind::Registration => Self::Registration(message),
            ErrorKind::Config => Self::Config(message),
            // serde_json errors cannot be rebuilt from text
            ErrorKind::Serialization | ErrorKind::Internal => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_restores_variant() {
        let original = Error::Backend("missing reply field".to_string());
        let failure = original.to_failure();

        assert_eq!(failure.kind, ErrorKind::Backend);
        assert_eq!(failure.message, "missing reply field");

        let restored = Error::from(failure);
        assert!(matches!(restored, Error::Backend(ref m) if m == "missing reply field"));
        assert_eq!(restored.to_string(), original.to_string());
    }

    #[test]
    fn test_failure_serialization_shape() {
        let failure = Error::Delivery("Unknown Message".to_string()).to_failure();
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["kind"], "delivery");
        assert_eq!(json["message"], "Unknown Message");
    }
}
