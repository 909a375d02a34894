//! Crate-wide error taxonomy for the disbursement core.
//!
//! Every user-facing failure is one of these variants; `user_message` is what
//! a host application should surface verbatim to the operator.

use thiserror::Error;

pub type DisbursementResult<T> = Result<T, DisbursementError>;

#[derive(Debug, Clone, Error)]
pub enum DisbursementError {
    /// A query matched zero source records. Reported, not fatal.
    #[error("No data fetched: {message}")]
    NoData { message: String },

    /// One message per violated rule; all violations reported together.
    #[error("Validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },

    /// An action was attempted in a status or commit state that forbids it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The gateway rejected the request for missing or expired credential
    /// material. No status transition is performed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A synchronous gateway acknowledgment this core does not recognise,
    /// surfaced verbatim for manual triage.
    #[error("Unrecognised gateway response: {reply}")]
    UnknownResponse { reply: String },

    #[error("Document store error: {message}")]
    Store { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl DisbursementError {
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::NoData {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DisbursementError::NoData { .. } => false,
            DisbursementError::Validation { .. } => false,
            DisbursementError::InvalidState { .. } => false,
            DisbursementError::Authentication { .. } => false,
            DisbursementError::UnknownResponse { .. } => false,
            DisbursementError::Store { .. } => true,
            DisbursementError::Network { .. } => true,
            DisbursementError::Serialization { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DisbursementError::NoData { message } => message.clone(),
            DisbursementError::Validation { violations } => violations.join("\n"),
            DisbursementError::InvalidState { message } => message.clone(),
            DisbursementError::Authentication { message } => format!(
                "{message}. Upload a valid authentication certificate and \
                 security credential in the gateway settings, then retry",
            ),
            DisbursementError::UnknownResponse { reply } => format!(
                "The payment gateway returned an unrecognised acknowledgment: \
                 {reply}. The payment was not marked as initiated; review and \
                 retry manually",
            ),
            DisbursementError::Store { .. } => {
                "The document store is temporarily unavailable. Please try again".to_string()
            }
            DisbursementError::Network { .. } => {
                "The payment gateway is temporarily unreachable. Please try again".to_string()
            }
            DisbursementError::Serialization { message } => message.clone(),
        }
    }
}

impl From<serde_json::Error> for DisbursementError {
    fn from(err: serde_json::Error) -> Self {
        DisbursementError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_every_violation() {
        let err = DisbursementError::Validation {
            violations: vec!["bad phone".to_string(), "amount too small".to_string()],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("bad phone"));
        assert!(rendered.contains("amount too small"));
    }

    #[test]
    fn retryable_flags_are_set() {
        assert!(DisbursementError::Network {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!DisbursementError::Authentication {
            message: "no certificate file found in server".to_string()
        }
        .is_retryable());
        assert!(!DisbursementError::UnknownResponse {
            reply: "odd".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn authentication_message_carries_remediation() {
        let err = DisbursementError::Authentication {
            message: "No certificate file found in server".to_string(),
        };
        assert!(err.user_message().contains("gateway settings"));
    }
}
