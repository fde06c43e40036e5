use crate::domain::verification::RejectReason;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PayError>;

/// Flat classification of [`PayError`] for callers that only need to branch
/// on the category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    UnsupportedOperation,
    Gateway,
    Arithmetic,
    Codec,
    Signature,
    Verification,
    Transport,
    Internal,
}

#[derive(Error, Debug)]
pub enum PayError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Operation {operation} is not supported via the {entry_point}")]
    UnsupportedOperation {
        operation: &'static str,
        entry_point: &'static str,
    },
    /// The gateway answered with a non-success status. Code and message are
    /// kept exactly as received.
    #[error("Gateway error [{code}]: {message}")]
    GatewayError { code: String, message: String },
    #[error("Arithmetic error: {0}")]
    ArithmeticError(String),
    #[error("Codec error: {0}")]
    CodecError(String),
    #[error("Signature error: {0}")]
    SignatureError(String),
    /// A gateway reply reported success but failed the signature checks.
    #[error("Verification failed: {0}")]
    VerificationFailed(RejectReason),
    #[error("Transport error: {0}")]
    TransportError(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PayError {
    pub fn gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GatewayError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationError(_) => ErrorKind::Configuration,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            Self::GatewayError { .. } => ErrorKind::Gateway,
            Self::ArithmeticError(_) => ErrorKind::Arithmetic,
            Self::CodecError(_) => ErrorKind::Codec,
            Self::SignatureError(_) => ErrorKind::Signature,
            Self::VerificationFailed(_) => ErrorKind::Verification,
            Self::TransportError(_) => ErrorKind::Transport,
            Self::IoError(_) | Self::CsvError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_keeps_code_and_message_verbatim() {
        let err = PayError::gateway("ORDERPAID", "该订单已支付");
        assert_eq!(err.kind(), ErrorKind::Gateway);
        assert_eq!(err.to_string(), "Gateway error [ORDERPAID]: 该订单已支付");
        match err {
            PayError::GatewayError { code, message } => {
                assert_eq!(code, "ORDERPAID");
                assert_eq!(message, "该订单已支付");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_verification_failure_carries_reason() {
        let err = PayError::VerificationFailed(RejectReason::SignatureMismatch);
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert_eq!(err.to_string(), "Verification failed: signature mismatch");
    }

    #[test]
    fn test_unsupported_operation_message() {
        let err = PayError::UnsupportedOperation {
            operation: "REFUND",
            entry_point: "secondary interface",
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert_eq!(
            err.to_string(),
            "Operation REFUND is not supported via the secondary interface"
        );
    }
}
