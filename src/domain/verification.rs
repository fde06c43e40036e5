use serde::Serialize;
use std::fmt;

/// Why an inbound response or callback was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    GatewayFailure,
    MissingSignature,
    SignatureMismatch,
    SourceCheckFailed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GatewayFailure => "gateway-reported failure",
            Self::MissingSignature => "missing signature",
            Self::SignatureMismatch => "signature mismatch",
            Self::SourceCheckFailed => "source check failed",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a verification. Both variants are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationResult {
    Verified,
    Rejected(RejectReason),
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Verified => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}
