use crate::domain::fields;
use crate::domain::params::{DEFAULT_EXCLUSIONS, ParameterSet, SIGN_TYPE_EXCLUSIONS};
use crate::domain::ports::{SourceVerifierBox, TrustAllSources};
use crate::domain::verification::{RejectReason, VerificationResult};
use crate::error::Result;
use crate::infrastructure::signer::SignatureEngine;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Checks inbound gateway responses and payment callbacks.
///
/// Checks run in order and stop at the first failure:
/// 1. `return_code` must be `SUCCESS`.
/// 2. A `sign` field must be present.
/// 3. The signature must match the parameters.
/// 4. The source verifier must accept the order (async only).
///
/// A rejection is a normal result, not an error. `Err` is reserved for
/// failures of this process, e.g. an RSA verifier without a public key.
pub struct ResponseVerifier {
    engine: Arc<SignatureEngine>,
    source: SourceVerifierBox,
}

impl ResponseVerifier {
    pub fn new(engine: Arc<SignatureEngine>) -> Self {
        Self {
            engine,
            source: Box::new(TrustAllSources),
        }
    }

    pub fn with_source_verifier(mut self, source: SourceVerifierBox) -> Self {
        self.source = source;
        self
    }

    /// Steps 1 to 3. `None` means the signature checks passed.
    pub fn check_signature(&self, params: &ParameterSet) -> Result<Option<RejectReason>> {
        if !params.is(fields::RETURN_CODE, fields::SUCCESS) {
            return Ok(Some(RejectReason::GatewayFailure));
        }
        let Some(candidate) = params.text(fields::SIGN).filter(|sign| !sign.is_empty()) else {
            return Ok(Some(RejectReason::MissingSignature));
        };
        // messages that declare sign_type were signed over it
        let exclusions = if params.contains_key(fields::SIGN_TYPE) {
            SIGN_TYPE_EXCLUSIONS
        } else {
            DEFAULT_EXCLUSIONS
        };
        if !self.engine.verify(params, &candidate, exclusions)? {
            return Ok(Some(RejectReason::SignatureMismatch));
        }
        Ok(None)
    }

    #[instrument(skip_all, fields(out_trade_no = ?params.text(fields::OUT_TRADE_NO)))]
    pub async fn verify(&self, params: &ParameterSet) -> Result<VerificationResult> {
        if let Some(reason) = self.check_signature(params)? {
            warn!(%reason, "callback rejected");
            return Ok(VerificationResult::Rejected(reason));
        }
        let out_trade_no = params.text(fields::OUT_TRADE_NO);
        if !self.source.verify_source(out_trade_no.as_deref()).await? {
            warn!(reason = %RejectReason::SourceCheckFailed, "callback rejected");
            return Ok(VerificationResult::Rejected(RejectReason::SourceCheckFailed));
        }
        Ok(VerificationResult::Verified)
    }
}
