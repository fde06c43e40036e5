use super::params::ParameterSet;
use crate::error::Result;
use async_trait::async_trait;

/// Sends a serialized request to the gateway and returns the raw reply text.
///
/// Timeouts, cancellation and TLS belong to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: String) -> Result<String>;
}

/// Converts between wire text and parameter maps.
pub trait WireCodec: Send + Sync {
    fn encode(&self, params: &ParameterSet) -> String;
    fn decode(&self, text: &str) -> Result<ParameterSet>;
}

/// Optional out-of-band confirmation that a callback refers to a real order,
/// e.g. by re-querying the gateway.
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify_source(&self, out_trade_no: Option<&str>) -> Result<bool>;
}

/// Renders a payment code (e.g. the NATIVE `code_url`) as an image.
pub trait QrRenderer: Send + Sync {
    fn render(&self, content: &str) -> Result<Vec<u8>>;
}

pub type TransportBox = Box<dyn Transport>;
pub type WireCodecBox = Box<dyn WireCodec>;
pub type SourceVerifierBox = Box<dyn SourceVerifier>;

/// Default source check: accepts every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustAllSources;

#[async_trait]
impl SourceVerifier for TrustAllSources {
    async fn verify_source(&self, _out_trade_no: Option<&str>) -> Result<bool> {
        Ok(true)
    }
}
