//! Gateway client configuration.
//!
//! Values are resolved once (from flags, environment or a JSON file) and are
//! read-only for the lifetime of a client.

use crate::domain::transaction::TransactionType;
use crate::error::{PayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const GATEWAY_URI: &str = "https://api.mch.weixin.qq.com/";
pub const SANDBOX_SEGMENT: &str = "sandboxnew/";
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Signing algorithm. Identifiers are matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignAlgorithm {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
    #[serde(rename = "RSA")]
    Rsa,
}

impl SignAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::Rsa => "RSA",
        }
    }
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignAlgorithm {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MD5" => Ok(Self::Md5),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            "RSA" => Ok(Self::Rsa),
            other => Err(PayError::ConfigurationError(format!(
                "unsupported signing algorithm: {other}"
            ))),
        }
    }
}

/// Key material and algorithm used for every signature a client produces.
///
/// For `MD5` and `HMAC-SHA256`, `key_private` is the merchant API key. For
/// `RSA` it is a PEM private key. `key_public` is the gateway's PEM public key,
/// needed for RSA verification and for encrypting transfer fields.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignConfig {
    pub algorithm: SignAlgorithm,
    pub key_private: String,
    #[serde(default)]
    pub key_public: Option<String>,
    #[serde(default = "default_charset")]
    pub input_charset: String,
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl fmt::Debug for SignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignConfig")
            .field("algorithm", &self.algorithm)
            .field("key_private", &"<redacted>")
            .field("key_public", &self.key_public.as_ref().map(|_| "<present>"))
            .field("input_charset", &self.input_charset)
            .finish()
    }
}

impl SignConfig {
    pub fn new(algorithm: SignAlgorithm, key_private: impl Into<String>) -> Self {
        Self {
            algorithm,
            key_private: key_private.into(),
            key_public: None,
            input_charset: default_charset(),
        }
    }

    pub fn with_public_key(mut self, pem: impl Into<String>) -> Self {
        self.key_public = Some(pem.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.input_charset = charset.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_private.trim().is_empty() {
            return Err(PayError::ConfigurationError(
                "malformed secret: private key is empty".to_string(),
            ));
        }
        let charset = self.input_charset.replace('-', "");
        if !charset.eq_ignore_ascii_case("UTF8") {
            return Err(PayError::ConfigurationError(format!(
                "unsupported input charset: {}",
                self.input_charset
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub appid: String,
    pub mch_id: String,
    #[serde(default)]
    pub notify_url: String,
    /// Where MWEB payers land after paying.
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub sign: SignConfig,
}

fn default_base_url() -> String {
    GATEWAY_URI.to_string()
}

impl GatewayConfig {
    pub fn new(appid: impl Into<String>, mch_id: impl Into<String>, sign: SignConfig) -> Self {
        Self {
            appid: appid.into(),
            mch_id: mch_id.into(),
            notify_url: String::new(),
            return_url: None,
            sandbox: false,
            base_url: default_base_url(),
            sign,
        }
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = url.into();
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| PayError::ConfigurationError(format!("invalid gateway config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.appid.is_empty() {
            return Err(PayError::ConfigurationError("appid must be set".to_string()));
        }
        if self.mch_id.is_empty() {
            return Err(PayError::ConfigurationError("mch_id must be set".to_string()));
        }
        self.sign.validate()
    }

    /// Full URL for an operation.
    pub fn endpoint(&self, kind: TransactionType) -> String {
        let base = self.base_url.trim_end_matches('/');
        let sandbox = if self.sandbox { SANDBOX_SEGMENT } else { "" };
        format!("{base}/{sandbox}{}", kind.path())
    }
}
