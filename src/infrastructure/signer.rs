use crate::config::{SignAlgorithm, SignConfig};
use crate::domain::params::{ParameterSet, canonicalize};
use crate::error::{PayError, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use md5::Md5;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// One signing algorithm bound to its key material.
pub trait SignatureStrategy: Send + Sync {
    fn algorithm(&self) -> SignAlgorithm;

    fn sign(&self, base: &str) -> Result<String>;

    /// Re-derives the signature and compares it in constant time.
    fn verify(&self, base: &str, candidate: &str) -> Result<bool> {
        let expected = self.sign(base)?;
        Ok(constant_time_eq(&expected, candidate))
    }
}

pub fn constant_time_eq(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

/// `MD5(base + "&key=" + key)`, upper-case hex.
pub struct Md5Signer {
    key: String,
}

impl Md5Signer {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl SignatureStrategy for Md5Signer {
    fn algorithm(&self) -> SignAlgorithm {
        SignAlgorithm::Md5
    }

    fn sign(&self, base: &str) -> Result<String> {
        let mut hasher = Md5::new();
        hasher.update(base.as_bytes());
        hasher.update(b"&key=");
        hasher.update(self.key.as_bytes());
        Ok(hex::encode_upper(hasher.finalize()))
    }
}

/// `HMAC-SHA256(key, base + "&key=" + key)`, upper-case hex.
pub struct HmacSha256Signer {
    key: String,
}

impl HmacSha256Signer {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl SignatureStrategy for HmacSha256Signer {
    fn algorithm(&self) -> SignAlgorithm {
        SignAlgorithm::HmacSha256
    }

    fn sign(&self, base: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| PayError::ConfigurationError(format!("malformed secret: {e}")))?;
        mac.update(base.as_bytes());
        mac.update(b"&key=");
        mac.update(self.key.as_bytes());
        Ok(hex::encode_upper(mac.finalize().into_bytes()))
    }
}

/// RSASSA-PKCS1-v1_5 with SHA-256 over the bare base string, base64 encoded.
pub struct RsaSigner {
    signing_key: SigningKey<Sha256>,
    verifying_key: Option<VerifyingKey<Sha256>>,
}

impl RsaSigner {
    pub fn new(private_key: RsaPrivateKey, public_key: Option<RsaPublicKey>) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(private_key),
            verifying_key: public_key.map(VerifyingKey::<Sha256>::new),
        }
    }

    pub fn from_pem(private_pem: &str, public_pem: Option<&str>) -> Result<Self> {
        let private_key = parse_private_key(private_pem)?;
        let public_key = public_pem.map(parse_public_key).transpose()?;
        Ok(Self::new(private_key, public_key))
    }
}

impl SignatureStrategy for RsaSigner {
    fn algorithm(&self) -> SignAlgorithm {
        SignAlgorithm::Rsa
    }

    fn sign(&self, base: &str) -> Result<String> {
        let signature = self
            .signing_key
            .try_sign(base.as_bytes())
            .map_err(|e| PayError::SignatureError(format!("RSA signing failed: {e}")))?;
        Ok(BASE64.encode(signature.to_bytes()))
    }

    /// Checks `candidate` against the gateway public key. Malformed
    /// candidates are a mismatch, not an error.
    fn verify(&self, base: &str, candidate: &str) -> Result<bool> {
        let verifying_key = self.verifying_key.as_ref().ok_or_else(|| {
            PayError::ConfigurationError("RSA verification requires a public key".to_string())
        })?;
        let Ok(bytes) = BASE64.decode(candidate) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
            return Ok(false);
        };
        Ok(verifying_key.verify(base.as_bytes(), &signature).is_ok())
    }
}

/// RSA-OAEP(SHA-1) encryption of individual sensitive fields with the
/// gateway's public key.
///
/// Kept apart from [`RsaSigner`]: the two share key material but are
/// different primitives.
pub struct FieldEncryptor {
    public_key: RsaPublicKey,
}

impl FieldEncryptor {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key }
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        parse_public_key(pem).map(Self::new)
    }

    pub fn encrypt_field(&self, plaintext: &str) -> Result<String> {
        let ciphertext = self
            .public_key
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), plaintext.as_bytes())
            .map_err(|e| PayError::SignatureError(format!("field encryption failed: {e}")))?;
        Ok(BASE64.encode(ciphertext))
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| PayError::ConfigurationError(format!("malformed RSA private key: {e}")))
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| PayError::ConfigurationError(format!("malformed RSA public key: {e}")))
}

/// Signs and verifies canonicalized parameter sets with the configured
/// algorithm, and encrypts transfer fields when a public key is configured.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct SignatureEngine {
    strategy: Box<dyn SignatureStrategy>,
    encryptor: Option<FieldEncryptor>,
}

impl SignatureEngine {
    pub fn new(strategy: Box<dyn SignatureStrategy>, encryptor: Option<FieldEncryptor>) -> Self {
        Self {
            strategy,
            encryptor,
        }
    }

    pub fn from_config(config: &SignConfig) -> Result<Self> {
        config.validate()?;
        let public_pem = config.key_public.as_deref().filter(|pem| !pem.trim().is_empty());
        let strategy: Box<dyn SignatureStrategy> = match config.algorithm {
            SignAlgorithm::Md5 => Box::new(Md5Signer::new(&config.key_private)),
            SignAlgorithm::HmacSha256 => Box::new(HmacSha256Signer::new(&config.key_private)),
            SignAlgorithm::Rsa => Box::new(RsaSigner::from_pem(&config.key_private, public_pem)?),
        };
        let encryptor = public_pem.map(FieldEncryptor::from_pem).transpose()?;
        Ok(Self::new(strategy, encryptor))
    }

    pub fn algorithm(&self) -> SignAlgorithm {
        self.strategy.algorithm()
    }

    pub fn sign(&self, base: &str) -> Result<String> {
        self.strategy.sign(base)
    }

    pub fn sign_params(&self, params: &ParameterSet, exclude: &[&str]) -> Result<String> {
        self.sign(&canonicalize(params, exclude))
    }

    /// Canonicalizes `params` with the same exclusions used for signing and
    /// checks `candidate` against the result.
    pub fn verify(&self, params: &ParameterSet, candidate: &str, exclude: &[&str]) -> Result<bool> {
        self.strategy.verify(&canonicalize(params, exclude), candidate)
    }

    pub fn encrypt_field(&self, plaintext: &str) -> Result<String> {
        self.encryptor
            .as_ref()
            .ok_or_else(|| {
                PayError::ConfigurationError(
                    "field encryption requires the gateway public key".to_string(),
                )
            })?
            .encrypt_field(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::DEFAULT_EXCLUSIONS;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use std::sync::OnceLock;

    // Example from the gateway's signing guide.
    const GUIDE_KEY: &str = "192006250b4c09247ec02edce69f6a2d";
    const GUIDE_BASE: &str =
        "appid=wxd930ea5d5a258f4f&body=test&device_info=1000&mch_id=10000100&nonce_str=ibuaiVcKdpRxkhJA";

    fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
    }

    fn rsa_config() -> SignConfig {
        let private_pem = test_key().to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        SignConfig::new(SignAlgorithm::Rsa, private_pem).with_public_key(public_pem)
    }

    #[test]
    fn test_md5_matches_guide_example() {
        let signer = Md5Signer::new(GUIDE_KEY);
        assert_eq!(
            signer.sign(GUIDE_BASE).unwrap(),
            "9A0A8659F005D6984697E2CA0A9CF3B7"
        );
    }

    #[test]
    fn test_hmac_sha256_matches_guide_example() {
        let signer = HmacSha256Signer::new(GUIDE_KEY);
        let sign = signer.sign(GUIDE_BASE).unwrap();
        assert_eq!(
            sign,
            "6A9AE1657590FD6257D693A078E1C3E4BB6BA4DC30B23E0EE2496E54170DACD6"
        );
        assert!(signer.verify(GUIDE_BASE, &sign).unwrap());
        assert_ne!(sign, signer.sign("appid=other").unwrap());
        assert_ne!(sign, HmacSha256Signer::new("other").sign(GUIDE_BASE).unwrap());
    }

    #[test]
    fn test_verify_is_exact_match() {
        let signer = Md5Signer::new(GUIDE_KEY);
        assert!(signer.verify(GUIDE_BASE, "9A0A8659F005D6984697E2CA0A9CF3B7").unwrap());
        assert!(!signer.verify(GUIDE_BASE, "9a0a8659f005d6984697e2ca0a9cf3b7").unwrap());
        assert!(!signer.verify(GUIDE_BASE, "").unwrap());
    }

    #[test]
    fn test_engine_rejects_unknown_config() {
        let err = SignatureEngine::from_config(&SignConfig::new(SignAlgorithm::Md5, ""))
            .err()
            .unwrap();
        assert!(matches!(err, PayError::ConfigurationError(_)));

        let bad_pem = SignConfig::new(SignAlgorithm::Rsa, "not a pem");
        assert!(matches!(
            SignatureEngine::from_config(&bad_pem),
            Err(PayError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_rsa_sign_and_verify() {
        let engine = SignatureEngine::from_config(&rsa_config()).unwrap();
        assert_eq!(engine.algorithm(), SignAlgorithm::Rsa);

        let params = ParameterSet::new().with("out_trade_no", "ORDER1").with("total_fee", 999i64);
        let sign = engine.sign_params(&params, DEFAULT_EXCLUSIONS).unwrap();
        assert!(BASE64.decode(&sign).is_ok());
        assert!(engine.verify(&params, &sign, DEFAULT_EXCLUSIONS).unwrap());

        let tampered = params.clone().with("total_fee", 1i64);
        assert!(!engine.verify(&tampered, &sign, DEFAULT_EXCLUSIONS).unwrap());
        assert!(!engine.verify(&params, "not base64!", DEFAULT_EXCLUSIONS).unwrap());
    }

    #[test]
    fn test_rsa_verify_without_public_key_is_configuration_error() {
        let signer = RsaSigner::new(test_key().clone(), None);
        let sign = signer.sign("a=1").unwrap();
        assert!(matches!(
            signer.verify("a=1", &sign),
            Err(PayError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_encrypt_field_round_trip() {
        let engine = SignatureEngine::from_config(&rsa_config()).unwrap();
        let ciphertext = engine.encrypt_field("6222020200000000000").unwrap();
        let bytes = BASE64.decode(ciphertext).unwrap();
        let plaintext = test_key().decrypt(Oaep::new::<Sha1>(), &bytes).unwrap();
        assert_eq!(plaintext, b"6222020200000000000");

        // OAEP is randomized
        assert_ne!(
            engine.encrypt_field("x").unwrap(),
            engine.encrypt_field("x").unwrap()
        );
    }

    #[test]
    fn test_encrypt_field_requires_public_key() {
        let engine = SignatureEngine::from_config(&SignConfig::new(SignAlgorithm::Md5, "k")).unwrap();
        assert!(matches!(
            engine.encrypt_field("x"),
            Err(PayError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_symmetric_engine_can_carry_encryption_key() {
        let public_pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let config = SignConfig::new(SignAlgorithm::Md5, GUIDE_KEY).with_public_key(public_pem);
        let engine = SignatureEngine::from_config(&config).unwrap();
        assert_eq!(engine.algorithm(), SignAlgorithm::Md5);
        assert!(engine.encrypt_field("张三").is_ok());
    }
}
