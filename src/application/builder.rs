use crate::config::GatewayConfig;
use crate::domain::fields;
use crate::domain::order::{PayOrder, RefundOrder, TradeReference, TransferOrder};
use crate::domain::params::{DEFAULT_EXCLUSIONS, ParameterSet, SIGN_TYPE_EXCLUSIONS};
use crate::domain::transaction::{PublicFields, SignScheme, TransactionType};
use crate::error::{PayError, Result};
use crate::infrastructure::signer::SignatureEngine;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const NONCE_LEN: usize = 32;

/// Sent as `spbill_create_ip` when the order carries no payer IP.
pub const DEFAULT_SPBILL_CREATE_IP: &str = "192.168.1.1";

/// A fresh alphanumeric nonce from the thread-local CSPRNG.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// A signed parameter set together with the endpoint it is meant for.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    kind: TransactionType,
    url: String,
    params: ParameterSet,
}

impl SignedRequest {
    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn signature(&self) -> Option<String> {
        self.params.text(fields::SIGN)
    }
}

/// Turns orders into signed parameter sets.
///
/// Every request is seeded with the public fields and a new nonce, merged
/// with the operation's own fields, then signed once. Cloning is cheap and
/// clones share the same configuration and keys.
#[derive(Clone)]
pub struct RequestBuilder {
    config: Arc<GatewayConfig>,
    engine: Arc<SignatureEngine>,
}

impl RequestBuilder {
    /// Validates `config` and loads its signing keys.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let engine = SignatureEngine::from_config(&config.sign)?;
        Ok(Self::from_parts(Arc::new(config), Arc::new(engine)))
    }

    pub fn from_parts(config: Arc<GatewayConfig>, engine: Arc<SignatureEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<SignatureEngine> {
        &self.engine
    }

    pub fn public_parameters(&self, public_fields: PublicFields) -> ParameterSet {
        let mut params = ParameterSet::new();
        if public_fields == PublicFields::AppAndMerchant {
            params.insert(fields::APPID, &self.config.appid);
        }
        params.insert(fields::MCH_ID, &self.config.mch_id);
        params.insert(fields::NONCE_STR, generate_nonce());
        params
    }

    /// Signs `params` with the given scheme and attaches the signature.
    pub fn seal(
        &self,
        kind: TransactionType,
        mut params: ParameterSet,
        scheme: SignScheme,
    ) -> Result<SignedRequest> {
        let exclusions = match scheme {
            SignScheme::Plain => DEFAULT_EXCLUSIONS,
            SignScheme::WithSignType => {
                params.insert(fields::SIGN_TYPE, self.engine.algorithm().as_str());
                SIGN_TYPE_EXCLUSIONS
            }
        };
        let sign = self.engine.sign_params(&params, exclusions)?;
        params.insert(fields::SIGN, sign);

        let url = self.config.endpoint(kind);
        debug!(%kind, %url, param_count = params.len(), "request signed");
        Ok(SignedRequest { kind, url, params })
    }

    #[instrument(skip(self, order), fields(kind = %order.transaction_type, out_trade_no = %order.out_trade_no))]
    pub fn unified_order(&self, order: &PayOrder) -> Result<SignedRequest> {
        let kind = order.transaction_type;
        let entry = kind.entry();
        let (Some(contribute), Some(trade_type)) = (entry.contribute, entry.trade_type) else {
            return Err(PayError::UnsupportedOperation {
                operation: kind.as_str(),
                entry_point: "unified order",
            });
        };
        order.validate()?;

        let mut params = self.public_parameters(entry.public_fields);
        params.insert(fields::BODY, &order.subject);
        params.insert(fields::OUT_TRADE_NO, &order.out_trade_no);
        let ip = order
            .spbill_create_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .unwrap_or(DEFAULT_SPBILL_CREATE_IP);
        params.insert(fields::SPBILL_CREATE_IP, ip);
        params.insert(fields::TOTAL_FEE, order.price.to_minor_units()?);
        params.insert_non_empty(fields::ATTACH, order.attach.as_deref());
        params.insert_non_empty(fields::NOTIFY_URL, Some(self.config.notify_url.as_str()));
        params.insert(fields::TRADE_TYPE, trade_type);

        let params = contribute(order, params);
        self.seal(kind, params, entry.sign_scheme)
    }

    #[instrument(skip(self, order), fields(refund_no = %order.refund_no))]
    pub fn refund(&self, order: &RefundOrder) -> Result<SignedRequest> {
        let reference = order.validate()?;
        let entry = TransactionType::Refund.entry();

        let mut params = self.public_parameters(entry.public_fields);
        match reference {
            TradeReference::TransactionId(id) => params.insert(fields::TRANSACTION_ID, id),
            TradeReference::OutTradeNo(no) => params.insert(fields::OUT_TRADE_NO, no),
        };
        params.insert(fields::OUT_REFUND_NO, &order.refund_no);
        params.insert(fields::TOTAL_FEE, order.total_amount.to_minor_units()?);
        params.insert(fields::REFUND_FEE, order.refund_amount.to_minor_units()?);
        params.insert(fields::OP_USER_ID, &self.config.mch_id);

        self.seal(TransactionType::Refund, params, entry.sign_scheme)
    }

    /// Payee account and name are encrypted before signing, so the signature
    /// covers the ciphertext.
    #[instrument(skip(self, order), fields(out_no = %order.out_no))]
    pub fn transfer(&self, order: &TransferOrder) -> Result<SignedRequest> {
        order.validate()?;
        let entry = TransactionType::Transfer.entry();

        let mut params = self.public_parameters(entry.public_fields);
        params.insert(fields::PARTNER_TRADE_NO, &order.out_no);
        params.insert(fields::ENC_BANK_NO, self.engine.encrypt_field(&order.payee_account)?);
        params.insert(fields::ENC_TRUE_NAME, self.engine.encrypt_field(&order.payee_name)?);
        params.insert(fields::BANK_CODE, &order.bank_code);
        params.insert(fields::AMOUNT, order.amount.to_minor_units()?);
        params.insert_non_empty(fields::DESC, order.remark.as_deref());

        self.seal(TransactionType::Transfer, params, entry.sign_scheme)
    }
}
