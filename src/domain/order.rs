use super::amount::Amount;
use super::transaction::TransactionType;
use crate::error::{PayError, Result};
use serde::{Deserialize, Serialize};

/// A single payment attempt. Created by the caller and consumed once by the
/// request builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayOrder {
    pub subject: String,
    pub out_trade_no: String,
    /// Payer IP. Falls back to a placeholder address when absent.
    pub spbill_create_ip: Option<String>,
    pub price: Amount,
    /// Free-text attachment echoed back by the gateway.
    pub attach: Option<String>,
    pub transaction_type: TransactionType,
    /// Payer identity for JSAPI payments.
    pub openid: Option<String>,
    /// Code scanned from the payer's device for MICROPAY.
    pub auth_code: Option<String>,
}

impl PayOrder {
    pub fn new(
        subject: impl Into<String>,
        out_trade_no: impl Into<String>,
        price: Amount,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            subject: subject.into(),
            out_trade_no: out_trade_no.into(),
            spbill_create_ip: None,
            price,
            attach: None,
            transaction_type,
            openid: None,
            auth_code: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.spbill_create_ip = Some(ip.into());
        self
    }

    pub fn with_attach(mut self, attach: impl Into<String>) -> Self {
        self.attach = Some(attach.into());
        self
    }

    pub fn with_openid(mut self, openid: impl Into<String>) -> Self {
        self.openid = Some(openid.into());
        self
    }

    pub fn with_auth_code(mut self, auth_code: impl Into<String>) -> Self {
        self.auth_code = Some(auth_code.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        require("subject", &self.subject)?;
        require("out_trade_no", &self.out_trade_no)?;
        if self.transaction_type == TransactionType::Micropay
            && self.auth_code.as_deref().is_none_or(str::is_empty)
        {
            return Err(PayError::ValidationError(
                "MICROPAY orders require an auth_code".to_string(),
            ));
        }
        Ok(())
    }
}

/// The trade a refund applies to: either the gateway's transaction id or the
/// merchant's own order number, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeReference {
    TransactionId(String),
    OutTradeNo(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundOrder {
    /// Gateway transaction id. Mutually exclusive with `out_trade_no`.
    pub trade_no: Option<String>,
    pub out_trade_no: Option<String>,
    pub refund_no: String,
    pub refund_amount: Amount,
    pub total_amount: Amount,
}

impl RefundOrder {
    pub fn new(
        trade_no: Option<String>,
        out_trade_no: Option<String>,
        refund_no: impl Into<String>,
        refund_amount: Amount,
        total_amount: Amount,
    ) -> Self {
        Self {
            trade_no,
            out_trade_no,
            refund_no: refund_no.into(),
            refund_amount,
            total_amount,
        }
    }

    /// Resolves which trade is being refunded. Empty strings count as absent.
    pub fn reference(&self) -> Result<TradeReference> {
        let trade_no = self.trade_no.as_deref().filter(|v| !v.is_empty());
        let out_trade_no = self.out_trade_no.as_deref().filter(|v| !v.is_empty());
        match (trade_no, out_trade_no) {
            (Some(id), None) => Ok(TradeReference::TransactionId(id.to_string())),
            (None, Some(no)) => Ok(TradeReference::OutTradeNo(no.to_string())),
            (None, None) => Err(PayError::ValidationError(
                "refund requires either a transaction id or an out_trade_no".to_string(),
            )),
            (Some(_), Some(_)) => Err(PayError::ValidationError(
                "refund accepts a transaction id or an out_trade_no, not both".to_string(),
            )),
        }
    }

    pub(crate) fn validate(&self) -> Result<TradeReference> {
        let reference = self.reference()?;
        require("refund_no", &self.refund_no)?;
        if self.refund_amount > self.total_amount {
            return Err(PayError::ValidationError(format!(
                "refund amount {} exceeds total amount {}",
                self.refund_amount.value(),
                self.total_amount.value()
            )));
        }
        Ok(reference)
    }
}

/// A payout to a bank account. Payee account and name are encrypted with the
/// gateway's public key before they leave the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOrder {
    pub out_no: String,
    pub payee_account: String,
    pub payee_name: String,
    pub bank_code: String,
    pub amount: Amount,
    pub remark: Option<String>,
}

impl TransferOrder {
    pub(crate) fn validate(&self) -> Result<()> {
        require("partner_trade_no", &self.out_no)?;
        require("payee account", &self.payee_account)?;
        require("payee name", &self.payee_name)?;
        require("bank_code", &self.bank_code)
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(PayError::ValidationError(format!("{name} must not be empty")))
    } else {
        Ok(())
    }
}
