use super::builder::{RequestBuilder, SignedRequest};
use crate::domain::fields;
use crate::domain::transaction::{LookupSupport, TransactionType};
use crate::error::{PayError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

const ENTRY_POINT: &str = "secondary interface";
const BILL_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillType {
    #[default]
    All,
    Success,
    Refund,
    RechargeRefund,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Success => "SUCCESS",
            Self::Refund => "REFUND",
            Self::RechargeRefund => "RECHARGE_REFUND",
        }
    }
}

impl fmt::Display for BillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillType {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ALL" => Ok(Self::All),
            "SUCCESS" => Ok(Self::Success),
            "REFUND" => Ok(Self::Refund),
            "RECHARGE_REFUND" => Ok(Self::RechargeRefund),
            other => Err(PayError::ValidationError(format!("unknown bill type: {other}"))),
        }
    }
}

/// What a lookup-style operation is addressed by. Chosen by the caller, so the
/// meaning of the argument never has to be guessed from its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    ByTransactionId(String),
    ByExternalOrderId(String),
    ByBillingDate { date: NaiveDate, bill_type: BillType },
}

impl LookupKey {
    fn shape(&self) -> &'static str {
        match self {
            Self::ByTransactionId(_) => "a transaction id",
            Self::ByExternalOrderId(_) => "an external order id",
            Self::ByBillingDate { .. } => "a billing date",
        }
    }
}

/// Builds signed requests for query, close, refund query, bill download and
/// transfer query.
#[derive(Clone)]
pub struct SecondaryDispatcher {
    builder: RequestBuilder,
}

impl SecondaryDispatcher {
    pub fn new(builder: RequestBuilder) -> Self {
        Self { builder }
    }

    #[instrument(skip(self))]
    pub fn dispatch(&self, kind: TransactionType, key: &LookupKey) -> Result<SignedRequest> {
        let entry = kind.entry();
        let params = match (entry.lookup, key) {
            (LookupSupport::Unsupported, _) => {
                return Err(PayError::UnsupportedOperation {
                    operation: kind.as_str(),
                    entry_point: ENTRY_POINT,
                });
            }
            (LookupSupport::BillDate, LookupKey::ByBillingDate { date, bill_type }) => {
                let mut params = self.builder.public_parameters(entry.public_fields);
                params.insert(fields::BILL_DATE, date.format(BILL_DATE_FORMAT).to_string());
                params.insert(fields::BILL_TYPE, bill_type.as_str());
                params
            }
            (
                LookupSupport::Identifier {
                    by_transaction_id,
                    by_out_trade_no,
                },
                LookupKey::ByTransactionId(id) | LookupKey::ByExternalOrderId(id),
            ) => {
                if id.is_empty() {
                    return Err(PayError::ValidationError(format!(
                        "{kind} requires a non-empty identifier"
                    )));
                }
                let field = match key {
                    LookupKey::ByTransactionId(_) => by_transaction_id,
                    _ => by_out_trade_no,
                };
                let mut params = self.builder.public_parameters(entry.public_fields);
                params.insert(field, id);
                params
            }
            (_, key) => {
                return Err(PayError::ValidationError(format!(
                    "{kind} cannot be addressed by {}",
                    key.shape()
                )));
            }
        };
        self.builder.seal(kind, params, entry.sign_scheme)
    }
}
