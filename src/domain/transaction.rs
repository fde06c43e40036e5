use super::fields;
use super::order::PayOrder;
use super::params::ParameterSet;
use crate::error::PayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every operation the gateway client can perform.
///
/// The discriminant indexes [`CATALOG`]; keep both in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Native,
    Jsapi,
    App,
    Micropay,
    Mweb,
    Query,
    Close,
    Refund,
    #[serde(rename = "REFUNDQUERY")]
    RefundQuery,
    #[serde(rename = "DOWNLOADBILL")]
    DownloadBill,
    Transfer,
    TransferQuery,
}

/// Adds operation-specific fields to the common payment fields.
pub type ContributeFn = fn(&PayOrder, ParameterSet) -> ParameterSet;

/// How the secondary interface may address an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSupport {
    /// Not reachable through the secondary interface.
    Unsupported,
    /// Addressed by one identifier; each variant names the wire field it fills.
    Identifier {
        by_transaction_id: &'static str,
        by_out_trade_no: &'static str,
    },
    /// Addressed by billing date and bill type.
    BillDate,
}

/// Which public fields seed the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicFields {
    AppAndMerchant,
    MerchantOnly,
}

/// How the request is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScheme {
    /// Sign over everything except the default exclusions.
    Plain,
    /// Insert `sign_type` first and include it in the signed text.
    WithSignType,
}

/// The client-side step that follows a successful unified order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPass {
    /// Response is handed to the caller as received.
    Passthrough,
    /// Second signature for the in-browser JS bridge.
    Jsapi,
    /// Second signature for the mobile SDK.
    App,
    /// Browser redirect to `mweb_url`.
    MwebRedirect,
}

#[derive(Clone, Copy)]
pub struct CatalogEntry {
    pub kind: TransactionType,
    pub path: &'static str,
    /// Value of `trade_type` for payment kinds.
    pub trade_type: Option<&'static str>,
    pub contribute: Option<ContributeFn>,
    pub lookup: LookupSupport,
    pub public_fields: PublicFields,
    pub sign_scheme: SignScheme,
    pub client_pass: Option<ClientPass>,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("trade_type", &self.trade_type)
            .field("lookup", &self.lookup)
            .field("public_fields", &self.public_fields)
            .field("sign_scheme", &self.sign_scheme)
            .field("client_pass", &self.client_pass)
            .finish_non_exhaustive()
    }
}

const BY_TRADE: LookupSupport = LookupSupport::Identifier {
    by_transaction_id: fields::TRANSACTION_ID,
    by_out_trade_no: fields::OUT_TRADE_NO,
};

const fn payment(
    kind: TransactionType,
    path: &'static str,
    trade_type: &'static str,
    contribute: ContributeFn,
    client_pass: ClientPass,
) -> CatalogEntry {
    CatalogEntry {
        kind,
        path,
        trade_type: Some(trade_type),
        contribute: Some(contribute),
        lookup: LookupSupport::Unsupported,
        public_fields: PublicFields::AppAndMerchant,
        sign_scheme: SignScheme::Plain,
        client_pass: Some(client_pass),
    }
}

const fn operation(
    kind: TransactionType,
    path: &'static str,
    lookup: LookupSupport,
    public_fields: PublicFields,
    sign_scheme: SignScheme,
) -> CatalogEntry {
    CatalogEntry {
        kind,
        path,
        trade_type: None,
        contribute: None,
        lookup,
        public_fields,
        sign_scheme,
        client_pass: None,
    }
}

pub static CATALOG: [CatalogEntry; 12] = [
    payment(
        TransactionType::Native,
        "pay/unifiedorder",
        "NATIVE",
        contribute_native,
        ClientPass::Passthrough,
    ),
    payment(
        TransactionType::Jsapi,
        "pay/unifiedorder",
        "JSAPI",
        contribute_jsapi,
        ClientPass::Jsapi,
    ),
    payment(
        TransactionType::App,
        "pay/unifiedorder",
        "APP",
        contribute_nothing,
        ClientPass::App,
    ),
    payment(
        TransactionType::Micropay,
        "pay/micropay",
        "MICROPAY",
        contribute_micropay,
        ClientPass::Passthrough,
    ),
    payment(
        TransactionType::Mweb,
        "pay/unifiedorder",
        "MWEB",
        contribute_nothing,
        ClientPass::MwebRedirect,
    ),
    operation(
        TransactionType::Query,
        "pay/orderquery",
        BY_TRADE,
        PublicFields::AppAndMerchant,
        SignScheme::WithSignType,
    ),
    operation(
        TransactionType::Close,
        "pay/closeorder",
        BY_TRADE,
        PublicFields::AppAndMerchant,
        SignScheme::WithSignType,
    ),
    operation(
        TransactionType::Refund,
        "secapi/pay/refund",
        LookupSupport::Unsupported,
        PublicFields::AppAndMerchant,
        SignScheme::WithSignType,
    ),
    operation(
        TransactionType::RefundQuery,
        "pay/refundquery",
        BY_TRADE,
        PublicFields::AppAndMerchant,
        SignScheme::WithSignType,
    ),
    operation(
        TransactionType::DownloadBill,
        "pay/downloadbill",
        LookupSupport::BillDate,
        PublicFields::AppAndMerchant,
        SignScheme::WithSignType,
    ),
    operation(
        TransactionType::Transfer,
        "mmpaysptrans/pay_bank",
        LookupSupport::Unsupported,
        PublicFields::MerchantOnly,
        SignScheme::Plain,
    ),
    operation(
        TransactionType::TransferQuery,
        "mmpaysptrans/query_bank",
        LookupSupport::Identifier {
            by_transaction_id: fields::PARTNER_TRADE_NO,
            by_out_trade_no: fields::PARTNER_TRADE_NO,
        },
        PublicFields::MerchantOnly,
        SignScheme::Plain,
    ),
];

fn contribute_native(order: &PayOrder, params: ParameterSet) -> ParameterSet {
    params.with(fields::PRODUCT_ID, order.out_trade_no.as_str())
}

fn contribute_jsapi(order: &PayOrder, mut params: ParameterSet) -> ParameterSet {
    params.insert_non_empty(fields::OPENID, order.openid.as_deref());
    params
}

fn contribute_micropay(order: &PayOrder, mut params: ParameterSet) -> ParameterSet {
    params.remove(fields::NOTIFY_URL);
    params.remove(fields::TRADE_TYPE);
    params.insert_non_empty(fields::AUTH_CODE, order.auth_code.as_deref());
    params
}

fn contribute_nothing(_order: &PayOrder, params: ParameterSet) -> ParameterSet {
    params
}

impl TransactionType {
    pub const ALL: [TransactionType; 12] = [
        Self::Native,
        Self::Jsapi,
        Self::App,
        Self::Micropay,
        Self::Mweb,
        Self::Query,
        Self::Close,
        Self::Refund,
        Self::RefundQuery,
        Self::DownloadBill,
        Self::Transfer,
        Self::TransferQuery,
    ];

    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    pub fn path(self) -> &'static str {
        self.entry().path
    }

    pub fn is_payment(self) -> bool {
        self.entry().contribute.is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "NATIVE",
            Self::Jsapi => "JSAPI",
            Self::App => "APP",
            Self::Micropay => "MICROPAY",
            Self::Mweb => "MWEB",
            Self::Query => "QUERY",
            Self::Close => "CLOSE",
            Self::Refund => "REFUND",
            Self::RefundQuery => "REFUNDQUERY",
            Self::DownloadBill => "DOWNLOADBILL",
            Self::Transfer => "TRANSFER",
            Self::TransferQuery => "TRANSFER_QUERY",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PayError::ValidationError(format!("unknown transaction type: {s}")))
    }
}
