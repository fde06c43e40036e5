#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use wxpay_core::application::builder::RequestBuilder;
use wxpay_core::application::service::PayService;
use wxpay_core::config::{GatewayConfig, SignAlgorithm, SignConfig};
use wxpay_core::domain::amount::Amount;
use wxpay_core::domain::fields;
use wxpay_core::domain::order::PayOrder;
use wxpay_core::domain::params::{DEFAULT_EXCLUSIONS, ParameterSet};
use wxpay_core::domain::ports::WireCodec;
use wxpay_core::domain::transaction::TransactionType;
use wxpay_core::infrastructure::in_memory::InMemoryTransport;
use wxpay_core::infrastructure::signer::SignatureEngine;
use wxpay_core::interfaces::xml::XmlCodec;

pub const APPID: &str = "wxd930ea5d5a258f4f";
pub const MCH_ID: &str = "10000100";
pub const KEY: &str = "192006250b4c09247ec02edce69f6a2d";

pub fn config(algorithm: SignAlgorithm) -> GatewayConfig {
    GatewayConfig::new(APPID, MCH_ID, SignConfig::new(algorithm, KEY))
        .with_notify_url("https://merchant.example/notify")
}

pub fn builder() -> RequestBuilder {
    RequestBuilder::new(config(SignAlgorithm::Md5)).unwrap()
}

pub fn engine() -> Arc<SignatureEngine> {
    engine_for(SignAlgorithm::Md5)
}

pub fn engine_for(algorithm: SignAlgorithm) -> Arc<SignatureEngine> {
    Arc::new(SignatureEngine::from_config(&config(algorithm).sign).unwrap())
}

pub fn service(transport: &InMemoryTransport) -> PayService {
    PayService::new(config(SignAlgorithm::Md5), Box::new(transport.clone())).unwrap()
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn order(kind: TransactionType, price: Decimal) -> PayOrder {
    PayOrder::new("Test", "ORDER1", amount(price), kind)
}

/// Signs `params` the way the gateway signs its replies and callbacks.
pub fn gateway_signed(params: ParameterSet) -> ParameterSet {
    gateway_signed_by(SignAlgorithm::Md5, params)
}

pub fn gateway_signed_by(algorithm: SignAlgorithm, mut params: ParameterSet) -> ParameterSet {
    let sign = engine_for(algorithm)
        .sign_params(&params, DEFAULT_EXCLUSIONS)
        .unwrap();
    params.insert(fields::SIGN, sign);
    params
}

pub fn to_xml(params: &ParameterSet) -> String {
    XmlCodec.encode(params)
}

pub fn payment_callback() -> ParameterSet {
    gateway_signed(
        ParameterSet::new()
            .with(fields::APPID, APPID)
            .with(fields::MCH_ID, MCH_ID)
            .with(fields::NONCE_STR, "5K8264ILTKCH16CQ2502SI8ZNMTM67VS")
            .with(fields::RETURN_CODE, fields::SUCCESS)
            .with(fields::RESULT_CODE, fields::SUCCESS)
            .with(fields::OUT_TRADE_NO, "ORDER1")
            .with(fields::TRANSACTION_ID, "1004400740201409030005092168")
            .with(fields::TOTAL_FEE, "999"),
    )
}
