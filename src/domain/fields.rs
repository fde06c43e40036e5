//! Wire field names. These are part of the gateway compatibility surface and
//! must not change.

pub const APPID: &str = "appid";
pub const MCH_ID: &str = "mch_id";
pub const NONCE_STR: &str = "nonce_str";
pub const SIGN: &str = "sign";
pub const SIGN_TYPE: &str = "sign_type";

pub const BODY: &str = "body";
pub const OUT_TRADE_NO: &str = "out_trade_no";
pub const SPBILL_CREATE_IP: &str = "spbill_create_ip";
pub const TOTAL_FEE: &str = "total_fee";
pub const ATTACH: &str = "attach";
pub const NOTIFY_URL: &str = "notify_url";
pub const TRADE_TYPE: &str = "trade_type";
pub const PRODUCT_ID: &str = "product_id";
pub const OPENID: &str = "openid";
pub const AUTH_CODE: &str = "auth_code";

pub const RETURN_CODE: &str = "return_code";
pub const RETURN_MSG: &str = "return_msg";
pub const RESULT_CODE: &str = "result_code";
pub const ERR_CODE: &str = "err_code";
pub const ERR_CODE_DES: &str = "err_code_des";
pub const PREPAY_ID: &str = "prepay_id";
pub const CODE_URL: &str = "code_url";
pub const MWEB_URL: &str = "mweb_url";

pub const TRANSACTION_ID: &str = "transaction_id";
pub const OUT_REFUND_NO: &str = "out_refund_no";
pub const REFUND_FEE: &str = "refund_fee";
pub const OP_USER_ID: &str = "op_user_id";

pub const BILL_DATE: &str = "bill_date";
pub const BILL_TYPE: &str = "bill_type";
pub const DATA: &str = "data";

pub const PARTNER_TRADE_NO: &str = "partner_trade_no";
pub const ENC_BANK_NO: &str = "enc_bank_no";
pub const ENC_TRUE_NAME: &str = "enc_true_name";
pub const BANK_CODE: &str = "bank_code";
pub const AMOUNT: &str = "amount";
pub const DESC: &str = "desc";

/// Status sentinel for `return_code` and `result_code`.
pub const SUCCESS: &str = "SUCCESS";
pub const FAIL: &str = "FAIL";

/// Keys of the payloads handed to the in-browser JS bridge and the mobile SDK.
/// These use the client-side spelling, not the server one.
pub mod client {
    pub const APP_ID: &str = "appId";
    pub const TIME_STAMP: &str = "timeStamp";
    pub const NONCE_STR: &str = "nonceStr";
    pub const PACKAGE: &str = "package";
    pub const SIGN_TYPE: &str = "signType";
    pub const PAY_SIGN: &str = "paySign";

    pub const APPID: &str = "appid";
    pub const PARTNER_ID: &str = "partnerid";
    pub const PREPAY_ID: &str = "prepayid";
    pub const NONCESTR: &str = "noncestr";
    pub const TIMESTAMP: &str = "timestamp";

    /// Fixed `package` value for the mobile SDK.
    pub const APP_PACKAGE: &str = "Sign=WXPay";
}
