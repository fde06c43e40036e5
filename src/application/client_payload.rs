//! Second signing pass over a successful unified-order response.
//!
//! JSAPI and APP payments are completed on the payer's device, which needs
//! its own signed payload built from the returned `prepay_id`. MWEB payments
//! redirect the browser instead. This pass uses different field names and
//! exclusions from request signing and never reuses the request's
//! parameters.

use super::builder::{RequestBuilder, generate_nonce};
use crate::domain::fields::{self, client};
use crate::domain::params::{DEFAULT_EXCLUSIONS, ParameterSet};
use crate::domain::transaction::{ClientPass, TransactionType};
use crate::error::{PayError, Result};
use serde::Serialize;
use tracing::instrument;

/// What the caller hands to the payer's client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ClientPayload {
    /// The gateway response as received (NATIVE, MICROPAY).
    Passthrough(ParameterSet),
    /// Parameters for the JS bridge, signed into `paySign`.
    Jsapi(ParameterSet),
    /// Parameters for the mobile SDK, signed into `sign`.
    App(ParameterSet),
    /// An HTML script that sends the browser to the gateway.
    MwebRedirect(String),
}

impl ClientPayload {
    pub fn params(&self) -> Option<&ParameterSet> {
        match self {
            Self::Passthrough(params) | Self::Jsapi(params) | Self::App(params) => Some(params),
            Self::MwebRedirect(_) => None,
        }
    }
}

impl RequestBuilder {
    /// Builds the client payload for `response`, stamped with the current time.
    pub fn client_payload(
        &self,
        kind: TransactionType,
        response: ParameterSet,
    ) -> Result<ClientPayload> {
        self.client_payload_at(kind, response, chrono::Utc::now().timestamp())
    }

    #[instrument(skip(self, response))]
    pub fn client_payload_at(
        &self,
        kind: TransactionType,
        response: ParameterSet,
        timestamp: i64,
    ) -> Result<ClientPayload> {
        let pass = kind
            .entry()
            .client_pass
            .ok_or(PayError::UnsupportedOperation {
                operation: kind.as_str(),
                entry_point: "client payload",
            })?;

        match pass {
            ClientPass::Passthrough => Ok(ClientPayload::Passthrough(response)),
            ClientPass::Jsapi => self.jsapi_payload(&response, timestamp).map(ClientPayload::Jsapi),
            ClientPass::App => self.app_payload(&response, timestamp).map(ClientPayload::App),
            ClientPass::MwebRedirect => self.mweb_redirect(&response).map(ClientPayload::MwebRedirect),
        }
    }

    fn jsapi_payload(&self, response: &ParameterSet, timestamp: i64) -> Result<ParameterSet> {
        let prepay_id = required(response, fields::PREPAY_ID)?;
        let mut payload = ParameterSet::new()
            .with(client::APP_ID, &self.config().appid)
            .with(client::TIME_STAMP, timestamp.to_string())
            .with(client::NONCE_STR, response_nonce(response))
            .with(client::PACKAGE, format!("prepay_id={prepay_id}"))
            .with(client::SIGN_TYPE, self.engine().algorithm().as_str());
        let pay_sign = self.engine().sign_params(&payload, &[client::PAY_SIGN])?;
        payload.insert(client::PAY_SIGN, pay_sign);
        Ok(payload)
    }

    fn app_payload(&self, response: &ParameterSet, timestamp: i64) -> Result<ParameterSet> {
        let prepay_id = required(response, fields::PREPAY_ID)?;
        let mut payload = ParameterSet::new()
            .with(client::APPID, &self.config().appid)
            .with(client::PARTNER_ID, &self.config().mch_id)
            .with(client::PREPAY_ID, prepay_id)
            .with(client::NONCESTR, response_nonce(response))
            .with(client::TIMESTAMP, timestamp.to_string())
            .with(client::PACKAGE, client::APP_PACKAGE);
        let sign = self.engine().sign_params(&payload, DEFAULT_EXCLUSIONS)?;
        payload.insert(fields::SIGN, sign);
        Ok(payload)
    }

    fn mweb_redirect(&self, response: &ParameterSet) -> Result<String> {
        if !response.is(fields::RETURN_CODE, fields::SUCCESS) {
            return Err(gateway_error(response));
        }
        let mweb_url = required(response, fields::MWEB_URL)?;
        let redirect = match self.config().return_url.as_deref() {
            Some(url) if !url.is_empty() => {
                let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
                format!("&redirect_url={encoded}")
            }
            _ => String::new(),
        };
        Ok(format!(
            "<script type=\"text/javascript\">location.href=\"{mweb_url}{redirect}\"</script>"
        ))
    }
}

/// The gateway's failure as a typed error, code and message verbatim.
pub(crate) fn gateway_error(response: &ParameterSet) -> PayError {
    let code = response
        .text(fields::ERR_CODE)
        .or_else(|| response.text(fields::RETURN_CODE))
        .unwrap_or_default();
    let message = response
        .text(fields::ERR_CODE_DES)
        .or_else(|| response.text(fields::RETURN_MSG))
        .unwrap_or_default();
    PayError::gateway(code, message)
}

fn required(response: &ParameterSet, key: &str) -> Result<String> {
    response
        .text(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PayError::ValidationError(format!("response has no {key}")))
}

fn response_nonce(response: &ParameterSet) -> String {
    response
        .text(fields::NONCE_STR)
        .filter(|nonce| !nonce.is_empty())
        .unwrap_or_else(generate_nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, SignAlgorithm, SignConfig};
    use crate::domain::params::canonicalize;
    use crate::error::ErrorKind;

    fn builder() -> RequestBuilder {
        let config = GatewayConfig::new("wx1", "100", SignConfig::new(SignAlgorithm::Md5, "key"))
            .with_return_url("https://shop.example/done?id=1");
        RequestBuilder::new(config).unwrap()
    }

    fn prepay_response() -> ParameterSet {
        ParameterSet::new()
            .with(fields::RETURN_CODE, fields::SUCCESS)
            .with(fields::RESULT_CODE, fields::SUCCESS)
            .with(fields::NONCE_STR, "n0nce")
            .with(fields::PREPAY_ID, "wx201410272009395522657a690389285100")
    }

    #[test]
    fn test_jsapi_payload() {
        let b = builder();
        let payload = b
            .client_payload_at(TransactionType::Jsapi, prepay_response(), 1414561699)
            .unwrap();
        let ClientPayload::Jsapi(params) = payload else {
            panic!("expected a JSAPI payload");
        };

        assert!(params.is(client::APP_ID, "wx1"));
        assert!(params.is(client::TIME_STAMP, "1414561699"));
        assert!(params.is(client::NONCE_STR, "n0nce"));
        assert!(params.is(client::PACKAGE, "prepay_id=wx201410272009395522657a690389285100"));
        assert!(params.is(client::SIGN_TYPE, "MD5"));

        let base = canonicalize(&params, &[client::PAY_SIGN]);
        assert_eq!(
            base,
            "appId=wx1&nonceStr=n0nce&package=prepay_id=wx201410272009395522657a690389285100&signType=MD5&timeStamp=1414561699"
        );
        assert_eq!(params.text(client::PAY_SIGN).unwrap(), b.engine().sign(&base).unwrap());
    }

    #[test]
    fn test_app_payload() {
        let b = builder();
        let payload = b
            .client_payload_at(TransactionType::App, prepay_response(), 1414561699)
            .unwrap();
        let params = payload.params().unwrap();

        assert!(params.is(client::PARTNER_ID, "100"));
        assert!(params.is(client::PACKAGE, "Sign=WXPay"));
        let sign = params.text(fields::SIGN).unwrap();
        assert!(b.engine().verify(params, &sign, DEFAULT_EXCLUSIONS).unwrap());
    }

    #[test]
    fn test_missing_prepay_id() {
        let mut response = prepay_response();
        response.remove(fields::PREPAY_ID);
        let err = builder()
            .client_payload_at(TransactionType::Jsapi, response, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_mweb_redirect() {
        let response = prepay_response().with(fields::MWEB_URL, "https://wx.tenpay.com/checkmweb?prepay_id=wx1");
        let payload = builder()
            .client_payload_at(TransactionType::Mweb, response, 0)
            .unwrap();
        assert_eq!(
            payload,
            ClientPayload::MwebRedirect(
                "<script type=\"text/javascript\">location.href=\"https://wx.tenpay.com/checkmweb?prepay_id=wx1&redirect_url=https%3A%2F%2Fshop.example%2Fdone%3Fid%3D1\"</script>"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_mweb_failure_is_gateway_error() {
        let response = ParameterSet::new()
            .with(fields::RETURN_CODE, fields::FAIL)
            .with(fields::RETURN_MSG, "签名错误");
        let err = builder()
            .client_payload_at(TransactionType::Mweb, response, 0)
            .unwrap_err();
        assert_eq!(err.to_string(), "Gateway error [FAIL]: 签名错误");
    }

    #[test]
    fn test_native_passes_through() {
        let payload = builder()
            .client_payload_at(TransactionType::Native, prepay_response(), 0)
            .unwrap();
        assert_eq!(payload, ClientPayload::Passthrough(prepay_response()));
    }

    #[test]
    fn test_operations_have_no_client_payload() {
        let err = builder()
            .client_payload_at(TransactionType::Refund, prepay_response(), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }
}
