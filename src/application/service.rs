use super::builder::{RequestBuilder, SignedRequest};
use super::client_payload::{ClientPayload, gateway_error};
use super::dispatcher::{BillType, LookupKey, SecondaryDispatcher};
use super::verifier::ResponseVerifier;
use crate::config::GatewayConfig;
use crate::domain::fields;
use crate::domain::order::{PayOrder, RefundOrder, TransferOrder};
use crate::domain::params::ParameterSet;
use crate::domain::ports::{QrRenderer, SourceVerifierBox, TransportBox, WireCodecBox};
use crate::domain::transaction::TransactionType;
use crate::domain::verification::VerificationResult;
use crate::error::{PayError, Result};
use crate::interfaces::csv::bill_reader::{Bill, BillReader};
use crate::interfaces::xml::XmlCodec;
use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

/// Message returned with a successful bill download that came back as plain
/// text rather than XML.
const BILL_OK_MSG: &str = "ok";
const SUCCESS_ACK_MSG: &str = "成功";

/// Gateway client: builds and signs requests, sends them through the
/// configured transport and interprets the replies.
///
/// The service owns no mutable state and can be shared across tasks behind
/// an `Arc`.
pub struct PayService {
    builder: RequestBuilder,
    dispatcher: SecondaryDispatcher,
    verifier: ResponseVerifier,
    transport: TransportBox,
    codec: WireCodecBox,
}

impl PayService {
    pub fn new(config: GatewayConfig, transport: TransportBox) -> Result<Self> {
        let builder = RequestBuilder::new(config)?;
        Ok(Self {
            dispatcher: SecondaryDispatcher::new(builder.clone()),
            verifier: ResponseVerifier::new(builder.engine().clone()),
            builder,
            transport,
            codec: Box::new(XmlCodec),
        })
    }

    pub fn with_codec(mut self, codec: WireCodecBox) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_source_verifier(mut self, source: SourceVerifierBox) -> Self {
        self.verifier = ResponseVerifier::new(self.builder.engine().clone()).with_source_verifier(source);
        self
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    async fn send(&self, request: &SignedRequest) -> Result<String> {
        let body = self.codec.encode(request.params());
        debug!(kind = %request.kind(), url = request.url(), "sending request");
        self.transport.post(request.url(), body).await
    }

    /// Sends `request` and accepts the reply only if it reports success and
    /// carries a valid signature.
    async fn exchange(&self, request: &SignedRequest) -> Result<ParameterSet> {
        let reply = self.send(request).await?;
        let response = ensure_return_success(self.codec.decode(&reply)?)?;
        if let Some(reason) = self.verifier.check_signature(&response)? {
            warn!(kind = %request.kind(), %reason, "gateway reply rejected");
            return Err(PayError::VerificationFailed(reason));
        }
        Ok(response)
    }

    /// Places an order and returns the gateway's reply. A non-success
    /// `return_code` is a [`PayError::GatewayError`] and a reply that fails
    /// the signature checks is a [`PayError::VerificationFailed`].
    #[instrument(skip_all, fields(kind = %order.transaction_type, out_trade_no = %order.out_trade_no))]
    pub async fn unified_order(&self, order: &PayOrder) -> Result<ParameterSet> {
        let request = self.builder.unified_order(order)?;
        self.exchange(&request).await
    }

    /// Places an order and prepares what the payer's client needs to finish
    /// paying.
    pub async fn order_info(&self, order: &PayOrder) -> Result<ClientPayload> {
        let response = self.unified_order(order).await?;
        self.builder.client_payload(order.transaction_type, response)
    }

    pub async fn micro_pay(&self, order: &PayOrder) -> Result<ParameterSet> {
        require_kind(order, TransactionType::Micropay, "micro pay")?;
        self.unified_order(order).await
    }

    /// Places a NATIVE order and renders its `code_url` for the payer to scan.
    pub async fn gen_qr_pay(&self, order: &PayOrder, renderer: &dyn QrRenderer) -> Result<Vec<u8>> {
        require_kind(order, TransactionType::Native, "QR payment")?;
        let response = self.unified_order(order).await?;
        if !response.is(fields::RESULT_CODE, fields::SUCCESS) {
            return Err(gateway_error(&response));
        }
        let code_url = response
            .text(fields::CODE_URL)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PayError::ValidationError("response has no code_url".to_string()))?;
        renderer.render(&code_url)
    }

    #[instrument(skip_all, fields(refund_no = %order.refund_no))]
    pub async fn refund(&self, order: &RefundOrder) -> Result<ParameterSet> {
        let request = self.builder.refund(order)?;
        self.exchange(&request).await
    }

    #[instrument(skip_all, fields(out_no = %order.out_no))]
    pub async fn transfer(&self, order: &TransferOrder) -> Result<ParameterSet> {
        let request = self.builder.transfer(order)?;
        self.exchange(&request).await
    }

    pub async fn query(&self, key: &LookupKey) -> Result<ParameterSet> {
        self.secondary_interface(TransactionType::Query, key).await
    }

    pub async fn close(&self, key: &LookupKey) -> Result<ParameterSet> {
        self.secondary_interface(TransactionType::Close, key).await
    }

    pub async fn refund_query(&self, key: &LookupKey) -> Result<ParameterSet> {
        self.secondary_interface(TransactionType::RefundQuery, key).await
    }

    pub async fn transfer_query(&self, key: &LookupKey) -> Result<ParameterSet> {
        self.secondary_interface(TransactionType::TransferQuery, key).await
    }

    pub async fn download_bill(&self, date: NaiveDate, bill_type: BillType) -> Result<ParameterSet> {
        self.secondary_interface(
            TransactionType::DownloadBill,
            &LookupKey::ByBillingDate { date, bill_type },
        )
        .await
    }

    /// Downloads a bill and parses its rows.
    pub async fn download_bill_records(&self, date: NaiveDate, bill_type: BillType) -> Result<Bill> {
        let response = self.download_bill(date, bill_type).await?;
        let data = response
            .text(fields::DATA)
            .ok_or_else(|| PayError::ValidationError("bill response has no data".to_string()))?;
        BillReader::new(data.as_bytes()).read()
    }

    /// Runs a lookup-style operation. Replies are returned as received,
    /// except that bill downloads must report success and plain-text bills
    /// are wrapped under `data`.
    #[instrument(skip(self))]
    pub async fn secondary_interface(
        &self,
        kind: TransactionType,
        key: &LookupKey,
    ) -> Result<ParameterSet> {
        let request = self.dispatcher.dispatch(kind, key)?;
        let reply = self.send(&request).await?;
        if kind != TransactionType::DownloadBill {
            return self.codec.decode(&reply);
        }
        if reply.starts_with('<') {
            return ensure_return_success(self.codec.decode(&reply)?);
        }
        Ok(ParameterSet::new()
            .with(fields::RETURN_CODE, fields::SUCCESS)
            .with(fields::RETURN_MSG, BILL_OK_MSG)
            .with(fields::DATA, reply))
    }

    pub fn parse_callback(&self, body: &str) -> Result<ParameterSet> {
        self.codec.decode(body)
    }

    /// Parses and verifies a payment notification. Rejections come back as
    /// [`VerificationResult::Rejected`]; only unreadable bodies are errors.
    pub async fn verify_callback(&self, body: &str) -> Result<VerificationResult> {
        let params = self.parse_callback(body)?;
        self.verifier.verify(&params).await
    }

    /// Acknowledgment body for the gateway's notification call.
    pub fn pay_out_message(&self, code: &str, message: &str) -> String {
        let ack = ParameterSet::new()
            .with(fields::RETURN_CODE, code.to_uppercase())
            .with(fields::RETURN_MSG, message);
        self.codec.encode(&ack)
    }

    pub fn success_pay_out_message(&self) -> String {
        self.pay_out_message(fields::SUCCESS, SUCCESS_ACK_MSG)
    }
}

fn ensure_return_success(response: ParameterSet) -> Result<ParameterSet> {
    if response.is(fields::RETURN_CODE, fields::SUCCESS) {
        return Ok(response);
    }
    let code = response.text(fields::RETURN_CODE).unwrap_or_default();
    let message = response.text(fields::RETURN_MSG).unwrap_or_default();
    debug!(%code, %message, "gateway reported failure");
    Err(PayError::gateway(code, message))
}

fn require_kind(order: &PayOrder, expected: TransactionType, entry_point: &'static str) -> Result<()> {
    if order.transaction_type == expected {
        Ok(())
    } else {
        Err(PayError::UnsupportedOperation {
            operation: order.transaction_type.as_str(),
            entry_point,
        })
    }
}
