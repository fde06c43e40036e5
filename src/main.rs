use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wxpay_core::application::builder::{RequestBuilder, SignedRequest};
use wxpay_core::application::dispatcher::{BillType, LookupKey, SecondaryDispatcher};
use wxpay_core::application::service::PayService;
use wxpay_core::config::{GatewayConfig, SignAlgorithm, SignConfig};
use wxpay_core::domain::amount::Amount;
use wxpay_core::domain::order::{PayOrder, RefundOrder, TransferOrder};
use wxpay_core::domain::ports::WireCodec;
use wxpay_core::domain::transaction::TransactionType;
use wxpay_core::infrastructure::in_memory::InMemoryTransport;
use wxpay_core::interfaces::xml::XmlCodec;

/// Builds signed gateway requests and verifies payment callbacks offline.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON gateway configuration. Overrides the individual flags.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "WXPAY_APPID", global = true)]
    appid: Option<String>,

    #[arg(long, env = "WXPAY_MCH_ID", global = true)]
    mch_id: Option<String>,

    /// Merchant API key, or a PEM private key file path for RSA.
    #[arg(long, env = "WXPAY_KEY", global = true, hide_env_values = true)]
    key: Option<String>,

    #[arg(long, default_value = "MD5", global = true)]
    algorithm: SignAlgorithm,

    /// Gateway public key (PEM), used for RSA verification and transfer fields.
    #[arg(long, env = "WXPAY_PUBLIC_KEY_FILE", global = true)]
    public_key_file: Option<PathBuf>,

    #[arg(long, global = true)]
    notify_url: Option<String>,

    #[arg(long, global = true)]
    return_url: Option<String>,

    #[arg(long, global = true)]
    sandbox: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign a unified-order (or MICROPAY) request.
    Order {
        #[arg(long, default_value = "NATIVE")]
        kind: TransactionType,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        out_trade_no: String,
        /// Price in major units, e.g. 9.99
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        attach: Option<String>,
        #[arg(long)]
        openid: Option<String>,
        #[arg(long)]
        auth_code: Option<String>,
    },
    /// Sign a refund request.
    Refund {
        #[command(flatten)]
        trade: TradeArgs,
        #[arg(long)]
        refund_no: String,
        #[arg(long)]
        refund_amount: Decimal,
        #[arg(long)]
        total_amount: Decimal,
    },
    /// Sign a query, close, refund query, bill download or transfer query.
    Lookup {
        kind: TransactionType,
        #[command(flatten)]
        trade: TradeArgs,
        /// Billing date, YYYY-MM-DD
        #[arg(long, conflicts_with_all = ["transaction_id", "out_trade_no"])]
        bill_date: Option<chrono::NaiveDate>,
        #[arg(long, default_value = "ALL")]
        bill_type: BillType,
    },
    /// Sign a bank transfer request. Needs the gateway public key.
    Transfer {
        #[arg(long)]
        out_no: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        bank_code: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        remark: Option<String>,
    },
    /// Verify a callback body read from FILE or stdin.
    Verify { file: Option<PathBuf> },
}

#[derive(Args)]
struct TradeArgs {
    #[arg(long, conflicts_with = "out_trade_no")]
    transaction_id: Option<String>,
    #[arg(long)]
    out_trade_no: Option<String>,
}

impl Cli {
    fn gateway_config(&self) -> Result<GatewayConfig> {
        if let Some(path) = &self.config {
            let text = fs::read_to_string(path).into_diagnostic()?;
            return GatewayConfig::from_json(&text).into_diagnostic();
        }

        let mut key = self.key.clone().unwrap_or_default();
        if self.algorithm == SignAlgorithm::Rsa && !key.contains("-----BEGIN") {
            key = fs::read_to_string(&key).into_diagnostic()?;
        }
        let mut sign = SignConfig::new(self.algorithm, key);
        if let Some(path) = &self.public_key_file {
            sign = sign.with_public_key(fs::read_to_string(path).into_diagnostic()?);
        }

        let mut config = GatewayConfig::new(
            self.appid.clone().unwrap_or_default(),
            self.mch_id.clone().unwrap_or_default(),
            sign,
        )
        .with_sandbox(self.sandbox);
        if let Some(url) = &self.notify_url {
            config = config.with_notify_url(url);
        }
        if let Some(url) = &self.return_url {
            config = config.with_return_url(url);
        }
        Ok(config)
    }
}

fn amount(value: Decimal) -> Result<Amount> {
    Amount::new(value).into_diagnostic()
}

fn print_request(request: &SignedRequest) {
    println!("{}", request.url());
    println!("{}", XmlCodec.encode(request.params()));
}

fn read_body(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).into_diagnostic(),
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body).into_diagnostic()?;
            Ok(body)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.gateway_config()?;

    match &cli.command {
        Command::Order {
            kind,
            subject,
            out_trade_no,
            price,
            ip,
            attach,
            openid,
            auth_code,
        } => {
            let mut order = PayOrder::new(subject, out_trade_no, amount(*price)?, *kind);
            order.spbill_create_ip = ip.clone();
            order.attach = attach.clone();
            order.openid = openid.clone();
            order.auth_code = auth_code.clone();

            let builder = RequestBuilder::new(config).into_diagnostic()?;
            print_request(&builder.unified_order(&order).into_diagnostic()?);
        }
        Command::Refund {
            trade,
            refund_no,
            refund_amount,
            total_amount,
        } => {
            let order = RefundOrder::new(
                trade.transaction_id.clone(),
                trade.out_trade_no.clone(),
                refund_no,
                amount(*refund_amount)?,
                amount(*total_amount)?,
            );
            let builder = RequestBuilder::new(config).into_diagnostic()?;
            print_request(&builder.refund(&order).into_diagnostic()?);
        }
        Command::Lookup {
            kind,
            trade,
            bill_date,
            bill_type,
        } => {
            let key = match (bill_date, &trade.transaction_id, &trade.out_trade_no) {
                (Some(date), _, _) => LookupKey::ByBillingDate {
                    date: *date,
                    bill_type: *bill_type,
                },
                (None, Some(id), _) => LookupKey::ByTransactionId(id.clone()),
                (None, None, Some(no)) => LookupKey::ByExternalOrderId(no.clone()),
                (None, None, None) => {
                    return Err(miette::miette!(
                        "lookup needs --transaction-id, --out-trade-no or --bill-date"
                    ));
                }
            };
            let builder = RequestBuilder::new(config).into_diagnostic()?;
            let dispatcher = SecondaryDispatcher::new(builder);
            print_request(&dispatcher.dispatch(*kind, &key).into_diagnostic()?);
        }
        Command::Transfer {
            out_no,
            account,
            name,
            bank_code,
            amount: value,
            remark,
        } => {
            let order = TransferOrder {
                out_no: out_no.clone(),
                payee_account: account.clone(),
                payee_name: name.clone(),
                bank_code: bank_code.clone(),
                amount: amount(*value)?,
                remark: remark.clone(),
            };
            let builder = RequestBuilder::new(config).into_diagnostic()?;
            print_request(&builder.transfer(&order).into_diagnostic()?);
        }
        Command::Verify { file } => {
            let body = read_body(file.as_ref())?;
            let service = PayService::new(config, Box::new(InMemoryTransport::new())).into_diagnostic()?;
            let result = service.verify_callback(&body).await.into_diagnostic()?;

            println!("{}", serde_json::to_string(&result).into_diagnostic()?);
            let ack = match result.reason() {
                None => service.success_pay_out_message(),
                Some(reason) => service.pay_out_message("FAIL", reason.as_str()),
            };
            println!("{ack}");
        }
    }

    Ok(())
}
