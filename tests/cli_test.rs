mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use wxpay_core::domain::fields;

fn cli() -> Command {
    let mut cmd = Command::new(cargo_bin!("wxpay-core"));
    cmd.env_remove("RUST_LOG")
        .args(["--appid", common::APPID])
        .args(["--mch-id", common::MCH_ID])
        .args(["--key", common::KEY]);
    cmd
}

#[test]
fn test_order_prints_url_and_signed_xml() {
    cli()
        .args(["order", "--subject", "Test", "--out-trade-no", "ORDER1", "--price", "9.99"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "https://api.mch.weixin.qq.com/pay/unifiedorder\n<xml>",
        ))
        .stdout(predicate::str::contains("<total_fee>999</total_fee>"))
        .stdout(predicate::str::contains("<product_id><![CDATA[ORDER1]]></product_id>"))
        .stdout(predicate::str::contains("<sign><![CDATA["));
}

#[test]
fn test_refund_needs_a_reference() {
    cli()
        .args(["refund", "--refund-no", "R1", "--refund-amount", "1", "--total-amount", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_lookup_bill_by_date() {
    cli()
        .args(["--sandbox", "lookup", "DOWNLOADBILL", "--bill-date", "2024-03-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/sandboxnew/pay/downloadbill"))
        .stdout(predicate::str::contains("<bill_date><![CDATA[20240301]]></bill_date>"))
        .stdout(predicate::str::contains("<bill_type><![CDATA[ALL]]></bill_type>"));
}

#[test]
fn test_lookup_rejects_wrong_argument_shape() {
    cli()
        .args(["lookup", "DOWNLOADBILL", "--transaction-id", "4200001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));

    cli()
        .args(["lookup", "REFUND", "--out-trade-no", "ORDER1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not supported"));
}

#[test]
fn test_unknown_algorithm_is_rejected() {
    cli()
        .args(["--algorithm", "md5", "order", "--subject", "T", "--out-trade-no", "O", "--price", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported signing algorithm"));
}

#[test]
fn test_verify_signed_callback_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", common::to_xml(&common::payment_callback())).unwrap();

    cli()
        .arg("verify")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"status":"VERIFIED"}"#))
        .stdout(predicate::str::contains("<return_code><![CDATA[SUCCESS]]></return_code>"));
}

#[test]
fn test_verify_rejected_callback_from_stdin() {
    let callback = common::payment_callback().with(fields::TOTAL_FEE, "1");

    let mut cmd = assert_cmd::Command::new(cargo_bin!("wxpay-core"));
    cmd.args(["--appid", common::APPID, "--mch-id", common::MCH_ID, "--key", common::KEY, "verify"])
        .write_stdin(common::to_xml(&callback))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"status":"REJECTED","reason":"signature_mismatch"}"#,
        ))
        .stdout(predicate::str::contains("<return_code><![CDATA[FAIL]]></return_code>"))
        .stdout(predicate::str::contains("signature mismatch"));
}
