use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn write_fixtures(dir: &TempDir) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(
        dir.path().join("orders.csv"),
        "order_id,amount,currency,customer_id\n\
         100,1000.00,EUR,C1\n\
         200,50,EUR,C2\n",
    )?;
    fs::write(
        dir.path().join("feedback.csv"),
        "orderID,PAYID,STATUS,BRAND,amount,currency\n\
         100,3000,9,VISA,1000.00,EUR\n\
         200,3001,5,VISA,50,EUR\n\
         300,3002,9,VISA,10,EUR\n\
         100,3000,8,VISA,400,EUR\n",
    )?;
    fs::write(
        dir.path().join("config.json"),
        r#"{ "pspid": "shop", "sha_out": "out-secret" }"#,
    )?;
    Ok(())
}

#[test]
fn test_cli_replays_feedback() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    write_fixtures(&dir)?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(dir.path().join("feedback.csv"))
        .arg("--orders")
        .arg(dir.path().join("orders.csv"))
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .arg("--sign-unsigned");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "order_id,status,amount,captured,refunded,cancelled",
        ))
        .stdout(predicate::str::contains("100,refunded,1000,1000,400,0"))
        .stdout(predicate::str::contains("200,authorized,50,0,0,0"))
        // feedback for an unknown order never creates one
        .stdout(predicate::str::contains("300,").not());

    Ok(())
}

#[test]
fn test_cli_rejects_unsigned_feedback() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    write_fixtures(&dir)?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(dir.path().join("feedback.csv"))
        .arg("--orders")
        .arg(dir.path().join("orders.csv"))
        .arg("--config")
        .arg(dir.path().join("config.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("100,pending,1000,0,0,0"))
        .stdout(predicate::str::contains("200,pending,50,0,0,0"));

    Ok(())
}

#[test]
fn test_cli_missing_orders_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    write_fixtures(&dir)?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(dir.path().join("feedback.csv"))
        .arg("--orders")
        .arg(dir.path().join("missing.csv"));

    cmd.assert().failure();

    Ok(())
}
