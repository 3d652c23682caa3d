mod common;

use common::{ORDER_ID, config, harness, harness_with, signed};
use ogone_flow::application::messages;
use ogone_flow::application::returns::InlineOutcome;
use ogone_flow::config::Configuration;
use ogone_flow::domain::alias::Alias;
use ogone_flow::domain::payment::PaymentResult;
use ogone_flow::domain::ports::SessionStore;
use ogone_flow::domain::request::GatewayParams;
use ogone_flow::domain::signature::SIGNATURE_FIELD;
use ogone_flow::domain::status::CanonicalStatus;
use ogone_flow::error::PaymentError;
use ogone_flow::infrastructure::in_memory::{CartState, Template};
use rust_decimal_macros::dec;
use serde_json::json;

fn return_params(state: &str, mode: &str) -> GatewayParams {
    GatewayParams::new()
        .with("order_id", ORDER_ID)
        .with("return_state", state)
        .with("payment_mode", mode)
}

fn gateway_status(status: u16, brand: &str) -> PaymentResult {
    PaymentResult {
        order_id: Some(ORDER_ID.into()),
        pay_id: Some("3000".into()),
        status: Some(status),
        brand: Some(brand.into()),
        amount: Some(dec!(1000)),
        ..PaymentResult::default()
    }
}

#[tokio::test]
async fn test_decline_without_pay_id_shows_generic_cancel() {
    let h = harness().await;
    let params = return_params("DECLINE", "REDIRECT").with("STATUS", "2");

    h.engine.process_return_url(&params).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.template, Template::PaymentError);
    assert_eq!(page.fields["message"], json!(messages::PAYMENT_CANCELLED));
    assert_eq!(page.fields["order_id"], json!(null));
    assert_eq!(page.fields["pay_id"], json!(null));
}

#[tokio::test]
async fn test_decline_with_pay_id_shows_detailed_error() {
    let h = harness().await;
    let params = return_params("EXCEPTION", "INLINE")
        .with("orderID", ORDER_ID)
        .with("PAYID", "3000")
        .with("STATUS", "2")
        .with("Alias_NCError", "30001001");

    h.engine.process_return_url(&params).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.template, Template::PaymentError);
    let message = page.fields["message"].as_str().unwrap();
    assert!(message.contains("Payment ID: 3000"));
    assert!(message.contains("Code: 30001001"));
    assert_eq!(page.payment.unwrap().nc_error.as_deref(), Some("30001001"));
}

#[tokio::test]
async fn test_cancel_and_back_show_cancellation() {
    let h = harness().await;

    for state in ["CANCEL", "BACK"] {
        h.engine
            .process_return_url(&return_params(state, "REDIRECT"))
            .await
            .unwrap();

        let page = h.platform.last_page().await.unwrap();
        assert_eq!(page.template, Template::Cancellation);
        assert_eq!(page.fields["message"], json!(messages::PAYMENT_CANCELLED));
        assert_eq!(page.payment.unwrap().status, Some(1));
    }
}

#[tokio::test]
async fn test_invalid_return_state() {
    let h = harness().await;
    let err = h
        .engine
        .process_return_url(&return_params("LOST", "REDIRECT"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
}

#[tokio::test]
async fn test_redirect_accept_finalises_and_clears_open_invoice_session() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(9, "VISA")).await;
    h.platform
        .set("open_invoice_missing_fields", "[]".into())
        .await
        .unwrap();
    h.platform.set("cart_token", "abc".into()).await.unwrap();
    let params = signed(
        &config(),
        return_params("ACCEPT", "REDIRECT")
            .with("orderID", ORDER_ID)
            .with("PAYID", "3000")
            .with("STATUS", "9"),
    );

    h.engine.process_return_url(&params).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.template, Template::Success);
    assert_eq!(page.fields["payment_status"], json!("captured"));
    assert_eq!(page.fields["is_show_warning"], json!(false));
    assert!(h.platform.session_value("open_invoice_missing_fields").await.is_none());
    assert!(h.platform.session_value("cart_token").await.is_some());
    assert_eq!(
        h.platform.order(ORDER_ID).await.unwrap().status,
        CanonicalStatus::Captured
    );
}

#[tokio::test]
async fn test_redirect_accept_authorised_in_test_mode_warns() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(5, "VISA")).await;
    let params = signed(
        &config(),
        return_params("ACCEPT", "REDIRECT")
            .with("orderID", ORDER_ID)
            .with("PAYID", "3000"),
    );

    h.engine.process_return_url(&params).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.fields["is_show_warning"], json!(true));
}

#[tokio::test]
async fn test_redirect_accept_signed_over_gateway_fields_only() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(9, "VISA")).await;
    let gateway_fields = GatewayParams::new()
        .with("orderID", ORDER_ID)
        .with("PAYID", "3000")
        .with("STATUS", "9")
        .with("BRAND", "VISA");
    let signature = config().sha_out_composer().sign(&gateway_fields);
    let params = gateway_fields
        .with(SIGNATURE_FIELD, signature)
        .with("order_id", ORDER_ID)
        .with("return_state", "ACCEPT")
        .with("payment_mode", "REDIRECT");

    h.engine.process_return_url(&params).await.unwrap();

    assert_eq!(
        h.platform.last_page().await.unwrap().template,
        Template::Success
    );
}

#[tokio::test]
async fn test_redirect_accept_with_bad_signature() {
    let h = harness().await;
    let params = return_params("ACCEPT", "REDIRECT")
        .with("orderID", ORDER_ID)
        .with("SHASIGN", "0000");

    let err = h.engine.process_return_url(&params).await.unwrap_err();

    assert!(matches!(err, PaymentError::Signature(_)));
    assert!(h.platform.payment_log(ORDER_ID).await.is_empty());
}

#[tokio::test]
async fn test_bancontact_bypasses_signature() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(9, "BCMC")).await;
    let params = return_params("ACCEPT", "REDIRECT")
        .with("orderID", ORDER_ID)
        .with("PAYID", "3000")
        .with("BRAND", "Bancontact/Mister Cash")
        .with("SHASIGN", "BROKEN");

    h.engine.process_return_url(&params).await.unwrap();

    assert_eq!(
        h.platform.last_page().await.unwrap().template,
        Template::Success
    );
}

#[tokio::test]
async fn test_inline_accept_with_pay_id_uses_redirect_handling() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(9, "VISA")).await;
    let params = signed(
        &config(),
        return_params("ACCEPT", "INLINE")
            .with("orderID", ORDER_ID)
            .with("PAYID", "3000"),
    );

    h.engine.process_return_url(&params).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.template, Template::Success);
    assert_eq!(page.fields["type"], json!("redirect"));
}

fn inline_params() -> GatewayParams {
    return_params("ACCEPT", "INLINE")
        .with("Alias_OrderId", ORDER_ID)
        .with("Alias_AliasId", "ALIAS-1")
        .with("Alias_StorePermanently", "Y")
        .with("Alias_Status", "0")
        .with("Card_Brand", "Bancontact/Mister Cash")
        .with("Card_CardHolderName", "Jo Doe")
        .with("Card_CardNumber", "XXXXXXXXXXXX1111")
        .with("Card_ExpiryDate", "1230")
}

#[tokio::test]
async fn test_inline_accept_stashes_alias() {
    let config = Configuration {
        one_click: true,
        payment_page_type: ogone_flow::config::PaymentMode::Inline,
        ..config()
    };
    let h = harness_with(config, common::order()).await;

    h.engine.process_return_url(&inline_params()).await.unwrap();

    let page = h.platform.last_page().await.unwrap();
    assert_eq!(page.template, Template::InlineLoader);
    assert_eq!(page.fields["card_brand"], json!("BCMC"));
    assert_eq!(page.fields["alias_id"], json!("ALIAS-1"));

    let stashed = h.platform.session_value("Alias_ALIAS-1").await.unwrap();
    let alias: Alias = serde_json::from_str(&stashed).unwrap();
    assert_eq!(alias.payment_id.as_deref(), Some("bancontact"));
    assert_eq!(alias.pm.as_deref(), Some("CreditCard"));
    assert!(alias.force_security);

    let saved = h.platform.saved_aliases().await;
    assert_eq!(saved[0].1.brand.as_deref(), Some("BCMC"));
    assert_eq!(saved[0].1.pm.as_deref(), Some("CreditCard"));
}

#[tokio::test]
async fn test_inline_accept_requires_identifiers() {
    let h = harness().await;
    let params = return_params("ACCEPT", "INLINE").with("Alias_OrderId", ORDER_ID);

    let err = h.engine.process_return_url(&params).await.unwrap_err();

    assert!(matches!(err, PaymentError::Validation(_)));
}

#[tokio::test]
async fn test_finish_inline_consumes_session_alias() {
    let h = harness().await;
    h.engine.process_return_url(&inline_params()).await.unwrap();
    h.gateway
        .set_direct_link_result(gateway_status(9, "BCMC"))
        .await;

    let outcome = h
        .engine
        .finish_return_inline(ORDER_ID, None, "ALIAS-1")
        .await
        .unwrap();

    match outcome {
        InlineOutcome::Success {
            payment_status,
            redirect,
            ..
        } => {
            assert_eq!(payment_status, CanonicalStatus::Captured);
            assert!(redirect.contains("order_success"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.platform.cart_state().await, CartState::Emptied);
    assert!(h.platform.get("Alias_ALIAS-1").await.unwrap().is_none());
    assert!(h.gateway.direct_link_aliases().await[0].force_security);

    // a second submission rebuilds the alias instead of reusing the stash
    h.engine
        .finish_return_inline(ORDER_ID, Some("Bancontact/Mister Cash"), "ALIAS-1")
        .await
        .unwrap();
    let rebuilt = &h.gateway.direct_link_aliases().await[1];
    assert!(rebuilt.force_security);
    assert_eq!(rebuilt.brand.as_deref(), Some("BCMC"));
}

#[tokio::test]
async fn test_finish_inline_without_stash_still_requires_security() {
    let h = harness().await;
    h.gateway
        .set_direct_link_result(gateway_status(9, "VISA"))
        .await;

    h.engine
        .finish_return_inline(ORDER_ID, Some("VISA"), "ALIAS-X")
        .await
        .unwrap();

    let charged = &h.gateway.direct_link_aliases().await[0];
    assert!(charged.force_security);
    assert_eq!(charged.alias.as_deref(), Some("ALIAS-X"));
    assert_eq!(charged.brand.as_deref(), Some("VISA"));
    assert_eq!(charged.pm.as_deref(), Some("CreditCard"));
    assert_eq!(charged.payment_id.as_deref(), Some("visa"));
}

#[tokio::test]
async fn test_finish_inline_security_check() {
    let h = harness().await;
    h.gateway
        .set_direct_link_result(PaymentResult {
            status: Some(46),
            pay_id: Some("3000".into()),
            html_answer: Some("<form id=\"3ds\"></form>".into()),
            ..PaymentResult::default()
        })
        .await;

    let outcome = h
        .engine
        .finish_return_inline(ORDER_ID, None, "ALIAS-1")
        .await
        .unwrap();

    assert!(matches!(outcome, InlineOutcome::SecurityCheckRequired { .. }));
    assert!(h.platform.payment_log(ORDER_ID).await.is_empty());
}

#[tokio::test]
async fn test_finish_inline_failed_transaction() {
    let h = harness().await;
    h.gateway
        .set_direct_link_result(PaymentResult {
            status: Some(0),
            nc_error: Some("50001111".into()),
            ..PaymentResult::default()
        })
        .await;

    let outcome = h
        .engine
        .finish_return_inline(ORDER_ID, None, "ALIAS-1")
        .await
        .unwrap();

    match outcome {
        InlineOutcome::Error {
            order_id, redirect, ..
        } => {
            assert_eq!(order_id, ORDER_ID);
            assert!(redirect.contains("order_cancelled"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.platform.cart_state().await, CartState::Active);
}

#[tokio::test]
async fn test_finish_inline_refused_payment_restores_cart() {
    let h = harness().await;
    h.gateway
        .set_direct_link_result(gateway_status(2, "VISA"))
        .await;

    let outcome = h
        .engine
        .finish_return_inline(ORDER_ID, None, "ALIAS-1")
        .await
        .unwrap();

    assert!(matches!(outcome, InlineOutcome::Error { .. }));
    assert_eq!(h.platform.cart_state().await, CartState::Restored);
}

#[tokio::test]
async fn test_finish_inline_cancelled_payment() {
    let h = harness().await;
    h.gateway
        .set_direct_link_result(gateway_status(1, "VISA"))
        .await;

    let outcome = h
        .engine
        .finish_return_inline(ORDER_ID, None, "ALIAS-1")
        .await
        .unwrap();

    match outcome {
        InlineOutcome::Cancelled {
            order_id, pay_id, ..
        } => {
            assert_eq!(order_id, ORDER_ID);
            assert_eq!(pay_id.as_deref(), Some("3000"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.platform.cart_state().await, CartState::Restored);
}
