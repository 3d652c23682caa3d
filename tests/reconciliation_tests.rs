mod common;

use common::{ORDER_ID, harness, harness_with};
use ogone_flow::domain::order::Operation;
use ogone_flow::domain::payment::PaymentResult;
use ogone_flow::domain::status::CanonicalStatus;
use ogone_flow::error::PaymentError;
use rust_decimal_macros::dec;

fn gateway_status(status: u16, brand: &str) -> PaymentResult {
    PaymentResult {
        order_id: Some(ORDER_ID.into()),
        pay_id: Some("3000".into()),
        status: Some(status),
        brand: Some(brand.into()),
        ..PaymentResult::default()
    }
}

#[tokio::test]
async fn test_partial_refund_leaves_remainder() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(9, "VISA")).await;

    let payment = h.engine.refund(ORDER_ID, "3000", Some(dec!(400))).await.unwrap();

    let calls = h.gateway.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, Operation::Refund);
    assert_eq!(calls[0].amount, dec!(400));
    assert!(calls[0].is_partially);
    assert_eq!(payment.payment_status, Some(CanonicalStatus::Refunded));

    let order = h.platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.available_for(Operation::Refund), dec!(600));
    assert_eq!(order.status, CanonicalStatus::Refunded);
}

#[tokio::test]
async fn test_successive_partial_captures() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(5, "VISA")).await;

    h.engine.capture(ORDER_ID, "3000", Some(dec!(300))).await.unwrap();
    h.engine.capture(ORDER_ID, "3000", Some(dec!(700))).await.unwrap();

    let calls = h.gateway.calls().await;
    assert!(calls[0].is_partially);
    // the second capture takes exactly what is left
    assert!(!calls[1].is_partially);

    let err = h
        .engine
        .capture(ORDER_ID, "3000", Some(dec!(0.01)))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::OperationUnavailable(Operation::Capture)));
}

#[tokio::test]
async fn test_requested_amount_is_truncated() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(5, "VISA")).await;

    // 1000.009 truncates to 1000.00, which is still available
    assert!(
        h.engine
            .can_capture(ORDER_ID, "3000", Some(dec!(1000.009)))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_authorised_visa_payment() {
    let h = harness().await;
    let mut payment = gateway_status(5, "VISA");

    let status = h
        .engine
        .finalise_order_payment(ORDER_ID, &mut payment)
        .await
        .unwrap();

    assert_eq!(status, CanonicalStatus::Authorized);
    let updates = h.platform.status_updates(ORDER_ID).await;
    assert_eq!(updates.len(), 1);
    assert!(updates[0].message.as_deref().unwrap().contains("status authorized"));
}

#[tokio::test]
async fn test_direct_sales_success_code_keeps_captured() {
    let h = harness().await;
    let mut payment = gateway_status(9, "paysafecard");
    payment.amount = Some(dec!(1000));

    let status = h
        .engine
        .finalise_order_payment(ORDER_ID, &mut payment)
        .await
        .unwrap();

    assert_eq!(status, CanonicalStatus::Captured);
    assert_eq!(
        h.platform.order(ORDER_ID).await.unwrap().captured_amount,
        dec!(1000)
    );
}

#[tokio::test]
async fn test_twint_authorisation_is_captured() {
    let h = harness().await;
    let mut payment = gateway_status(5, "TWINT");

    let status = h
        .engine
        .finalise_order_payment(ORDER_ID, &mut payment)
        .await
        .unwrap();

    assert_eq!(status, CanonicalStatus::Captured);
}

#[tokio::test]
async fn test_cancel_of_authorised_order() {
    let h = harness_with(common::config(), common::order()).await;
    h.gateway.set_status(ORDER_ID, gateway_status(5, "VISA")).await;

    let payment = h.engine.cancel(ORDER_ID, "3000", None).await.unwrap();

    assert_eq!(payment.payment_status, Some(CanonicalStatus::Cancelled));
    let order = h.platform.order(ORDER_ID).await.unwrap();
    assert_eq!(order.cancelled_amount, dec!(1000));
    assert_eq!(order.available_for(Operation::Cancel), dec!(0));
}

#[tokio::test]
async fn test_payment_info_resolves_status() {
    let h = harness().await;
    h.gateway.set_status(ORDER_ID, gateway_status(91, "VISA")).await;

    let payment = h
        .engine
        .payment_info(ORDER_ID, Some("3000"), None)
        .await
        .unwrap();

    assert_eq!(payment.payment_status, Some(CanonicalStatus::CaptureProcessing));
}
