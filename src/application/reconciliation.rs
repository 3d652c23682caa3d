use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::engine::PaymentEngine;
use super::messages;
use super::resolver::resolve_status;
use crate::domain::order::{Operation, Order, truncate_amount};
use crate::domain::payment::PaymentResult;
use crate::domain::ports::Notification;
use crate::domain::status::{CanonicalStatus, status_by_code};
use crate::error::{PaymentError, Result};

impl PaymentEngine {
    /// Canonical status for a brand and raw code, using the merchant's method selection.
    pub fn payment_status(&self, brand: &str, code: u16) -> CanonicalStatus {
        resolve_status(brand, code, Some(&self.config.selected_payment_methods))
    }

    /// Applies a gateway result to the order and returns the resolved status.
    ///
    /// The payment is always written to the order's audit trail first. A result
    /// without a status means the gateway rejected our credentials and is fatal.
    pub async fn finalise_order_payment(
        &self,
        order_id: &str,
        payment: &mut PaymentResult,
    ) -> Result<CanonicalStatus> {
        let orders = &self.platform.orders;
        orders.log_payment(order_id, payment).await?;

        let Some(code) = payment.status else {
            return Err(PaymentError::MissingStatus(
                "the gateway returned no payment status, check the DirectLink credentials"
                    .to_string(),
            ));
        };

        let status = self.payment_status(payment.brand(), code);
        payment.payment_status = Some(status);
        let message = messages::payment_info(status, payment);
        debug!(order_id, pay_id = ?payment.pay_id, code, %status, "Finalising payment");

        match status {
            CanonicalStatus::Authorized => {
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
                if self.config.direct_sale_email {
                    self.notify(Notification::Authorization, order_id).await?;
                    self.notify(Notification::AdminAuthorization, order_id).await?;
                }
            }
            CanonicalStatus::CaptureProcessing | CanonicalStatus::RefundProcessing => {
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
            }
            CanonicalStatus::Captured => {
                if let Some(amount) = payment.amount {
                    orders.add_captured_amount(order_id, amount).await?;
                }
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
            }
            CanonicalStatus::RefundRefused => {
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
                self.notify(Notification::RefundFailed, order_id).await?;
                self.notify(Notification::AdminRefundFailed, order_id).await?;
            }
            CanonicalStatus::Refunded => {
                if let Some(amount) = payment.amount {
                    orders.add_refunded_amount(order_id, amount).await?;
                }
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
            }
            CanonicalStatus::Cancelled => {
                if let Some(amount) = payment.amount {
                    orders.add_cancelled_amount(order_id, amount).await?;
                }
                orders
                    .update_order_status(order_id, payment, Some(&message))
                    .await?;
            }
            CanonicalStatus::Error => {
                let message = messages::payment_error(payment);
                error!(order_id, pay_id = ?payment.pay_id, "{message}");
                payment.message = Some(message);
            }
            CanonicalStatus::Pending | CanonicalStatus::Unknown => {
                info!(order_id, code, %status, "Payment status left unchanged");
            }
        }

        Ok(status)
    }

    async fn notify(&self, notification: Notification, order_id: &str) -> Result<()> {
        self.platform.notifier.send(notification, order_id).await
    }

    /// Queries the gateway and resolves the current status of a payment.
    pub async fn payment_info(
        &self,
        order_id: &str,
        pay_id: Option<&str>,
        pay_id_sub: Option<&str>,
    ) -> Result<PaymentResult> {
        let mut payment = self.gateway.status(order_id, pay_id, pay_id_sub).await?;
        if let Some(code) = payment.status {
            payment.payment_status = Some(self.payment_status(payment.brand(), code));
        }
        Ok(payment)
    }

    pub async fn can_void(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<bool> {
        let order = self.fetch_order(order_id).await?;
        self.check_availability(Operation::Cancel, &order, pay_id, amount)
            .await
    }

    pub async fn can_capture(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<bool> {
        let order = self.fetch_order(order_id).await?;
        self.check_availability(Operation::Capture, &order, pay_id, amount)
            .await
    }

    pub async fn can_refund(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<bool> {
        let order = self.fetch_order(order_id).await?;
        self.check_availability(Operation::Refund, &order, pay_id, amount)
            .await
    }

    async fn check_availability(
        &self,
        operation: Operation,
        order: &Order,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<bool> {
        let amount = truncate_amount(amount.unwrap_or(order.amount));
        let available = order.available_for(operation);
        if amount > available {
            debug!(
                order_id = %order.order_id,
                %operation,
                %amount,
                %available,
                "Amount exceeds availability"
            );
            return Ok(false);
        }

        match operation {
            Operation::Cancel | Operation::Capture => {
                let payment = self
                    .gateway
                    .status(&order.order_id, Some(pay_id), None)
                    .await?;
                let status = status_by_code(payment.status.unwrap_or_default());
                Ok(status == CanonicalStatus::Authorized)
            }
            Operation::Refund => {
                let query = self
                    .gateway
                    .status(&order.order_id, Some(pay_id), None)
                    .await;
                match query {
                    Ok(payment)
                        if payment.is_transaction_successful()
                            && payment.brand() == "Intersolve" =>
                    {
                        Ok(false)
                    }
                    Ok(_) => Ok(true),
                    Err(err) => {
                        // the status query is advisory here
                        warn!(
                            order_id = %order.order_id,
                            error = %err,
                            "Status query failed during refund check"
                        );
                        Ok(true)
                    }
                }
            }
        }
    }

    pub async fn cancel(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Cancel, order_id, pay_id, amount)
            .await
    }

    pub async fn capture(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Capture, order_id, pay_id, amount)
            .await
    }

    pub async fn refund(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Refund, order_id, pay_id, amount)
            .await
    }

    async fn maintenance(
        &self,
        operation: Operation,
        order_id: &str,
        pay_id: &str,
        amount: Option<Decimal>,
    ) -> Result<PaymentResult> {
        let order = self.fetch_order(order_id).await?;
        let amount = truncate_amount(amount.unwrap_or(order.amount));
        if !self
            .check_availability(operation, &order, pay_id, Some(amount))
            .await?
        {
            return Err(PaymentError::OperationUnavailable(operation));
        }

        let is_partially = amount < order.available_for(operation);
        info!(
            order_id,
            pay_id,
            %operation,
            %amount,
            is_partially,
            "Submitting maintenance operation"
        );

        let mut payment = match operation {
            Operation::Cancel => self.gateway.void(order_id, pay_id, amount, is_partially).await?,
            Operation::Capture => {
                self.gateway
                    .capture(order_id, pay_id, amount, is_partially)
                    .await?
            }
            Operation::Refund => {
                self.gateway
                    .refund(order_id, pay_id, amount, is_partially)
                    .await?
            }
        };

        if !payment.is_transaction_successful() {
            return Err(PaymentError::Gateway {
                code: payment.error_code().to_string(),
                message: payment.error_message().to_string(),
            });
        }

        self.finalise_order_payment(order_id, &mut payment).await?;
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::domain::ports::Collaborators;
    use crate::infrastructure::in_memory::InMemoryPlatform;
    use crate::infrastructure::scripted_gateway::ScriptedGateway;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup(
        config: Configuration,
    ) -> (PaymentEngine, Arc<InMemoryPlatform>, Arc<ScriptedGateway>) {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.insert_order(Order::new("100", dec!(1000), "EUR")).await;
        let gateway = Arc::new(ScriptedGateway::new());
        let engine = PaymentEngine::new(
            config,
            Collaborators::from_platform(platform.clone()),
            gateway.clone(),
        );
        (engine, platform, gateway)
    }

    fn result(status: u16, brand: &str, amount: Decimal) -> PaymentResult {
        PaymentResult {
            order_id: Some("100".into()),
            pay_id: Some("3000".into()),
            status: Some(status),
            brand: Some(brand.into()),
            amount: Some(amount),
            ..PaymentResult::default()
        }
    }

    #[tokio::test]
    async fn test_missing_status_is_fatal_but_logged() {
        let (engine, platform, _) = setup(Configuration::default()).await;
        let mut payment = PaymentResult::default();

        let outcome = engine.finalise_order_payment("100", &mut payment).await;

        assert!(matches!(outcome, Err(PaymentError::MissingStatus(_))));
        assert_eq!(platform.payment_log("100").await.len(), 1);
        assert!(platform.status_updates("100").await.is_empty());
    }

    #[tokio::test]
    async fn test_captured_adds_amount() {
        let (engine, platform, _) = setup(Configuration::default()).await;
        let mut payment = result(9, "VISA", dec!(250));

        let status = engine.finalise_order_payment("100", &mut payment).await.unwrap();

        assert_eq!(status, CanonicalStatus::Captured);
        assert_eq!(payment.payment_status, Some(CanonicalStatus::Captured));
        let order = platform.order("100").await.unwrap();
        assert_eq!(order.captured_amount, dec!(250));
        assert_eq!(order.status, CanonicalStatus::Captured);
    }

    #[tokio::test]
    async fn test_authorized_sends_mails_when_enabled() {
        let config = Configuration {
            direct_sale_email: true,
            ..Configuration::default()
        };
        let (engine, platform, _) = setup(config).await;
        let mut payment = result(5, "VISA", dec!(1000));

        engine.finalise_order_payment("100", &mut payment).await.unwrap();

        assert_eq!(
            platform.notifications().await,
            vec![
                (Notification::Authorization, "100".to_string()),
                (Notification::AdminAuthorization, "100".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_refund_refused_notifies() {
        let (engine, platform, _) = setup(Configuration::default()).await;
        let mut payment = result(83, "VISA", dec!(10));

        engine.finalise_order_payment("100", &mut payment).await.unwrap();

        let sent: Vec<_> = platform.notifications().await.into_iter().map(|(n, _)| n).collect();
        assert_eq!(sent, vec![Notification::RefundFailed, Notification::AdminRefundFailed]);
        assert_eq!(platform.order("100").await.unwrap().refunded_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_error_status_does_not_touch_order() {
        let (engine, platform, _) = setup(Configuration::default()).await;
        let mut payment = result(92, "VISA", dec!(10));

        let status = engine.finalise_order_payment("100", &mut payment).await.unwrap();

        assert_eq!(status, CanonicalStatus::Error);
        assert!(payment.message.is_some());
        assert!(platform.status_updates("100").await.is_empty());
    }

    #[tokio::test]
    async fn test_capture_boundary_is_inclusive() {
        let (engine, _, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(5, "VISA", dec!(1000))).await;

        assert!(engine.can_capture("100", "3000", Some(dec!(1000))).await.unwrap());
        assert!(!engine.can_capture("100", "3000", Some(dec!(1000.01))).await.unwrap());
        assert!(engine.can_capture("100", "3000", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_void_requires_authorized() {
        let (engine, _, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(9, "VISA", dec!(1000))).await;

        assert!(!engine.can_void("100", "3000", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_refund_gate() {
        let (engine, _, gateway) = setup(Configuration::default()).await;

        // no scripted status: the query fails and does not block
        assert!(engine.can_refund("100", "3000", Some(dec!(10))).await.unwrap());

        gateway.set_status("100", result(9, "Intersolve", dec!(1000))).await;
        assert!(!engine.can_refund("100", "3000", Some(dec!(10))).await.unwrap());

        // accepted but not paid yet still counts as a live voucher transaction
        gateway.set_status("100", result(46, "Intersolve", dec!(1000))).await;
        assert!(!engine.can_refund("100", "3000", Some(dec!(10))).await.unwrap());

        gateway.set_status("100", result(0, "Intersolve", dec!(1000))).await;
        assert!(engine.can_refund("100", "3000", Some(dec!(10))).await.unwrap());

        gateway.set_status("100", result(9, "VISA", dec!(1000))).await;
        assert!(engine.can_refund("100", "3000", Some(dec!(10))).await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_refund() {
        let (engine, platform, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(9, "VISA", dec!(1000))).await;

        let payment = engine.refund("100", "3000", Some(dec!(400))).await.unwrap();

        assert_eq!(payment.payment_status, Some(CanonicalStatus::Refunded));
        assert!(gateway.calls().await[0].is_partially);
        let order = platform.order("100").await.unwrap();
        assert_eq!(order.available_for(Operation::Refund), dec!(600));
    }

    #[tokio::test]
    async fn test_full_capture_is_not_partial() {
        let (engine, _, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(5, "VISA", dec!(1000))).await;

        engine.capture("100", "3000", None).await.unwrap();

        assert!(!gateway.calls().await[0].is_partially);
    }

    #[tokio::test]
    async fn test_unavailable_operation() {
        let (engine, _, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(9, "VISA", dec!(1000))).await;

        let err = engine.cancel("100", "3000", None).await.unwrap_err();

        assert!(matches!(err, PaymentError::OperationUnavailable(Operation::Cancel)));
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_transport_result_raises_gateway_error() {
        let (engine, platform, gateway) = setup(Configuration::default()).await;
        gateway.set_status("100", result(5, "VISA", dec!(1000))).await;
        gateway
            .fail_maintenance("50001111", "Data validation error")
            .await;

        let err = engine.capture("100", "3000", None).await.unwrap_err();

        match err {
            PaymentError::Gateway { code, message } => {
                assert_eq!(code, "50001111");
                assert_eq!(message, "Data validation error");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(platform.status_updates("100").await.is_empty());
    }
}
