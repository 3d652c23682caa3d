use http::StatusCode;
use tracing::{debug, error, info, warn};

use super::engine::PaymentEngine;
use crate::domain::alias::AliasFields;
use crate::domain::payment::PaymentResult;
use crate::domain::ports::Notification;
use crate::domain::request::GatewayParams;
use crate::domain::status::CanonicalStatus;
use crate::error::{PaymentError, Result};

impl PaymentEngine {
    /// Handles a gateway POST notification.
    ///
    /// Answers 400 only when the payload is rejected outright (bad signature,
    /// gateway error, unknown order). Failures past that point are logged and
    /// still acknowledged with 200, since the gateway redelivers on errors.
    pub async fn webhook_listener(&self, params: &GatewayParams) -> StatusCode {
        match self.dispatch_webhook(params).await {
            Ok(()) => StatusCode::OK,
            Err(err) => {
                error!(error = %err, order_id = ?params.get("orderID"), "Webhook rejected");
                StatusCode::BAD_REQUEST
            }
        }
    }

    async fn dispatch_webhook(&self, params: &GatewayParams) -> Result<()> {
        if !self.config.sha_out_composer().is_valid(params) {
            return Err(PaymentError::Signature(
                "webhook signature does not match".to_string(),
            ));
        }

        if let Some(nc_error) = params.get("NCERROR").filter(|error| *error != "0") {
            return Err(PaymentError::Gateway {
                code: nc_error.to_string(),
                message: params.get("NCERRORPLUS").unwrap_or_default().to_string(),
            });
        }

        let order_id = params
            .get_string("orderID")
            .ok_or_else(|| PaymentError::Validation("Order id is missing".to_string()))?;
        let order = self
            .platform
            .orders
            .request_order_info(&order_id)
            .await?
            .ok_or_else(|| PaymentError::Validation(format!("Order {order_id} not found")))?;

        let mut payment = PaymentResult::from_params(params);
        let status = self.payment_status(payment.brand(), payment.status.unwrap_or_default());
        debug!(%order_id, pay_id = ?payment.pay_id, %status, "Webhook received");

        if status == CanonicalStatus::Refunded {
            let pay_id = payment.pay_id.clone().unwrap_or_default();
            match self.can_refund(&order_id, &pay_id, payment.amount).await {
                Ok(true) => {
                    if let Err(err) = self.finalise_order_payment(&order_id, &mut payment).await {
                        warn!(%order_id, error = %err, "Refund notification not applied");
                    }
                }
                Ok(false) => {
                    warn!(%order_id, "Refund notification exceeds what can be refunded, ignored");
                }
                Err(err) => {
                    warn!(%order_id, error = %err, "Refund check failed, notification ignored");
                }
            }
            return Ok(());
        }

        if let Err(err) = self.finalise_order_payment(&order_id, &mut payment).await {
            warn!(%order_id, error = %err, "Webhook finalisation failed");
            return Ok(());
        }

        if self.config.one_click && payment.is_payment_successful() {
            let fields = AliasFields::from_params(params);
            if let Err(err) = self.save_order_alias(&order_id, fields).await {
                warn!(%order_id, error = %err, "Alias from webhook not saved");
            }
        }

        if order.status == CanonicalStatus::Cancelled && payment.is_payment_successful() {
            info!(%order_id, "Cancelled order got paid");
            for notification in [Notification::OrderPaid, Notification::AdminOrderPaid] {
                if let Err(err) = self
                    .platform
                    .notifier
                    .send(notification, &order_id)
                    .await
                {
                    warn!(%order_id, %notification, error = %err, "Notification not sent");
                }
            }
        }

        Ok(())
    }
}
