use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use super::engine::PaymentEngine;
use crate::domain::ports::Notification;
use crate::domain::status::CanonicalStatus;
use crate::error::Result;

/// Gateway errors meaning the customer never finished the payment page.
const ABANDONED_ERROR_CODES: [&str; 2] = ["50001130", "50001131"];
const ABANDONED_NC_STATUS: &str = "none";

/// What one cron run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub sent: Vec<String>,
    pub enqueued: Vec<String>,
    pub failed: Vec<String>,
}

impl PaymentEngine {
    /// Sends due payment reminders and queues new ones for abandoned payments.
    ///
    /// Each order is handled on its own: a failing mail or status query is
    /// logged and the rest of the batch still runs.
    pub async fn cron_handler(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let mut report = ReminderReport::default();
        if !self.config.reminder.enabled {
            debug!("Payment reminders disabled");
            return Ok(report);
        }

        let days = self.config.reminder.days.abs();
        let Some(due_before) =
            TimeDelta::try_days(days).and_then(|delay| now.checked_sub_signed(delay))
        else {
            warn!(days, "Reminder delay out of range, skipping run");
            return Ok(report);
        };

        let reminders = &self.platform.reminders;
        for reminder in reminders.pending_reminders().await? {
            if reminder.created_at >= due_before {
                continue;
            }
            let order_id = reminder.order_id.as_str();
            match self
                .platform
                .notifier
                .send(Notification::Reminder, order_id)
                .await
            {
                Ok(()) => report.sent.push(order_id.to_string()),
                Err(err) => {
                    warn!(order_id, error = %err, "Payment reminder not sent");
                    report.failed.push(order_id.to_string());
                }
            }
            reminders.set_reminder_sent(order_id).await?;
        }

        for order_id in reminders.orders_for_reminding().await? {
            match self.is_abandoned(&order_id).await {
                Ok(true) => {
                    reminders.enqueue_reminder(&order_id).await?;
                    report.enqueued.push(order_id);
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(%order_id, error = %err, "Reminder check failed");
                    report.failed.push(order_id);
                }
            }
        }

        info!(
            sent = report.sent.len(),
            enqueued = report.enqueued.len(),
            failed = report.failed.len(),
            "Reminder run finished"
        );
        Ok(report)
    }

    async fn is_abandoned(&self, order_id: &str) -> Result<bool> {
        let order = self.fetch_order(order_id).await?;
        if order.status != CanonicalStatus::Pending {
            return Ok(false);
        }

        let payment = self
            .gateway
            .status(order_id, order.pay_id.as_deref(), None)
            .await?;
        Ok(!payment.is_transaction_successful()
            && (ABANDONED_ERROR_CODES.contains(&payment.error_code())
                || payment.nc_status.as_deref() == Some(ABANDONED_NC_STATUS)))
    }
}
