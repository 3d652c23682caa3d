use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::Display;

use super::alias::{Alias, AliasFields};
use super::order::Order;
use super::payment::PaymentResult;
use crate::error::Result;

/// Template variables handed to the platform renderer.
pub type Fields = BTreeMap<String, serde_json::Value>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn request_order_info(&self, order_id: &str) -> Result<Option<Order>>;
    async fn request_order_info_before_place_order(&self, reserved_id: &str)
    -> Result<Option<Order>>;
    async fn is_order_created(&self, order_id: &str) -> Result<bool>;
    async fn order_payment_method(&self, order_id: &str) -> Result<Option<String>>;
    async fn quote_payment_method(&self, quote_id: &str) -> Result<Option<String>>;
    async fn update_order_status(
        &self,
        order_id: &str,
        payment: &PaymentResult,
        message: Option<&str>,
    ) -> Result<()>;
    async fn add_captured_amount(&self, order_id: &str, amount: Decimal) -> Result<()>;
    async fn add_refunded_amount(&self, order_id: &str, amount: Decimal) -> Result<()>;
    async fn add_cancelled_amount(&self, order_id: &str, amount: Decimal) -> Result<()>;
    /// Appends the payment to the order's audit trail.
    async fn log_payment(&self, order_id: &str, payment: &PaymentResult) -> Result<()>;
    async fn empty_shopping_cart(&self) -> Result<()>;
    async fn restore_shopping_cart(&self) -> Result<()>;
}

#[async_trait]
pub trait AliasStore: Send + Sync {
    async fn get_alias(&self, alias_id: &str) -> Result<Option<Alias>>;
    async fn customer_aliases(&self, customer_id: &str) -> Result<Vec<Alias>>;
    async fn save_alias(&self, customer_id: &str, fields: &AliasFields) -> Result<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn unset(&self, key: &str) -> Result<()>;
    async fn values(&self) -> Result<BTreeMap<String, String>>;
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn show_success_template(&self, fields: Fields, payment: &PaymentResult) -> Result<()>;
    async fn show_cancellation_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()>;
    async fn show_payment_error_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()>;
    async fn show_security_check_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()>;
    async fn show_inline_loader_template(&self, fields: Fields) -> Result<()>;
    async fn show_payment_list_redirect_template(&self, fields: Fields) -> Result<()>;
    async fn show_payment_list_inline_template(&self, fields: Fields) -> Result<()>;
    async fn show_payment_list_alias_template(&self, fields: Fields) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Notification {
    Authorization,
    AdminAuthorization,
    RefundFailed,
    AdminRefundFailed,
    OrderPaid,
    AdminOrderPaid,
    Reminder,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification, order_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Controller {
    Payment,
    Success,
    OrderSuccess,
    OrderCancelled,
}

pub trait UrlBuilder: Send + Sync {
    fn build_platform_url(&self, controller: Controller, params: &BTreeMap<String, String>)
    -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub order_id: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn pending_reminders(&self) -> Result<Vec<Reminder>>;
    async fn set_reminder_sent(&self, order_id: &str) -> Result<()>;
    async fn enqueue_reminder(&self, order_id: &str) -> Result<()>;
    async fn orders_for_reminding(&self) -> Result<Vec<String>>;
}

/// Single-call operations against the remote gateway. No retries.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn status(
        &self,
        order_id: &str,
        pay_id: Option<&str>,
        pay_id_sub: Option<&str>,
    ) -> Result<PaymentResult>;
    async fn void(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult>;
    async fn capture(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult>;
    async fn refund(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult>;
    async fn direct_link_payment(&self, order: &Order, alias: &Alias) -> Result<PaymentResult>;
}

pub type GatewayArc = Arc<dyn Gateway>;

/// The platform connector, split into the narrow capabilities the engine consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: Arc<dyn OrderStore>,
    pub aliases: Arc<dyn AliasStore>,
    pub session: Arc<dyn SessionStore>,
    pub renderer: Arc<dyn Renderer>,
    pub notifier: Arc<dyn Notifier>,
    pub urls: Arc<dyn UrlBuilder>,
    pub reminders: Arc<dyn ReminderStore>,
}

impl Collaborators {
    /// Uses one connector for every capability.
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: OrderStore
            + AliasStore
            + SessionStore
            + Renderer
            + Notifier
            + UrlBuilder
            + ReminderStore
            + 'static,
    {
        Self {
            orders: platform.clone(),
            aliases: platform.clone(),
            session: platform.clone(),
            renderer: platform.clone(),
            notifier: platform.clone(),
            urls: platform.clone(),
            reminders: platform,
        }
    }
}
