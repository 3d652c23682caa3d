use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use strum::Display;
use tokio::sync::RwLock;
use url::Url;

use crate::domain::alias::{Alias, AliasFields};
use crate::domain::order::Order;
use crate::domain::payment::PaymentResult;
use crate::domain::ports::{
    AliasStore, Controller, Fields, Notification, Notifier, OrderStore, Reminder, ReminderStore,
    Renderer, SessionStore, UrlBuilder,
};
use crate::error::{PaymentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Template {
    Success,
    Cancellation,
    PaymentError,
    SecurityCheck,
    InlineLoader,
    PaymentListRedirect,
    PaymentListInline,
    PaymentListAlias,
}

/// A page the engine asked the platform to render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub template: Template,
    pub fields: Fields,
    pub payment: Option<PaymentResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartState {
    #[default]
    Active,
    Emptied,
    Restored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub payment: PaymentResult,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
struct ReminderEntry {
    reminder: Reminder,
    sent: bool,
}

#[derive(Default)]
struct PlatformState {
    orders: HashMap<String, Order>,
    quotes: HashMap<String, Order>,
    aliases: HashMap<String, Alias>,
    saved_aliases: Vec<(String, AliasFields)>,
    session: BTreeMap<String, String>,
    pages: Vec<RenderedPage>,
    notifications: Vec<(Notification, String)>,
    failing_notifications: HashSet<String>,
    payment_log: HashMap<String, Vec<PaymentResult>>,
    status_updates: HashMap<String, Vec<StatusUpdate>>,
    reminders: Vec<ReminderEntry>,
    reminder_candidates: Vec<String>,
    cart: CartState,
}

impl PlatformState {
    fn order_mut(&mut self, order_id: &str) -> Result<&mut Order> {
        match self.orders.get_mut(order_id) {
            Some(order) => Ok(order),
            None => self
                .quotes
                .get_mut(order_id)
                .ok_or_else(|| PaymentError::Storage(format!("Unknown order {order_id}"))),
        }
    }
}

/// A thread-safe in-memory platform connector.
///
/// Implements every platform capability over one shared state and records what
/// the engine rendered, sent and logged. Used by the replay binary and the tests.
#[derive(Clone)]
pub struct InMemoryPlatform {
    state: Arc<RwLock<PlatformState>>,
    base_url: String,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    /// Creates a new, empty platform.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(PlatformState::default())),
            base_url: "https://shop.example.com/ogone/".to_string(),
        }
    }

    /// Changes the root the platform URLs are built from.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn insert_order(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.order_id.clone(), order);
    }

    /// Registers a quote, an order that is not placed yet.
    pub async fn insert_quote(&self, order: Order) {
        let mut state = self.state.write().await;
        state.quotes.insert(order.order_id.clone(), order);
    }

    pub async fn insert_alias(&self, alias: Alias) {
        let mut state = self.state.write().await;
        if let Some(id) = alias.id.clone() {
            state.aliases.insert(id, alias);
        }
    }

    pub async fn order(&self, order_id: &str) -> Option<Order> {
        let state = self.state.read().await;
        state
            .orders
            .get(order_id)
            .or_else(|| state.quotes.get(order_id))
            .cloned()
    }

    /// All placed orders, sorted by id.
    pub async fn orders(&self) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        orders
    }

    pub async fn payment_log(&self, order_id: &str) -> Vec<PaymentResult> {
        let state = self.state.read().await;
        state.payment_log.get(order_id).cloned().unwrap_or_default()
    }

    pub async fn status_updates(&self, order_id: &str) -> Vec<StatusUpdate> {
        let state = self.state.read().await;
        state
            .status_updates
            .get(order_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn notifications(&self) -> Vec<(Notification, String)> {
        self.state.read().await.notifications.clone()
    }

    /// Makes every notification for `order_id` fail.
    pub async fn fail_notifications_for(&self, order_id: &str) {
        let mut state = self.state.write().await;
        state.failing_notifications.insert(order_id.to_string());
    }

    pub async fn pages(&self) -> Vec<RenderedPage> {
        self.state.read().await.pages.clone()
    }

    pub async fn last_page(&self) -> Option<RenderedPage> {
        self.state.read().await.pages.last().cloned()
    }

    pub async fn saved_aliases(&self) -> Vec<(String, AliasFields)> {
        self.state.read().await.saved_aliases.clone()
    }

    pub async fn session_value(&self, key: &str) -> Option<String> {
        self.state.read().await.session.get(key).cloned()
    }

    pub async fn cart_state(&self) -> CartState {
        self.state.read().await.cart
    }

    pub async fn add_reminder_candidate(&self, order_id: &str) {
        let mut state = self.state.write().await;
        state.reminder_candidates.push(order_id.to_string());
    }

    /// Reminders not sent yet.
    pub async fn queued_reminders(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .reminders
            .iter()
            .filter(|entry| !entry.sent)
            .map(|entry| entry.reminder.order_id.clone())
            .collect()
    }

    async fn record_page(
        &self,
        template: Template,
        fields: Fields,
        payment: Option<&PaymentResult>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.pages.push(RenderedPage {
            template,
            fields,
            payment: payment.cloned(),
        });
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryPlatform {
    async fn request_order_info(&self, order_id: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(order_id).cloned())
    }

    async fn request_order_info_before_place_order(
        &self,
        reserved_id: &str,
    ) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.quotes.get(reserved_id).cloned())
    }

    async fn is_order_created(&self, order_id: &str) -> Result<bool> {
        Ok(self.state.read().await.orders.contains_key(order_id))
    }

    async fn order_payment_method(&self, order_id: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(order_id)
            .and_then(|order| order.payment_method.clone()))
    }

    async fn quote_payment_method(&self, quote_id: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state
            .quotes
            .get(quote_id)
            .and_then(|order| order.payment_method.clone()))
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        payment: &PaymentResult,
        message: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state.order_mut(order_id)?;
        if let Some(status) = payment.payment_status {
            order.status = status;
        }
        if payment.pay_id.is_some() {
            order.pay_id = payment.pay_id.clone();
        }
        state
            .status_updates
            .entry(order_id.to_string())
            .or_default()
            .push(StatusUpdate {
                payment: payment.clone(),
                message: message.map(str::to_string),
            });
        Ok(())
    }

    async fn add_captured_amount(&self, order_id: &str, amount: Decimal) -> Result<()> {
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.captured_amount += amount;
        Ok(())
    }

    async fn add_refunded_amount(&self, order_id: &str, amount: Decimal) -> Result<()> {
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.refunded_amount += amount;
        Ok(())
    }

    async fn add_cancelled_amount(&self, order_id: &str, amount: Decimal) -> Result<()> {
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.cancelled_amount += amount;
        Ok(())
    }

    async fn log_payment(&self, order_id: &str, payment: &PaymentResult) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .payment_log
            .entry(order_id.to_string())
            .or_default()
            .push(payment.clone());
        Ok(())
    }

    async fn empty_shopping_cart(&self) -> Result<()> {
        self.state.write().await.cart = CartState::Emptied;
        Ok(())
    }

    async fn restore_shopping_cart(&self) -> Result<()> {
        self.state.write().await.cart = CartState::Restored;
        Ok(())
    }
}

#[async_trait]
impl AliasStore for InMemoryPlatform {
    async fn get_alias(&self, alias_id: &str) -> Result<Option<Alias>> {
        Ok(self.state.read().await.aliases.get(alias_id).cloned())
    }

    async fn customer_aliases(&self, customer_id: &str) -> Result<Vec<Alias>> {
        let state = self.state.read().await;
        let mut aliases: Vec<Alias> = state
            .aliases
            .values()
            .filter(|alias| alias.customer_id.as_deref() == Some(customer_id))
            .cloned()
            .collect();
        aliases.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(aliases)
    }

    async fn save_alias(&self, customer_id: &str, fields: &AliasFields) -> Result<bool> {
        let mut state = self.state.write().await;
        if let Some(token) = fields.alias.clone() {
            let mut alias = Alias::create(fields);
            alias.id = Some(token.clone());
            alias.customer_id = Some(customer_id.to_string());
            state.aliases.insert(token, alias);
        }
        state
            .saved_aliases
            .push((customer_id.to_string(), fields.clone()));
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for InMemoryPlatform {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.read().await.session.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.state
            .write()
            .await
            .session
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn unset(&self, key: &str) -> Result<()> {
        self.state.write().await.session.remove(key);
        Ok(())
    }

    async fn values(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.state.read().await.session.clone())
    }
}

#[async_trait]
impl Renderer for InMemoryPlatform {
    async fn show_success_template(&self, fields: Fields, payment: &PaymentResult) -> Result<()> {
        self.record_page(Template::Success, fields, Some(payment))
            .await
    }

    async fn show_cancellation_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()> {
        self.record_page(Template::Cancellation, fields, Some(payment))
            .await
    }

    async fn show_payment_error_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()> {
        self.record_page(Template::PaymentError, fields, Some(payment))
            .await
    }

    async fn show_security_check_template(
        &self,
        fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()> {
        self.record_page(Template::SecurityCheck, fields, Some(payment))
            .await
    }

    async fn show_inline_loader_template(&self, fields: Fields) -> Result<()> {
        self.record_page(Template::InlineLoader, fields, None).await
    }

    async fn show_payment_list_redirect_template(&self, fields: Fields) -> Result<()> {
        self.record_page(Template::PaymentListRedirect, fields, None)
            .await
    }

    async fn show_payment_list_inline_template(&self, fields: Fields) -> Result<()> {
        self.record_page(Template::PaymentListInline, fields, None)
            .await
    }

    async fn show_payment_list_alias_template(&self, fields: Fields) -> Result<()> {
        self.record_page(Template::PaymentListAlias, fields, None)
            .await
    }
}

#[async_trait]
impl Notifier for InMemoryPlatform {
    async fn send(&self, notification: Notification, order_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_notifications.contains(order_id) {
            return Err(PaymentError::Transport(format!(
                "mail transport refused {notification} for order {order_id}"
            )));
        }
        state
            .notifications
            .push((notification, order_id.to_string()));
        Ok(())
    }
}

impl UrlBuilder for InMemoryPlatform {
    fn build_platform_url(
        &self,
        controller: Controller,
        params: &BTreeMap<String, String>,
    ) -> String {
        let raw = format!("{}{}", self.base_url, controller);
        match Url::parse(&raw) {
            Ok(mut url) => {
                if !params.is_empty() {
                    url.query_pairs_mut().extend_pairs(params.iter());
                }
                url.to_string()
            }
            Err(_) => raw,
        }
    }
}

#[async_trait]
impl ReminderStore for InMemoryPlatform {
    async fn pending_reminders(&self) -> Result<Vec<Reminder>> {
        let state = self.state.read().await;
        Ok(state
            .reminders
            .iter()
            .filter(|entry| !entry.sent)
            .map(|entry| entry.reminder.clone())
            .collect())
    }

    async fn set_reminder_sent(&self, order_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        for entry in state
            .reminders
            .iter_mut()
            .filter(|entry| entry.reminder.order_id == order_id)
        {
            entry.sent = true;
        }
        Ok(())
    }

    async fn enqueue_reminder(&self, order_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let created_at = state
            .orders
            .get(order_id)
            .map(|order| order.created_at)
            .unwrap_or_else(Utc::now);
        state.reminders.push(ReminderEntry {
            reminder: Reminder {
                order_id: order_id.to_string(),
                created_at,
            },
            sent: false,
        });
        state
            .reminder_candidates
            .retain(|candidate| candidate != order_id);
        Ok(())
    }

    async fn orders_for_reminding(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.reminder_candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::CanonicalStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_amount_accounting() {
        let platform = InMemoryPlatform::new();
        platform.insert_order(Order::new("1", dec!(100), "EUR")).await;

        platform.add_captured_amount("1", dec!(60)).await.unwrap();
        platform.add_captured_amount("1", dec!(40)).await.unwrap();

        assert_eq!(platform.order("1").await.unwrap().captured_amount, dec!(100));
        assert!(platform.add_refunded_amount("2", dec!(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_status_update_uses_cached_status() {
        let platform = InMemoryPlatform::new();
        platform.insert_order(Order::new("1", dec!(100), "EUR")).await;
        let payment = PaymentResult {
            pay_id: Some("77".into()),
            payment_status: Some(CanonicalStatus::Authorized),
            ..PaymentResult::default()
        };

        platform
            .update_order_status("1", &payment, Some("note"))
            .await
            .unwrap();

        let order = platform.order("1").await.unwrap();
        assert_eq!(order.status, CanonicalStatus::Authorized);
        assert_eq!(order.pay_id.as_deref(), Some("77"));
        assert_eq!(
            platform.status_updates("1").await[0].message.as_deref(),
            Some("note")
        );
    }

    #[tokio::test]
    async fn test_saved_alias_round_trips_fields() {
        let platform = InMemoryPlatform::new();
        let fields = AliasFields {
            alias: Some("TOKEN".into()),
            brand: Some("VISA".into()),
            card_no: Some("XXXXXXXXXXXX1111".into()),
            cn: Some("Jo Doe".into()),
            bin: Some("411111".into()),
            pm: Some("CreditCard".into()),
            ed: Some("1230".into()),
        };

        platform.save_alias("C1", &fields).await.unwrap();

        let stored = platform.get_alias("TOKEN").await.unwrap().unwrap();
        assert_eq!(stored.customer_id.as_deref(), Some("C1"));
        assert_eq!(stored.brand, fields.brand);
        assert_eq!(stored.card_no, fields.card_no);
        assert_eq!(stored.cn, fields.cn);
        assert_eq!(stored.bin, fields.bin);
        assert_eq!(stored.pm, fields.pm);
        assert_eq!(stored.ed, fields.ed);
        assert_eq!(platform.customer_aliases("C1").await.unwrap().len(), 1);
    }

    #[test]
    fn test_platform_urls() {
        let platform = InMemoryPlatform::new();
        let params = BTreeMap::from([("order_id".to_string(), "100".to_string())]);

        let url = platform.build_platform_url(Controller::OrderSuccess, &params);

        assert_eq!(url, "https://shop.example.com/ogone/order_success?order_id=100");
    }
}
