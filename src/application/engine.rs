use tracing::debug;

use crate::config::Configuration;
use crate::domain::alias::AliasFields;
use crate::domain::order::Order;
use crate::domain::ports::{Collaborators, GatewayArc};
use crate::error::{PaymentError, Result};

/// The main entry point for payment orchestration.
///
/// `PaymentEngine` holds the merchant configuration, the platform collaborators
/// and the gateway transport. Every public operation runs to completion within
/// one request; the engine keeps no state of its own between calls.
pub struct PaymentEngine {
    pub(crate) config: Configuration,
    pub(crate) platform: Collaborators,
    pub(crate) gateway: GatewayArc,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Merchant settings.
    /// * `platform` - The platform connector capabilities.
    /// * `gateway` - The gateway transport.
    pub fn new(config: Configuration, platform: Collaborators, gateway: GatewayArc) -> Self {
        Self {
            config,
            platform,
            gateway,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Fetches an order, falling back to the quote when the order is not placed yet.
    ///
    /// Addresses are normalised before the order is returned.
    pub async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let orders = &self.platform.orders;
        let order = if orders.is_order_created(order_id).await? {
            orders.request_order_info(order_id).await?
        } else {
            orders.request_order_info_before_place_order(order_id).await?
        };

        let mut order = order
            .ok_or_else(|| PaymentError::Validation(format!("Order {order_id} not found")))?;
        order.normalize_addresses();
        Ok(order)
    }

    /// Payment method code of the order, or of its quote when not placed yet.
    pub(crate) async fn payment_method_code(&self, order_id: &str) -> Result<Option<String>> {
        let orders = &self.platform.orders;
        if orders.is_order_created(order_id).await? {
            orders.order_payment_method(order_id).await
        } else {
            orders.quote_payment_method(order_id).await
        }
    }

    /// Persists an alias unless its brand is on the non-storable list.
    ///
    /// Returns true in both cases.
    pub async fn save_alias(&self, customer_id: &str, fields: &AliasFields) -> Result<bool> {
        if !fields.is_storable() {
            debug!(brand = ?fields.brand, "Alias brand is not storable, skipping");
            return Ok(true);
        }
        self.platform.aliases.save_alias(customer_id, fields).await
    }

    /// Saves the alias returned with a payment for the order's customer.
    ///
    /// Carte Bancaire payments come back with the card network brand, so the
    /// brand is replaced with `CB` when the order was paid with it.
    pub(crate) async fn save_order_alias(
        &self,
        order_id: &str,
        mut fields: AliasFields,
    ) -> Result<bool> {
        if fields.alias.is_none() {
            return Ok(false);
        }

        let order = self.fetch_order(order_id).await?;
        let Some(customer_id) = order.customer_id.as_deref() else {
            debug!(order_id, "Guest order, alias not saved");
            return Ok(false);
        };

        if self.payment_method_code(order_id).await?.as_deref() == Some("cb") {
            fields.brand = Some("CB".to_string());
        }
        self.save_alias(customer_id, &fields).await
    }
}
