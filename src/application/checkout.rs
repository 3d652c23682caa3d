use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::engine::PaymentEngine;
use super::messages;
use super::requests::{ReturnUrls, flexcheckout_url, hosted_checkout_request};
use crate::config::PaymentMode;
use crate::domain::alias::{ALIAS_USAGE, Alias, AliasOperation};
use crate::domain::catalog::{self, PaymentMethod};
use crate::domain::order::Order;
use crate::domain::payment::PaymentResult;
use crate::domain::ports::{Controller, Fields};
use crate::error::{PaymentError, Result};

/// Alias id the checkout sends when the customer picks a new card.
pub const NEW_ALIAS: &str = "new";

fn saved_alias_id(alias_id: Option<&str>) -> Option<&str> {
    alias_id.filter(|id| !id.is_empty() && *id != NEW_ALIAS)
}

impl PaymentEngine {
    /// Entry point of the checkout: picks the payment mode and starts it.
    ///
    /// Stored aliases are charged directly (ALIAS mode) only when one-click is
    /// enabled and the merchant skips the security check.
    pub async fn process_payment(
        &self,
        order_id: &str,
        alias_id: Option<&str>,
        force_alias_save: bool,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let mode = if self.config.one_click
            && self.config.skip_security_check
            && saved_alias_id(alias_id).is_some()
        {
            PaymentMode::Alias
        } else {
            self.config.payment_page_type
        };
        info!(order_id, %mode, "Processing payment");

        match mode {
            PaymentMode::Redirect => {
                self.process_payment_redirect(order_id, alias_id, force_alias_save, customer_id)
                    .await
            }
            PaymentMode::Inline => {
                self.process_payment_inline(order_id, alias_id, force_alias_save, customer_id)
                    .await
            }
            PaymentMode::Alias => {
                let alias_id = alias_id.unwrap_or_default();
                self.process_payment_alias(order_id, alias_id, customer_id)
                    .await
            }
        }
    }

    /// Loads a stored alias and checks it belongs to the customer.
    async fn owned_alias(&self, alias_id: &str, customer_id: Option<&str>) -> Result<Alias> {
        let alias = self
            .platform
            .aliases
            .get_alias(alias_id)
            .await?
            .ok_or_else(|| PaymentError::Validation(messages::ALIAS_NONE.to_string()))?;

        if alias.customer_id.as_deref() != customer_id {
            return Err(PaymentError::AccessDenied(messages::ACCESS_DENIED.to_string()));
        }
        Ok(alias)
    }

    /// Builds the alias for a payment attempt according to the one-click policy.
    pub async fn prepare_alias(
        &self,
        mode: PaymentMode,
        alias_id: Option<&str>,
        force_alias_save: bool,
        customer_id: Option<&str>,
    ) -> Result<Alias> {
        let mut alias = match (mode, saved_alias_id(alias_id)) {
            (PaymentMode::Alias, saved) => {
                let saved = saved
                    .ok_or_else(|| PaymentError::Validation(messages::ALIAS_NONE.to_string()))?;
                let mut alias = self.owned_alias(saved, customer_id).await?;
                alias.operation = AliasOperation::ByMerchant;
                return Ok(alias);
            }
            (_, Some(saved)) if self.config.one_click => {
                let mut alias = self.owned_alias(saved, customer_id).await?;
                alias.operation = AliasOperation::ByPsp;
                if mode == PaymentMode::Redirect {
                    alias.usage = Some(ALIAS_USAGE.to_string());
                }
                alias
            }
            _ if self.config.one_click => {
                let mut alias = Alias {
                    customer_id: customer_id.map(str::to_string),
                    operation: AliasOperation::ByPsp,
                    usage: Some(ALIAS_USAGE.to_string()),
                    ..Alias::default()
                };
                alias.mark_for_permanent_storage();
                alias
            }
            _ => {
                let mut alias = Alias {
                    customer_id: customer_id.map(str::to_string),
                    operation: AliasOperation::ByPsp,
                    ..Alias::default()
                };
                if mode == PaymentMode::Redirect {
                    alias.mark_prevent_storing();
                }
                alias
            }
        };

        if force_alias_save && !alias.store_permanently {
            alias.store_permanently = true;
        }
        Ok(alias)
    }

    pub fn return_urls(&self, order_id: &str, mode: PaymentMode) -> ReturnUrls {
        ReturnUrls::build(self.platform.urls.as_ref(), order_id, mode)
    }

    pub async fn process_payment_redirect(
        &self,
        order_id: &str,
        alias_id: Option<&str>,
        force_alias_save: bool,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let alias = self
            .prepare_alias(PaymentMode::Redirect, alias_id, force_alias_save, customer_id)
            .await?;
        self.render_redirect(order_id, &alias).await
    }

    /// Redirect payment with the method chosen on the merchant's page.
    pub async fn process_payment_redirect_specified(
        &self,
        order_id: &str,
        alias_id: Option<&str>,
        pm: &str,
        brand: &str,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let mut alias = self
            .prepare_alias(PaymentMode::Redirect, alias_id, false, customer_id)
            .await?;
        alias.pm = Some(pm.to_string());
        alias.brand = Some(brand.to_string());
        self.render_redirect(order_id, &alias).await
    }

    async fn render_redirect(&self, order_id: &str, alias: &Alias) -> Result<()> {
        let order = self.fetch_order(order_id).await?;
        let urls = self.return_urls(order_id, PaymentMode::Redirect);
        let request = hosted_checkout_request(&self.config, &order, alias, &urls);
        debug!(order_id, url = %request.url, "Rendering Hosted Checkout redirect");

        let mut fields = Fields::new();
        fields.insert("order_id".into(), json!(order_id));
        fields.insert("url".into(), json!(request.url));
        fields.insert("fields".into(), serde_json::to_value(&request.fields)?);
        self.platform
            .renderer
            .show_payment_list_redirect_template(fields)
            .await
    }

    pub async fn process_payment_inline(
        &self,
        order_id: &str,
        alias_id: Option<&str>,
        force_alias_save: bool,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let alias = self
            .prepare_alias(PaymentMode::Inline, alias_id, force_alias_save, customer_id)
            .await?;
        let order = self.fetch_order(order_id).await?;
        let urls = self.return_urls(order_id, PaymentMode::Inline);

        let methods: Vec<&'static PaymentMethod> = match alias.brand.as_deref() {
            Some(brand) => {
                catalog::lookup_by_brand(brand, Some(&self.config.selected_payment_methods))
                    .into_iter()
                    .collect()
            }
            None => catalog::selected(&self.config.selected_payment_methods),
        };

        let mut entries = Vec::with_capacity(methods.len());
        for method in methods {
            entries.push(self.inline_entry(&order, &alias, method, &urls)?);
        }

        let categories: serde_json::Map<String, Value> = catalog::categories()
            .into_iter()
            .map(|(category, label)| (category.to_string(), json!(label)))
            .collect();

        let mut fields = Fields::new();
        fields.insert("order_id".into(), json!(order_id));
        fields.insert("methods".into(), Value::Array(entries));
        fields.insert("categories".into(), Value::Object(categories));
        fields.insert(
            "cc_url".into(),
            json!(self.generic_card_url(&order, &alias, &urls)?),
        );
        if let Some(customer_id) = customer_id {
            let aliases = self.platform.aliases.customer_aliases(customer_id).await?;
            let names: Vec<Value> = aliases
                .iter()
                .map(|alias| json!({ "id": alias.id, "name": alias.display_name() }))
                .collect();
            fields.insert("aliases".into(), Value::Array(names));
        }
        self.platform
            .renderer
            .show_payment_list_inline_template(fields)
            .await
    }

    fn inline_entry(
        &self,
        order: &Order,
        alias: &Alias,
        method: &'static PaymentMethod,
        urls: &ReturnUrls,
    ) -> Result<Value> {
        if !method.is_redirect_only {
            let url = flexcheckout_url(&self.config, order, alias, method, urls)?;
            return Ok(json!({
                "id": method.id,
                "name": method.name,
                "category": method.category,
                "url": url,
            }));
        }

        let country = self.config.generic_country();
        let pm = method.pm_by_country(country).unwrap_or(method.pm);
        let brand = method.brand_by_country(country).unwrap_or(method.brand);
        let params = BTreeMap::from([
            ("order_id".to_string(), order.order_id.clone()),
            ("payment_id".to_string(), method.id.to_string()),
            ("pm".to_string(), pm.to_string()),
            ("brand".to_string(), brand.to_string()),
        ]);
        let url = self
            .platform
            .urls
            .build_platform_url(Controller::Payment, &params);

        let missing_fields = if method.additional_data_required {
            order.missing_fields(method)
        } else {
            Vec::new()
        };
        Ok(json!({
            "id": method.id,
            "name": method.name,
            "category": method.category,
            "url": url,
            "missing_fields": missing_fields,
        }))
    }

    /// FlexCheckout card iframe for a quote that is not an order yet.
    pub async fn cc_iframe_url_before_place_order(&self, reserved_id: &str) -> Result<String> {
        let order = self
            .platform
            .orders
            .request_order_info_before_place_order(reserved_id)
            .await?
            .ok_or_else(|| PaymentError::Validation(format!("Quote {reserved_id} not found")))?;
        let mut alias = Alias::default();
        alias.mark_for_permanent_storage();
        let urls = self.return_urls(reserved_id, PaymentMode::Inline);
        self.generic_card_url(&order, &alias, &urls)
    }

    /// FlexCheckout iframe where the customer picks the card brand.
    fn generic_card_url(&self, order: &Order, alias: &Alias, urls: &ReturnUrls) -> Result<String> {
        let card = catalog::lookup_by_id("visa").unwrap_or(&PaymentMethod::EMPTY);
        let generic = PaymentMethod {
            brand: "",
            ..card.clone()
        };
        flexcheckout_url(&self.config, order, alias, &generic, urls)
    }

    /// Charges a stored alias straight away and renders the outcome.
    pub async fn process_payment_alias(
        &self,
        order_id: &str,
        alias_id: &str,
        customer_id: Option<&str>,
    ) -> Result<()> {
        let alias = self
            .prepare_alias(PaymentMode::Alias, Some(alias_id), false, customer_id)
            .await?;
        let order = self.fetch_order(order_id).await?;

        let mut payment = self
            .gateway
            .direct_link_payment(&order, &alias)
            .await?;
        let renderer = &self.platform.renderer;
        let mut fields = Fields::new();
        fields.insert("type".into(), json!("alias"));
        fields.insert("order_id".into(), json!(order_id));
        fields.insert("pay_id".into(), json!(payment.pay_id));

        if payment.is_security_check_required() {
            fields.insert("html".into(), json!(payment.html_answer));
            return renderer.show_security_check_template(fields, &payment).await;
        }
        if !payment.is_transaction_successful() {
            return Err(PaymentError::Gateway {
                code: payment.error_code().to_string(),
                message: payment.error_message().to_string(),
            });
        }

        let status = self.finalise_order_payment(order_id, &mut payment).await?;
        fields.insert("payment_status".into(), json!(status));
        self.render_outcome(fields, &payment).await
    }

    /// Success, cancellation or error page depending on the payment outcome.
    pub(crate) async fn render_outcome(
        &self,
        mut fields: Fields,
        payment: &PaymentResult,
    ) -> Result<()> {
        let renderer = &self.platform.renderer;
        if payment.is_payment_successful() {
            fields.insert("is_show_warning".into(), json!(self.is_show_warning(payment)));
            renderer.show_success_template(fields, payment).await
        } else if payment.is_payment_cancelled() {
            renderer.show_cancellation_template(fields, payment).await
        } else {
            fields.insert("message".into(), json!(messages::checkout_error(payment)));
            renderer.show_payment_error_template(fields, payment).await
        }
    }

    /// Test-mode authorisations remind the merchant that nothing was captured.
    pub(crate) fn is_show_warning(&self, payment: &PaymentResult) -> bool {
        self.config.is_test_mode()
            && payment.payment_status == Some(crate::domain::status::CanonicalStatus::Authorized)
    }
}
