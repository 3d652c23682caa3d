use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use super::engine::PaymentEngine;
use super::messages;
use crate::config::PaymentMode;
use crate::domain::alias::{Alias, AliasFields};
use crate::domain::catalog::{self, BANCONTACT_RAW_BRAND, normalize_brand};
use crate::domain::payment::PaymentResult;
use crate::domain::ports::{Controller, Fields};
use crate::domain::request::{GatewayParams, ReturnState};
use crate::domain::status::CanonicalStatus;
use crate::error::{PaymentError, Result};

/// Session key prefix for the values kept by the open-invoice checkout.
const OPEN_INVOICE_SESSION_MARKER: &str = "open_invoice_";

/// Alias statuses FlexCheckout reports for a usable token (created, updated).
const STORABLE_ALIAS_STATUSES: [&str; 2] = ["0", "2"];

fn alias_session_key(alias_id: &str) -> String {
    format!("Alias_{alias_id}")
}

/// Payload returned to the browser after an inline payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InlineOutcome {
    #[serde(rename = "3ds_required")]
    SecurityCheckRequired {
        order_id: String,
        pay_id: Option<String>,
        html: Option<String>,
    },
    Error {
        order_id: String,
        pay_id: Option<String>,
        message: String,
        redirect: String,
    },
    Success {
        order_id: String,
        pay_id: Option<String>,
        payment_status: CanonicalStatus,
        redirect: String,
        is_show_warning: bool,
    },
    Cancelled {
        order_id: String,
        pay_id: Option<String>,
        message: String,
        redirect: String,
    },
}

impl PaymentEngine {
    /// Handles the customer coming back from the hosted pages.
    pub async fn process_return_url(&self, params: &GatewayParams) -> Result<()> {
        let return_state = params
            .get("return_state")
            .and_then(|state| ReturnState::from_str(state).ok())
            .ok_or_else(|| PaymentError::Validation("Invalid return state".to_string()))?;
        let mut mode = match params.get("payment_mode") {
            Some(mode) => PaymentMode::from_str(mode)
                .map_err(|_| PaymentError::Validation(format!("Invalid payment mode {mode}")))?,
            None => self.config.payment_page_type,
        };
        debug!(%return_state, %mode, "Processing return url");

        match return_state {
            ReturnState::Accept => {
                // 3-D Secure always completes through the redirect return
                if mode == PaymentMode::Inline && (params.has("COMPLUS") || params.has("PAYID")) {
                    mode = PaymentMode::Redirect;
                }
                match mode {
                    PaymentMode::Inline => self.process_return_inline(params).await,
                    PaymentMode::Redirect | PaymentMode::Alias => {
                        self.process_return_redirect(params).await
                    }
                }
            }
            ReturnState::Cancel | ReturnState::Back => {
                let order_id = return_order_id(params).unwrap_or_default();
                let payment = PaymentResult::cancelled_by_customer(order_id);
                let mut fields = Fields::new();
                fields.insert("order_id".into(), json!(order_id));
                fields.insert("message".into(), json!(messages::PAYMENT_CANCELLED));
                self.platform
                    .renderer
                    .show_cancellation_template(fields, &payment)
                    .await
            }
            ReturnState::Decline | ReturnState::Exception => {
                self.process_return_declined(params).await
            }
        }
    }

    async fn process_return_redirect(&self, params: &GatewayParams) -> Result<()> {
        let mut params = params.clone();
        if params.get("BRAND") == Some(BANCONTACT_RAW_BRAND) {
            // Bancontact returns are signed over a different brand string
            params.remove("BRAND");
            params.insert("BRAND", catalog::BANCONTACT_BRAND);
        } else if !self.config.sha_out_composer().is_valid(&params) {
            return Err(PaymentError::Signature(
                "return url signature does not match".to_string(),
            ));
        }

        let order_id = params
            .get_string("orderID")
            .ok_or_else(|| PaymentError::Validation("Order id is missing".to_string()))?;
        let mut payment = self
            .gateway
            .status(&order_id, params.get("PAYID"), params.get("PAYIDSUB"))
            .await?;
        let status = self.finalise_order_payment(&order_id, &mut payment).await?;

        if self.config.one_click {
            self.save_order_alias(&order_id, AliasFields::from_params(&params))
                .await?;
        }

        let mut fields = Fields::new();
        fields.insert("type".into(), json!("redirect"));
        fields.insert("order_id".into(), json!(order_id));
        fields.insert("pay_id".into(), json!(payment.pay_id));
        fields.insert("payment_status".into(), json!(status));

        if payment.is_payment_successful() {
            let session = &self.platform.session;
            for key in session.values().await?.into_keys() {
                if key.contains(OPEN_INVOICE_SESSION_MARKER) {
                    session.unset(&key).await?;
                }
            }
        }
        self.render_outcome(fields, &payment).await
    }

    async fn process_return_inline(&self, params: &GatewayParams) -> Result<()> {
        let order_id = params
            .get_string("Alias_OrderId")
            .ok_or_else(|| PaymentError::Validation("Alias_OrderId is missing".to_string()))?;
        let alias_id = params
            .get_string("Alias_AliasId")
            .ok_or_else(|| PaymentError::Validation("Alias_AliasId is missing".to_string()))?;
        let brand = normalize_brand(params.get("Card_Brand").unwrap_or_default()).to_string();
        let store_permanently = params.get("Alias_StorePermanently") == Some("Y");

        if self.config.one_click
            && store_permanently
            && params
                .get("Alias_Status")
                .is_some_and(|status| STORABLE_ALIAS_STATUSES.contains(&status))
        {
            let mut fields = AliasFields::from_inline_params(params);
            fields.brand = Some(brand.clone());
            self.save_order_alias(&order_id, fields).await?;
        }

        let mut alias = self.inline_alias(&alias_id, Some(&brand)).await?;
        alias.cn = params.get_string("Card_CardHolderName");
        alias.card_no = params.get_string("Card_CardNumber").or(alias.card_no);
        alias.ed = params.get_string("Card_ExpiryDate").or(alias.ed);
        alias.bin = params.get_string("Card_Bin").or(alias.bin);
        alias.store_permanently = store_permanently;

        self.platform
            .session
            .set(&alias_session_key(&alias_id), serde_json::to_string(&alias)?)
            .await?;
        info!(%order_id, %alias_id, %brand, "Inline card accepted, waiting for charge");

        let mut fields = Fields::new();
        fields.insert("type".into(), json!("inline"));
        fields.insert("order_id".into(), json!(order_id));
        fields.insert("alias_id".into(), json!(alias_id));
        fields.insert("card_brand".into(), json!(brand));
        fields.insert("card_cn".into(), json!(alias.cn));
        fields.insert("data".into(), serde_json::to_value(params)?);
        self.platform
            .renderer
            .show_inline_loader_template(fields)
            .await
    }

    async fn process_return_declined(&self, params: &GatewayParams) -> Result<()> {
        let mut payment = PaymentResult::from_params(params);
        if let Some(error) = params.get_string("Alias_NCError") {
            payment.nc_error = Some(error);
        }
        if let Some(error) = params.get_string("Alias_NCErrorCardNo") {
            payment.nc_error_card_no = Some(error);
        }

        let mut fields = Fields::new();
        if payment.pay_id.is_none() {
            // the customer left before any transaction was created
            fields.insert("order_id".into(), json!(null));
            fields.insert("pay_id".into(), json!(null));
            fields.insert("message".into(), json!(messages::PAYMENT_CANCELLED));
        } else {
            warn!(
                order_id = ?payment.order_id,
                pay_id = ?payment.pay_id,
                code = payment.error_code(),
                "Payment declined"
            );
            fields.insert("order_id".into(), json!(payment.order_id));
            fields.insert("pay_id".into(), json!(payment.pay_id));
            fields.insert("message".into(), json!(messages::checkout_error(&payment)));
        }
        self.platform
            .renderer
            .show_payment_error_template(fields, &payment)
            .await
    }

    /// Loads or builds the alias an inline payment is charged with.
    ///
    /// Inline payments always go through 3-D Secure.
    async fn inline_alias(&self, alias_id: &str, card_brand: Option<&str>) -> Result<Alias> {
        let mut alias = self
            .platform
            .aliases
            .get_alias(alias_id)
            .await?
            .unwrap_or_else(|| Alias::with_id(alias_id));
        if alias.alias.is_none() {
            alias.alias = Some(alias_id.to_string());
        }

        if let Some(brand) = card_brand.map(normalize_brand).filter(|brand| !brand.is_empty()) {
            if let Some(method) =
                catalog::lookup_by_brand(brand, Some(&self.config.selected_payment_methods))
            {
                alias.payment_id = Some(method.id.to_string());
                alias.pm = Some(method.pm.to_string());
            }
            alias.brand = Some(brand.to_string());
        }
        alias.force_security = true;
        Ok(alias)
    }

    /// Charges the card captured by the inline iframe.
    ///
    /// The alias stashed by the inline return is consumed from the session, so a
    /// duplicate submission rebuilds it from storage and the card brand instead.
    pub async fn finish_return_inline(
        &self,
        order_id: &str,
        card_brand: Option<&str>,
        alias_id: &str,
    ) -> Result<InlineOutcome> {
        let session = &self.platform.session;
        let key = alias_session_key(alias_id);
        let alias = match session.get(&key).await? {
            Some(stashed) => {
                session.unset(&key).await?;
                serde_json::from_str(&stashed)?
            }
            None => {
                debug!(order_id, alias_id, "No stashed alias, rebuilding it");
                self.inline_alias(alias_id, card_brand).await?
            }
        };

        let order = self.fetch_order(order_id).await?;
        let mut payment = self.gateway.direct_link_payment(&order, &alias).await?;

        if payment.is_security_check_required() {
            info!(order_id, pay_id = ?payment.pay_id, "3-D Secure challenge required");
            return Ok(InlineOutcome::SecurityCheckRequired {
                order_id: order_id.to_string(),
                pay_id: payment.pay_id.clone(),
                html: payment.html_answer.clone(),
            });
        }

        let cancel_redirect = self.order_url(Controller::OrderCancelled, order_id);
        if !payment.is_transaction_successful() {
            let message = messages::checkout_error(&payment);
            error!(order_id, "{message}");
            return Ok(InlineOutcome::Error {
                order_id: order_id.to_string(),
                pay_id: payment.pay_id.clone(),
                message,
                redirect: cancel_redirect,
            });
        }

        let status = self.finalise_order_payment(order_id, &mut payment).await?;
        let orders = &self.platform.orders;
        if payment.is_payment_successful() {
            orders.empty_shopping_cart().await?;
            Ok(InlineOutcome::Success {
                order_id: order_id.to_string(),
                pay_id: payment.pay_id.clone(),
                payment_status: status,
                redirect: self.order_url(Controller::OrderSuccess, order_id),
                is_show_warning: self.is_show_warning(&payment),
            })
        } else if payment.is_payment_cancelled() {
            orders.restore_shopping_cart().await?;
            Ok(InlineOutcome::Cancelled {
                order_id: order_id.to_string(),
                pay_id: payment.pay_id.clone(),
                message: messages::PAYMENT_CANCELLED.to_string(),
                redirect: cancel_redirect,
            })
        } else {
            orders.restore_shopping_cart().await?;
            Ok(InlineOutcome::Error {
                order_id: order_id.to_string(),
                pay_id: payment.pay_id.clone(),
                message: messages::checkout_error(&payment),
                redirect: cancel_redirect,
            })
        }
    }

    fn order_url(&self, controller: Controller, order_id: &str) -> String {
        let params = BTreeMap::from([("order_id".to_string(), order_id.to_string())]);
        self.platform.urls.build_platform_url(controller, &params)
    }
}

fn return_order_id(params: &GatewayParams) -> Option<&str> {
    params
        .get("order_id")
        .or_else(|| params.get("orderID"))
        .or_else(|| params.get("Alias_OrderId"))
}
