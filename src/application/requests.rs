//! Hosted Checkout form and FlexCheckout URL builders.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

use crate::config::{Configuration, PaymentMode};
use crate::domain::alias::Alias;
use crate::domain::catalog::PaymentMethod;
use crate::domain::order::Order;
use crate::domain::ports::{Controller, UrlBuilder};
use crate::domain::request::{GatewayParams, ReturnState};
use crate::domain::signature::SIGNATURE_FIELD;
use crate::error::{PaymentError, Result};

/// Platform URLs the gateway sends the customer back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnUrls {
    pub accept: String,
    pub decline: String,
    pub exception: String,
    pub cancel: String,
    pub back: String,
}

impl ReturnUrls {
    pub fn build(urls: &dyn UrlBuilder, order_id: &str, mode: PaymentMode) -> Self {
        let url = |state: ReturnState| {
            let params = BTreeMap::from([
                ("order_id".to_string(), order_id.to_string()),
                ("payment_mode".to_string(), mode.to_string()),
                ("return_state".to_string(), state.to_string()),
            ]);
            urls.build_platform_url(Controller::Success, &params)
        };

        Self {
            accept: url(ReturnState::Accept),
            decline: url(ReturnState::Decline),
            exception: url(ReturnState::Exception),
            cancel: url(ReturnState::Cancel),
            back: url(ReturnState::Back),
        }
    }
}

/// A signed form the customer's browser posts to the Hosted Checkout page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostedCheckoutRequest {
    pub url: String,
    pub fields: GatewayParams,
}

/// Amount in minor units, as the Hosted Checkout page expects it.
pub fn minor_units(amount: Decimal) -> String {
    (amount * Decimal::ONE_HUNDRED).round_dp(0).normalize().to_string()
}

fn yes_no(value: bool) -> &'static str {
    if value { "Y" } else { "N" }
}

pub fn hosted_checkout_request(
    config: &Configuration,
    order: &Order,
    alias: &Alias,
    urls: &ReturnUrls,
) -> HostedCheckoutRequest {
    let billing = &order.billing;
    let method = alias.resolve_payment_method();
    let operation = if config.direct_sales || (!method.is_empty() && !method.two_phase_flow) {
        "SAL"
    } else {
        "RES"
    };

    let mut fields = GatewayParams::new()
        .with("PSPID", config.pspid.as_str())
        .with("ORDERID", order.order_id.as_str())
        .with("AMOUNT", minor_units(order.amount))
        .with("CURRENCY", order.currency.as_str())
        .with("LANGUAGE", config.locale(&order.locale))
        .with("CN", billing.full_name())
        .with("EMAIL", billing.email.as_str())
        .with("OWNERADDRESS", billing.address1.as_str())
        .with("OWNERZIP", billing.postcode.as_str())
        .with("OWNERTOWN", billing.city.as_str())
        .with("OWNERCTY", billing.country_code.as_str())
        .with("OWNERTELNO", billing.phone.as_str())
        .with("ACCEPTURL", urls.accept.as_str())
        .with("DECLINEURL", urls.decline.as_str())
        .with("EXCEPTIONURL", urls.exception.as_str())
        .with("CANCELURL", urls.cancel.as_str())
        .with("BACKURL", urls.back.as_str())
        .with("OPERATION", operation)
        .with("PM", alias.pm.clone().unwrap_or_default())
        .with("BRAND", alias.brand.clone().unwrap_or_default())
        .with("ALIAS", alias.alias.clone().unwrap_or_default())
        .with("ALIASOPERATION", alias.operation.to_string())
        .with("ALIASUSAGE", alias.usage.clone().unwrap_or_default())
        .with("ALIASPERSISTEDAFTERUSE", yes_no(alias.store_permanently))
        .with("TP", config.template_name.clone().unwrap_or_default())
        .with("WIN3DS", "MAINW");

    fields = fields
        .into_inner()
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();
    let signature = config.sha_in_composer().sign(&fields);
    fields.insert(SIGNATURE_FIELD, signature);

    HostedCheckoutRequest {
        url: config.ecommerce_url().to_string(),
        fields,
    }
}

/// Signed FlexCheckout iframe URL for one card payment method.
pub fn flexcheckout_url(
    config: &Configuration,
    order: &Order,
    alias: &Alias,
    method: &PaymentMethod,
    urls: &ReturnUrls,
) -> Result<String> {
    let alias_id = alias.alias.clone().or_else(|| alias.id.clone()).unwrap_or_default();
    let params = GatewayParams::new()
        .with("ACCOUNT.PSPID", config.pspid.as_str())
        .with("ALIAS.ORDERID", order.order_id.as_str())
        .with("ALIAS.ALIASID", alias_id)
        .with("ALIAS.STOREPERMANENTLY", yes_no(alias.store_permanently))
        .with("CARD.PAYMENTMETHOD", method.pm)
        .with("CARD.BRAND", method.brand)
        .with("PARAMETERS.ACCEPTURL", urls.accept.as_str())
        .with("PARAMETERS.EXCEPTIONURL", urls.exception.as_str())
        .with("LAYOUT.TEMPLATENAME", config.template_name.clone().unwrap_or_default())
        .with("LAYOUT.LANGUAGE", config.locale(&order.locale));
    let params: GatewayParams = params
        .into_inner()
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();
    let signature = config.sha_in_composer().sign(&params);

    let mut url = Url::parse(config.flexcheckout_url())
        .map_err(|err| PaymentError::Validation(format!("Invalid FlexCheckout url: {err}")))?;
    url.query_pairs_mut()
        .extend_pairs(params.iter())
        .append_pair("SHASIGNATURE.SHASIGN", &signature);
    Ok(url.to_string())
}
