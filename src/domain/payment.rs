use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::catalog::normalize_brand;
use crate::domain::request::GatewayParams;
use crate::domain::status::CanonicalStatus;

const SUCCESSFUL_CODES: [u16; 11] = [4, 5, 9, 41, 50, 51, 52, 56, 59, 91, 95];
const CANCELLED_CODES: [u16; 4] = [1, 6, 61, 62];
const WAITING_FOR_IDENTIFICATION: u16 = 46;

/// A gateway transaction response.
///
/// The derived booleans only read the raw fields. `payment_status` is a cache
/// filled in by status resolution and never consulted by them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub order_id: Option<String>,
    pub pay_id: Option<String>,
    pub pay_id_sub: Option<String>,
    pub status: Option<u16>,
    pub brand: Option<String>,
    pub pm: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub nc_error: Option<String>,
    pub nc_error_plus: Option<String>,
    pub nc_error_card_no: Option<String>,
    pub nc_status: Option<String>,
    pub alias: Option<String>,
    pub card_no: Option<String>,
    pub cn: Option<String>,
    pub bin: Option<String>,
    pub ed: Option<String>,
    /// 3-D Secure challenge markup returned by DirectLink.
    pub html_answer: Option<String>,
    pub message: Option<String>,
    pub payment_status: Option<CanonicalStatus>,
}

impl PaymentResult {
    /// Builds a result from a raw gateway payload (return URL or webhook body).
    pub fn from_params(params: &GatewayParams) -> Self {
        Self {
            order_id: params.get_string("orderID"),
            pay_id: params.get_string("PAYID"),
            pay_id_sub: params.get_string("PAYIDSUB"),
            status: params.get("STATUS").and_then(|status| status.parse().ok()),
            brand: params.get("BRAND").map(|brand| normalize_brand(brand).to_string()),
            pm: params.get_string("PM"),
            amount: params.get("amount").and_then(|amount| Decimal::from_str(amount).ok()),
            currency: params.get_string("currency"),
            nc_error: params.get_string("NCERROR"),
            nc_error_plus: params.get_string("NCERRORPLUS"),
            nc_error_card_no: params.get_string("NCERRORCARDNO"),
            nc_status: params.get_string("NCSTATUS"),
            alias: params.get_string("ALIAS"),
            card_no: params.get_string("CARDNO"),
            cn: params.get_string("CN"),
            bin: params.get_string("BIN"),
            ed: params.get_string("ED"),
            html_answer: params.get_string("HTML_ANSWER"),
            message: None,
            payment_status: None,
        }
    }

    /// Pseudo-payment used when the customer backs out of the hosted page.
    pub fn cancelled_by_customer(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            status: Some(crate::domain::status::STATUS_CANCELLED_BY_CUSTOMER),
            ..Self::default()
        }
    }

    pub fn is_payment_successful(&self) -> bool {
        self.status
            .is_some_and(|status| SUCCESSFUL_CODES.contains(&status))
    }

    pub fn is_payment_cancelled(&self) -> bool {
        self.status
            .is_some_and(|status| CANCELLED_CODES.contains(&status))
    }

    /// True when the gateway accepted the request itself, whatever the payment outcome.
    pub fn is_transaction_successful(&self) -> bool {
        let accepted = self.status.is_some_and(|status| status != 0);
        let no_error = self
            .nc_error
            .as_deref()
            .is_none_or(|error| error.is_empty() || error == "0");
        accepted && no_error
    }

    pub fn is_security_check_required(&self) -> bool {
        self.status == Some(WAITING_FOR_IDENTIFICATION)
            && self
                .html_answer
                .as_deref()
                .is_some_and(|html| !html.trim().is_empty())
    }

    pub fn error_code(&self) -> &str {
        self.nc_error.as_deref().unwrap_or_default()
    }

    pub fn error_message(&self) -> &str {
        self.nc_error_plus.as_deref().unwrap_or_default()
    }

    pub fn brand(&self) -> &str {
        self.brand.as_deref().unwrap_or_default()
    }
}
