//! Customer and merchant facing message texts.

use crate::domain::payment::PaymentResult;
use crate::domain::status::CanonicalStatus;

pub const PAYMENT_CANCELLED: &str = "The payment has been cancelled.";
pub const ALIAS_NONE: &str = "No stored payment method was found.";
pub const ACCESS_DENIED: &str = "This stored payment method does not belong to you.";

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|value| !value.is_empty()).unwrap_or("-")
}

/// Error shown at checkout, embedding the identifiers support needs.
pub fn checkout_error(payment: &PaymentResult) -> String {
    let status = payment
        .status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Your payment could not be processed. Payment ID: {}. Status: {}. Code: {}. Message: {}",
        or_dash(payment.pay_id.as_deref()),
        status,
        or_dash(payment.nc_error.as_deref()),
        or_dash(payment.nc_error_plus.as_deref()),
    )
}

/// Order history note attached to every status update.
pub fn payment_info(status: CanonicalStatus, payment: &PaymentResult) -> String {
    format!(
        "Payment info: status {}, status code {}, pay id {}",
        status,
        payment
            .status
            .map(|status| status.to_string())
            .unwrap_or_default(),
        or_dash(payment.pay_id.as_deref()),
    )
}

pub fn payment_error(payment: &PaymentResult) -> String {
    format!(
        "An error occurred during the payment. Status code: {}. Error: {} {}",
        payment
            .status
            .map(|status| status.to_string())
            .unwrap_or_default(),
        or_dash(payment.nc_error.as_deref()),
        payment.error_message(),
    )
    .trim_end()
    .to_string()
}
