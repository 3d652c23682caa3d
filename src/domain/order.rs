use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::catalog::{OrderField, PaymentMethod};
use crate::domain::status::CanonicalStatus;

const MAX_ADDRESS_LINE: usize = 35;

/// Maintenance operations an order can go through after authorisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Cancel,
    Capture,
    Refund,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub address2: String,
    pub street_number: String,
    pub city: String,
    pub postcode: String,
    pub country_code: String,
    pub phone: String,
    pub email: String,
}

impl Address {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Collapses whitespace in line 1 and moves anything past 35 characters to line 2.
    pub fn normalize(&mut self) {
        let line1 = self.address1.split_whitespace().collect::<Vec<_>>().join(" ");
        if line1.chars().count() <= MAX_ADDRESS_LINE {
            self.address1 = line1;
            return;
        }

        let head: String = line1.chars().take(MAX_ADDRESS_LINE).collect();
        let overflow: String = line1.chars().skip(MAX_ADDRESS_LINE).collect();
        let line2 = format!("{} {}", overflow.trim(), self.address2.trim());

        self.address1 = head;
        self.address2 = line2.trim().chars().take(MAX_ADDRESS_LINE).collect();
    }
}

/// Read projection of a platform order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub pay_id: Option<String>,
    pub customer_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: CanonicalStatus,
    pub created_at: DateTime<Utc>,
    pub captured_amount: Decimal,
    pub refunded_amount: Decimal,
    pub cancelled_amount: Decimal,
    pub billing: Address,
    pub shipping: Address,
    pub locale: String,
    pub payment_method: Option<String>,
    pub customer_dob: Option<NaiveDate>,
    pub customer_gender: Option<String>,
}

impl Order {
    pub fn new(order_id: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            pay_id: None,
            customer_id: None,
            amount,
            currency: currency.into(),
            status: CanonicalStatus::Pending,
            created_at: Utc::now(),
            captured_amount: Decimal::ZERO,
            refunded_amount: Decimal::ZERO,
            cancelled_amount: Decimal::ZERO,
            billing: Address::default(),
            shipping: Address::default(),
            locale: "en_US".to_string(),
            payment_method: None,
            customer_dob: None,
            customer_gender: None,
        }
    }

    pub fn available_for(&self, operation: Operation) -> Decimal {
        let used = match operation {
            Operation::Capture => self.captured_amount,
            Operation::Refund => self.refunded_amount,
            Operation::Cancel => self.cancelled_amount,
        };
        (self.amount - used).max(Decimal::ZERO)
    }

    pub fn normalize_addresses(&mut self) {
        self.billing.normalize();
        self.shipping.normalize();
    }

    /// Expected order fields the given method needs but the order leaves empty.
    pub fn missing_fields(&self, method: &PaymentMethod) -> Vec<OrderField> {
        method
            .expected_fields
            .iter()
            .copied()
            .filter(|field| self.is_field_empty(*field))
            .collect()
    }

    fn is_field_empty(&self, field: OrderField) -> bool {
        let billing = &self.billing;
        let value = match field {
            OrderField::BillingFirstName => &billing.first_name,
            OrderField::BillingLastName => &billing.last_name,
            OrderField::BillingAddress1 => &billing.address1,
            OrderField::BillingStreetNumber => &billing.street_number,
            OrderField::BillingCity => &billing.city,
            OrderField::BillingPostcode => &billing.postcode,
            OrderField::BillingCountryCode => &billing.country_code,
            OrderField::BillingPhone => &billing.phone,
            OrderField::BillingEmail => &billing.email,
            OrderField::CustomerDob => return self.customer_dob.is_none(),
            OrderField::CustomerGender => {
                return self
                    .customer_gender
                    .as_deref()
                    .is_none_or(|gender| gender.trim().is_empty());
            }
        };
        value.trim().is_empty()
    }
}

/// Truncates a requested amount to two decimals (no rounding up).
pub fn truncate_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}
