use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

use crate::domain::order::Order;
use crate::domain::status::CanonicalStatus;
use crate::error::{PaymentError, Result};

#[derive(Debug, Deserialize)]
struct OrderRecord {
    order_id: String,
    amount: Decimal,
    currency: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    status: Option<CanonicalStatus>,
    #[serde(default)]
    pay_id: Option<String>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        let mut order = Order::new(record.order_id, record.amount, record.currency);
        order.customer_id = record.customer_id.filter(|id| !id.is_empty());
        order.payment_method = record.payment_method.filter(|code| !code.is_empty());
        order.pay_id = record.pay_id.filter(|id| !id.is_empty());
        if let Some(status) = record.status {
            order.status = status;
        }
        order
    }
}

/// Reads the orders a replay starts from.
///
/// Columns: `order_id, amount, currency[, customer_id, payment_method, status, pay_id]`.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn orders(self) -> impl Iterator<Item = Result<Order>> {
        self.reader
            .into_deserialize::<OrderRecord>()
            .map(|record| record.map(Order::from).map_err(PaymentError::from))
    }
}
