use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

use crate::domain::order::Order;
use crate::domain::status::CanonicalStatus;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct LedgerRecord<'a> {
    order_id: &'a str,
    status: CanonicalStatus,
    amount: Decimal,
    captured: Decimal,
    refunded: Decimal,
    cancelled: Decimal,
}

/// Writes the order ledger (`order_id,status,amount,captured,refunded,cancelled`).
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: impl IntoIterator<Item = Order>) -> Result<()> {
        for order in orders {
            self.writer.serialize(LedgerRecord {
                order_id: &order.order_id,
                status: order.status,
                amount: order.amount.normalize(),
                captured: order.captured_amount.normalize(),
                refunded: order.refunded_amount.normalize(),
                cancelled: order.cancelled_amount.normalize(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
