//! Application layer containing the payment orchestration.
//!
//! `PaymentEngine` is defined in `engine`; the other modules extend it with the
//! checkout flows, return and webhook handling, maintenance operations and the
//! reminder cron.

pub mod checkout;
pub mod engine;
pub mod messages;
pub mod reconciliation;
pub mod reminders;
pub mod requests;
pub mod resolver;
pub mod returns;
pub mod webhook;
