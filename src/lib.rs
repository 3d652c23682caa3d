//! Payment orchestration for the Ingenico/Ogone gateway family.
//!
//! Maps gateway status codes to canonical order states, manages stored payment
//! aliases and drives the redirect, inline and alias payment flows together
//! with their return-URL and webhook handling.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
