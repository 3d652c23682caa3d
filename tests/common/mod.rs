#![allow(dead_code)]

use ogone_flow::application::engine::PaymentEngine;
use ogone_flow::config::Configuration;
use ogone_flow::domain::order::Order;
use ogone_flow::domain::ports::Collaborators;
use ogone_flow::domain::request::GatewayParams;
use ogone_flow::domain::signature::SIGNATURE_FIELD;
use ogone_flow::infrastructure::in_memory::InMemoryPlatform;
use ogone_flow::infrastructure::scripted_gateway::ScriptedGateway;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const ORDER_ID: &str = "100";
pub const CUSTOMER_ID: &str = "C1";

pub struct Harness {
    pub engine: PaymentEngine,
    pub platform: Arc<InMemoryPlatform>,
    pub gateway: Arc<ScriptedGateway>,
}

pub fn config() -> Configuration {
    Configuration {
        pspid: "shop".into(),
        sha_in: "in-secret".into(),
        sha_out: "out-secret".into(),
        ..Configuration::default()
    }
}

pub fn order() -> Order {
    let mut order = Order::new(ORDER_ID, dec!(1000), "EUR");
    order.customer_id = Some(CUSTOMER_ID.into());
    order
}

pub async fn harness_with(config: Configuration, order: Order) -> Harness {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.insert_order(order).await;
    let gateway = Arc::new(ScriptedGateway::new());
    let engine = PaymentEngine::new(
        config,
        Collaborators::from_platform(platform.clone()),
        gateway.clone(),
    );
    Harness {
        engine,
        platform,
        gateway,
    }
}

pub async fn harness() -> Harness {
    harness_with(config(), order()).await
}

/// Signs the payload with the SHA-OUT passphrase, as the gateway does.
pub fn signed(config: &Configuration, params: GatewayParams) -> GatewayParams {
    let signature = config.sha_out_composer().sign(&params);
    params.with(SIGNATURE_FIELD, signature)
}

pub fn feedback(status: u16, brand: &str, amount: Decimal) -> GatewayParams {
    GatewayParams::new()
        .with("orderID", ORDER_ID)
        .with("PAYID", "3000")
        .with("STATUS", status.to_string())
        .with("BRAND", brand)
        .with("amount", amount.to_string())
        .with("currency", "EUR")
}
