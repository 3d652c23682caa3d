use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::alias::Alias;
use crate::domain::order::{Operation, Order};
use crate::domain::payment::PaymentResult;
use crate::domain::ports::Gateway;
use crate::error::{PaymentError, Result};

/// A maintenance request the gateway received.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceCall {
    pub operation: Operation,
    pub order_id: String,
    pub pay_id: String,
    pub amount: Decimal,
    pub is_partially: bool,
}

#[derive(Default)]
struct GatewayState {
    statuses: HashMap<String, PaymentResult>,
    maintenance_codes: HashMap<Operation, u16>,
    maintenance_failure: Option<(String, String)>,
    direct_link: Option<PaymentResult>,
    calls: Vec<MaintenanceCall>,
    direct_link_aliases: Vec<Alias>,
}

/// Gateway transport answering from scripted responses.
///
/// Status queries return the last result registered for the order. Maintenance
/// calls echo the requested amount with the status code configured for the
/// operation (void 6, capture 9, refund 8 unless overridden).
#[derive(Default, Clone)]
pub struct ScriptedGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, order_id: &str, result: PaymentResult) {
        let mut state = self.state.write().await;
        state.statuses.insert(order_id.to_string(), result);
    }

    pub async fn set_maintenance_status(&self, operation: Operation, code: u16) {
        let mut state = self.state.write().await;
        state.maintenance_codes.insert(operation, code);
    }

    /// Makes every following maintenance call come back rejected.
    pub async fn fail_maintenance(&self, code: &str, message: &str) {
        let mut state = self.state.write().await;
        state.maintenance_failure = Some((code.to_string(), message.to_string()));
    }

    pub async fn set_direct_link_result(&self, result: PaymentResult) {
        self.state.write().await.direct_link = Some(result);
    }

    pub async fn calls(&self) -> Vec<MaintenanceCall> {
        self.state.read().await.calls.clone()
    }

    /// Aliases DirectLink payments were executed with.
    pub async fn direct_link_aliases(&self) -> Vec<Alias> {
        self.state.read().await.direct_link_aliases.clone()
    }

    async fn maintenance(
        &self,
        operation: Operation,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult> {
        let mut state = self.state.write().await;
        state.calls.push(MaintenanceCall {
            operation,
            order_id: order_id.to_string(),
            pay_id: pay_id.to_string(),
            amount,
            is_partially,
        });
        debug!(order_id, pay_id, %operation, %amount, is_partially, "Scripted maintenance call");

        let brand = state
            .statuses
            .get(order_id)
            .and_then(|result| result.brand.clone());
        let mut result = PaymentResult {
            order_id: Some(order_id.to_string()),
            pay_id: Some(pay_id.to_string()),
            brand,
            amount: Some(amount),
            ..PaymentResult::default()
        };

        if let Some((code, message)) = &state.maintenance_failure {
            result.status = Some(0);
            result.nc_error = Some(code.clone());
            result.nc_error_plus = Some(message.clone());
            return Ok(result);
        }

        let default_code = match operation {
            Operation::Cancel => 6,
            Operation::Capture => 9,
            Operation::Refund => 8,
        };
        result.status = Some(
            state
                .maintenance_codes
                .get(&operation)
                .copied()
                .unwrap_or(default_code),
        );
        Ok(result)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn status(
        &self,
        order_id: &str,
        _pay_id: Option<&str>,
        _pay_id_sub: Option<&str>,
    ) -> Result<PaymentResult> {
        let state = self.state.read().await;
        state
            .statuses
            .get(order_id)
            .cloned()
            .ok_or_else(|| {
                PaymentError::Transport(format!("no status available for order {order_id}"))
            })
    }

    async fn void(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Cancel, order_id, pay_id, amount, is_partially)
            .await
    }

    async fn capture(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Capture, order_id, pay_id, amount, is_partially)
            .await
    }

    async fn refund(
        &self,
        order_id: &str,
        pay_id: &str,
        amount: Decimal,
        is_partially: bool,
    ) -> Result<PaymentResult> {
        self.maintenance(Operation::Refund, order_id, pay_id, amount, is_partially)
            .await
    }

    async fn direct_link_payment(&self, order: &Order, alias: &Alias) -> Result<PaymentResult> {
        let mut state = self.state.write().await;
        state.direct_link_aliases.push(alias.clone());
        let mut result = state.direct_link.clone().ok_or_else(|| {
            PaymentError::Transport("no DirectLink response scripted".to_string())
        })?;
        result.order_id = Some(order.order_id.clone());
        if result.amount.is_none() {
            result.amount = Some(order.amount);
        }
        Ok(result)
    }
}
