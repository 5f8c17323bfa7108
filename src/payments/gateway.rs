use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::decimal::Money;
use crate::errors::BillingError;
use crate::types::{BillId, UserId};

/// charge instruction handed to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub bill_id: BillId,
    pub tenant_id: UserId,
    pub amount: Money,
    /// stable per bill attempt, lets the gateway dedupe retries
    pub idempotency_key: String,
}

/// a successful charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayCharge {
    pub transaction_id: String,
    pub amount: Money,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("charge declined: {reason}")]
    Declined { reason: String },

    #[error("gateway unavailable: {message}")]
    Unavailable { message: String },
}

impl From<GatewayError> for BillingError {
    fn from(e: GatewayError) -> Self {
        BillingError::Gateway {
            message: e.to_string(),
        }
    }
}

/// external payment gateway. a repeated idempotency key returns the
/// original charge instead of charging again
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError>;
}

/// in-process gateway that approves charges with sequential transaction ids
#[derive(Debug, Default)]
pub struct SandboxGateway {
    inner: Mutex<SandboxState>,
}

#[derive(Debug, Default)]
struct SandboxState {
    charges: Vec<ChargeRequest>,
    by_key: HashMap<String, GatewayCharge>,
    decline_reason: Option<String>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// a gateway that declines every charge
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(SandboxState {
                decline_reason: Some(reason.into()),
                ..SandboxState::default()
            }),
        }
    }

    /// distinct charges made, retries excluded
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.inner
            .lock()
            .map(|state| state.charges.clone())
            .unwrap_or_default()
    }
}

impl PaymentGateway for SandboxGateway {
    fn charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let mut state = self.inner.lock().map_err(|_| GatewayError::Unavailable {
            message: "sandbox lock poisoned".to_string(),
        })?;

        if let Some(reason) = &state.decline_reason {
            return Err(GatewayError::Declined {
                reason: reason.clone(),
            });
        }

        if let Some(existing) = state.by_key.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        state.charges.push(request.clone());
        let charge = GatewayCharge {
            transaction_id: format!("sandbox_{}", state.charges.len()),
            amount: request.amount,
        };
        state
            .by_key
            .insert(request.idempotency_key.clone(), charge.clone());
        Ok(charge)
    }
}
