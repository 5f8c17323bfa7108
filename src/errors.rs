use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("invalid state: {current}, cannot {attempted}")]
    InvalidState {
        current: String,
        attempted: String,
    },

    #[error("partial payment refused: minimum {minimum}, provided {provided}")]
    BelowMinimum {
        minimum: Money,
        provided: Money,
    },

    #[error("payment exceeds remaining contract: limit {limit}, requested {requested}")]
    ExceedsContract {
        limit: Money,
        requested: Money,
    },

    #[error("qr payment requires a reference number or proof artifact")]
    MissingProof,

    #[error("insufficient credit: available {available}, required {required}")]
    InsufficientCredit {
        available: Money,
        required: Money,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("gateway charge failed: {message}")]
    Gateway {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl BillingError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(current: impl ToString, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.to_string(),
            attempted: attempted.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
