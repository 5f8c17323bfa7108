use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{BillingError, Result};
use crate::types::AdvanceMonthPolicy;

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub contract_terms: ContractTerms,
    pub intake: IntakeConfig,
    pub settlement: SettlementConfig,
}

/// how contract limits are derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    /// a deposit at or above this share of one month's rent covers the final month
    pub deposit_cover_ratio: Rate,
}

/// payment intake rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// `None` allows unlimited resubmission after a rejection
    pub max_resubmissions: Option<u32>,
    /// require a reference or artifact for cash claims as well as qr payments
    pub require_proof_for_cash: bool,
}

/// settlement rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub advance_policy: AdvanceMonthPolicy,
}

impl EngineConfig {
    /// standard configuration: whole advance months only, remainder to credit.
    /// 25000 against a 10000 rent bill gives one advance bill and 5000 credit
    pub fn standard() -> Self {
        Self {
            contract_terms: ContractTerms {
                deposit_cover_ratio: Rate::from_decimal(dec!(0.90)),
            },
            intake: IntakeConfig {
                max_resubmissions: None,
                require_proof_for_cash: false,
            },
            settlement: SettlementConfig {
                advance_policy: AdvanceMonthPolicy::WholeMonths,
            },
        }
    }

    /// a partially prepaid trailing month is granted as a full advance month.
    /// 25000 against a 10000 rent bill gives two advance bills and no credit
    pub fn cover_partial_month() -> Self {
        let mut config = Self::standard();
        config.settlement.advance_policy = AdvanceMonthPolicy::CoverPartialMonth;
        config
    }

    /// parse and validate a json configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| BillingError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio = self.contract_terms.deposit_cover_ratio.as_decimal();
        if ratio <= Decimal::ZERO || ratio > Decimal::ONE {
            return Err(BillingError::InvalidConfiguration {
                message: format!("deposit cover ratio must be in (0, 1], got {}", ratio),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}
