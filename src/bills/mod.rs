pub mod ledger;
pub mod status;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{
    ArtifactRef, BillId, BillStatus, PaymentId, PaymentMethod, PaymentProof, TenancyId, UserId,
};

pub use ledger::{AdvanceBills, BillLedger};
pub use status::BillTransition;

/// the monetary lines a bill may carry; absent lines count as zero
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItems {
    pub rent: Option<Money>,
    pub security_deposit: Option<Money>,
    pub water: Option<Money>,
    pub electrical: Option<Money>,
    pub wifi: Option<Money>,
    pub other: Option<Money>,
}

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rent_only(amount: Money) -> Self {
        Self::new().with_rent(amount)
    }

    pub fn with_rent(mut self, amount: Money) -> Self {
        self.rent = Some(amount);
        self
    }

    pub fn with_security_deposit(mut self, amount: Money) -> Self {
        self.security_deposit = Some(amount);
        self
    }

    pub fn with_water(mut self, amount: Money) -> Self {
        self.water = Some(amount);
        self
    }

    pub fn with_electrical(mut self, amount: Money) -> Self {
        self.electrical = Some(amount);
        self
    }

    pub fn with_wifi(mut self, amount: Money) -> Self {
        self.wifi = Some(amount);
        self
    }

    pub fn with_other(mut self, amount: Money) -> Self {
        self.other = Some(amount);
        self
    }

    fn lines(&self) -> [(&'static str, Option<Money>); 6] {
        [
            ("rent", self.rent),
            ("security_deposit", self.security_deposit),
            ("water", self.water),
            ("electrical", self.electrical),
            ("wifi", self.wifi),
            ("other", self.other),
        ]
    }

    /// sum of every present line
    pub fn total(&self) -> Money {
        self.lines().iter().filter_map(|(_, amount)| *amount).sum()
    }

    pub fn rent_amount(&self) -> Money {
        self.rent.unwrap_or(Money::ZERO)
    }

    /// everything except rent; these never span more than one month
    pub fn one_time_charges(&self) -> Money {
        self.total() - self.rent_amount()
    }

    /// water, electrical, wifi and other
    pub fn utility_charges(&self) -> Money {
        self.one_time_charges() - self.security_deposit.unwrap_or(Money::ZERO)
    }

    pub fn has_rent(&self) -> bool {
        self.rent_amount().is_positive()
    }

    /// at least one positive line, none negative, all in whole cents
    pub fn validate(&self) -> Result<()> {
        for (name, amount) in self.lines() {
            if let Some(amount) = amount {
                if amount.is_negative() {
                    return Err(BillingError::validation(format!("{} cannot be negative", name)));
                }
                if !amount.is_whole_cents() {
                    return Err(BillingError::validation(format!(
                        "{} has fractions of a cent",
                        name
                    )));
                }
            }
        }

        if !self.lines().iter().any(|(_, amount)| amount.map(|a| a.is_positive()).unwrap_or(false)) {
            return Err(BillingError::validation("bill needs at least one positive line item"));
        }

        Ok(())
    }
}

/// what a landlord supplies when issuing a bill
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BillDraft {
    pub line_items: LineItems,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub receipt_artifact: Option<ArtifactRef>,
}

impl BillDraft {
    pub fn new(line_items: LineItems, due_date: NaiveDate) -> Self {
        Self {
            line_items,
            due_date: Some(due_date),
            description: None,
            receipt_artifact: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn receipt(mut self, artifact: ArtifactRef) -> Self {
        self.receipt_artifact = Some(artifact);
        self
    }
}

/// a payment request owed by a tenant for one tenancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub tenancy_id: TenancyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    pub line_items: LineItems,

    // staged by intake
    pub amount_paid: Money,
    pub credit_applied: Money,
    pub advance_amount: Money,
    pub months_covered: u32,
    pub payment_method: Option<PaymentMethod>,
    pub proof: PaymentProof,
    pub gateway_transaction_id: Option<String>,
    pub resubmission_count: u32,

    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_artifact: Option<ArtifactRef>,
    pub is_advance_payment: bool,
    pub payment_id: Option<PaymentId>,

    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// amount owed, from line items only
    pub fn total(&self) -> Money {
        self.line_items.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_sums_present_lines() {
        let items = LineItems::new()
            .with_rent(Money::from_major(10_000))
            .with_water(Money::from_decimal(dec!(350.50)))
            .with_wifi(Money::from_major(999));
        assert_eq!(items.total(), Money::from_decimal(dec!(11349.50)));
        assert_eq!(items.one_time_charges(), Money::from_decimal(dec!(1349.50)));
        assert_eq!(items.utility_charges(), Money::from_decimal(dec!(1349.50)));
    }

    #[test]
    fn test_zero_water_never_changes_total() {
        let items = LineItems::rent_only(Money::from_major(7_500));
        let with_zero = items.clone().with_water(Money::ZERO);
        assert_eq!(items.total(), with_zero.total());
        assert_eq!(LineItems::new().total(), Money::ZERO);
    }

    #[test]
    fn test_deposit_is_one_time_not_utility() {
        let items = LineItems::rent_only(Money::from_major(10_000))
            .with_security_deposit(Money::from_major(10_000))
            .with_electrical(Money::from_major(400));
        assert_eq!(items.one_time_charges(), Money::from_major(10_400));
        assert_eq!(items.utility_charges(), Money::from_major(400));
        assert!(items.has_rent());
    }

    #[test]
    fn test_validation() {
        assert!(LineItems::new().validate().is_err());
        assert!(LineItems::new().with_water(Money::ZERO).validate().is_err());
        assert!(LineItems::new().with_other(Money::from_major(-5)).validate().is_err());
        assert!(LineItems::new()
            .with_other(Money::from_major(5))
            .with_water(Money::from_major(-1))
            .validate()
            .is_err());
        assert!(LineItems::new().with_wifi(Money::from_major(500)).validate().is_ok());
    }
}
