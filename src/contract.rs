use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ContractTerms;
use crate::decimal::{Money, Rate};
use crate::tenancy::Tenancy;

/// how far a single payment may prepay a lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractLimit {
    /// open-ended lease, no cap
    Unbounded,
    Bounded {
        max_months: u32,
        max_payable_amount: Money,
    },
}

impl ContractLimit {
    pub fn max_months(&self) -> Option<u32> {
        match self {
            ContractLimit::Unbounded => None,
            ContractLimit::Bounded { max_months, .. } => Some(*max_months),
        }
    }

    pub fn max_payable_amount(&self) -> Option<Money> {
        match self {
            ContractLimit::Unbounded => None,
            ContractLimit::Bounded {
                max_payable_amount, ..
            } => Some(*max_payable_amount),
        }
    }

    /// most rent a single payment may carry
    pub fn max_rent(&self, monthly_rent: Money) -> Option<Money> {
        self.max_months().map(|months| monthly_rent.times(months))
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, ContractLimit::Bounded { .. })
    }
}

/// calendar months between two dates, ignoring the day of month
pub fn contract_months(start: NaiveDate, end: NaiveDate) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}

/// derives prepayment limits from lease terms
#[derive(Debug, Clone)]
pub struct ContractLimitCalculator {
    deposit_cover_ratio: Rate,
}

impl ContractLimitCalculator {
    pub fn new(deposit_cover_ratio: Rate) -> Self {
        Self {
            deposit_cover_ratio,
        }
    }

    pub fn from_terms(terms: &ContractTerms) -> Self {
        Self::new(terms.deposit_cover_ratio)
    }

    /// limit for a tenancy as of `today`
    pub fn for_tenancy(&self, tenancy: &Tenancy, today: NaiveDate) -> ContractLimit {
        self.calculate(
            tenancy.start_date,
            tenancy.contract_end_date,
            tenancy.monthly_rent,
            tenancy.security_deposit,
            today,
        )
    }

    pub fn calculate(
        &self,
        start_date: NaiveDate,
        contract_end_date: Option<NaiveDate>,
        monthly_rent: Money,
        security_deposit: Money,
        today: NaiveDate,
    ) -> ContractLimit {
        let Some(end_date) = contract_end_date else {
            return ContractLimit::Unbounded;
        };

        let mut months = contract_months(start_date, end_date);

        // final month is treated as paid by the deposit
        if self.deposit_covers_final_month(monthly_rent, security_deposit) {
            months -= 1;
        }

        let mut max_months = months.max(1) as u32;

        // contract over: only the current bill remains payable
        if end_date < today {
            max_months = 1;
        }

        ContractLimit::Bounded {
            max_months,
            max_payable_amount: monthly_rent.times(max_months) + security_deposit,
        }
    }

    fn deposit_covers_final_month(&self, monthly_rent: Money, security_deposit: Money) -> bool {
        security_deposit.is_positive()
            && security_deposit.as_decimal() >= self.deposit_cover_ratio.of(monthly_rent)
    }
}
