use chrono::{Datelike, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::bills::{Bill, BillDraft, BillLedger, LineItems};
use crate::errors::Result;
use crate::store::UnitOfWork;
use crate::tenancy::Tenancy;
use crate::types::JobKind;

/// issues one rent bill per tenancy per calendar month
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyRentJob {
    bills: BillLedger,
}

impl MonthlyRentJob {
    pub fn new() -> Self {
        Self {
            bills: BillLedger::new(),
        }
    }

    /// issue this month's rent bill unless it was already issued, the lease
    /// has not started yet, or the contract is over
    pub fn run(
        &self,
        uow: &mut UnitOfWork<'_>,
        tenancy: &Tenancy,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<Bill>> {
        let now = time_provider.now();
        let today = now.date_naive();

        if !tenancy.is_active() || today < tenancy.start_date {
            return Ok(None);
        }
        if tenancy.contract_end_date.map(|end| end < today).unwrap_or(false) {
            debug!(tenancy_id = %tenancy.id, "contract ended, no rent bill");
            return Ok(None);
        }

        if let Some(last) = uow.last_run(JobKind::MonthlyRent, tenancy.id) {
            let last = last.date_naive();
            if last.year() == today.year() && last.month() == today.month() {
                debug!(tenancy_id = %tenancy.id, "rent already issued this month");
                return Ok(None);
            }
        }

        let due_date = due_in_month(today.year(), today.month(), tenancy.start_date.day());
        let draft = BillDraft::new(LineItems::rent_only(tenancy.monthly_rent), due_date)
            .description(format!("rent for {}", due_date.format("%B %Y")));

        let bill = self.bills.issue(uow, tenancy, draft, time_provider)?;
        uow.record_run(JobKind::MonthlyRent, tenancy.id, now);

        info!(tenancy_id = %tenancy.id, bill_id = %bill.id, due_date = %due_date, "monthly rent issued");
        Ok(Some(bill))
    }
}

/// `day` of the given month, clamped to the month's last day
pub fn due_in_month(year: i32, month: u32, day: u32) -> NaiveDate {
    (1..=day.min(31))
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or(NaiveDate::MIN)
}
