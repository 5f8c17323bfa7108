use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::debug;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::store::UnitOfWork;
use crate::tenancy::Tenancy;
use crate::types::{BillId, BillStatus, PaymentId, PaymentMethod, PaymentProof, TenancyId};

use super::{Bill, BillDraft, BillTransition, LineItems};

/// issues bills and owns every bill status write
#[derive(Debug, Clone, Copy, Default)]
pub struct BillLedger;

impl BillLedger {
    pub fn new() -> Self {
        BillLedger
    }

    /// issue a new pending bill against an active tenancy
    pub fn issue(
        &self,
        uow: &mut UnitOfWork<'_>,
        tenancy: &Tenancy,
        draft: BillDraft,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        if !tenancy.is_active() {
            return Err(BillingError::invalid_state("tenancy has ended", "issue bill"));
        }

        draft.line_items.validate()?;
        let due_date = draft
            .due_date
            .ok_or_else(|| BillingError::validation("due date required"))?;

        let now = time_provider.now();
        let bill = Bill {
            id: Uuid::new_v4(),
            tenancy_id: tenancy.id,
            tenant_id: tenancy.tenant_id,
            landlord_id: tenancy.landlord_id,
            line_items: draft.line_items,
            amount_paid: Money::ZERO,
            credit_applied: Money::ZERO,
            advance_amount: Money::ZERO,
            months_covered: 0,
            payment_method: None,
            proof: PaymentProof::none(),
            gateway_transaction_id: None,
            resubmission_count: 0,
            due_date,
            description: draft.description,
            receipt_artifact: draft.receipt_artifact,
            is_advance_payment: false,
            payment_id: None,
            status: BillStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        uow.emit(Event::BillIssued {
            bill_id: bill.id,
            tenancy_id: bill.tenancy_id,
            tenant_id: bill.tenant_id,
            amount: bill.total(),
            due_date,
            timestamp: now,
        });
        uow.put_bill(bill.clone());

        Ok(bill)
    }

    /// replace the line items (and optionally the due date) of a pending bill
    pub fn edit(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        line_items: LineItems,
        due_date: Option<NaiveDate>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let mut bill = uow.bill(bill_id)?;
        if bill.status != BillStatus::Pending {
            return Err(BillingError::invalid_state(bill.status, "edit bill"));
        }

        line_items.validate()?;

        let old_amount = bill.total();
        bill.line_items = line_items;
        if let Some(due_date) = due_date {
            bill.due_date = due_date;
        }
        bill.updated_at = time_provider.now();

        uow.emit(Event::BillEdited {
            bill_id: bill.id,
            tenant_id: bill.tenant_id,
            old_amount,
            new_amount: bill.total(),
            timestamp: bill.updated_at,
        });
        uow.put_bill(bill.clone());

        Ok(bill)
    }

    /// withdraw a pending bill
    pub fn cancel(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let mut bill = uow.bill(bill_id)?;
        self.transition(uow, &mut bill, BillTransition::Cancel, time_provider)?;

        uow.emit(Event::BillCancelled {
            bill_id: bill.id,
            tenant_id: bill.tenant_id,
            amount: bill.total(),
            timestamp: bill.updated_at,
        });
        uow.put_bill(bill.clone());

        Ok(bill)
    }

    pub fn get(&self, uow: &UnitOfWork<'_>, bill_id: BillId) -> Result<Bill> {
        uow.bill(bill_id)
    }

    pub fn list_for_tenancy(&self, uow: &UnitOfWork<'_>, tenancy_id: TenancyId) -> Vec<Bill> {
        uow.bills_for_tenancy(tenancy_id)
    }

    /// move `bill` along the status table. the caller stages the bill
    pub fn transition(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill: &mut Bill,
        transition: BillTransition,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let old_status = bill.status;
        let new_status = old_status.transition(transition)?;
        let now = time_provider.now();

        bill.status = new_status;
        bill.updated_at = now;

        debug!(bill_id = %bill.id, from = %old_status, to = %new_status, "bill status changed");
        uow.emit(Event::StatusChanged {
            bill_id: bill.id,
            old_status,
            new_status,
            timestamp: now,
        });

        Ok(())
    }

    /// create up to `months` paid rent-only bills in the calendar months after
    /// `parent`, never due after `contract_end_date`
    pub fn create_advance_bills(
        &self,
        uow: &mut UnitOfWork<'_>,
        parent: &Bill,
        advance: AdvanceBills,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Bill>> {
        let now = time_provider.now();
        let mut created = Vec::new();

        for offset in 1..=advance.months {
            let due_date = parent
                .due_date
                .checked_add_months(Months::new(offset))
                .ok_or_else(|| BillingError::validation("advance due date out of range"))?;

            if let Some(end) = advance.contract_end_date {
                if due_date > end {
                    break;
                }
            }

            let bill = Bill {
                id: Uuid::new_v4(),
                tenancy_id: parent.tenancy_id,
                tenant_id: parent.tenant_id,
                landlord_id: parent.landlord_id,
                line_items: LineItems::rent_only(advance.monthly_rent),
                amount_paid: advance.monthly_rent,
                credit_applied: Money::ZERO,
                advance_amount: Money::ZERO,
                months_covered: 1,
                payment_method: Some(advance.method),
                proof: PaymentProof::none(),
                gateway_transaction_id: None,
                resubmission_count: 0,
                due_date,
                description: Some(format!("advance rent for {}", due_date.format("%B %Y"))),
                receipt_artifact: None,
                is_advance_payment: true,
                payment_id: Some(advance.payment_id),
                status: BillStatus::Paid,
                created_at: now,
                updated_at: now,
            };

            uow.emit(Event::AdvanceBillCreated {
                bill_id: bill.id,
                parent_bill_id: parent.id,
                due_date,
                amount: advance.monthly_rent,
            });
            uow.put_bill(bill.clone());
            created.push(bill);
        }

        Ok(created)
    }
}

/// parameters for spreading an advance over future months
#[derive(Debug, Clone, Copy)]
pub struct AdvanceBills {
    pub months: u32,
    pub monthly_rent: Money,
    pub contract_end_date: Option<NaiveDate>,
    pub payment_id: PaymentId,
    pub method: PaymentMethod,
}
