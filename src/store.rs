use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::bills::Bill;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::{Event, EventStore};
use crate::payments::Payment;
use crate::types::{BillId, CreditKey, JobKind, TenancyId};

/// committed ledger contents
#[derive(Debug, Default, Clone)]
pub struct LedgerState {
    bills: HashMap<BillId, Bill>,
    payments: Vec<Payment>,
    payment_by_bill: HashMap<BillId, usize>,
    credits: HashMap<CreditKey, Money>,
    gateway_index: HashMap<String, BillId>,
    job_runs: HashMap<(JobKind, TenancyId), DateTime<Utc>>,
    audit_log: Vec<Event>,
}

impl LedgerState {
    pub fn bill(&self, bill_id: BillId) -> Option<&Bill> {
        self.bills.get(&bill_id)
    }

    pub fn bills(&self) -> impl Iterator<Item = &Bill> {
        self.bills.values()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment_for_bill(&self, bill_id: BillId) -> Option<&Payment> {
        self.payment_by_bill
            .get(&bill_id)
            .and_then(|idx| self.payments.get(*idx))
    }

    pub fn credit(&self, key: &CreditKey) -> Option<Money> {
        self.credits.get(key).copied()
    }

    pub fn audit_log(&self) -> &[Event] {
        &self.audit_log
    }

    fn apply(&mut self, changes: Changes) {
        self.bills.extend(changes.bills);
        for payment in changes.payments {
            self.payment_by_bill.insert(payment.bill_id, self.payments.len());
            self.payments.push(payment);
        }
        self.credits.extend(changes.credits);
        self.gateway_index.extend(changes.gateway_index);
        self.job_runs.extend(changes.job_runs);
        self.audit_log.extend(changes.events.iter().cloned());
    }
}

/// staged writes of one unit of work
#[derive(Debug, Default)]
struct Changes {
    bills: HashMap<BillId, Bill>,
    payments: Vec<Payment>,
    credits: HashMap<CreditKey, Money>,
    gateway_index: HashMap<String, BillId>,
    job_runs: HashMap<(JobKind, TenancyId), DateTime<Utc>>,
    events: Vec<Event>,
}

/// read-through overlay over the committed state
pub struct UnitOfWork<'a> {
    base: &'a LedgerState,
    bills: HashMap<BillId, Bill>,
    payments: Vec<Payment>,
    credits: HashMap<CreditKey, Money>,
    gateway_index: HashMap<String, BillId>,
    job_runs: HashMap<(JobKind, TenancyId), DateTime<Utc>>,
    events: EventStore,
}

impl<'a> UnitOfWork<'a> {
    fn new(base: &'a LedgerState) -> Self {
        Self {
            base,
            bills: HashMap::new(),
            payments: Vec::new(),
            credits: HashMap::new(),
            gateway_index: HashMap::new(),
            job_runs: HashMap::new(),
            events: EventStore::new(),
        }
    }

    pub fn bill(&self, bill_id: BillId) -> Result<Bill> {
        self.bills
            .get(&bill_id)
            .or_else(|| self.base.bill(bill_id))
            .cloned()
            .ok_or_else(|| BillingError::not_found("bill", bill_id))
    }

    /// stage a bill write (insert or update)
    pub fn put_bill(&mut self, bill: Bill) {
        self.bills.insert(bill.id, bill);
    }

    pub fn bills_for_tenancy(&self, tenancy_id: TenancyId) -> Vec<Bill> {
        let mut merged: HashMap<BillId, &Bill> = self
            .base
            .bills()
            .filter(|b| b.tenancy_id == tenancy_id)
            .map(|b| (b.id, b))
            .collect();
        for bill in self.bills.values().filter(|b| b.tenancy_id == tenancy_id) {
            merged.insert(bill.id, bill);
        }
        let mut bills: Vec<Bill> = merged.into_values().cloned().collect();
        bills.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.created_at.cmp(&b.created_at)));
        bills
    }

    pub fn payment_for_bill(&self, bill_id: BillId) -> Option<Payment> {
        self.payments
            .iter()
            .find(|p| p.bill_id == bill_id)
            .or_else(|| self.base.payment_for_bill(bill_id))
            .cloned()
    }

    /// append a settlement record; a bill never gets two
    pub fn append_payment(&mut self, payment: Payment) -> Result<()> {
        if let Some(existing) = self.payment_for_bill(payment.bill_id) {
            return Err(BillingError::Storage {
                message: format!(
                    "bill {} already has payment {}",
                    payment.bill_id, existing.id
                ),
            });
        }
        self.payments.push(payment);
        Ok(())
    }

    pub fn credit(&self, key: &CreditKey) -> Option<Money> {
        self.credits.get(key).copied().or_else(|| self.base.credit(key))
    }

    pub fn set_credit(&mut self, key: CreditKey, balance: Money) -> Result<()> {
        if balance.is_negative() {
            return Err(BillingError::Storage {
                message: format!("credit balance cannot go negative: {}", balance),
            });
        }
        self.credits.insert(key, balance);
        Ok(())
    }

    pub fn gateway_bill(&self, transaction_id: &str) -> Option<BillId> {
        self.gateway_index
            .get(transaction_id)
            .or_else(|| self.base.gateway_index.get(transaction_id))
            .copied()
    }

    pub fn bind_gateway_transaction(&mut self, transaction_id: &str, bill_id: BillId) {
        self.gateway_index.insert(transaction_id.to_string(), bill_id);
    }

    pub fn last_run(&self, job: JobKind, tenancy_id: TenancyId) -> Option<DateTime<Utc>> {
        self.job_runs
            .get(&(job, tenancy_id))
            .or_else(|| self.base.job_runs.get(&(job, tenancy_id)))
            .copied()
    }

    pub fn record_run(&mut self, job: JobKind, tenancy_id: TenancyId, at: DateTime<Utc>) {
        self.job_runs.insert((job, tenancy_id), at);
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }

    fn into_changes(mut self) -> Changes {
        Changes {
            bills: self.bills,
            payments: self.payments,
            credits: self.credits,
            gateway_index: self.gateway_index,
            job_runs: self.job_runs,
            events: self.events.take_events(),
        }
    }
}

/// the ledger behind a single lock. staged writes of a unit of work are
/// applied only when it returns `Ok`
#[derive(Debug, Default)]
pub struct LedgerStore {
    state: Mutex<LedgerState>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `work` atomically; staged writes commit only on `Ok`.
    /// returns the value and the events the unit emitted
    pub fn transaction<T, F>(&self, work: F) -> Result<(T, Vec<Event>)>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T>,
    {
        let mut guard = self.state.lock().map_err(|_| poisoned())?;

        let (value, changes) = {
            let mut uow = UnitOfWork::new(&guard);
            let value = work(&mut uow)?;
            (value, uow.into_changes())
        };

        let events = changes.events.clone();
        guard.apply(changes);
        Ok((value, events))
    }

    /// read committed state
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&LedgerState) -> T,
    {
        let guard = self.state.lock().map_err(|_| poisoned())?;
        Ok(f(&guard))
    }
}

fn poisoned() -> BillingError {
    BillingError::Storage {
        message: "ledger lock poisoned".to_string(),
    }
}
