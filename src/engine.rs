use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bills::{Bill, BillDraft, BillLedger, LineItems};
use crate::config::EngineConfig;
use crate::contract::ContractLimitCalculator;
use crate::credit::CreditLedger;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::jobs::MonthlyRentJob;
use crate::notify::{dispatch_events, NotificationDispatcher};
use crate::payments::{
    ChargeRequest, Payment, PaymentGateway, PaymentIntake, PaymentQuote, Settlement,
    SettlementEngine, Submission,
};
use crate::reports::IncomeReport;
use crate::store::{LedgerStore, UnitOfWork};
use crate::tenancy::{Tenancy, TenancyDirectory};
use crate::types::{BillId, BillStatus, CreditKey, PaymentMethod, PaymentProof, TenancyId, UserId};

/// billing operations, each run as one unit of work on the ledger store.
/// tenancy lookups, gateway charges and notifications stay outside the lock
pub struct BillingEngine {
    config: EngineConfig,
    store: LedgerStore,
    tenancies: Arc<dyn TenancyDirectory>,
    notifier: Arc<dyn NotificationDispatcher>,
    bills: BillLedger,
    credit: CreditLedger,
    intake: PaymentIntake,
    settlement: SettlementEngine,
    rent_job: MonthlyRentJob,
}

impl BillingEngine {
    pub fn new(
        config: EngineConfig,
        tenancies: Arc<dyn TenancyDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self> {
        config.validate()?;
        let limits = ContractLimitCalculator::from_terms(&config.contract_terms);

        Ok(Self {
            intake: PaymentIntake::new(config.intake.clone(), limits),
            settlement: SettlementEngine::new(config.settlement.clone()),
            bills: BillLedger::new(),
            credit: CreditLedger::new(),
            rent_job: MonthlyRentJob::new(),
            store: LedgerStore::new(),
            config,
            tenancies,
            notifier,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn issue_bill(
        &self,
        tenancy_id: TenancyId,
        draft: BillDraft,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let tenancy = self.tenancies.get_tenancy(tenancy_id)?;
        let bill = self.commit(|uow| self.bills.issue(uow, &tenancy, draft, time_provider))?;
        info!(bill_id = %bill.id, tenancy_id = %tenancy_id, total = %bill.total(), "bill issued");
        Ok(bill)
    }

    pub fn edit_bill(
        &self,
        bill_id: BillId,
        line_items: LineItems,
        due_date: Option<NaiveDate>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        self.commit(|uow| self.bills.edit(uow, bill_id, line_items, due_date, time_provider))
    }

    pub fn cancel_bill(&self, bill_id: BillId, time_provider: &SafeTimeProvider) -> Result<()> {
        self.commit(|uow| self.bills.cancel(uow, bill_id, time_provider))?;
        info!(bill_id = %bill_id, "bill cancelled");
        Ok(())
    }

    /// tenant payment claim. credit payments settle immediately
    pub fn submit_payment(
        &self,
        bill_id: BillId,
        tenant_id: UserId,
        amount: Money,
        method: PaymentMethod,
        proof: PaymentProof,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        match method {
            PaymentMethod::Credit => return self.pay_with_credit(bill_id, tenant_id, time_provider),
            PaymentMethod::Gateway => {
                return Err(BillingError::validation(
                    "gateway payments go through submit_gateway_payment",
                ))
            }
            PaymentMethod::Cash | PaymentMethod::QrCode => {}
        }

        let tenancy = self.tenancy_for_bill(bill_id)?;
        let submission = Submission {
            tenant_id,
            amount,
            method,
            proof,
        };
        self.commit(|uow| self.intake.submit(uow, bill_id, &tenancy, submission, time_provider))
    }

    /// what `amount` would cover, without staging anything
    pub fn quote_payment(
        &self,
        bill_id: BillId,
        tenant_id: UserId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentQuote> {
        let tenancy = self.tenancy_for_bill(bill_id)?;
        self.commit(|uow| {
            let bill = uow.bill(bill_id)?;
            self.intake.quote(uow, &bill, &tenancy, tenant_id, amount, time_provider)
        })
    }

    /// validate, charge through `gateway`, then stage the charge for confirmation
    pub fn submit_gateway_payment(
        &self,
        bill_id: BillId,
        tenant_id: UserId,
        amount: Money,
        gateway: &dyn PaymentGateway,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let tenancy = self.tenancy_for_bill(bill_id)?;
        let (quote, attempt) = self.commit(|uow| {
            let bill = uow.bill(bill_id)?;
            let quote = self.intake.quote(uow, &bill, &tenancy, tenant_id, amount, time_provider)?;
            // one key per attempt, a resubmission after rejection is a new charge
            let attempt = bill.resubmission_count + u32::from(bill.status == BillStatus::Rejected);
            Ok((quote, attempt))
        })?;

        let request = ChargeRequest {
            bill_id,
            tenant_id,
            amount: quote.amount,
            idempotency_key: format!("{}-{}", bill_id, attempt),
        };
        let charge = gateway.charge(&request).map_err(|e| {
            warn!(bill_id = %bill_id, error = %e, "gateway charge failed");
            BillingError::from(e)
        })?;

        self.commit(|uow| {
            self.intake.stage_gateway(
                uow,
                bill_id,
                &tenancy,
                tenant_id,
                charge.amount,
                &charge.transaction_id,
                time_provider,
            )
        })
        .map_err(|e| {
            warn!(
                bill_id = %bill_id,
                transaction_id = %charge.transaction_id,
                error = %e,
                "charge succeeded but staging failed, awaiting gateway confirmation"
            );
            e
        })
    }

    pub fn pay_with_credit(
        &self,
        bill_id: BillId,
        tenant_id: UserId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let tenancy = self.resolve_tenancy(bill_id);
        let settlement = self.commit(|uow| {
            self.settlement
                .pay_with_credit(uow, bill_id, tenant_id, tenancy.as_ref(), time_provider)
        })?;
        Ok(settlement.bill)
    }

    pub fn confirm_payment(
        &self,
        bill_id: BillId,
        landlord_id: UserId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        let tenancy = self.resolve_tenancy(bill_id);
        self.commit(|uow| {
            self.settlement
                .confirm(uow, bill_id, landlord_id, tenancy.as_ref(), time_provider)
        })
    }

    /// gateway webhook; safe to deliver more than once
    pub fn confirm_gateway_payment(
        &self,
        bill_id: BillId,
        transaction_id: &str,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        let tenancy = self.tenancy_for_bill(bill_id)?;
        self.commit(|uow| {
            self.settlement.confirm_gateway(
                uow,
                &self.intake,
                bill_id,
                transaction_id,
                amount,
                &tenancy,
                time_provider,
            )
        })
    }

    pub fn reject_payment(
        &self,
        bill_id: BillId,
        landlord_id: UserId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        self.commit(|uow| self.settlement.reject(uow, bill_id, landlord_id, time_provider))
    }

    pub fn credit_balance(&self, tenant_id: UserId, tenancy_id: TenancyId) -> Result<Money> {
        let key = CreditKey::new(tenant_id, tenancy_id);
        self.read_uow(|uow| self.credit.balance(uow, key))
    }

    pub fn bill(&self, bill_id: BillId) -> Result<Bill> {
        self.read_uow(|uow| self.bills.get(uow, bill_id))?
    }

    /// bills of a tenancy ordered by due date
    pub fn bills_for_tenancy(&self, tenancy_id: TenancyId) -> Result<Vec<Bill>> {
        self.read_uow(|uow| self.bills.list_for_tenancy(uow, tenancy_id))
    }

    pub fn payments_for_tenancy(&self, tenancy_id: TenancyId) -> Result<Vec<Payment>> {
        self.store.read(|state| {
            state
                .payments()
                .iter()
                .filter(|p| p.tenancy_id == tenancy_id)
                .cloned()
                .collect()
        })
    }

    pub fn income_report(&self, landlord_id: UserId, from: NaiveDate, to: NaiveDate) -> Result<IncomeReport> {
        self.store
            .read(|state| IncomeReport::build(landlord_id, from, to, state.payments()))?
    }

    /// issue this month's rent bill for a tenancy, at most once per month
    pub fn generate_monthly_rent(
        &self,
        tenancy_id: TenancyId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<Bill>> {
        let tenancy = self.tenancies.get_tenancy(tenancy_id)?;
        self.commit(|uow| self.rent_job.run(uow, &tenancy, time_provider))
    }

    /// every event committed so far
    pub fn audit_log(&self) -> Result<Vec<Event>> {
        self.store.read(|state| state.audit_log().to_vec())
    }

    /// run one unit of work, then notify outside the lock
    fn commit<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T>,
    {
        let (value, events) = self.store.transaction(work)?;
        dispatch_events(self.notifier.as_ref(), &events);
        Ok(value)
    }

    fn read_uow<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&UnitOfWork<'_>) -> T,
    {
        self.store
            .transaction(|uow| Ok(f(uow)))
            .map(|(value, _)| value)
    }

    fn tenancy_for_bill(&self, bill_id: BillId) -> Result<Tenancy> {
        let tenancy_id = self.bill(bill_id)?.tenancy_id;
        self.tenancies.get_tenancy(tenancy_id)
    }

    /// settlement proceeds without advance spreading when the directory
    /// cannot resolve the tenancy
    fn resolve_tenancy(&self, bill_id: BillId) -> Option<Tenancy> {
        match self.tenancy_for_bill(bill_id) {
            Ok(tenancy) => Some(tenancy),
            Err(e) => {
                warn!(bill_id = %bill_id, error = %e, "tenancy unavailable for settlement");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingDispatcher;
    use crate::payments::SandboxGateway;
    use crate::tenancy::InMemoryTenancyDirectory;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 3, 9, 30, 0).unwrap()))
    }

    struct Harness {
        engine: BillingEngine,
        notifier: Arc<RecordingDispatcher>,
        tenancy: Tenancy,
        time: SafeTimeProvider,
    }

    fn harness(config: EngineConfig, tenancy: Tenancy) -> Harness {
        let directory = Arc::new(InMemoryTenancyDirectory::new());
        directory.insert(tenancy.clone()).unwrap();
        let notifier = Arc::new(RecordingDispatcher::new());
        let engine = BillingEngine::new(config, directory, notifier.clone()).unwrap();
        Harness {
            engine,
            notifier,
            tenancy,
            time: time(),
        }
    }

    fn three_month_lease() -> Tenancy {
        Tenancy::builder()
            .start_date(date(2024, 1, 1))
            .contract_end_date(date(2024, 4, 1))
            .monthly_rent(Money::from_major(10_000))
            .build()
            .unwrap()
    }

    impl Harness {
        fn issue(&self, items: LineItems, due: NaiveDate) -> Bill {
            self.engine
                .issue_bill(self.tenancy.id, BillDraft::new(items, due), &self.time)
                .unwrap()
        }

        fn rent_bill(&self) -> Bill {
            self.issue(LineItems::rent_only(self.tenancy.monthly_rent), date(2024, 1, 1))
        }

        fn pay_cash(&self, bill_id: BillId, amount: Money) -> Result<Bill> {
            self.engine.submit_payment(
                bill_id,
                self.tenancy.tenant_id,
                amount,
                PaymentMethod::Cash,
                PaymentProof::none(),
                &self.time,
            )
        }

        fn confirm(&self, bill_id: BillId) -> Result<Settlement> {
            self.engine
                .confirm_payment(bill_id, self.tenancy.landlord_id, &self.time)
        }

        fn credit(&self) -> Money {
            self.engine
                .credit_balance(self.tenancy.tenant_id, self.tenancy.id)
                .unwrap()
        }
    }

    #[test]
    fn test_scenario_a_prepaying_past_contract_is_refused() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();

        let result = h.pay_cash(bill.id, Money::from_major(35_000));
        assert!(matches!(result, Err(BillingError::ExceedsContract { .. })));
        assert_eq!(h.engine.bill(bill.id).unwrap().status, BillStatus::Pending);
    }

    #[test]
    fn test_scenario_b_cover_partial_month() {
        let h = harness(EngineConfig::cover_partial_month(), three_month_lease());
        let bill = h.rent_bill();

        let staged = h.pay_cash(bill.id, Money::from_major(25_000)).unwrap();
        assert_eq!(staged.months_covered, 3);
        assert_eq!(staged.advance_amount, Money::from_major(15_000));

        let settlement = h.confirm(bill.id).unwrap();
        assert_eq!(settlement.advance_months_created, 2);
        assert_eq!(h.credit(), Money::ZERO);

        let bills = h.engine.bills_for_tenancy(h.tenancy.id).unwrap();
        assert_eq!(bills.len(), 3);
        assert!(bills.iter().all(|b| b.status == BillStatus::Paid));
        assert_eq!(bills.iter().filter(|b| b.is_advance_payment).count(), 2);
    }

    #[test]
    fn test_scenario_b_whole_months() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();

        h.pay_cash(bill.id, Money::from_major(25_000)).unwrap();
        let settlement = h.confirm(bill.id).unwrap();
        assert_eq!(settlement.advance_months_created, 1);
        assert_eq!(h.credit(), Money::from_major(5_000));
    }

    #[test]
    fn test_scenario_c_credit_covers_bill() {
        let tenancy = Tenancy::builder()
            .start_date(date(2024, 1, 1))
            .monthly_rent(Money::from_major(5_000))
            .build()
            .unwrap();
        let h = harness(EngineConfig::standard(), tenancy);

        // earn 5000 credit by overpaying an earlier utility bill
        let earlier = h.issue(LineItems::new().with_other(Money::from_major(1_000)), date(2024, 1, 1));
        h.pay_cash(earlier.id, Money::from_major(6_000)).unwrap();
        h.confirm(earlier.id).unwrap();
        assert_eq!(h.credit(), Money::from_major(5_000));

        let bill = h.issue(LineItems::rent_only(Money::from_major(5_000)), date(2024, 2, 1));
        let cash = h.pay_cash(bill.id, Money::from_major(5_000));
        assert!(matches!(cash, Err(BillingError::InvalidState { .. })));

        let paid = h
            .engine
            .submit_payment(
                bill.id,
                h.tenancy.tenant_id,
                Money::ZERO,
                PaymentMethod::Credit,
                PaymentProof::none(),
                &h.time,
            )
            .unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::Credit));
        assert_eq!(h.credit(), Money::ZERO);
    }

    #[test]
    fn test_scenario_d_qr_without_proof() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();

        let result = h.engine.submit_payment(
            bill.id,
            h.tenancy.tenant_id,
            Money::from_major(10_000),
            PaymentMethod::QrCode,
            PaymentProof::reference(""),
            &h.time,
        );
        assert_eq!(result.unwrap_err(), BillingError::MissingProof);
        assert_eq!(h.engine.bill(bill.id).unwrap().status, BillStatus::Pending);
    }

    #[test]
    fn test_partial_payment_leaves_bill_pending() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.issue(
            LineItems::rent_only(Money::from_major(10_000)).with_water(Money::from_decimal(dec!(420.75))),
            date(2024, 1, 1),
        );

        let result = h.pay_cash(bill.id, Money::from_major(10_420));
        assert!(matches!(result, Err(BillingError::BelowMinimum { .. })));
        assert_eq!(h.engine.bill(bill.id).unwrap().status, BillStatus::Pending);
    }

    #[test]
    fn test_exactly_one_payment_per_bill() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        h.pay_cash(bill.id, Money::from_major(10_000)).unwrap();

        h.confirm(bill.id).unwrap();
        assert!(matches!(h.confirm(bill.id), Err(BillingError::InvalidState { .. })));
        assert_eq!(h.engine.payments_for_tenancy(h.tenancy.id).unwrap().len(), 1);
    }

    #[test]
    fn test_advance_bills_never_outlive_contract() {
        let h = harness(EngineConfig::cover_partial_month(), three_month_lease());
        let bill = h.issue(LineItems::rent_only(Money::from_major(10_000)), date(2024, 3, 1));

        h.pay_cash(bill.id, Money::from_major(30_000)).unwrap();
        h.confirm(bill.id).unwrap();

        let end = h.tenancy.contract_end_date.unwrap();
        let bills = h.engine.bills_for_tenancy(h.tenancy.id).unwrap();
        assert!(bills.iter().all(|b| b.due_date <= end));
        assert_eq!(bills.iter().filter(|b| b.is_advance_payment).count(), 1);
        assert_eq!(h.credit(), Money::from_major(10_000));
    }

    #[test]
    fn test_gateway_flow_and_webhook_replay() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        let gateway = SandboxGateway::new();

        let staged = h
            .engine
            .submit_gateway_payment(bill.id, h.tenancy.tenant_id, Money::from_major(10_000), &gateway, &h.time)
            .unwrap();
        assert_eq!(staged.status, BillStatus::PendingConfirmation);
        let tx = staged.gateway_transaction_id.clone().unwrap();

        let first = h
            .engine
            .confirm_gateway_payment(bill.id, &tx, Money::from_major(10_000), &h.time)
            .unwrap();
        assert!(!first.replayed);

        let replay = h
            .engine
            .confirm_gateway_payment(bill.id, &tx, Money::from_major(10_000), &h.time)
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(h.engine.payments_for_tenancy(h.tenancy.id).unwrap().len(), 1);
        assert_eq!(h.credit(), Money::ZERO);
    }

    #[test]
    fn test_gateway_resubmission_after_rejection() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        let gateway = SandboxGateway::new();
        let rent = Money::from_major(10_000);

        let first = h
            .engine
            .submit_gateway_payment(bill.id, h.tenancy.tenant_id, rent, &gateway, &h.time)
            .unwrap();
        let first_tx = first.gateway_transaction_id.clone().unwrap();
        h.engine
            .reject_payment(bill.id, h.tenancy.landlord_id, &h.time)
            .unwrap();

        let second = h
            .engine
            .submit_gateway_payment(bill.id, h.tenancy.tenant_id, rent, &gateway, &h.time)
            .unwrap();
        assert_eq!(second.status, BillStatus::PendingConfirmation);
        assert_eq!(second.resubmission_count, 1);
        let second_tx = second.gateway_transaction_id.clone().unwrap();
        assert_ne!(second_tx, first_tx);

        let keys: Vec<String> = gateway.charges().into_iter().map(|c| c.idempotency_key).collect();
        assert_eq!(keys, vec![format!("{}-0", bill.id), format!("{}-1", bill.id)]);

        // the rejected charge cannot settle the bill
        let stale = h.engine.confirm_gateway_payment(bill.id, &first_tx, rent, &h.time);
        assert!(matches!(stale, Err(BillingError::InvalidState { .. })));

        let settlement = h
            .engine
            .confirm_gateway_payment(bill.id, &second_tx, rent, &h.time)
            .unwrap();
        assert_eq!(settlement.bill.status, BillStatus::Paid);
        assert_eq!(h.engine.payments_for_tenancy(h.tenancy.id).unwrap().len(), 1);
    }

    #[test]
    fn test_declined_charge_leaves_bill_untouched() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        let gateway = SandboxGateway::declining("insufficient funds");

        let result = h.engine.submit_gateway_payment(
            bill.id,
            h.tenancy.tenant_id,
            Money::from_major(10_000),
            &gateway,
            &h.time,
        );
        assert!(matches!(result, Err(BillingError::Gateway { .. })));
        assert_eq!(h.engine.bill(bill.id).unwrap(), bill);
    }

    #[test]
    fn test_gateway_is_not_charged_for_invalid_amount() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        let gateway = SandboxGateway::new();

        let result = h.engine.submit_gateway_payment(
            bill.id,
            h.tenancy.tenant_id,
            Money::from_major(9_000),
            &gateway,
            &h.time,
        );
        assert!(matches!(result, Err(BillingError::BelowMinimum { .. })));
        assert!(gateway.charges().is_empty());
    }

    #[test]
    fn test_quote_does_not_stage() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();

        let quote = h
            .engine
            .quote_payment(bill.id, h.tenancy.tenant_id, Money::from_major(20_000), &h.time)
            .unwrap();
        assert_eq!(quote.months_covered, 2);
        assert_eq!(quote.advance_amount, Money::from_major(10_000));
        assert!(quote.is_prepayment());
        assert_eq!(h.engine.bill(bill.id).unwrap().status, BillStatus::Pending);
    }

    #[test]
    fn test_notifications_follow_commits() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        h.pay_cash(bill.id, Money::from_major(10_000)).unwrap();
        h.engine
            .reject_payment(bill.id, h.tenancy.landlord_id, &h.time)
            .unwrap();

        let landlord = h.notifier.sent_to(h.tenancy.landlord_id);
        assert_eq!(landlord.len(), 1);
        assert_eq!(landlord[0].event_type, "confirmation_requested");

        let tenant: Vec<String> = h
            .notifier
            .sent_to(h.tenancy.tenant_id)
            .into_iter()
            .map(|n| n.event_type)
            .collect();
        assert_eq!(tenant, vec!["bill_issued", "payment_rejected"]);

        // a failed operation notifies nobody
        let before = h.notifier.sent().len();
        assert!(h.confirm(Uuid::new_v4()).is_err());
        assert_eq!(h.notifier.sent().len(), before);
    }

    #[test]
    fn test_cancel_and_edit() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();

        let edited = h
            .engine
            .edit_bill(
                bill.id,
                LineItems::rent_only(Money::from_major(10_000)).with_electrical(Money::from_major(700)),
                Some(date(2024, 1, 5)),
                &h.time,
            )
            .unwrap();
        assert_eq!(edited.total(), Money::from_major(10_700));
        assert_eq!(edited.due_date, date(2024, 1, 5));

        h.engine.cancel_bill(bill.id, &h.time).unwrap();
        assert_eq!(h.engine.bill(bill.id).unwrap().status, BillStatus::Cancelled);
        assert!(matches!(
            h.pay_cash(bill.id, Money::from_major(10_700)),
            Err(BillingError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_income_report() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        h.pay_cash(bill.id, Money::from_major(20_000)).unwrap();
        h.confirm(bill.id).unwrap();

        let report = h
            .engine
            .income_report(h.tenancy.landlord_id, date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();
        assert_eq!(report.total, Money::from_major(20_000));
        assert_eq!(report.advance_months, 1);
        assert_eq!(report.payment_count, 1);
    }

    #[test]
    fn test_monthly_rent_generation() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let first = h.engine.generate_monthly_rent(h.tenancy.id, &h.time).unwrap();
        assert!(first.is_some());
        assert!(h.engine.generate_monthly_rent(h.tenancy.id, &h.time).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_confirms_create_one_payment() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let bill = h.rent_bill();
        h.pay_cash(bill.id, Money::from_major(20_000)).unwrap();

        let engine = &h.engine;
        let landlord_id = h.tenancy.landlord_id;
        let bill_id = bill.id;
        let results: Vec<Result<Settlement>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        let time = time();
                        engine.confirm_payment(bill_id, landlord_id, &time)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BillingError::InvalidState { .. })));
        assert_eq!(h.engine.payments_for_tenancy(h.tenancy.id).unwrap().len(), 1);
        // one advance bill plus the parent
        assert_eq!(h.engine.bills_for_tenancy(h.tenancy.id).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_credit_payments_never_overdraw() {
        let tenancy = Tenancy::builder()
            .start_date(date(2024, 1, 1))
            .monthly_rent(Money::from_major(3_000))
            .build()
            .unwrap();
        let h = harness(EngineConfig::standard(), tenancy);

        let seed = h.issue(LineItems::new().with_other(Money::from_major(1_000)), date(2024, 1, 1));
        h.pay_cash(seed.id, Money::from_major(7_000)).unwrap();
        h.confirm(seed.id).unwrap();
        assert_eq!(h.credit(), Money::from_major(6_000));

        let bills: Vec<Bill> = (0..3)
            .map(|_| h.issue(LineItems::new().with_other(Money::from_major(3_000)), date(2024, 2, 1)))
            .collect();

        let engine = &h.engine;
        let tenant_id = h.tenancy.tenant_id;
        let paid = std::thread::scope(|scope| {
            let handles: Vec<_> = bills
                .iter()
                .map(|bill| {
                    scope.spawn(move || {
                        let time = time();
                        engine.pay_with_credit(bill.id, tenant_id, &time)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|r| r.is_ok())
                .count()
        });

        assert_eq!(paid, 2);
        assert_eq!(h.credit(), Money::ZERO);
    }

    #[test]
    fn test_unknown_tenancy() {
        let h = harness(EngineConfig::standard(), three_month_lease());
        let result = h.engine.issue_bill(
            Uuid::new_v4(),
            BillDraft::new(LineItems::rent_only(Money::from_major(1)), date(2024, 1, 1)),
            &h.time,
        );
        assert!(matches!(result, Err(BillingError::NotFound { entity: "tenancy", .. })));
    }
}
