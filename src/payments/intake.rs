use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::bills::{Bill, BillLedger, BillTransition};
use crate::config::IntakeConfig;
use crate::contract::{ContractLimit, ContractLimitCalculator};
use crate::credit::CreditLedger;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::store::UnitOfWork;
use crate::tenancy::Tenancy;
use crate::types::{BillId, BillStatus, CreditKey, PaymentMethod, PaymentProof, UserId};

use super::{PaymentQuote, Submission};

/// validates tenant payment attempts and stages them for confirmation
#[derive(Debug, Clone)]
pub struct PaymentIntake {
    config: IntakeConfig,
    limits: ContractLimitCalculator,
    bills: BillLedger,
    credit: CreditLedger,
}

impl PaymentIntake {
    pub fn new(config: IntakeConfig, limits: ContractLimitCalculator) -> Self {
        Self {
            config,
            limits,
            bills: BillLedger::new(),
            credit: CreditLedger::new(),
        }
    }

    /// check `amount` against the bill, the tenant's credit and the contract
    pub fn quote(
        &self,
        uow: &UnitOfWork<'_>,
        bill: &Bill,
        tenancy: &Tenancy,
        tenant_id: UserId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentQuote> {
        if bill.tenant_id != tenant_id {
            return Err(BillingError::validation("only the billed tenant may pay this bill"));
        }
        if !bill.status.can(BillTransition::Submit) {
            return Err(BillingError::invalid_state(bill.status, "submit payment"));
        }
        validate_amount(amount)?;

        let bill_total = bill.total();
        let credit_available = self
            .credit
            .balance(uow, CreditKey::new(bill.tenant_id, bill.tenancy_id));

        let owed = bill_total - credit_available;
        if !owed.is_positive() {
            return Err(BillingError::invalid_state(
                "bill is fully covered by credit",
                "submit payment",
            ));
        }

        if amount < owed {
            return Err(BillingError::BelowMinimum {
                minimum: owed,
                provided: amount,
            });
        }

        let monthly_rent = tenancy.monthly_rent;
        let one_time_charges = bill.line_items.one_time_charges();
        let rent_portion = amount.saturating_sub(one_time_charges);
        let months_covered = rent_portion.ceil_units(monthly_rent).unwrap_or(0).max(1);

        let limit = self
            .limits
            .for_tenancy(tenancy, time_provider.now().date_naive());

        if amount > owed {
            check_contract(&limit, monthly_rent, amount, rent_portion)?;
        }

        Ok(PaymentQuote {
            bill_id: bill.id,
            bill_total,
            credit_available,
            owed,
            amount,
            one_time_charges,
            rent_portion,
            months_covered,
            advance_amount: rent_portion.saturating_sub(monthly_rent),
            limit,
        })
    }

    /// validate a cash or qr submission and move the bill to pending confirmation
    pub fn submit(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        tenancy: &Tenancy,
        submission: Submission,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        if matches!(submission.method, PaymentMethod::Gateway | PaymentMethod::Credit) {
            return Err(BillingError::validation(format!(
                "{} payments are not submitted as claims",
                submission.method
            )));
        }

        let bill = uow.bill(bill_id)?;
        let quote = self.quote(uow, &bill, tenancy, submission.tenant_id, submission.amount, time_provider)?;

        let proof_required = submission.method == PaymentMethod::QrCode
            || (submission.method == PaymentMethod::Cash && self.config.require_proof_for_cash);
        if proof_required && submission.proof.is_empty() {
            return Err(BillingError::MissingProof);
        }

        self.stage(uow, bill, &quote, submission.method, submission.proof, None, time_provider)
    }

    /// stage a successful gateway charge. a transaction id already staged or
    /// settled on this bill leaves it untouched
    #[allow(clippy::too_many_arguments)]
    pub fn stage_gateway(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        tenancy: &Tenancy,
        tenant_id: UserId,
        amount: Money,
        transaction_id: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        match uow.gateway_bill(transaction_id) {
            Some(bound) if bound == bill_id => {
                let bill = uow.bill(bill_id)?;
                let carries_transaction = bill.gateway_transaction_id.as_deref() == Some(transaction_id);
                if carries_transaction
                    && matches!(bill.status, BillStatus::PendingConfirmation | BillStatus::Paid)
                {
                    return Ok(bill);
                }
                return Err(BillingError::invalid_state(
                    bill.status,
                    format!("stage gateway transaction {} again", transaction_id),
                ));
            }
            Some(bound) => {
                return Err(BillingError::validation(format!(
                    "gateway transaction {} belongs to bill {}",
                    transaction_id, bound
                )))
            }
            None => {}
        }

        let bill = uow.bill(bill_id)?;
        let quote = self.quote(uow, &bill, tenancy, tenant_id, amount, time_provider)?;

        uow.bind_gateway_transaction(transaction_id, bill_id);
        self.stage(
            uow,
            bill,
            &quote,
            PaymentMethod::Gateway,
            PaymentProof::reference(transaction_id),
            Some(transaction_id.to_string()),
            time_provider,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn stage(
        &self,
        uow: &mut UnitOfWork<'_>,
        mut bill: Bill,
        quote: &PaymentQuote,
        method: PaymentMethod,
        proof: PaymentProof,
        gateway_transaction_id: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        if bill.status == BillStatus::Rejected {
            if let Some(max) = self.config.max_resubmissions {
                if bill.resubmission_count >= max {
                    return Err(BillingError::invalid_state(
                        format!("bill rejected {} times", bill.resubmission_count),
                        "resubmit payment",
                    ));
                }
            }
            bill.resubmission_count += 1;
        }

        self.bills
            .transition(uow, &mut bill, BillTransition::Submit, time_provider)?;

        bill.proof = proof;
        bill.payment_method = Some(method);
        bill.gateway_transaction_id = gateway_transaction_id;
        bill.amount_paid = quote.amount_paid();
        bill.credit_applied = quote.credit_available;
        bill.advance_amount = quote.advance_amount;
        bill.months_covered = quote.months_covered;

        info!(
            bill_id = %bill.id,
            method = %method,
            amount_paid = %bill.amount_paid,
            months_covered = bill.months_covered,
            "payment staged for confirmation"
        );
        uow.emit(Event::ConfirmationRequested {
            bill_id: bill.id,
            landlord_id: bill.landlord_id,
            amount_paid: bill.amount_paid,
            method,
            months_covered: bill.months_covered,
            timestamp: bill.updated_at,
        });
        uow.put_bill(bill.clone());

        Ok(bill)
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(BillingError::validation("payment amount cannot be negative"));
    }
    if !amount.is_whole_cents() {
        return Err(BillingError::validation("payment amount has fractions of a cent"));
    }
    Ok(())
}

fn check_contract(
    limit: &ContractLimit,
    monthly_rent: Money,
    amount: Money,
    rent_portion: Money,
) -> Result<()> {
    if let Some(max_rent) = limit.max_rent(monthly_rent) {
        if rent_portion > max_rent {
            return Err(BillingError::ExceedsContract {
                limit: max_rent,
                requested: rent_portion,
            });
        }
    }

    if let Some(max_payable) = limit.max_payable_amount() {
        if amount > max_payable {
            return Err(BillingError::ExceedsContract {
                limit: max_payable,
                requested: amount,
            });
        }
    }

    Ok(())
}
