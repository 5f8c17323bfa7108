use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bills::{AdvanceBills, Bill, BillLedger, BillTransition};
use crate::config::SettlementConfig;
use crate::credit::CreditLedger;
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::store::UnitOfWork;
use crate::tenancy::Tenancy;
use crate::types::{AdvanceMonthPolicy, BillId, BillStatus, CreditKey, PaymentMethod, UserId};

use super::intake::PaymentIntake;
use super::{tenant_cash, Payment};

/// outcome of settling a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub bill: Bill,
    pub payment: Payment,
    pub advance_bills: Vec<Bill>,
    pub advance_months_created: u32,
    /// a gateway confirmation that had already been applied
    pub replayed: bool,
}

/// confirms, rejects and settles staged payments. sole writer of payments
/// and credit balances
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    config: SettlementConfig,
    bills: BillLedger,
    credit: CreditLedger,
}

impl SettlementEngine {
    pub fn new(config: SettlementConfig) -> Self {
        Self {
            config,
            bills: BillLedger::new(),
            credit: CreditLedger::new(),
        }
    }

    /// landlord confirmation. a pending bill is confirmed as a direct cash payment
    pub fn confirm(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        landlord_id: UserId,
        tenancy: Option<&Tenancy>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        let mut bill = uow.bill(bill_id)?;
        if bill.landlord_id != landlord_id {
            return Err(BillingError::validation("only the bill's landlord may confirm it"));
        }

        match bill.status {
            BillStatus::PendingConfirmation => {
                self.bills
                    .transition(uow, &mut bill, BillTransition::Confirm, time_provider)?;
            }
            BillStatus::Pending => {
                let method = bill.payment_method.unwrap_or(PaymentMethod::Cash);
                self.bills
                    .transition(uow, &mut bill, BillTransition::ConfirmDirect, time_provider)?;
                stage_direct(&mut bill, method, Money::ZERO);
            }
            current => return Err(BillingError::invalid_state(current, "confirm payment")),
        }

        self.settle(uow, bill, tenancy, time_provider)
    }

    /// landlord disputes the tenant's claim
    pub fn reject(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        landlord_id: UserId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Bill> {
        let mut bill = uow.bill(bill_id)?;
        if bill.landlord_id != landlord_id {
            return Err(BillingError::validation("only the bill's landlord may reject it"));
        }

        self.bills
            .transition(uow, &mut bill, BillTransition::Reject, time_provider)?;

        info!(bill_id = %bill.id, amount = %bill.amount_paid, "payment rejected");
        uow.emit(Event::PaymentRejected {
            bill_id: bill.id,
            tenant_id: bill.tenant_id,
            amount: bill.amount_paid,
            timestamp: bill.updated_at,
        });
        uow.put_bill(bill.clone());

        Ok(bill)
    }

    /// settle a bill entirely from the tenant's credit balance
    pub fn pay_with_credit(
        &self,
        uow: &mut UnitOfWork<'_>,
        bill_id: BillId,
        tenant_id: UserId,
        tenancy: Option<&Tenancy>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        let mut bill = uow.bill(bill_id)?;
        if bill.tenant_id != tenant_id {
            return Err(BillingError::validation("only the billed tenant may pay this bill"));
        }
        if !bill.status.can(BillTransition::ConfirmDirect) {
            return Err(BillingError::invalid_state(bill.status, "pay with credit"));
        }

        let total = bill.total();
        let available = self
            .credit
            .balance(uow, CreditKey::new(bill.tenant_id, bill.tenancy_id));
        if available < total {
            return Err(BillingError::InsufficientCredit {
                available,
                required: total,
            });
        }

        self.bills
            .transition(uow, &mut bill, BillTransition::ConfirmDirect, time_provider)?;
        stage_direct(&mut bill, PaymentMethod::Credit, total);

        self.settle(uow, bill, tenancy, time_provider)
    }

    /// gateway webhook, idempotent on `transaction_id`
    #[allow(clippy::too_many_arguments)]
    pub fn confirm_gateway(
        &self,
        uow: &mut UnitOfWork<'_>,
        intake: &PaymentIntake,
        bill_id: BillId,
        transaction_id: &str,
        amount: Money,
        tenancy: &Tenancy,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        if let Some(bound) = uow.gateway_bill(transaction_id) {
            if bound != bill_id {
                return Err(BillingError::validation(format!(
                    "gateway transaction {} belongs to bill {}",
                    transaction_id, bound
                )));
            }
        }

        let mut bill = uow.bill(bill_id)?;
        let same_transaction = bill.gateway_transaction_id.as_deref() == Some(transaction_id);

        match bill.status {
            BillStatus::Paid if same_transaction => {
                let payment = uow
                    .payment_for_bill(bill_id)
                    .ok_or_else(|| BillingError::not_found("payment for bill", bill_id))?;

                debug!(bill_id = %bill_id, transaction_id, "gateway confirmation replayed");
                uow.emit(Event::GatewayReplayIgnored {
                    bill_id,
                    transaction_id: transaction_id.to_string(),
                    timestamp: time_provider.now(),
                });

                Ok(Settlement {
                    bill,
                    payment,
                    advance_bills: Vec::new(),
                    advance_months_created: 0,
                    replayed: true,
                })
            }
            BillStatus::PendingConfirmation if same_transaction => {
                if tenant_cash(&bill) != amount {
                    return Err(BillingError::validation(format!(
                        "gateway amount {} does not match staged amount {}",
                        amount,
                        tenant_cash(&bill)
                    )));
                }
                self.bills
                    .transition(uow, &mut bill, BillTransition::Confirm, time_provider)?;
                self.settle(uow, bill, Some(tenancy), time_provider)
            }
            BillStatus::Pending | BillStatus::Rejected => {
                // charge went through but the staging write never landed
                let tenant_id = bill.tenant_id;
                let mut staged = intake.stage_gateway(
                    uow,
                    bill_id,
                    tenancy,
                    tenant_id,
                    amount,
                    transaction_id,
                    time_provider,
                )?;
                self.bills
                    .transition(uow, &mut staged, BillTransition::Confirm, time_provider)?;
                self.settle(uow, staged, Some(tenancy), time_provider)
            }
            current => Err(BillingError::invalid_state(current, "confirm gateway payment")),
        }
    }

    /// write the payment, spread the advance and reconcile credit for a bill
    /// that has just become paid
    fn settle(
        &self,
        uow: &mut UnitOfWork<'_>,
        mut bill: Bill,
        tenancy: Option<&Tenancy>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Settlement> {
        let bill_total = bill.total();
        let method = bill.payment_method.unwrap_or(PaymentMethod::Cash);
        let payment_id = Uuid::new_v4();

        let advance_bills = match tenancy {
            Some(tenancy) if bill.advance_amount.is_positive() && bill.line_items.has_rent() => {
                let months = self.extra_months(&bill, tenancy.monthly_rent);
                self.bills.create_advance_bills(
                    uow,
                    &bill,
                    AdvanceBills {
                        months,
                        monthly_rent: tenancy.monthly_rent,
                        contract_end_date: tenancy.contract_end_date,
                        payment_id,
                        method,
                    },
                    time_provider,
                )?
            }
            _ => Vec::new(),
        };
        let created = advance_bills.len() as u32;

        let key = CreditKey::new(bill.tenant_id, bill.tenancy_id);
        if bill.credit_applied.is_positive() {
            self.credit
                .debit(uow, key, bill.credit_applied, "applied to bill", time_provider)?;
        }

        let spread: Money = advance_bills.iter().map(|b| b.total()).sum();
        let remaining = bill.amount_paid - bill_total - spread;
        if remaining.is_positive() {
            self.credit
                .credit(uow, key, remaining, "overpayment carried forward", time_provider)?;
        }

        let payment = Payment {
            id: payment_id,
            bill_id: bill.id,
            tenancy_id: bill.tenancy_id,
            tenant_id: bill.tenant_id,
            landlord_id: bill.landlord_id,
            amount: bill_total + bill.advance_amount,
            method,
            gateway_transaction_id: bill.gateway_transaction_id.clone(),
            advance_months: created,
            created_at: time_provider.now(),
        };
        uow.append_payment(payment.clone())?;

        bill.payment_id = Some(payment_id);
        uow.put_bill(bill.clone());

        info!(
            bill_id = %bill.id,
            payment_id = %payment_id,
            amount = %payment.amount,
            advance_months = created,
            "payment confirmed"
        );
        uow.emit(Event::PaymentConfirmed {
            bill_id: bill.id,
            payment_id,
            tenant_id: bill.tenant_id,
            amount: payment.amount,
            months_covered: 1 + created,
            timestamp: payment.created_at,
        });

        Ok(Settlement {
            bill,
            payment,
            advance_bills,
            advance_months_created: created,
            replayed: false,
        })
    }

    fn extra_months(&self, bill: &Bill, monthly_rent: Money) -> u32 {
        match self.config.advance_policy {
            AdvanceMonthPolicy::WholeMonths => bill.advance_amount.floor_units(monthly_rent).unwrap_or(0),
            AdvanceMonthPolicy::CoverPartialMonth => bill.months_covered.saturating_sub(1),
        }
    }
}

/// a bill paid without a staged claim covers exactly its total
fn stage_direct(bill: &mut Bill, method: PaymentMethod, credit_applied: Money) {
    bill.payment_method = Some(method);
    bill.amount_paid = bill.total();
    bill.credit_applied = credit_applied;
    bill.advance_amount = Money::ZERO;
    bill.months_covered = 1;
}
