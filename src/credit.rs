use hourglass_rs::SafeTimeProvider;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::events::Event;
use crate::store::UnitOfWork;
use crate::types::CreditKey;

/// per (tenant, tenancy) balances, created on first credit and never negative
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditLedger;

impl CreditLedger {
    pub fn new() -> Self {
        CreditLedger
    }

    /// current balance, zero when no balance exists yet
    pub fn balance(&self, uow: &UnitOfWork<'_>, key: CreditKey) -> Money {
        uow.credit(&key).unwrap_or(Money::ZERO)
    }

    /// add `amount` to the balance, creating it if absent
    pub fn credit(
        &self,
        uow: &mut UnitOfWork<'_>,
        key: CreditKey,
        amount: Money,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        if amount.is_negative() {
            return Err(BillingError::validation("credit amount cannot be negative"));
        }
        let old_balance = self.balance(uow, key);
        self.write(uow, key, old_balance, old_balance + amount, reason, time_provider)
    }

    /// take `amount` from the balance
    pub fn debit(
        &self,
        uow: &mut UnitOfWork<'_>,
        key: CreditKey,
        amount: Money,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        if amount.is_negative() {
            return Err(BillingError::validation("debit amount cannot be negative"));
        }
        let old_balance = self.balance(uow, key);
        if old_balance < amount {
            return Err(BillingError::InsufficientCredit {
                available: old_balance,
                required: amount,
            });
        }
        self.write(uow, key, old_balance, old_balance - amount, reason, time_provider)
    }

    fn write(
        &self,
        uow: &mut UnitOfWork<'_>,
        key: CreditKey,
        old_balance: Money,
        new_balance: Money,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        if old_balance == new_balance {
            return Ok(new_balance);
        }

        uow.set_credit(key, new_balance)?;
        debug!(
            tenant_id = %key.tenant_id,
            tenancy_id = %key.tenancy_id,
            old_balance = %old_balance,
            new_balance = %new_balance,
            reason,
            "credit balance adjusted"
        );
        uow.emit(Event::CreditAdjusted {
            tenant_id: key.tenant_id,
            tenancy_id: key.tenancy_id,
            old_balance,
            new_balance,
            reason: reason.to_string(),
            timestamp: time_provider.now(),
        });

        Ok(new_balance)
    }
}
