pub mod gateway;
pub mod intake;
pub mod settlement;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bills::Bill;
use crate::contract::ContractLimit;
use crate::decimal::Money;
use crate::types::{BillId, PaymentId, PaymentMethod, PaymentProof, TenancyId, UserId};

pub use gateway::{ChargeRequest, GatewayCharge, GatewayError, PaymentGateway, SandboxGateway};
pub use intake::PaymentIntake;
pub use settlement::{Settlement, SettlementEngine};

/// immutable settlement record, written once when a bill is paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub bill_id: BillId,
    pub tenancy_id: TenancyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    /// bill total plus the advance carried by this payment
    pub amount: Money,
    pub method: PaymentMethod,
    pub gateway_transaction_id: Option<String>,
    /// advance bills created from this payment
    pub advance_months: u32,
    pub created_at: DateTime<Utc>,
}

/// a tenant's payment attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub tenant_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub proof: PaymentProof,
}

impl Submission {
    pub fn cash(tenant_id: UserId, amount: Money) -> Self {
        Self {
            tenant_id,
            amount,
            method: PaymentMethod::Cash,
            proof: PaymentProof::none(),
        }
    }

    pub fn qr_code(tenant_id: UserId, amount: Money, proof: PaymentProof) -> Self {
        Self {
            tenant_id,
            amount,
            method: PaymentMethod::QrCode,
            proof,
        }
    }
}

/// what a chosen amount would do to a bill, before anything is charged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentQuote {
    pub bill_id: BillId,
    pub bill_total: Money,
    pub credit_available: Money,
    /// minimum the tenant must pay now
    pub owed: Money,
    pub amount: Money,
    pub one_time_charges: Money,
    pub rent_portion: Money,
    pub months_covered: u32,
    pub advance_amount: Money,
    pub limit: ContractLimit,
}

impl PaymentQuote {
    /// tenant cash plus the credit the submission draws on
    pub fn amount_paid(&self) -> Money {
        self.amount + self.credit_available
    }

    pub fn is_prepayment(&self) -> bool {
        self.amount > self.owed
    }
}

/// the cash part of a staged submission
pub(crate) fn tenant_cash(bill: &Bill) -> Money {
    bill.amount_paid - bill.credit_applied
}
