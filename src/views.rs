use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::bills::{Bill, LineItems};
use crate::decimal::Money;
use crate::payments::Settlement;
use crate::types::{BillId, BillStatus, PaymentId, PaymentMethod, TenancyId};

/// what a client sees of a bill
#[derive(Debug, Serialize, Deserialize)]
pub struct BillView {
    pub id: BillId,
    pub tenancy_id: TenancyId,
    pub status: BillStatus,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub charges: ChargesView,
    pub payment: StagedPaymentView,
    pub is_advance_payment: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChargesView {
    pub line_items: LineItems,
    pub rent: Money,
    pub one_time: Money,
    pub total: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StagedPaymentView {
    pub method: Option<PaymentMethod>,
    pub amount_paid: Money,
    pub credit_applied: Money,
    pub advance_amount: Money,
    pub months_covered: u32,
    pub gateway_transaction_id: Option<String>,
    pub payment_id: Option<PaymentId>,
    pub resubmission_count: u32,
}

impl BillView {
    pub fn from_bill(bill: &Bill) -> Self {
        BillView {
            id: bill.id,
            tenancy_id: bill.tenancy_id,
            status: bill.status,
            due_date: bill.due_date,
            description: bill.description.clone(),
            charges: ChargesView {
                line_items: bill.line_items.clone(),
                rent: bill.line_items.rent_amount(),
                one_time: bill.line_items.one_time_charges(),
                total: bill.total(),
            },
            payment: StagedPaymentView {
                method: bill.payment_method,
                amount_paid: bill.amount_paid,
                credit_applied: bill.credit_applied,
                advance_amount: bill.advance_amount,
                months_covered: bill.months_covered,
                gateway_transaction_id: bill.gateway_transaction_id.clone(),
                payment_id: bill.payment_id,
                resubmission_count: bill.resubmission_count,
            },
            is_advance_payment: bill.is_advance_payment,
            updated_at: bill.updated_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementView {
    pub bill: BillView,
    pub payment_id: PaymentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub advance_months_created: u32,
    pub advance_due_dates: Vec<NaiveDate>,
    pub replayed: bool,
}

impl SettlementView {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        SettlementView {
            bill: BillView::from_bill(&settlement.bill),
            payment_id: settlement.payment.id,
            amount: settlement.payment.amount,
            method: settlement.payment.method,
            advance_months_created: settlement.advance_months_created,
            advance_due_dates: settlement.advance_bills.iter().map(|b| b.due_date).collect(),
            replayed: settlement.replayed,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentProof;
    use uuid::Uuid;

    #[test]
    fn test_bill_view_json() {
        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4(),
            tenancy_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            landlord_id: Uuid::new_v4(),
            line_items: LineItems::rent_only(Money::from_major(10_000)).with_water(Money::from_major(250)),
            amount_paid: Money::ZERO,
            credit_applied: Money::ZERO,
            advance_amount: Money::ZERO,
            months_covered: 0,
            payment_method: None,
            proof: PaymentProof::none(),
            gateway_transaction_id: None,
            resubmission_count: 0,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: Some("january".to_string()),
            receipt_artifact: None,
            is_advance_payment: false,
            payment_id: None,
            status: BillStatus::PendingConfirmation,
            created_at: now,
            updated_at: now,
        };

        let json = BillView::from_bill(&bill).to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "pending_confirmation");
        assert_eq!(value["charges"]["total"], "10250");
        assert_eq!(value["charges"]["one_time"], "250");
    }
}
