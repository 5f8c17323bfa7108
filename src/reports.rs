use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::payments::Payment;
use crate::types::{PaymentMethod, UserId};

const METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Cash,
    PaymentMethod::QrCode,
    PaymentMethod::Gateway,
    PaymentMethod::Credit,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub amount: Money,
    pub count: u32,
}

/// a landlord's confirmed income over an inclusive date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeReport {
    pub landlord_id: UserId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: Money,
    pub payment_count: u32,
    pub advance_months: u32,
    pub by_method: Vec<MethodTotal>,
}

impl IncomeReport {
    pub fn build(landlord_id: UserId, from: NaiveDate, to: NaiveDate, payments: &[Payment]) -> Result<Self> {
        if to < from {
            return Err(BillingError::validation("report range ends before it starts"));
        }

        let in_range: Vec<&Payment> = payments
            .iter()
            .filter(|p| p.landlord_id == landlord_id)
            .filter(|p| {
                let day = p.created_at.date_naive();
                day >= from && day <= to
            })
            .collect();

        let by_method = METHODS
            .iter()
            .filter_map(|method| {
                let matching: Vec<&&Payment> = in_range.iter().filter(|p| p.method == *method).collect();
                if matching.is_empty() {
                    return None;
                }
                Some(MethodTotal {
                    method: *method,
                    amount: matching.iter().map(|p| p.amount).sum(),
                    count: matching.len() as u32,
                })
            })
            .collect();

        Ok(Self {
            landlord_id,
            from,
            to,
            total: in_range.iter().map(|p| p.amount).sum(),
            payment_count: in_range.len() as u32,
            advance_months: in_range.iter().map(|p| p.advance_months).sum(),
            by_method,
        })
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn payment(landlord_id: UserId, method: PaymentMethod, amount: i64, day: u32, advance: u32) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            bill_id: Uuid::new_v4(),
            tenancy_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            landlord_id,
            amount: Money::from_major(amount),
            method,
            gateway_transaction_id: None,
            advance_months: advance,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_report_groups_by_method_within_range() {
        let landlord = Uuid::new_v4();
        let payments = vec![
            payment(landlord, PaymentMethod::Cash, 10_000, 1, 0),
            payment(landlord, PaymentMethod::Cash, 25_000, 10, 1),
            payment(landlord, PaymentMethod::Gateway, 8_000, 20, 0),
            payment(landlord, PaymentMethod::QrCode, 9_000, 31, 0),
            payment(Uuid::new_v4(), PaymentMethod::Cash, 99_000, 5, 0),
        ];
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let report = IncomeReport::build(landlord, from, to, &payments).unwrap();
        assert_eq!(report.total, Money::from_major(43_000));
        assert_eq!(report.payment_count, 3);
        assert_eq!(report.advance_months, 1);
        assert_eq!(report.by_method.len(), 2);
        assert_eq!(report.by_method[0].method, PaymentMethod::Cash);
        assert_eq!(report.by_method[0].amount, Money::from_major(35_000));
        assert_eq!(report.by_method[1].count, 1);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(IncomeReport::build(Uuid::new_v4(), from, to, &[]).is_err());
    }
}
