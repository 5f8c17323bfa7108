use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BillId, BillStatus, PaymentId, PaymentMethod, TenancyId, UserId};

/// all events emitted by the billing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // bill lifecycle
    BillIssued {
        bill_id: BillId,
        tenancy_id: TenancyId,
        tenant_id: UserId,
        amount: Money,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    BillEdited {
        bill_id: BillId,
        tenant_id: UserId,
        old_amount: Money,
        new_amount: Money,
        timestamp: DateTime<Utc>,
    },
    BillCancelled {
        bill_id: BillId,
        tenant_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        bill_id: BillId,
        old_status: BillStatus,
        new_status: BillStatus,
        timestamp: DateTime<Utc>,
    },

    // intake
    ConfirmationRequested {
        bill_id: BillId,
        landlord_id: UserId,
        amount_paid: Money,
        method: PaymentMethod,
        months_covered: u32,
        timestamp: DateTime<Utc>,
    },

    // settlement
    PaymentConfirmed {
        bill_id: BillId,
        payment_id: PaymentId,
        tenant_id: UserId,
        amount: Money,
        months_covered: u32,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        bill_id: BillId,
        tenant_id: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    AdvanceBillCreated {
        bill_id: BillId,
        parent_bill_id: BillId,
        due_date: NaiveDate,
        amount: Money,
    },
    CreditAdjusted {
        tenant_id: UserId,
        tenancy_id: TenancyId,
        old_balance: Money,
        new_balance: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    GatewayReplayIgnored {
        bill_id: BillId,
        transaction_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// event type label used for notifications
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BillIssued { .. } => "bill_issued",
            Event::BillEdited { .. } => "bill_edited",
            Event::BillCancelled { .. } => "bill_cancelled",
            Event::StatusChanged { .. } => "status_changed",
            Event::ConfirmationRequested { .. } => "confirmation_requested",
            Event::PaymentConfirmed { .. } => "payment_confirmed",
            Event::PaymentRejected { .. } => "payment_rejected",
            Event::AdvanceBillCreated { .. } => "advance_bill_created",
            Event::CreditAdjusted { .. } => "credit_adjusted",
            Event::GatewayReplayIgnored { .. } => "gateway_replay_ignored",
        }
    }

    /// who should hear about this event, if anyone
    pub fn recipient(&self) -> Option<UserId> {
        match self {
            Event::BillIssued { tenant_id, .. }
            | Event::BillEdited { tenant_id, .. }
            | Event::BillCancelled { tenant_id, .. }
            | Event::PaymentConfirmed { tenant_id, .. }
            | Event::PaymentRejected { tenant_id, .. }
            | Event::CreditAdjusted { tenant_id, .. } => Some(*tenant_id),
            Event::ConfirmationRequested { landlord_id, .. } => Some(*landlord_id),
            Event::StatusChanged { .. }
            | Event::AdvanceBillCreated { .. }
            | Event::GatewayReplayIgnored { .. } => None,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_recipients() {
        let tenant = Uuid::new_v4();
        let landlord = Uuid::new_v4();
        let now = Utc::now();

        let rejected = Event::PaymentRejected {
            bill_id: Uuid::new_v4(),
            tenant_id: tenant,
            amount: Money::from_major(500),
            timestamp: now,
        };
        assert_eq!(rejected.recipient(), Some(tenant));
        assert_eq!(rejected.event_type(), "payment_rejected");

        let requested = Event::ConfirmationRequested {
            bill_id: Uuid::new_v4(),
            landlord_id: landlord,
            amount_paid: Money::from_major(500),
            method: PaymentMethod::Cash,
            months_covered: 1,
            timestamp: now,
        };
        assert_eq!(requested.recipient(), Some(landlord));

        let status = Event::StatusChanged {
            bill_id: Uuid::new_v4(),
            old_status: BillStatus::Pending,
            new_status: BillStatus::Cancelled,
            timestamp: now,
        };
        assert_eq!(status.recipient(), None);
    }

    #[test]
    fn test_event_store_take() {
        let mut store = EventStore::new();
        store.emit(Event::GatewayReplayIgnored {
            bill_id: Uuid::new_v4(),
            transaction_id: "pay_1".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(store.events().len(), 1);
        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_serialized_tag() {
        let event = Event::GatewayReplayIgnored {
            bill_id: Uuid::nil(),
            transaction_id: "pay_1".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "gateway_replay_ignored");
    }
}
