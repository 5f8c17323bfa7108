use serde::{Deserialize, Serialize};

use crate::errors::{BillingError, Result};
use crate::types::BillStatus;

/// every status change a bill can undergo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillTransition {
    /// tenant claims payment (also re-entry after rejection)
    Submit,
    /// landlord confirms a staged payment
    Confirm,
    /// landlord confirms cash or credit without a staged claim
    ConfirmDirect,
    Cancel,
    Reject,
}

impl BillTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillTransition::Submit => "submit payment",
            BillTransition::Confirm => "confirm payment",
            BillTransition::ConfirmDirect => "confirm payment directly",
            BillTransition::Cancel => "cancel",
            BillTransition::Reject => "reject payment",
        }
    }
}

const TRANSITIONS: &[(BillStatus, BillTransition, BillStatus)] = &[
    (BillStatus::Pending, BillTransition::Submit, BillStatus::PendingConfirmation),
    (BillStatus::Rejected, BillTransition::Submit, BillStatus::PendingConfirmation),
    (BillStatus::Pending, BillTransition::ConfirmDirect, BillStatus::Paid),
    (BillStatus::PendingConfirmation, BillTransition::Confirm, BillStatus::Paid),
    (BillStatus::Pending, BillTransition::Cancel, BillStatus::Cancelled),
    (BillStatus::PendingConfirmation, BillTransition::Reject, BillStatus::Rejected),
];

impl BillStatus {
    /// target status for `transition` from here, if the edge exists
    pub fn next(self, transition: BillTransition) -> Option<BillStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, edge, _)| *from == self && *edge == transition)
            .map(|(_, _, to)| *to)
    }

    pub fn transition(self, transition: BillTransition) -> Result<BillStatus> {
        self.next(transition)
            .ok_or_else(|| BillingError::invalid_state(self, transition.as_str()))
    }

    pub fn can(self, transition: BillTransition) -> bool {
        self.next(transition).is_some()
    }
}
