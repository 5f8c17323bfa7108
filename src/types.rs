use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a bill
pub type BillId = Uuid;

/// unique identifier for a settlement record
pub type PaymentId = Uuid;

/// unique identifier for a tenancy (occupancy)
pub type TenancyId = Uuid;

/// tenant or landlord account id
pub type UserId = Uuid;

/// bill status, wire-exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// issued, awaiting payment
    Pending,
    /// tenant claims payment, landlord must confirm
    PendingConfirmation,
    /// settled
    Paid,
    /// withdrawn by landlord
    Cancelled,
    /// landlord disputed the tenant's claim
    Rejected,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::PendingConfirmation => "pending_confirmation",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
            BillStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// payment channel, wire-exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    QrCode,
    Gateway,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::QrCode => "qr_code",
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// how an advance amount is turned into future rent months at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceMonthPolicy {
    /// only whole months of advance rent become bills, the fraction goes to credit
    WholeMonths,
    /// a partially paid trailing month is granted in full
    CoverPartialMonth,
}

/// reference to an externally stored artifact (receipt image, transfer screenshot)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn new(location: impl Into<String>) -> Self {
        ArtifactRef(location.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// tenant-supplied proof of payment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentProof {
    pub reference_number: Option<String>,
    pub artifact: Option<ArtifactRef>,
}

impl PaymentProof {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference_number: Some(reference.into()),
            artifact: None,
        }
    }

    pub fn artifact(location: impl Into<String>) -> Self {
        Self {
            reference_number: None,
            artifact: Some(ArtifactRef::new(location)),
        }
    }

    /// true when neither a non-blank reference nor a non-blank artifact is present
    pub fn is_empty(&self) -> bool {
        let has_reference = self
            .reference_number
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false);
        let has_artifact = self.artifact.as_ref().map(|a| !a.is_blank()).unwrap_or(false);
        !has_reference && !has_artifact
    }
}

/// credit balances are keyed per tenant per tenancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreditKey {
    pub tenant_id: UserId,
    pub tenancy_id: TenancyId,
}

impl CreditKey {
    pub fn new(tenant_id: UserId, tenancy_id: TenancyId) -> Self {
        Self {
            tenant_id,
            tenancy_id,
        }
    }
}

/// recurring jobs guarded by a persisted last-run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    MonthlyRent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            serde_json::to_string(&BillStatus::PendingConfirmation).unwrap(),
            "\"pending_confirmation\""
        );
        assert_eq!(serde_json::to_string(&PaymentMethod::QrCode).unwrap(), "\"qr_code\"");
        let status: BillStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, BillStatus::Cancelled);
        assert_eq!(BillStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_blank_proof_is_empty() {
        assert!(PaymentProof::none().is_empty());
        assert!(PaymentProof::reference("   ").is_empty());
        assert!(PaymentProof::artifact("").is_empty());
        assert!(!PaymentProof::reference("TXN-881").is_empty());
        assert!(!PaymentProof::artifact("proofs/881.png").is_empty());
    }
}
