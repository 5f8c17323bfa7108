use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{TenancyId, UserId};

/// occupancy status as far as billing is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyStatus {
    Active,
    Ended,
}

/// lease facts the engine reads but never writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenancy {
    pub id: TenancyId,
    pub tenant_id: UserId,
    pub landlord_id: UserId,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    /// `None` is an open-ended lease
    pub contract_end_date: Option<NaiveDate>,
    pub monthly_rent: Money,
    pub security_deposit: Money,
    pub status: TenancyStatus,
}

impl Tenancy {
    pub fn builder() -> TenancyBuilder {
        TenancyBuilder::new()
    }

    pub fn is_active(&self) -> bool {
        self.status == TenancyStatus::Active
    }
}

/// source of tenancy records
pub trait TenancyDirectory: Send + Sync {
    fn get_tenancy(&self, tenancy_id: TenancyId) -> Result<Tenancy>;
}

/// directory backed by a map, for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryTenancyDirectory {
    tenancies: RwLock<HashMap<TenancyId, Tenancy>>,
}

impl InMemoryTenancyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenancy: Tenancy) -> Result<()> {
        let mut tenancies = self.tenancies.write().map_err(|_| BillingError::Storage {
            message: "tenancy directory lock poisoned".to_string(),
        })?;
        tenancies.insert(tenancy.id, tenancy);
        Ok(())
    }
}

impl TenancyDirectory for InMemoryTenancyDirectory {
    fn get_tenancy(&self, tenancy_id: TenancyId) -> Result<Tenancy> {
        let tenancies = self.tenancies.read().map_err(|_| BillingError::Storage {
            message: "tenancy directory lock poisoned".to_string(),
        })?;
        tenancies
            .get(&tenancy_id)
            .cloned()
            .ok_or_else(|| BillingError::not_found("tenancy", tenancy_id))
    }
}

/// builder for tenancy records
pub struct TenancyBuilder {
    id: Option<TenancyId>,
    tenant_id: Option<UserId>,
    landlord_id: Option<UserId>,
    property_id: Option<Uuid>,
    start_date: Option<NaiveDate>,
    contract_end_date: Option<NaiveDate>,
    monthly_rent: Option<Money>,
    security_deposit: Money,
    status: TenancyStatus,
}

impl TenancyBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            tenant_id: None,
            landlord_id: None,
            property_id: None,
            start_date: None,
            contract_end_date: None,
            monthly_rent: None,
            security_deposit: Money::ZERO,
            status: TenancyStatus::Active,
        }
    }

    pub fn id(mut self, id: TenancyId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn tenant(mut self, tenant_id: UserId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn landlord(mut self, landlord_id: UserId) -> Self {
        self.landlord_id = Some(landlord_id);
        self
    }

    pub fn property(mut self, property_id: Uuid) -> Self {
        self.property_id = Some(property_id);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn contract_end_date(mut self, date: NaiveDate) -> Self {
        self.contract_end_date = Some(date);
        self
    }

    pub fn monthly_rent(mut self, rent: Money) -> Self {
        self.monthly_rent = Some(rent);
        self
    }

    pub fn security_deposit(mut self, deposit: Money) -> Self {
        self.security_deposit = deposit;
        self
    }

    pub fn status(mut self, status: TenancyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Result<Tenancy> {
        let start_date = self
            .start_date
            .ok_or_else(|| BillingError::validation("start date required"))?;

        let monthly_rent = self
            .monthly_rent
            .ok_or_else(|| BillingError::validation("monthly rent required"))?;

        if !monthly_rent.is_positive() {
            return Err(BillingError::validation("monthly rent must be positive"));
        }

        if self.security_deposit.is_negative() {
            return Err(BillingError::validation("security deposit cannot be negative"));
        }

        if let Some(end) = self.contract_end_date {
            if end < start_date {
                return Err(BillingError::validation("contract ends before it starts"));
            }
        }

        Ok(Tenancy {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            tenant_id: self.tenant_id.unwrap_or_else(Uuid::new_v4),
            landlord_id: self.landlord_id.unwrap_or_else(Uuid::new_v4),
            property_id: self.property_id.unwrap_or_else(Uuid::new_v4),
            start_date,
            contract_end_date: self.contract_end_date,
            monthly_rent,
            security_deposit: self.security_deposit,
            status: self.status,
        })
    }
}

impl Default for TenancyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
