pub mod bills;
pub mod config;
pub mod contract;
pub mod credit;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod jobs;
pub mod notify;
pub mod payments;
pub mod reports;
pub mod store;
pub mod tenancy;
pub mod types;
pub mod views;

// re-export key types
pub use bills::{Bill, BillDraft, BillLedger, BillTransition, LineItems};
pub use config::{ContractTerms, EngineConfig, IntakeConfig, SettlementConfig};
pub use contract::{ContractLimit, ContractLimitCalculator};
pub use credit::CreditLedger;
pub use decimal::{Money, Rate};
pub use engine::BillingEngine;
pub use errors::{BillingError, Result};
pub use events::{Event, EventStore};
pub use jobs::MonthlyRentJob;
pub use notify::{
    DispatchError, NoopDispatcher, Notification, NotificationDispatcher, RecordingDispatcher,
};
pub use payments::{
    ChargeRequest, GatewayCharge, GatewayError, Payment, PaymentGateway, PaymentQuote,
    SandboxGateway, Settlement, Submission,
};
pub use reports::IncomeReport;
pub use tenancy::{InMemoryTenancyDirectory, Tenancy, TenancyDirectory, TenancyStatus};
pub use types::{
    AdvanceMonthPolicy, ArtifactRef, BillId, BillStatus, CreditKey, PaymentId, PaymentMethod,
    PaymentProof, TenancyId, UserId,
};
pub use views::{BillView, SettlementView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
