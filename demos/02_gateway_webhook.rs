/// gateway webhook - charge through a gateway, confirm twice, settle once
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rental_billing_rs::{
    BillDraft, BillingEngine, EngineConfig, InMemoryTenancyDirectory, LineItems, Money,
    NoopDispatcher, SafeTimeProvider, SandboxGateway, Tenancy, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== gateway webhook example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
    let due = NaiveDate::from_ymd_opt(2024, 5, 1).ok_or("bad date")?;

    let tenancy = Tenancy::builder()
        .start_date(due)
        .monthly_rent(Money::from_major(12_000))
        .build()?;
    let directory = Arc::new(InMemoryTenancyDirectory::new());
    directory.insert(tenancy.clone())?;
    let engine = BillingEngine::new(EngineConfig::standard(), directory, Arc::new(NoopDispatcher))?;
    let gateway = SandboxGateway::new();

    let bill = engine.issue_bill(
        tenancy.id,
        BillDraft::new(LineItems::rent_only(Money::from_major(12_000)).with_wifi(Money::from_major(800)), due),
        &time,
    )?;

    let staged = engine.submit_gateway_payment(bill.id, tenancy.tenant_id, bill.total(), &gateway, &time)?;
    let tx = staged.gateway_transaction_id.clone().ok_or("no transaction id")?;
    println!("charged {} as {}", bill.total(), tx);

    // webhooks are delivered at least once
    for attempt in 1..=2 {
        let settlement = engine.confirm_gateway_payment(bill.id, &tx, bill.total(), &time)?;
        println!(
            "delivery {}: payment {} replayed={}",
            attempt, settlement.payment.id, settlement.replayed
        );
    }

    println!("payments recorded: {}", engine.payments_for_tenancy(tenancy.id)?.len());
    Ok(())
}
