/// quick start - issue a bill, pay it in cash, confirm it
use std::sync::Arc;

use chrono::NaiveDate;
use rental_billing_rs::{
    BillDraft, BillView, BillingEngine, EngineConfig, InMemoryTenancyDirectory, LineItems, Money,
    NoopDispatcher, PaymentMethod, PaymentProof, SafeTimeProvider, SettlementView, Tenancy,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let time = SafeTimeProvider::new(TimeSource::System);

    let tenancy = Tenancy::builder()
        .start_date(time.now().date_naive())
        .monthly_rent(Money::from_major(10_000))
        .build()?;
    let directory = Arc::new(InMemoryTenancyDirectory::new());
    directory.insert(tenancy.clone())?;

    let engine = BillingEngine::new(EngineConfig::standard(), directory, Arc::new(NoopDispatcher))?;

    // rent plus water
    let due = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let bill = engine.issue_bill(
        tenancy.id,
        BillDraft::new(
            LineItems::rent_only(Money::from_major(10_000)).with_water(Money::from_major(350)),
            due,
        ),
        &time,
    )?;
    println!("{}", BillView::from_bill(&bill).to_json_pretty()?);

    engine.submit_payment(
        bill.id,
        tenancy.tenant_id,
        bill.total(),
        PaymentMethod::Cash,
        PaymentProof::none(),
        &time,
    )?;

    let settlement = engine.confirm_payment(bill.id, tenancy.landlord_id, &time)?;
    println!("{}", SettlementView::from_settlement(&settlement).to_json_pretty()?);

    Ok(())
}
