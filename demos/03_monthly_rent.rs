/// monthly rent - scheduled rent bills with controlled time and an income report
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rental_billing_rs::{
    BillingEngine, EngineConfig, InMemoryTenancyDirectory, Money, NoopDispatcher, PaymentMethod,
    PaymentProof, SafeTimeProvider, Tenancy, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== monthly rent example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap()));
    let controller = time.test_control().expect("test time source");

    let start = NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?;
    let tenancy = Tenancy::builder()
        .start_date(start)
        .contract_end_date(NaiveDate::from_ymd_opt(2024, 6, 30).ok_or("bad date")?)
        .monthly_rent(Money::from_major(9_500))
        .security_deposit(Money::from_major(9_500))
        .build()?;
    let directory = Arc::new(InMemoryTenancyDirectory::new());
    directory.insert(tenancy.clone())?;
    let engine = BillingEngine::new(EngineConfig::standard(), directory, Arc::new(NoopDispatcher))?;

    // run the job daily for eight months
    for _ in 0..240 {
        if let Some(bill) = engine.generate_monthly_rent(tenancy.id, &time)? {
            println!("{} issued rent due {}", time.now().format("%Y-%m-%d"), bill.due_date);
            engine.submit_payment(
                bill.id,
                tenancy.tenant_id,
                bill.total(),
                PaymentMethod::QrCode,
                PaymentProof::reference(format!("TRF-{}", bill.due_date.format("%Y%m"))),
                &time,
            )?;
            engine.confirm_payment(bill.id, tenancy.landlord_id, &time)?;
        }
        controller.advance(Duration::days(1));
    }

    let report = engine.income_report(
        tenancy.landlord_id,
        start,
        time.now().date_naive(),
    )?;
    println!("\n{}", report.to_json_pretty()?);

    Ok(())
}
