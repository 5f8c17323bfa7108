/// advance payment - one payment spread over future months, remainder to credit
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rental_billing_rs::{
    BillDraft, BillingEngine, BillingError, EngineConfig, InMemoryTenancyDirectory, LineItems,
    Money, PaymentMethod, PaymentProof, RecordingDispatcher, SafeTimeProvider, Tenancy, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== advance payment example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()));
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let end = NaiveDate::from_ymd_opt(2024, 4, 1).ok_or("bad date")?;

    // three month lease, no deposit
    let tenancy = Tenancy::builder()
        .start_date(start)
        .contract_end_date(end)
        .monthly_rent(Money::from_major(10_000))
        .build()?;
    let directory = Arc::new(InMemoryTenancyDirectory::new());
    directory.insert(tenancy.clone())?;
    let notifier = Arc::new(RecordingDispatcher::new());

    for config in [EngineConfig::standard(), EngineConfig::cover_partial_month()] {
        println!("policy: {:?}", config.settlement.advance_policy);
        let engine = BillingEngine::new(config, directory.clone(), notifier.clone())?;

        let bill = engine.issue_bill(
            tenancy.id,
            BillDraft::new(LineItems::rent_only(Money::from_major(10_000)), start),
            &time,
        )?;

        // more than the contract allows
        match engine.submit_payment(
            bill.id,
            tenancy.tenant_id,
            Money::from_major(35_000),
            PaymentMethod::Cash,
            PaymentProof::none(),
            &time,
        ) {
            Err(BillingError::ExceedsContract { limit, requested }) => {
                println!("  refused {}: limit {}", requested, limit)
            }
            other => println!("  unexpected: {:?}", other),
        }

        let quote = engine.quote_payment(bill.id, tenancy.tenant_id, Money::from_major(25_000), &time)?;
        println!("  25000 covers {} months", quote.months_covered);

        engine.submit_payment(
            bill.id,
            tenancy.tenant_id,
            Money::from_major(25_000),
            PaymentMethod::Cash,
            PaymentProof::none(),
            &time,
        )?;
        let settlement = engine.confirm_payment(bill.id, tenancy.landlord_id, &time)?;

        for advance in &settlement.advance_bills {
            println!("  advance bill due {}", advance.due_date);
        }
        println!(
            "  credit carried forward: {}\n",
            engine.credit_balance(tenancy.tenant_id, tenancy.id)?
        );
    }

    println!("notifications sent: {}", notifier.sent().len());
    Ok(())
}
