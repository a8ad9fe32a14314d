/// json request - parse a wire payload and build the persistence record
use mortgage_engine_rs::{
    CalculationContext, Money, MortgageEngine, PropertySnapshot, PropertyStatus, SafeTimeProvider,
    SimulationRecord, SimulationRequest, TimeSource,
};

const REQUEST: &str = r#"{
    "principal": "95000",
    "rate_value": "12",
    "rate_kind": "Nominal",
    "capitalization": "Monthly",
    "term": 120,
    "grace_kind": "Partial",
    "grace_periods": "3",
    "life_insurance_percent": 0.028,
    "cok_percent": "9",
    "currency": "USD",
    "costs": [
        {"name": "registry", "kind": "Fixed", "value": "120.50"},
        {"name": "commission", "kind": "Percentage", "value": 1, "base": "Principal"}
    ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== json request example ===\n");

    let params = SimulationRequest::from_json(REQUEST)?.into_parameters()?;

    let ctx = CalculationContext::strict();
    let time = SafeTimeProvider::new(TimeSource::System);
    let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time)?;

    let property = PropertySnapshot {
        code: "TWR-B-804".to_string(),
        address: "Calle Los Olivos 210".to_string(),
        sale_value: Money::from_major(120_000),
        status: PropertyStatus::UnderConstruction,
    };
    let record = SimulationRecord::new("client-0017", Some(property), &params, &result, &ctx, &time);

    println!("record {} created at {}", record.id, record.created_at);
    println!("{}", record.to_json_pretty()?);

    // a missing principal is rejected before anything is computed
    match SimulationRequest::from_json(r#"{"rate_value": 10, "term": 12}"#)?.into_parameters() {
        Ok(_) => println!("unexpectedly accepted"),
        Err(e) => println!("\nrejected: {e}"),
    }

    Ok(())
}
