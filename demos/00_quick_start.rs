/// quick start - minimal example to get started
use mortgage_engine_rs::{
    CalculationContext, LoanParameters, Money, MortgageEngine, RateKind, SafeTimeProvider,
    SimulationResponse, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a 150,000 mortgage at 9.5% effective annual over 20 years
    let params = LoanParameters::builder()
        .principal(Money::from_major(150_000))
        .rate(dec!(9.5), RateKind::Effective)
        .term(240)
        .build()?;

    let ctx = CalculationContext::standard();
    let time = SafeTimeProvider::new(TimeSource::System);
    let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time)?;

    // print the wire view
    println!("{}", SimulationResponse::from_result(&result, &ctx).to_json_pretty()?);

    Ok(())
}
