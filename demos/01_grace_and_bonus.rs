/// grace and bonus - grace periods, good-payer bonus, insurance and upfront costs
use chrono::{NaiveDate, TimeZone, Utc};
use mortgage_engine_rs::{
    BonusTerms, CalculationContext, Capitalization, CostBase, CostItem, GraceKind,
    LoanParameters, Money, MortgageEngine, RateKind, ResidualPolicy, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== grace and bonus example ===\n");

    let params = LoanParameters::builder()
        .principal(Money::from_major(200_000))
        .rate(dec!(11), RateKind::Nominal)
        .capitalization(Capitalization::Daily)
        .term(180)
        .grace(GraceKind::Total, 6)
        .life_insurance(dec!(0.05))
        .property_insurance(dec!(0.03))
        .bonus(BonusTerms::enabled(12, dec!(0.5)))
        .cok(dec!(10))
        .cost(CostItem::fixed("notary", Money::from_major(450)))
        .cost(CostItem::percentage("appraisal", dec!(0.25), CostBase::PropertyValue))
        .property_value(Money::from_major(250_000))
        .start_date(NaiveDate::from_ymd_opt(2024, 1, 31).ok_or("bad date")?)
        .build()?;

    // deterministic time, closing the last balance at zero
    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()));
    let ctx = CalculationContext::standard().with_residual_policy(ResidualPolicy::AbsorbIntoFinalPayment);
    let result = MortgageEngine::new(ctx.clone()).calculate(&params, &time)?;

    println!("periodic rate: {}", ctx.rate_str(result.periodic_rate));
    println!("upfront costs: {}", ctx.money_str(result.upfront_total));
    println!("net disbursement: {}\n", ctx.money_str(result.net_disbursement));

    println!("period  date        interest   bonus   total due     balance");
    for row in result.schedule.rows.iter().take(14) {
        println!(
            "{:>6}  {}  {:>9}  {:>6}  {:>9}  {:>10}{}",
            row.period,
            row.date,
            ctx.money_str(row.interest),
            ctx.money_str(row.bonus),
            ctx.money_str(row.total_due),
            ctx.money_str(row.balance),
            if row.is_grace() { "  (grace)" } else { "" }
        );
    }

    let totals = &result.schedule.totals;
    println!("\ntotal interest: {}", ctx.money_str(totals.interest));
    println!("total paid: {}", ctx.money_str(totals.paid));
    println!("final balance: {}", ctx.money_str(result.schedule.final_balance));

    println!("\nirr (monthly): {}%", ctx.percent_str(result.indicators.irr));
    println!("tcea: {}%", ctx.percent_str(result.indicators.tcea));
    println!("npv at cok: {}", ctx.money_str(result.indicators.npv));

    Ok(())
}
