use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::CalculationContext;
use crate::costs::{CostBreakdown, InitialCostCalculator};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::indicators::{IndicatorCalculator, Indicators};
use crate::interest::RateConverter;
use crate::params::LoanParameters;
use crate::payments::{CashFlow, CashFlowBuilder, Schedule, ScheduleGenerator, ScheduleTerms};
use crate::types::Currency;

/// everything one calculation produces, at full precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// monthly effective rate (TEM) applied to the schedule
    pub periodic_rate: Rate,
    pub schedule: Schedule,
    pub indicators: Indicators,
    pub upfront_total: Money,
    pub cost_breakdown: Vec<CostBreakdown>,
    /// principal minus upfront costs
    pub net_disbursement: Money,
    pub cash_flow: CashFlow,
    pub start_date: NaiveDate,
    pub currency: Currency,
    /// non-fatal conditions the caller should surface
    pub warnings: Vec<String>,
}

impl SimulationResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// calculation entrypoint
///
/// Holds only the immutable context, so one engine can serve any number of
/// concurrent calculations.
#[derive(Debug, Clone, Default)]
pub struct MortgageEngine {
    ctx: CalculationContext,
}

impl MortgageEngine {
    pub fn new(ctx: CalculationContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &CalculationContext {
        &self.ctx
    }

    /// rate conversion, costs, schedule, cash flow and indicators in one pass
    ///
    /// Parameters are validated before anything is computed. When no start
    /// date is given, today's date from `time_provider` is used.
    pub fn calculate(
        &self,
        params: &LoanParameters,
        time_provider: &SafeTimeProvider,
    ) -> Result<SimulationResult> {
        params.validate()?;

        let periodic_rate = RateConverter::new(&self.ctx).for_loan(params)?;

        let costs = InitialCostCalculator::for_loan(params);
        let cost_breakdown = costs.breakdown(&params.costs);
        let upfront_total = costs.total(&params.costs);

        let start_date = params
            .start_date
            .unwrap_or_else(|| time_provider.now().date_naive());
        let terms = ScheduleTerms::from_loan(params, periodic_rate, start_date);
        let schedule = ScheduleGenerator::new(&self.ctx, terms).generate()?;

        let cash_flow = CashFlowBuilder::build(params.principal, upfront_total, &schedule);
        let indicators = IndicatorCalculator::new(&self.ctx).calculate(&cash_flow, params.cok_percent)?;

        let mut warnings = Vec::new();
        if !indicators.irr_converged {
            warnings.push(format!(
                "irr did not converge within {} iterations; irr and tcea are estimates",
                indicators.irr_iterations
            ));
        }

        log::debug!(
            "simulated {} {} over {} periods at {}: upfront {}, tcea {}",
            params.currency,
            params.principal,
            params.term,
            periodic_rate,
            upfront_total,
            indicators.tcea
        );

        Ok(SimulationResult {
            periodic_rate,
            schedule,
            indicators,
            upfront_total,
            cost_breakdown,
            net_disbursement: params.principal - upfront_total,
            cash_flow,
            start_date,
            currency: params.currency,
            warnings,
        })
    }
}
