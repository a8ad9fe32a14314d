//! Cost indicators of a loan's cash flow: IRR, TCEA and NPV.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CalculationContext;
use crate::decimal::{Money, Rate};
use crate::errors::{MortgageError, Result};
use crate::interest::{annualize_monthly, monthly_from_annual_percent};
use crate::payments::CashFlow;

const MAX_STEP_HALVINGS: u32 = 64;

/// outcome of the newton-raphson search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// periodic (monthly) rate as a fraction
    pub rate: Rate,
    /// false when the tolerance was not met; `rate` is then only the last estimate
    pub converged: bool,
    pub iterations: u32,
}

/// indicators at full precision; rounding is left to the output layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// monthly irr
    pub irr: Rate,
    /// annualized irr (TCEA)
    pub tcea: Rate,
    /// npv at the monthly equivalent of the cok
    pub npv: Money,
    pub cok_monthly: Rate,
    pub irr_converged: bool,
    pub irr_iterations: u32,
}

pub struct IndicatorCalculator<'a> {
    ctx: &'a CalculationContext,
}

impl<'a> IndicatorCalculator<'a> {
    pub fn new(ctx: &'a CalculationContext) -> Self {
        Self { ctx }
    }

    /// irr, tcea and npv for `flow`, discounting at an annual cok percentage
    pub fn calculate(&self, flow: &CashFlow, cok_percent: Decimal) -> Result<Indicators> {
        let solution = self.irr(flow);
        if !solution.converged {
            if self.ctx.require_irr_convergence {
                return Err(MortgageError::NumericDivergence {
                    iterations: solution.iterations,
                    last_estimate: solution.rate.as_decimal(),
                });
            }
            log::warn!(
                "irr did not converge after {} iterations, last estimate {}",
                solution.iterations,
                solution.rate
            );
        }

        let tcea = self.tcea(solution.rate)?;
        let cok_monthly = monthly_from_annual_percent(cok_percent)?;
        let npv = self.npv(flow, cok_monthly)?;

        log::debug!(
            "indicators: irr {} ({} iterations), tcea {}, npv {}",
            solution.rate,
            solution.iterations,
            tcea,
            npv
        );

        Ok(Indicators {
            irr: solution.rate,
            tcea,
            npv,
            cok_monthly,
            irr_converged: solution.converged,
            irr_iterations: solution.iterations,
        })
    }

    /// annualized cost rate from a monthly irr: (1 + irr)^12 - 1
    pub fn tcea(&self, monthly_irr: Rate) -> Result<Rate> {
        annualize_monthly(monthly_irr)
    }

    /// newton-raphson on f(r) = sum(flow[t] / (1 + r)^t)
    ///
    /// Stops when two successive estimates differ by less than the configured
    /// tolerance. A step that lands where the flows cannot be discounted
    /// (rate at or below -100%, or decimal overflow over long terms) is halved
    /// back toward the current estimate. A vanishing derivative or a step that
    /// cannot be recovered ends the search as non-converged.
    pub fn irr(&self, flow: &CashFlow) -> IrrSolution {
        let config = self.ctx.irr;
        let flows = flow.flows();
        let mut rate = config.guess;
        let Some(mut current) = npv_and_derivative(flows, rate) else {
            return not_converged(rate, 0);
        };

        for iteration in 1..=config.max_iterations {
            let (value, derivative) = current;
            if derivative.is_zero() {
                return not_converged(rate, iteration);
            }
            let Some(mut next) = value.checked_div(derivative).and_then(|step| rate.checked_sub(step)) else {
                return not_converged(rate, iteration);
            };

            let mut halvings = 0;
            let evaluated = loop {
                next = self.ctx.working(next);
                if let Some(evaluated) = npv_and_derivative(flows, next) {
                    break evaluated;
                }
                if halvings == MAX_STEP_HALVINGS {
                    return not_converged(rate, iteration);
                }
                next = (rate + next) / Decimal::TWO;
                halvings += 1;
            };

            if halvings == 0 && (next - rate).abs() < config.tolerance {
                return IrrSolution {
                    rate: Rate::from_decimal(next),
                    converged: true,
                    iterations: iteration,
                };
            }
            log::trace!("irr iteration {}: {} -> {} ({} halvings)", iteration, rate, next, halvings);
            rate = next;
            current = evaluated;
        }

        not_converged(rate, config.max_iterations)
    }

    /// npv at a periodic discount rate
    pub fn npv(&self, flow: &CashFlow, periodic_rate: Rate) -> Result<Money> {
        let one_plus_r = Decimal::ONE + periodic_rate.as_decimal();
        if one_plus_r <= Decimal::ZERO {
            return Err(MortgageError::invalid_input(
                "discount_rate",
                "must be greater than -100%",
            ));
        }

        let mut discount = Decimal::ONE;
        let mut result = Decimal::ZERO;
        for (t, cf) in flow.flows().iter().enumerate() {
            if t > 0 {
                discount = discount
                    .checked_mul(one_plus_r)
                    .ok_or_else(|| MortgageError::calculation(format!("npv discount overflow at period {t}")))?;
            }
            let present = cf
                .as_decimal()
                .checked_div(discount)
                .ok_or_else(|| MortgageError::calculation(format!("npv discount factor at period {t}")))?;
            result += present;
        }
        Ok(Money::from_decimal(result))
    }

    /// npv at the monthly equivalent of an annual effective percentage
    pub fn npv_at_annual(&self, flow: &CashFlow, annual_percent: Decimal) -> Result<Money> {
        self.npv(flow, monthly_from_annual_percent(annual_percent)?)
    }
}

fn not_converged(rate: Decimal, iterations: u32) -> IrrSolution {
    IrrSolution {
        rate: Rate::from_decimal(rate),
        converged: false,
        iterations,
    }
}

/// f(r) and f'(r) in one pass; `None` on overflow or r <= -100%
fn npv_and_derivative(flows: &[Money], rate: Decimal) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE.checked_div(one_plus_r)?;

    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    for (t, cf) in flows.iter().enumerate() {
        let cf = cf.as_decimal();
        let next = discount.checked_mul(v)?;
        value = value.checked_add(cf.checked_mul(discount)?)?;
        let weighted = Decimal::from(t as u64).checked_mul(cf)?.checked_mul(next)?;
        derivative = derivative.checked_sub(weighted)?;
        discount = next;
    }
    Some((value, derivative))
}
