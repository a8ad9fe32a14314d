use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::decimal::{Money, Rate};
use crate::types::ResidualPolicy;

/// immutable numeric configuration threaded through every calculation
///
/// There is no process-wide precision setting: each call receives the
/// context it should use, so concurrent callers can run with different
/// settings without coordination.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationContext {
    /// scale carried by intermediate rates and balances
    pub working_scale: u32,
    /// scale of monetary output
    pub money_scale: u32,
    /// scale of the periodic rate on the wire (as a fraction)
    pub rate_scale: u32,
    /// scale of indicator percentages
    pub percent_scale: u32,
    /// rounding applied at the output boundary
    pub rounding: RoundingStrategy,
    pub irr: IrrConfig,
    pub residual_policy: ResidualPolicy,
    /// turn a non-converged irr into an error instead of a warning
    pub require_irr_convergence: bool,
}

/// newton-raphson solver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrrConfig {
    pub guess: Decimal,
    pub tolerance: Decimal,
    pub max_iterations: u32,
}

impl Default for IrrConfig {
    fn default() -> Self {
        Self {
            guess: dec!(0.1),
            tolerance: dec!(0.000001),
            max_iterations: 1000,
        }
    }
}

impl Default for CalculationContext {
    fn default() -> Self {
        Self::standard()
    }
}

impl CalculationContext {
    /// 20-place working precision, 2-place money, half-up rounding
    pub fn standard() -> Self {
        Self {
            working_scale: 20,
            money_scale: 2,
            rate_scale: 6,
            percent_scale: 2,
            rounding: RoundingStrategy::MidpointAwayFromZero,
            irr: IrrConfig::default(),
            residual_policy: ResidualPolicy::Carry,
            require_irr_convergence: false,
        }
    }

    /// like `standard`, but a non-converged irr fails the calculation
    pub fn strict() -> Self {
        Self {
            require_irr_convergence: true,
            ..Self::standard()
        }
    }

    pub fn with_residual_policy(mut self, policy: ResidualPolicy) -> Self {
        self.residual_policy = policy;
        self
    }

    pub fn with_irr(mut self, irr: IrrConfig) -> Self {
        self.irr = irr;
        self
    }

    /// cap an intermediate value at the working scale
    pub fn working(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.working_scale, self.rounding)
    }

    /// round a monetary value for output
    pub fn money(&self, value: Money) -> Money {
        value.round_to(self.money_scale, self.rounding)
    }

    pub fn money_str(&self, value: Money) -> String {
        value.to_fixed(self.money_scale, self.rounding)
    }

    pub fn rate_str(&self, rate: Rate) -> String {
        rate.to_fixed(self.rate_scale, self.rounding)
    }

    pub fn percent_str(&self, rate: Rate) -> String {
        rate.to_fixed_percentage(self.percent_scale, self.rounding)
    }
}
