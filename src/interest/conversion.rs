use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::config::CalculationContext;
use crate::decimal::Rate;
use crate::errors::{MortgageError, Result};
use crate::params::LoanParameters;
use crate::types::{Capitalization, RateKind};

/// days in a commercial year and month for daily capitalization
const COMMERCIAL_YEAR_DAYS: u32 = 360;
const COMMERCIAL_MONTH_DAYS: u64 = 30;
const MONTHS_PER_YEAR: u64 = 12;

/// normalizes an annual quotation into the monthly effective rate (TEM)
pub struct RateConverter<'a> {
    ctx: &'a CalculationContext,
}

impl<'a> RateConverter<'a> {
    pub fn new(ctx: &'a CalculationContext) -> Self {
        Self { ctx }
    }

    /// periodic rate for a loan's quoted rate
    pub fn for_loan(&self, params: &LoanParameters) -> Result<Rate> {
        self.periodic_rate(Some(params.rate_value), params.rate_kind, params.capitalization)
    }

    /// convert an annual percentage into a monthly effective fraction
    ///
    /// `capitalization` only matters for nominal rates.
    pub fn periodic_rate(
        &self,
        rate_value: Option<Decimal>,
        kind: RateKind,
        capitalization: Capitalization,
    ) -> Result<Rate> {
        let value = rate_value
            .ok_or_else(|| MortgageError::invalid_input("rate_value", "is required"))?;
        if value <= Decimal::ZERO {
            return Err(MortgageError::invalid_input("rate_value", "must be greater than zero"));
        }

        let r = value / Decimal::ONE_HUNDRED;
        let periodic = match (kind, capitalization) {
            (RateKind::Nominal, Capitalization::Daily) => {
                let daily = r / Decimal::from(COMMERCIAL_YEAR_DAYS);
                compound(daily, COMMERCIAL_MONTH_DAYS)?
            }
            (RateKind::Nominal, Capitalization::Monthly) => r / Decimal::from(MONTHS_PER_YEAR),
            (RateKind::Effective, _) => root(r, MONTHS_PER_YEAR)?,
        };

        log::trace!(
            "converted {}% {:?}/{:?} to periodic rate {}",
            value,
            kind,
            capitalization,
            periodic
        );
        Ok(Rate::from_decimal(self.ctx.working(periodic)))
    }
}

/// (1 + rate)^periods - 1
pub fn compound(rate: Decimal, periods: u64) -> Result<Decimal> {
    let factor = (Decimal::ONE + rate)
        .checked_powu(periods)
        .ok_or_else(|| MortgageError::calculation("compounding factor overflow"))?;
    Ok(factor - Decimal::ONE)
}

/// (1 + rate)^(1/periods) - 1
pub fn root(rate: Decimal, periods: u64) -> Result<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(MortgageError::calculation("rate must be greater than -100%"));
    }
    let exponent = Decimal::ONE / Decimal::from(periods);
    let factor = base
        .checked_powd(exponent)
        .ok_or_else(|| MortgageError::calculation("fractional power overflow"))?;
    Ok(factor - Decimal::ONE)
}

/// annual effective rate equivalent to a monthly rate
pub fn annualize_monthly(monthly: Rate) -> Result<Rate> {
    Ok(Rate::from_decimal(compound(monthly.as_decimal(), MONTHS_PER_YEAR)?))
}

/// monthly effective rate equivalent to an annual effective percentage
pub fn monthly_from_annual_percent(annual_percent: Decimal) -> Result<Rate> {
    if annual_percent.is_zero() {
        return Ok(Rate::ZERO);
    }
    let monthly = root(annual_percent / dec!(100), MONTHS_PER_YEAR)?;
    Ok(Rate::from_decimal(monthly))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: Rate, expected: Decimal, tolerance: Decimal) -> bool {
        (actual.as_decimal() - expected).abs() < tolerance
    }

    #[test]
    fn test_effective_annual_to_monthly() {
        let ctx = CalculationContext::standard();
        let tem = RateConverter::new(&ctx)
            .periodic_rate(Some(dec!(10)), RateKind::Effective, Capitalization::Monthly)
            .unwrap();
        // 1.10^(1/12) - 1
        assert!(close(tem, dec!(0.007974140428903741), dec!(0.000001)));
    }

    #[test]
    fn test_effective_ignores_capitalization() {
        let ctx = CalculationContext::standard();
        let converter = RateConverter::new(&ctx);
        let monthly = converter
            .periodic_rate(Some(dec!(10)), RateKind::Effective, Capitalization::Monthly)
            .unwrap();
        let daily = converter
            .periodic_rate(Some(dec!(10)), RateKind::Effective, Capitalization::Daily)
            .unwrap();
        assert_eq!(monthly, daily);
    }

    #[test]
    fn test_nominal_monthly() {
        let ctx = CalculationContext::standard();
        let tem = RateConverter::new(&ctx)
            .periodic_rate(Some(dec!(12)), RateKind::Nominal, Capitalization::Monthly)
            .unwrap();
        assert_eq!(tem.as_decimal(), dec!(0.01));
    }

    #[test]
    fn test_nominal_daily() {
        let ctx = CalculationContext::standard();
        let tem = RateConverter::new(&ctx)
            .periodic_rate(Some(dec!(12)), RateKind::Nominal, Capitalization::Daily)
            .unwrap();
        // (1 + 0.12/360)^30 - 1
        assert!(close(tem, dec!(0.010048484042624297), dec!(0.000001)));
        // daily capitalization always beats simple monthly division
        assert!(tem.as_decimal() > dec!(0.01));
    }

    #[test]
    fn test_missing_or_invalid_rate() {
        let ctx = CalculationContext::standard();
        let converter = RateConverter::new(&ctx);
        let missing = converter.periodic_rate(None, RateKind::Effective, Capitalization::Monthly);
        assert!(matches!(missing, Err(MortgageError::InvalidInput { .. })));

        let negative =
            converter.periodic_rate(Some(dec!(-5)), RateKind::Nominal, Capitalization::Monthly);
        assert!(matches!(negative, Err(MortgageError::InvalidInput { .. })));
    }

    #[test]
    fn test_annualize_roundtrip() {
        let annual = annualize_monthly(Rate::from_decimal(dec!(0.01))).unwrap();
        assert!(close(annual, dec!(0.126825030131969720661201), dec!(0.0000000001)));

        let monthly = monthly_from_annual_percent(dec!(12.6825030131969720661201)).unwrap();
        assert!(close(monthly, dec!(0.01), dec!(0.000001)));
        assert_eq!(monthly_from_annual_percent(Decimal::ZERO).unwrap(), Rate::ZERO);
    }
}
