use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::config::CalculationContext;
use crate::decimal::{Money, Rate};
use crate::errors::{MortgageError, Result};
use crate::params::{BonusTerms, InsuranceRates, LoanParameters};
use crate::types::{GraceKind, ResidualPolicy};

/// one row of the amortization table, rounded for output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: u32,
    pub date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
    pub life_insurance: Money,
    pub property_insurance: Money,
    pub bonus: Money,
    /// installment after the bonus, before insurance
    pub installment: Money,
    pub total_due: Money,
    pub balance: Money,
    /// grace applied to this period, if any
    pub grace: Option<GraceKind>,
}

impl AmortizationRow {
    pub fn is_grace(&self) -> bool {
        self.grace.is_some()
    }
}

/// schedule-wide sums, accumulated at full precision and rounded once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScheduleTotals {
    pub principal: Money,
    pub interest: Money,
    pub life_insurance: Money,
    pub property_insurance: Money,
    pub bonus: Money,
    pub paid: Money,
}

/// full ordered amortization table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub rows: Vec<AmortizationRow>,
    pub totals: ScheduleTotals,
    /// unrounded balance after the last period
    pub final_balance: Money,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// row for a 1-based period
    pub fn get(&self, period: u32) -> Option<&AmortizationRow> {
        period
            .checked_sub(1)
            .and_then(|index| self.rows.get(index as usize))
    }
}

/// everything the generator needs, independent of how the rate was quoted
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleTerms {
    pub principal: Money,
    pub periodic_rate: Rate,
    pub term: u32,
    pub grace_kind: GraceKind,
    pub grace_periods: u32,
    pub insurance: InsuranceRates,
    pub bonus: BonusTerms,
    pub start_date: NaiveDate,
}

impl ScheduleTerms {
    pub fn from_loan(params: &LoanParameters, periodic_rate: Rate, start_date: NaiveDate) -> Self {
        Self {
            principal: params.principal,
            periodic_rate,
            term: params.term,
            grace_kind: params.grace_kind,
            grace_periods: params.effective_grace_periods(),
            insurance: params.insurance,
            bonus: params.bonus,
            start_date,
        }
    }

    fn grace_for(&self, period: u32) -> Option<GraceKind> {
        match self.grace_kind {
            GraceKind::None => None,
            kind if period <= self.grace_periods => Some(kind),
            _ => None,
        }
    }
}

/// unrounded figures of one period
#[derive(Debug, Clone, Copy)]
struct PeriodFigures {
    principal: Decimal,
    interest: Decimal,
    life_insurance: Decimal,
    property_insurance: Decimal,
    bonus: Decimal,
    installment: Decimal,
    total_due: Decimal,
}

/// french-method schedule with grace, bonus and insurance
pub struct ScheduleGenerator<'a> {
    ctx: &'a CalculationContext,
    terms: ScheduleTerms,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(ctx: &'a CalculationContext, terms: ScheduleTerms) -> Self {
        Self { ctx, terms }
    }

    /// generate the table as a fold over (balance, period)
    pub fn generate(&self) -> Result<Schedule> {
        self.check_terms()?;

        let capacity = self.terms.term as usize;
        let (final_balance, rows, totals) = (1..=self.terms.term).try_fold(
            (self.terms.principal.as_decimal(), Vec::with_capacity(capacity), ScheduleTotals::default()),
            |(balance, mut rows, totals), period| {
                let (next_balance, figures) = self.step(balance, period)?;
                let totals = accumulate(totals, &figures);
                rows.push(self.emit(period, next_balance, figures)?);
                Ok::<_, MortgageError>((next_balance, rows, totals))
            },
        )?;

        log::debug!(
            "generated {} periods, final balance {}",
            rows.len(),
            final_balance
        );

        Ok(Schedule {
            rows,
            totals: self.round_totals(totals),
            final_balance: Money::from_decimal(final_balance),
        })
    }

    /// one period: consumes the opening balance, returns the closing balance
    fn step(&self, balance: Decimal, period: u32) -> Result<(Decimal, PeriodFigures)> {
        let ctx = self.ctx;
        let rate = self.terms.periodic_rate.as_decimal();
        let hundred = Decimal::ONE_HUNDRED;

        let interest = ctx.working(product(balance, rate, period)?);
        let life_insurance =
            ctx.working(product(balance, self.terms.insurance.life_percent, period)? / hundred);
        let property_insurance = ctx.working(
            product(self.terms.principal.as_decimal(), self.terms.insurance.property_percent, period)?
                / hundred,
        );

        let (mut principal, mut installment, mut next_balance) = match self.terms.grace_for(period) {
            Some(GraceKind::Total) => {
                let capitalized = balance
                    .checked_add(interest)
                    .ok_or_else(|| MortgageError::calculation(format!("balance overflow at period {period}")))?;
                (Decimal::ZERO, Decimal::ZERO, capitalized)
            }
            Some(GraceKind::Partial) => (Decimal::ZERO, interest, balance),
            _ => {
                let remaining = self.terms.term - period + 1;
                let payment = ctx.working(french_installment(balance, rate, remaining)?);
                let principal = payment - interest;
                (principal, payment, balance - principal)
            }
        };

        if period == self.terms.term && ctx.residual_policy == ResidualPolicy::AbsorbIntoFinalPayment {
            principal += next_balance;
            installment += next_balance;
            next_balance = Decimal::ZERO;
        }

        let mut bonus = Decimal::ZERO;
        if self.terms.bonus.applies_to(period) && installment > Decimal::ZERO {
            bonus = ctx.working(product(installment, self.terms.bonus.percent, period)? / hundred);
            installment -= bonus;
        }

        let total_due = installment
            .checked_add(life_insurance)
            .and_then(|v| v.checked_add(property_insurance))
            .ok_or_else(|| MortgageError::calculation(format!("total due overflow at period {period}")))?;

        log::trace!(
            "period {}: balance {} -> {}, installment {}, total due {}",
            period,
            balance,
            next_balance,
            installment,
            total_due
        );

        Ok((
            ctx.working(next_balance),
            PeriodFigures {
                principal,
                interest,
                life_insurance,
                property_insurance,
                bonus,
                installment,
                total_due,
            },
        ))
    }

    fn emit(&self, period: u32, balance: Decimal, figures: PeriodFigures) -> Result<AmortizationRow> {
        let date = self
            .terms
            .start_date
            .checked_add_months(Months::new(period))
            .ok_or_else(|| MortgageError::calculation(format!("date overflow at period {period}")))?;
        let round = |value: Decimal| self.ctx.money(Money::from_decimal(value));

        Ok(AmortizationRow {
            period,
            date,
            principal: round(figures.principal),
            interest: round(figures.interest),
            life_insurance: round(figures.life_insurance),
            property_insurance: round(figures.property_insurance),
            bonus: round(figures.bonus),
            installment: round(figures.installment),
            total_due: round(figures.total_due),
            balance: round(balance),
            grace: self.terms.grace_for(period),
        })
    }

    fn round_totals(&self, totals: ScheduleTotals) -> ScheduleTotals {
        ScheduleTotals {
            principal: self.ctx.money(totals.principal),
            interest: self.ctx.money(totals.interest),
            life_insurance: self.ctx.money(totals.life_insurance),
            property_insurance: self.ctx.money(totals.property_insurance),
            bonus: self.ctx.money(totals.bonus),
            paid: self.ctx.money(totals.paid),
        }
    }

    fn check_terms(&self) -> Result<()> {
        let terms = &self.terms;
        if terms.term == 0 {
            return Err(MortgageError::invalid_input("term", "must be at least one period"));
        }
        if !terms.principal.is_positive() {
            return Err(MortgageError::invalid_input("principal", "must be greater than zero"));
        }
        if terms.periodic_rate.as_decimal() < Decimal::ZERO {
            return Err(MortgageError::invalid_input("periodic_rate", "must not be negative"));
        }
        if terms.grace_kind != GraceKind::None && terms.grace_periods >= terms.term {
            return Err(MortgageError::invalid_input(
                "grace_periods",
                "must be shorter than the term",
            ));
        }
        Ok(())
    }
}

fn accumulate(totals: ScheduleTotals, figures: &PeriodFigures) -> ScheduleTotals {
    ScheduleTotals {
        principal: totals.principal + Money::from_decimal(figures.principal),
        interest: totals.interest + Money::from_decimal(figures.interest),
        life_insurance: totals.life_insurance + Money::from_decimal(figures.life_insurance),
        property_insurance: totals.property_insurance
            + Money::from_decimal(figures.property_insurance),
        bonus: totals.bonus + Money::from_decimal(figures.bonus),
        paid: totals.paid + Money::from_decimal(figures.total_due),
    }
}

/// level installment that clears `balance` over `remaining` periods
///
/// P * r * (1 + r)^n / ((1 + r)^n - 1), or P / n when the rate is zero
pub fn french_installment(balance: Decimal, rate: Decimal, remaining: u32) -> Result<Decimal> {
    if remaining == 0 {
        return Ok(balance);
    }
    if rate.is_zero() {
        return Ok(balance / Decimal::from(remaining));
    }

    let factor = (Decimal::ONE + rate)
        .checked_powu(remaining as u64)
        .ok_or_else(|| MortgageError::calculation("installment factor overflow"))?;
    let denominator = factor - Decimal::ONE;
    balance
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .ok_or_else(|| MortgageError::calculation("installment numerator overflow"))?
        .checked_div(denominator)
        .ok_or_else(|| MortgageError::calculation("installment denominator is zero"))
}

/// a * b, overflow reported against the period
fn product(a: Decimal, b: Decimal, period: u32) -> Result<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| MortgageError::calculation(format!("multiplication overflow at period {period}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms(principal: i64, rate: Decimal, term: u32) -> ScheduleTerms {
        ScheduleTerms {
            principal: Money::from_major(principal),
            periodic_rate: Rate::from_decimal(rate),
            term,
            grace_kind: GraceKind::None,
            grace_periods: 0,
            insurance: InsuranceRates::default(),
            bonus: BonusTerms::default(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn generate(terms: ScheduleTerms) -> Schedule {
        let ctx = CalculationContext::standard();
        ScheduleGenerator::new(&ctx, terms).generate().unwrap()
    }

    #[test]
    fn test_plain_french_schedule() {
        let schedule = generate(terms(10_000, dec!(0.01), 12));

        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule.rows[0].interest, Money::from_major(100));
        assert!(schedule.rows[11].balance.abs() < Money::ONE);

        // level installment of 888.49 throughout
        let first = schedule.rows[0].total_due;
        assert_eq!(first, Money::from_decimal(dec!(888.49)));
        for row in &schedule.rows {
            assert!((row.total_due - first).abs() <= Money::MINOR_UNIT);
            assert!(row.grace.is_none());
        }
    }

    #[test]
    fn test_principal_portions_sum_to_principal() {
        let principal = Money::from_major(250_000);
        let schedule = generate(terms(250_000, dec!(0.0079741404289), 240));

        assert!((schedule.totals.principal - principal).abs() <= Money::MINOR_UNIT);

        // rounded rows drift by at most half a cent each
        let rounded: Money = schedule.rows.iter().map(|row| row.principal).sum();
        let slack = Money::from_decimal(dec!(0.005) * Decimal::from(schedule.len() as u32));
        assert!((rounded - principal).abs() <= slack);
    }

    #[test]
    fn test_total_grace_capitalizes_interest() {
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Total;
        t.grace_periods = 3;
        let schedule = generate(t);

        for row in &schedule.rows[..3] {
            assert_eq!(row.principal, Money::ZERO);
            assert_eq!(row.total_due, Money::ZERO);
            assert_eq!(row.grace, Some(GraceKind::Total));
        }
        assert!(schedule.rows[0].balance > Money::from_major(10_000));
        assert!(schedule.rows[1].balance > schedule.rows[0].balance);

        // 10000 * 1.01^3
        assert_eq!(schedule.rows[2].balance, Money::from_decimal(dec!(10303.01)));
        assert!(schedule.rows[3].principal.is_positive());
        assert!(schedule.rows[11].balance.abs() < Money::ONE);
    }

    #[test]
    fn test_partial_grace_pays_interest_only() {
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Partial;
        t.grace_periods = 2;
        let schedule = generate(t);

        for row in &schedule.rows[..2] {
            assert_eq!(row.principal, Money::ZERO);
            assert_eq!(row.total_due, row.interest);
            assert_eq!(row.balance, Money::from_major(10_000));
        }
        assert!(schedule.rows[2].grace.is_none());
        assert!(schedule.rows[11].balance.abs() < Money::ONE);
    }

    #[test]
    fn test_zero_grace_matches_no_grace() {
        let plain = generate(terms(10_000, dec!(0.01), 12));
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Total;
        t.grace_periods = 0;
        assert_eq!(generate(t).rows, plain.rows);
    }

    #[test]
    fn test_bonus_window() {
        let mut t = terms(10_000, dec!(0.01), 12);
        t.bonus = BonusTerms::enabled(4, dec!(0.5));
        let schedule = generate(t);

        for row in &schedule.rows[..4] {
            assert!(row.bonus.is_positive());
        }
        for row in &schedule.rows[4..] {
            assert_eq!(row.bonus, Money::ZERO);
        }

        // 0.5% off an 888.49 installment
        assert_eq!(schedule.rows[0].bonus, Money::from_decimal(dec!(4.44)));
        assert_eq!(schedule.rows[0].total_due, Money::from_decimal(dec!(884.05)));
    }

    #[test]
    fn test_bonus_skips_periods_without_payment() {
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Total;
        t.grace_periods = 2;
        t.bonus = BonusTerms::enabled(3, dec!(1));
        let schedule = generate(t);

        assert_eq!(schedule.rows[0].bonus, Money::ZERO);
        assert_eq!(schedule.rows[1].bonus, Money::ZERO);
        assert!(schedule.rows[2].bonus.is_positive());
        assert_eq!(schedule.rows[3].bonus, Money::ZERO);
    }

    #[test]
    fn test_insurance_bases() {
        let mut t = terms(100_000, dec!(0.01), 24);
        t.insurance = InsuranceRates {
            life_percent: dec!(0.05),
            property_percent: dec!(0.03),
        };
        let schedule = generate(t);

        // life on the opening balance, property on the original principal
        assert_eq!(schedule.rows[0].life_insurance, Money::from_major(50));
        assert!(schedule.rows[10].life_insurance < schedule.rows[0].life_insurance);
        for row in &schedule.rows {
            assert_eq!(row.property_insurance, Money::from_major(30));
            let expected = row.installment + row.life_insurance + row.property_insurance;
            assert!((row.total_due - expected).abs() <= Money::MINOR_UNIT);
        }
    }

    #[test]
    fn test_absorb_residual_closes_at_zero() {
        let ctx = CalculationContext::standard()
            .with_residual_policy(ResidualPolicy::AbsorbIntoFinalPayment);
        let schedule = ScheduleGenerator::new(&ctx, terms(75_000, dec!(0.0095), 180))
            .generate()
            .unwrap();

        assert_eq!(schedule.final_balance, Money::ZERO);
        assert_eq!(schedule.rows[179].balance, Money::ZERO);
    }

    #[test]
    fn test_zero_rate_splits_evenly() {
        let schedule = generate(terms(1_200, Decimal::ZERO, 12));
        for row in &schedule.rows {
            assert_eq!(row.principal, Money::from_major(100));
            assert_eq!(row.interest, Money::ZERO);
        }
        assert_eq!(schedule.final_balance, Money::ZERO);
    }

    #[test]
    fn test_dates_follow_calendar_months() {
        let mut t = terms(1_000, dec!(0.01), 3);
        t.start_date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let schedule = generate(t);

        assert_eq!(schedule.rows[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(schedule.rows[1].date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(schedule.rows[2].date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(schedule.get(2).map(|row| row.period), Some(2));
        assert!(schedule.get(0).is_none());
    }

    #[test]
    fn test_invalid_terms_rejected() {
        let ctx = CalculationContext::standard();
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Partial;
        t.grace_periods = 12;
        let result = ScheduleGenerator::new(&ctx, t).generate();
        assert!(matches!(result, Err(MortgageError::InvalidInput { .. })));

        let result = ScheduleGenerator::new(&ctx, terms(10_000, dec!(0.01), 0)).generate();
        assert!(matches!(result, Err(MortgageError::InvalidInput { .. })));
    }

    #[test]
    fn test_french_installment() {
        let payment = french_installment(dec!(10000), dec!(0.01), 12).unwrap();
        assert_eq!(payment.round_dp(2), dec!(888.49));
        // one period left clears the balance plus interest
        assert_eq!(french_installment(dec!(500), dec!(0.01), 1).unwrap(), dec!(505));
    }

    #[test]
    fn test_installment_overflow_is_an_error() {
        // 1.1^650 still fits, the product with the balance does not
        let result = french_installment(dec!(100000), dec!(0.1), 650);
        assert!(matches!(result, Err(MortgageError::CalculationError { .. })));

        let ctx = CalculationContext::standard();
        let result = ScheduleGenerator::new(&ctx, terms(100_000, dec!(0.1), 650)).generate();
        assert!(matches!(result, Err(MortgageError::CalculationError { .. })));
    }

    #[test]
    fn test_bonus_applies_to_interest_only_grace() {
        let mut t = terms(10_000, dec!(0.01), 12);
        t.grace_kind = GraceKind::Partial;
        t.grace_periods = 2;
        t.bonus = BonusTerms::enabled(3, dec!(0.5));
        let schedule = generate(t);

        for row in &schedule.rows[..2] {
            assert_eq!(row.principal, Money::ZERO);
            // 0.5% off the 100.00 interest payment
            assert_eq!(row.bonus, Money::from_decimal(dec!(0.50)));
            assert_eq!(row.installment, row.interest - row.bonus);
            assert_eq!(row.total_due, Money::from_decimal(dec!(99.50)));
            assert!(row.total_due < row.interest);
            assert_eq!(row.balance, Money::from_major(10_000));
        }
        assert!(schedule.rows[2].bonus.is_positive());
        assert!(schedule.rows[2].principal.is_positive());
        assert_eq!(schedule.rows[3].bonus, Money::ZERO);
    }
}
