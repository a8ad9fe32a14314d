use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{MortgageError, Result};
use crate::types::{Capitalization, CostBase, CostKind, Currency, GraceKind, RateKind};

/// inputs of one calculation, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    pub principal: Money,
    /// annual rate as a percentage (e.g. 10 for 10%)
    pub rate_value: Decimal,
    pub rate_kind: RateKind,
    pub capitalization: Capitalization,
    /// number of monthly periods
    pub term: u32,
    pub grace_kind: GraceKind,
    pub grace_periods: u32,
    pub insurance: InsuranceRates,
    pub bonus: BonusTerms,
    /// annual cost of opportunity capital as a percentage
    pub cok_percent: Decimal,
    pub costs: Vec<CostItem>,
    pub property_value: Option<Money>,
    /// schedule dates start one month after this date
    pub start_date: Option<NaiveDate>,
    pub currency: Currency,
}

/// monthly insurance rates, as percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InsuranceRates {
    /// charged on the outstanding balance
    pub life_percent: Decimal,
    /// charged on the original principal
    pub property_percent: Decimal,
}

/// good-payer bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTerms {
    pub enabled: bool,
    pub periods: u32,
    /// discount on the installment, as a percentage
    pub percent: Decimal,
}

impl Default for BonusTerms {
    fn default() -> Self {
        Self {
            enabled: false,
            periods: 12,
            percent: dec!(0.5),
        }
    }
}

impl BonusTerms {
    pub fn enabled(periods: u32, percent: Decimal) -> Self {
        Self {
            enabled: true,
            periods,
            percent,
        }
    }

    /// bonus applies to this 1-based period
    pub fn applies_to(&self, period: u32) -> bool {
        self.enabled && period <= self.periods
    }
}

/// one-time upfront fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostItem {
    pub name: String,
    pub kind: CostKind,
    /// amount for fixed items, percentage for percentage items
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<CostBase>,
}

impl CostItem {
    pub fn fixed(name: impl Into<String>, amount: Money) -> Self {
        Self {
            name: name.into(),
            kind: CostKind::Fixed,
            value: amount.as_decimal(),
            base: None,
        }
    }

    pub fn percentage(name: impl Into<String>, percent: Decimal, base: CostBase) -> Self {
        Self {
            name: name.into(),
            kind: CostKind::Percentage,
            value: percent,
            base: Some(base),
        }
    }
}

impl LoanParameters {
    pub fn builder() -> LoanParametersBuilder {
        LoanParametersBuilder::new()
    }

    /// grace periods that actually apply; a `None` grace kind ignores any duration
    pub fn effective_grace_periods(&self) -> u32 {
        match self.grace_kind {
            GraceKind::None => 0,
            GraceKind::Total | GraceKind::Partial => self.grace_periods,
        }
    }

    /// base for property-value percentage costs, falling back to the principal
    pub fn property_base(&self) -> Money {
        self.property_value.unwrap_or(self.principal)
    }

    /// check every invariant the calculation relies on
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(MortgageError::invalid_input("principal", "must be greater than zero"));
        }
        if self.rate_value <= Decimal::ZERO {
            return Err(MortgageError::invalid_input("rate_value", "must be greater than zero"));
        }
        if self.term == 0 {
            return Err(MortgageError::invalid_input("term", "must be at least one period"));
        }
        if self.grace_kind != GraceKind::None && self.grace_periods >= self.term {
            return Err(MortgageError::invalid_input(
                "grace_periods",
                format!(
                    "grace of {} periods leaves no amortizing period in a term of {}",
                    self.grace_periods, self.term
                ),
            ));
        }
        if self.insurance.life_percent < Decimal::ZERO {
            return Err(MortgageError::invalid_input("life_insurance_percent", "must not be negative"));
        }
        if self.insurance.property_percent < Decimal::ZERO {
            return Err(MortgageError::invalid_input(
                "property_insurance_percent",
                "must not be negative",
            ));
        }
        if self.bonus.enabled
            && (self.bonus.percent < Decimal::ZERO || self.bonus.percent > Decimal::ONE_HUNDRED)
        {
            return Err(MortgageError::invalid_input("bonus_percent", "must be between 0 and 100"));
        }
        if self.cok_percent <= dec!(-100) {
            return Err(MortgageError::invalid_input("cok_percent", "must be greater than -100"));
        }
        if let Some(value) = self.property_value {
            if value.is_negative() {
                return Err(MortgageError::invalid_input("property_value", "must not be negative"));
            }
        }
        for cost in &self.costs {
            if cost.value < Decimal::ZERO {
                return Err(MortgageError::invalid_input(
                    "costs",
                    format!("cost '{}' must not be negative", cost.name),
                ));
            }
            if cost.kind == CostKind::Percentage && cost.base.is_none() {
                return Err(MortgageError::invalid_input(
                    "costs",
                    format!("percentage cost '{}' needs a base", cost.name),
                ));
            }
        }
        Ok(())
    }
}

/// builder for loan parameters; principal, rate and term are required
#[derive(Debug, Clone, Default)]
pub struct LoanParametersBuilder {
    principal: Option<Money>,
    rate_value: Option<Decimal>,
    rate_kind: RateKind,
    capitalization: Capitalization,
    term: Option<u32>,
    grace_kind: GraceKind,
    grace_periods: u32,
    insurance: InsuranceRates,
    bonus: BonusTerms,
    cok_percent: Decimal,
    costs: Vec<CostItem>,
    property_value: Option<Money>,
    start_date: Option<NaiveDate>,
    currency: Currency,
}

impl LoanParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, amount: Money) -> Self {
        self.principal = Some(amount);
        self
    }

    /// annual rate as a percentage
    pub fn rate(mut self, value: Decimal, kind: RateKind) -> Self {
        self.rate_value = Some(value);
        self.rate_kind = kind;
        self
    }

    pub fn capitalization(mut self, capitalization: Capitalization) -> Self {
        self.capitalization = capitalization;
        self
    }

    pub fn term(mut self, periods: u32) -> Self {
        self.term = Some(periods);
        self
    }

    pub fn grace(mut self, kind: GraceKind, periods: u32) -> Self {
        self.grace_kind = kind;
        self.grace_periods = periods;
        self
    }

    pub fn life_insurance(mut self, percent: Decimal) -> Self {
        self.insurance.life_percent = percent;
        self
    }

    pub fn property_insurance(mut self, percent: Decimal) -> Self {
        self.insurance.property_percent = percent;
        self
    }

    pub fn bonus(mut self, bonus: BonusTerms) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn cok(mut self, percent: Decimal) -> Self {
        self.cok_percent = percent;
        self
    }

    pub fn cost(mut self, item: CostItem) -> Self {
        self.costs.push(item);
        self
    }

    pub fn costs(mut self, items: Vec<CostItem>) -> Self {
        self.costs = items;
        self
    }

    pub fn property_value(mut self, value: Money) -> Self {
        self.property_value = Some(value);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn build(self) -> Result<LoanParameters> {
        let principal = self
            .principal
            .ok_or_else(|| MortgageError::invalid_input("principal", "is required"))?;
        let rate_value = self
            .rate_value
            .ok_or_else(|| MortgageError::invalid_input("rate_value", "is required"))?;
        let term = self
            .term
            .ok_or_else(|| MortgageError::invalid_input("term", "is required"))?;

        let params = LoanParameters {
            principal,
            rate_value,
            rate_kind: self.rate_kind,
            capitalization: self.capitalization,
            term,
            grace_kind: self.grace_kind,
            grace_periods: self.grace_periods,
            insurance: self.insurance,
            bonus: self.bonus,
            cok_percent: self.cok_percent,
            costs: self.costs,
            property_value: self.property_value,
            start_date: self.start_date,
            currency: self.currency,
        };
        params.validate()?;
        Ok(params)
    }
}
