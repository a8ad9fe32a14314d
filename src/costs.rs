use crate::decimal::Money;
use crate::params::{CostItem, LoanParameters};
use crate::types::{CostBase, CostKind};

/// one resolved upfront cost
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CostBreakdown {
    pub name: String,
    pub amount: Money,
}

/// sums one-time fees deducted at disbursement
pub struct InitialCostCalculator {
    principal: Money,
    property_value: Money,
}

impl InitialCostCalculator {
    pub fn new(principal: Money, property_value: Money) -> Self {
        Self {
            principal,
            property_value,
        }
    }

    pub fn for_loan(params: &LoanParameters) -> Self {
        Self::new(params.principal, params.property_base())
    }

    /// amount a single item contributes
    pub fn amount(&self, item: &CostItem) -> Money {
        match item.kind {
            CostKind::Fixed => Money::from_decimal(item.value),
            CostKind::Percentage => {
                // an item without a base has nothing to apply the percentage to
                let base = match item.base {
                    Some(CostBase::Principal) => self.principal,
                    Some(CostBase::PropertyValue) => self.property_value,
                    None => Money::ZERO,
                };
                base.percentage(item.value)
            }
        }
    }

    pub fn breakdown(&self, items: &[CostItem]) -> Vec<CostBreakdown> {
        items
            .iter()
            .map(|item| CostBreakdown {
                name: item.name.clone(),
                amount: self.amount(item),
            })
            .collect()
    }

    /// total upfront deduction
    pub fn total(&self, items: &[CostItem]) -> Money {
        items.iter().map(|item| self.amount(item)).sum()
    }
}
