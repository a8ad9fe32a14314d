use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::amortization::Schedule;

/// signed flows from the borrower's side: index 0 is the net disbursement,
/// index k the k-th payment (negative)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    flows: Vec<Money>,
}

impl CashFlow {
    pub fn from_flows(flows: Vec<Money>) -> Self {
        Self { flows }
    }

    pub fn flows(&self) -> &[Money] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// net amount the borrower receives
    pub fn disbursement(&self) -> Money {
        self.flows.first().copied().unwrap_or(Money::ZERO)
    }

    /// undiscounted sum of all flows
    pub fn sum(&self) -> Money {
        self.flows.iter().sum()
    }

    /// at least one inflow and one outflow, needed for an irr to exist
    pub fn has_sign_change(&self) -> bool {
        self.flows.iter().any(Money::is_positive) && self.flows.iter().any(Money::is_negative)
    }
}

/// combines disbursement, upfront costs and the total-due column
pub struct CashFlowBuilder;

impl CashFlowBuilder {
    pub fn build(principal: Money, upfront_total: Money, schedule: &Schedule) -> CashFlow {
        let mut flows = Vec::with_capacity(schedule.len() + 1);
        flows.push(principal - upfront_total);
        flows.extend(schedule.rows.iter().map(|row| -row.total_due));
        CashFlow { flows }
    }
}
