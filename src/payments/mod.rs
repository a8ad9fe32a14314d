pub mod amortization;
pub mod cashflow;

pub use amortization::{
    french_installment, AmortizationRow, Schedule, ScheduleGenerator, ScheduleTerms, ScheduleTotals,
};
pub use cashflow::{CashFlow, CashFlowBuilder};
