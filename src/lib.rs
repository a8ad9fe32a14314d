pub mod config;
pub mod costs;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod indicators;
pub mod interest;
pub mod params;
pub mod payments;
pub mod serialization;
pub mod types;

// re-export key types
pub use config::{CalculationContext, IrrConfig};
pub use costs::{CostBreakdown, InitialCostCalculator};
pub use decimal::{Money, Rate};
pub use engine::{MortgageEngine, SimulationResult};
pub use errors::{MortgageError, Result};
pub use indicators::{IndicatorCalculator, Indicators, IrrSolution};
pub use interest::RateConverter;
pub use params::{BonusTerms, CostItem, InsuranceRates, LoanParameters, LoanParametersBuilder};
pub use payments::{
    AmortizationRow, CashFlow, CashFlowBuilder, Schedule, ScheduleGenerator, ScheduleTerms,
    ScheduleTotals,
};
pub use serialization::{
    PropertySnapshot, SimulationRecord, SimulationRequest, SimulationResponse,
};
pub use types::{
    Capitalization, CostBase, CostKind, Currency, GraceKind, PropertyStatus, RateKind,
    ResidualPolicy,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
