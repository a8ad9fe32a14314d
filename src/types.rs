use serde::{Deserialize, Serialize};
use std::fmt;

/// how the annual rate is quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RateKind {
    /// annual nominal rate (TNA), paired with a capitalization frequency
    Nominal,
    /// annual effective rate (TEA)
    #[default]
    Effective,
}

/// capitalization frequency of a nominal rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Capitalization {
    #[default]
    Monthly,
    Daily,
}

/// grace period policy at the start of the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GraceKind {
    /// amortize from the first period
    #[default]
    None,
    /// nothing is paid, interest capitalizes into the balance
    Total,
    /// interest only, balance unchanged
    Partial,
}

/// upfront cost item kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostKind {
    Fixed,
    Percentage,
}

/// base amount for a percentage cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostBase {
    Principal,
    PropertyValue,
}

/// currency label; amounts are never converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    PEN,
    USD,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::PEN => write!(f, "PEN"),
            Currency::USD => write!(f, "USD"),
        }
    }
}

/// what to do with the sub-unit balance left after the final installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResidualPolicy {
    /// leave the residue on the final balance
    #[default]
    Carry,
    /// fold the residue into the final principal portion so the balance closes at zero
    AbsorbIntoFinalPayment,
}

/// construction status of the financed property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStatus {
    /// sold off-plan
    Planned,
    UnderConstruction,
    Finished,
}
