pub mod conversion;

pub use conversion::{annualize_monthly, compound, monthly_from_annual_percent, root, RateConverter};
