pub mod allowance;
pub mod band;
pub mod error;
pub mod group;
pub mod metrics;
pub mod model;

// Flat public surface for domain types and functions.
pub use allowance::{Allowance, AllowancePolicy, ProportionalAllowance, TaperedAllowance};
pub use band::{Band, BandSpec, Charge};
pub use error::{ValidationError, Violation};
pub use group::BandsGroup;
pub use metrics::{sample, IncomeRange, MetricColumn, MetricKind, MetricsTable};
pub use model::{RulePayable, TaxModel, TaxResults, DEFAULT_MARGINAL_DELTA};
