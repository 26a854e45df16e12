//! Loading band tables and model definitions from files.

mod definition;
mod table;
mod yearly;

pub use definition::{
    read_model, AllowanceDefinition, AllowancePolicyDefinition, ModelDefinition, RuleDefinition,
    TableDefinition,
};
pub use table::{read_bands_csv, read_bands_file, BandRow, CsvField, TableKind};
pub use yearly::read_yearly_tables;

use crate::core::ValidationError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule table {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
    #[error("invalid model definition {source_name}: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("rule table {source_name}, row {row}: {column} must not be negative, found [{value}]")]
    NegativeValue {
        source_name: String,
        row: usize,
        column: &'static str,
        value: rust_decimal::Decimal,
    },
    #[error("rule \"{rule}\" gives both inline bands and a csv table")]
    AmbiguousBands { rule: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
