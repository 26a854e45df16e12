pub mod compare;
pub mod marginal;
pub mod results;
pub mod sample;
pub mod schema;
pub mod validate;

use clap::Args;
use cuota::core::TaxModel;
use cuota::import::read_model;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;

/// Options shared by every command that evaluates a model
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// JSON model definition file
    #[arg(short, long)]
    model: PathBuf,

    /// Express the model in another currency by scaling its bands (e.g. 1.17 for GBP to EUR)
    #[arg(long)]
    convert: Option<Decimal>,
}

impl ModelArgs {
    pub fn load(&self) -> anyhow::Result<TaxModel> {
        let model = read_model(&self.model)?;
        match self.convert {
            Some(multiplier) => Ok(model.convert(multiplier)?),
            None => Ok(model),
        }
    }
}

pub fn format_rate(rate: Decimal) -> String {
    format!("{:.2}%", rate * dec!(100))
}

/// Heading line for a model, e.g. `UK employee (2025, non-sequential)`
pub fn describe(model: &TaxModel) -> String {
    let sequencing = if model.is_non_sequential() {
        "non-sequential"
    } else {
        "sequential"
    };
    format!("{} ({}, {})", model.name(), model.year(), sequencing)
}
