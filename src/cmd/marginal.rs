use crate::cmd::{describe, format_rate, ModelArgs};
use clap::Args;
use cuota::core::DEFAULT_MARGINAL_DELTA;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct MarginalCommand {
    #[command(flatten)]
    model: ModelArgs,

    /// Gross amount to evaluate
    #[arg(short, long)]
    amount: u64,

    /// Income increment for the forward difference
    #[arg(short, long, default_value_t = DEFAULT_MARGINAL_DELTA)]
    delta: u64,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MarginalOutput {
    model: String,
    amount: u64,
    delta: u64,
    payable: u64,
    next_payable: u64,
    marginal_rate: Decimal,
}

impl MarginalCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let model = self.model.load()?;
        let output = MarginalOutput {
            model: model.name().to_string(),
            amount: self.amount,
            delta: self.delta,
            payable: model.get_payable(self.amount),
            next_payable: model.get_payable(self.amount.saturating_add(self.delta)),
            marginal_rate: model.marginal_rate(self.amount, self.delta),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", describe(&model));
            println!(
                "Payable at {}: {} | at {}: {}",
                output.amount,
                output.payable,
                output.amount.saturating_add(output.delta),
                output.next_payable
            );
            println!("Marginal rate: {}", format_rate(output.marginal_rate));
        }
        Ok(())
    }
}
