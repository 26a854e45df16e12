//! Results command - payable per rule for a single amount

use crate::cmd::{describe, format_rate, ModelArgs};
use clap::Args;
use cuota::core::{TaxResults, DEFAULT_MARGINAL_DELTA};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ResultsCommand {
    #[command(flatten)]
    model: ModelArgs,

    /// Gross amount to evaluate
    #[arg(short, long)]
    amount: u64,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ResultsOutput {
    model: String,
    year: i32,
    non_sequential: bool,
    #[serde(flatten)]
    results: TaxResults,
    marginal_rate: Decimal,
}

#[derive(Debug, Clone, Tabled)]
struct RuleRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Payable")]
    payable: u64,
    #[tabled(rename = "Effective Rate")]
    effective_rate: String,
}

impl ResultsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let model = self.model.load()?;
        let results = model.results(self.amount);
        let marginal_rate = model.marginal_rate(self.amount, DEFAULT_MARGINAL_DELTA);

        if self.json {
            let output = ResultsOutput {
                model: model.name().to_string(),
                year: model.year(),
                non_sequential: model.is_non_sequential(),
                results,
                marginal_rate,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!();
        println!("{}", describe(&model).to_uppercase());
        println!("Gross amount: {}", self.amount);
        println!();

        let rows: Vec<RuleRow> = results
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleRow {
                position: index + 1,
                rule: rule.name.clone(),
                payable: rule.payable,
                effective_rate: format_rate(rule.effective_rate),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();
        println!("Total payable:  {}", results.total_payable);
        println!("Take home:      {}", results.take_home);
        println!("Effective rate: {}", format_rate(results.effective_rate));
        println!(
            "Marginal rate:  {} (next {})",
            format_rate(marginal_rate),
            DEFAULT_MARGINAL_DELTA
        );
        println!();
        Ok(())
    }
}
