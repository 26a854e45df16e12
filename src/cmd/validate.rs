//! Validate command - check a model definition without evaluating it

use clap::Args;
use cuota::core::Charge;
use cuota::import::read_model;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// JSON model definition file
    #[arg(short, long)]
    model: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rules: Vec<RuleSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RuleSummary {
    name: String,
    bands: usize,
    flat_charge_bands: usize,
    exclusive_bands: usize,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let output = match read_model(&self.model) {
            Ok(model) => ValidationOutput {
                valid: true,
                model: Some(crate::cmd::describe(&model)),
                rules: model
                    .rules()
                    .iter()
                    .map(|rule| RuleSummary {
                        name: rule.name().to_string(),
                        bands: rule.bands().len(),
                        flat_charge_bands: rule
                            .bands()
                            .iter()
                            .filter(|b| matches!(b.charge(), Charge::Flat(_)))
                            .count(),
                        exclusive_bands: rule.bands().iter().filter(|b| b.is_exclusive()).count(),
                    })
                    .collect(),
                issues: Vec::new(),
            },
            Err(err) => ValidationOutput {
                valid: false,
                model: None,
                rules: Vec::new(),
                issues: err.to_string().lines().map(str::to_string).collect(),
            },
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&output);
        }

        // Exit with code 1 if issues found
        if !output.valid {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn print_text(output: &ValidationOutput) {
    println!();
    if output.valid {
        println!(
            "\u{2713} {} is valid",
            output.model.as_deref().unwrap_or_default()
        );
        for (i, rule) in output.rules.iter().enumerate() {
            println!(
                "  {}. {}: {} band(s), {} flat charge, {} exclusive",
                i + 1,
                rule.name,
                rule.bands,
                rule.flat_charge_bands,
                rule.exclusive_bands
            );
        }
    } else {
        println!("\u{26A0} model could not be loaded:");
        for issue in &output.issues {
            println!("  {}", issue);
        }
    }
    println!();
}
