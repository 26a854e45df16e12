mod cmd;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cuota", version)]
#[command(about = "Calculate tax and social security payable under banded rules")]
struct Opts {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Payable per rule, take home and rates for one amount
    Results(cmd::results::ResultsCommand),
    /// Marginal rate for one amount
    Marginal(cmd::marginal::MarginalCommand),
    /// Sweep a range of incomes and output per-rule metrics
    Sample(cmd::sample::SampleCommand),
    /// One amount under every dated rule table in a directory
    Compare(cmd::compare::CompareCommand),
    /// Check a model definition and its rule tables
    Validate(cmd::validate::ValidateCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    match &opts.cmd {
        Command::Results(results) => results.exec(),
        Command::Marginal(marginal) => marginal.exec(),
        Command::Sample(sample) => sample.exec(),
        Command::Compare(compare) => compare.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
