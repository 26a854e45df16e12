//! Schema command - print expected input formats

use clap::Args;
use cuota::import::{BandRow, ModelDefinition};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for model definition files
    JsonSchema,
    /// CSV header row for rule tables
    CsvHeader,
    /// Rule table column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(ModelDefinition);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        println!("{}", BandRow::csv_header().join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("Rule Table CSV Format");
        println!("=====================");
        println!();
        for field in BandRow::csv_schema() {
            let req = if field.required { "required" } else { "optional" };
            println!("{:12} ({:8})  {}", field.name, req, field.description);
        }
        println!();
        println!("Columns are read by position; the header row is skipped.");
        println!("Rate tables give value as a percentage (19 = 19%).");
        Ok(())
    }
}
