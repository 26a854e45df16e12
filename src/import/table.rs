use super::ImportError;
use crate::core::band::scale;
use crate::core::{BandSpec, ValidationError, Violation};
use cuota_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column description generated by `#[derive(CsvSchema)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// How the `value` column of a rule table is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// `value` is a percentage rate, e.g. 19 for 19%
    Rate,
    /// `value` is a flat charge in currency units
    Flat,
}

/// One row of a rule table.
#[derive(Debug, Clone, PartialEq, Deserialize, CsvSchema)]
pub struct BandRow {
    /// Lower limit of the band
    pub floor: Decimal,
    /// Upper limit of the band
    pub ceiling: Decimal,
    /// Percentage rate (rate tables) or flat charge (flat-charge tables)
    pub value: Decimal,
    /// Charge the whole amount at this band's rate when it falls in range
    #[serde(default)]
    pub exclusive: bool,
}

impl BandRow {
    /// Band definition for this row, monetary columns scaled by `multiplier`.
    fn to_spec(&self, kind: TableKind, multiplier: Decimal) -> Result<BandSpec, Vec<Violation>> {
        let mut violations = Vec::new();
        let mut scaled = |value: Decimal| {
            scale(value, multiplier).unwrap_or_else(|violation| {
                violations.push(violation);
                0
            })
        };
        let floor = scaled(self.floor);
        let ceiling = scaled(self.ceiling);
        let spec = match kind {
            TableKind::Rate => BandSpec::rate(floor, ceiling, self.value / Decimal::ONE_HUNDRED),
            TableKind::Flat => BandSpec::flat(floor, ceiling, scaled(self.value)),
        };
        if !violations.is_empty() {
            return Err(violations);
        }
        Ok(BandSpec {
            exclusive: self.exclusive,
            ..spec
        })
    }

    fn negative_column(&self) -> Option<(&'static str, Decimal)> {
        [
            ("floor", self.floor),
            ("ceiling", self.ceiling),
            ("value", self.value),
        ]
        .into_iter()
        .find(|(_, value)| value.is_sign_negative() && !value.is_zero())
    }
}

/// Read band definitions from a CSV table.
///
/// The header row is skipped and columns are read by position: floor,
/// ceiling, value and an optional exclusive flag.
///
/// `multiplier` rescales floors, ceilings and flat charges, e.g. 12 to
/// annualise a monthly social security table.
pub fn read_bands_csv<R: Read>(
    reader: R,
    kind: TableKind,
    multiplier: Decimal,
    source_name: &str,
) -> Result<Vec<BandSpec>, ImportError> {
    if multiplier <= Decimal::ZERO {
        return Err(ValidationError::new(
            format!("rule table {}", source_name),
            vec![Violation::NonPositiveMultiplier(multiplier)],
        )
        .into());
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let rows = rdr
        .records()
        .map(|record| record.and_then(|record| record.deserialize::<BandRow>(None)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ImportError::Csv {
            source_name: source_name.to_string(),
            source,
        })?;
    log::info!("Read {} band rows from {}", rows.len(), source_name);

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row.negative_column() {
            Some((column, value)) => Err(ImportError::NegativeValue {
                source_name: source_name.to_string(),
                row: index + 1,
                column,
                value,
            }),
            None => row.to_spec(kind, multiplier).map_err(|violations| {
                ImportError::from(ValidationError::new(
                    format!("rule table {}, row {}", source_name, index + 1),
                    violations,
                ))
            }),
        })
        .collect()
}

pub fn read_bands_file(
    path: &Path,
    kind: TableKind,
    multiplier: Decimal,
) -> Result<Vec<BandSpec>, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_bands_csv(file, kind, multiplier, &path.display().to_string())
}
