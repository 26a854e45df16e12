use super::table::{read_bands_file, TableKind};
use super::ImportError;
use crate::core::{
    Allowance, BandSpec, BandsGroup, ProportionalAllowance, TaperedAllowance, TaxModel,
    ValidationError,
};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A complete tax model as written in a JSON definition file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelDefinition {
    /// Display name of the model
    #[serde(default = "default_name")]
    pub name: String,
    /// Tax year the rules apply to
    #[serde(default = "default_year")]
    pub year: i32,
    /// Evaluate every rule against the gross amount rather than the amount left by earlier rules
    #[serde(default)]
    pub non_sequential: bool,
    /// Rules in the order they are applied
    pub rules: Vec<RuleDefinition>,
}

/// One rule family (e.g. "Income Tax") of a model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleDefinition {
    pub name: String,
    /// Bands given inline
    #[serde(default)]
    pub bands: Vec<BandSpec>,
    /// Bands read from a CSV rule table
    #[serde(default)]
    pub table: Option<TableDefinition>,
    /// Deduction applied before the bands
    #[serde(default)]
    pub allowance: AllowanceDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableDefinition {
    /// Path to the CSV table, relative to the definition file
    pub csv: PathBuf,
    pub kind: TableKind,
    /// Scale applied to floors, ceilings and flat charges (12 annualises monthly tables)
    #[serde(default = "default_multiplier")]
    #[schemars(with = "f64")]
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AllowanceDefinition {
    /// Fixed amount
    Fixed(u64),
    /// Income-dependent policy
    Policy(AllowancePolicyDefinition),
}

impl Default for AllowanceDefinition {
    fn default() -> Self {
        AllowanceDefinition::Fixed(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllowancePolicyDefinition {
    /// `max(minimum, rate * amount)`, optionally capped
    Proportional {
        #[schemars(with = "f64")]
        rate: Decimal,
        #[serde(default)]
        minimum: u64,
        #[serde(default)]
        cap: Option<u64>,
    },
    /// `base`, reduced by `withdrawal_rate` per unit above `threshold`
    Tapered {
        base: u64,
        threshold: u64,
        #[serde(default = "default_withdrawal_rate")]
        #[schemars(with = "f64")]
        withdrawal_rate: Decimal,
    },
}

fn default_name() -> String {
    crate::core::model::DEFAULT_NAME.to_string()
}

fn default_year() -> i32 {
    crate::core::model::DEFAULT_YEAR
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

fn default_withdrawal_rate() -> Decimal {
    Decimal::ONE
}

impl From<&AllowanceDefinition> for Allowance {
    fn from(definition: &AllowanceDefinition) -> Self {
        match *definition {
            AllowanceDefinition::Fixed(value) => Allowance::Fixed(value),
            AllowanceDefinition::Policy(AllowancePolicyDefinition::Proportional {
                rate,
                minimum,
                cap,
            }) => Allowance::policy(ProportionalAllowance { rate, minimum, cap }),
            AllowanceDefinition::Policy(AllowancePolicyDefinition::Tapered {
                base,
                threshold,
                withdrawal_rate,
            }) => Allowance::policy(TaperedAllowance {
                base,
                threshold,
                withdrawal_rate,
            }),
        }
    }
}

impl ModelDefinition {
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, ImportError> {
        serde_json::from_reader(reader).map_err(|source| ImportError::Json {
            source_name: source_name.to_string(),
            source,
        })
    }

    /// Build and validate the model. CSV tables are resolved against `base_dir`.
    ///
    /// Validation problems from every rule are reported together.
    pub fn build(&self, base_dir: &Path) -> Result<TaxModel, ImportError> {
        let mut violations = Vec::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let specs = rule.band_specs(base_dir)?;
            match BandsGroup::new(rule.name.clone(), specs, Allowance::from(&rule.allowance)) {
                Ok(group) => rules.push(group),
                Err(err) => violations.extend(err.into_nested()),
            }
        }
        ValidationError::check(format!("tax model \"{}\"", self.name), violations)?;

        let model = TaxModel::new(rules)?
            .with_name(self.name.clone())
            .with_year(self.year)
            .non_sequential(self.non_sequential);
        log::info!(
            "Loaded {} ({}) with {} rules",
            model.name(),
            model.year(),
            model.rules().len()
        );
        Ok(model)
    }
}

impl RuleDefinition {
    fn band_specs(&self, base_dir: &Path) -> Result<Vec<BandSpec>, ImportError> {
        match &self.table {
            Some(_) if !self.bands.is_empty() => Err(ImportError::AmbiguousBands {
                rule: self.name.clone(),
            }),
            Some(table) => read_bands_file(&base_dir.join(&table.csv), table.kind, table.multiplier),
            None => Ok(self.bands.clone()),
        }
    }
}

/// Read a model definition file and build the model it describes.
pub fn read_model(path: &Path) -> Result<TaxModel, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let definition =
        ModelDefinition::from_reader(BufReader::new(file), &path.display().to_string())?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    definition.build(base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Violation;
    use rust_decimal_macros::dec;

    const UK: &str = r#"{
        "name": "UK employee",
        "non_sequential": true,
        "rules": [
            {
                "name": "National Insurance",
                "bands": [
                    { "ceiling": 12570, "rate": 0 },
                    { "floor": 12570, "ceiling": 50270, "rate": 0.08 },
                    { "floor": 50270, "ceiling": 10000000, "rate": 0.02 }
                ]
            },
            {
                "name": "Income Tax",
                "allowance": { "type": "tapered", "base": 12570, "threshold": 100000, "withdrawal_rate": 0.5 },
                "bands": [
                    { "ceiling": 37700, "rate": 0.2 },
                    { "floor": 37700, "ceiling": 125140, "rate": 0.4 },
                    { "floor": 125140, "ceiling": 10000000, "rate": 0.45 }
                ]
            }
        ]
    }"#;

    fn parse(json: &str) -> ModelDefinition {
        ModelDefinition::from_reader(json.as_bytes(), "test.json").unwrap()
    }

    #[test]
    fn builds_model_from_inline_bands() {
        let model = parse(UK).build(Path::new(".")).unwrap();
        assert_eq!(model.name(), "UK employee");
        assert_eq!(model.year(), 2025);
        assert!(model.is_non_sequential());
        let results = model.results(40000);
        // (40000 - 12570) * 0.08
        assert_eq!(results.payable_for("National Insurance"), Some(2194));
        // (40000 - 12570) * 0.2
        assert_eq!(results.payable_for("Income Tax"), Some(5486));
    }

    #[test]
    fn allowance_definitions() {
        let fixed: AllowanceDefinition = serde_json::from_str("5500").unwrap();
        assert_eq!(fixed, AllowanceDefinition::Fixed(5500));

        let proportional: AllowanceDefinition =
            serde_json::from_str(r#"{ "type": "proportional", "rate": 0.7, "minimum": 2000 }"#)
                .unwrap();
        assert_eq!(
            proportional,
            AllowanceDefinition::Policy(AllowancePolicyDefinition::Proportional {
                rate: dec!(0.7),
                minimum: 2000,
                cap: None,
            })
        );
        assert_eq!(Allowance::from(&proportional).evaluate(10000), 7000);
    }

    #[test]
    fn tapered_withdrawal_rate_defaults_to_one() {
        let tapered: AllowanceDefinition =
            serde_json::from_str(r#"{ "type": "tapered", "base": 12570, "threshold": 100000 }"#)
                .unwrap();
        assert_eq!(Allowance::from(&tapered).evaluate(105000), 7570);
    }

    #[test]
    fn negative_allowance_is_rejected() {
        assert!(serde_json::from_str::<AllowanceDefinition>("-1").is_err());
    }

    #[test]
    fn violations_from_every_rule_are_collected() {
        let json = r#"{
            "rules": [
                { "name": "A", "bands": [{ "floor": 10, "ceiling": 100, "rate": 0.1 }] },
                { "name": "B", "bands": [] }
            ]
        }"#;
        let err = parse(json).build(Path::new(".")).unwrap_err();
        let err = match err {
            ImportError::Validation(err) => err,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(err.violations().len(), 2);
        let message = err.to_string();
        assert!(message.starts_with("invalid tax model \"TaxModel\""));
        assert!(message.contains("rule \"A\": floor of first band must be 0, found [10]"));
        assert!(message.contains("rule \"B\": a rule must contain at least one band"));
    }

    #[test]
    fn allowance_policy_parameters_are_validated() {
        let json = r#"{
            "rules": [{
                "name": "Income Tax",
                "allowance": { "type": "proportional", "rate": 70 },
                "bands": [{ "ceiling": 100000, "rate": 0.2 }]
            }]
        }"#;
        let err = match parse(json).build(Path::new(".")).unwrap_err() {
            ImportError::Validation(err) => err,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(err
            .to_string()
            .contains("rule \"Income Tax\": allowance: rate [70] must be between 0 and 1 inclusive"));
    }

    #[test]
    fn empty_rule_list_is_rejected() {
        let err = parse(r#"{ "rules": [] }"#).build(Path::new(".")).unwrap_err();
        let err = match err {
            ImportError::Validation(err) => err,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(err.violations(), &[Violation::NoRules]);
    }

    #[test]
    fn bands_and_table_together_are_ambiguous() {
        let json = r#"{
            "rules": [{
                "name": "A",
                "bands": [{ "ceiling": 100, "rate": 0.1 }],
                "table": { "csv": "a.csv", "kind": "rate" }
            }]
        }"#;
        let err = parse(json).build(Path::new(".")).unwrap_err();
        assert!(matches!(err, ImportError::AmbiguousBands { .. }));
    }

    #[test]
    fn missing_table_file_is_io_error() {
        let json = r#"{
            "rules": [{ "name": "A", "table": { "csv": "does-not-exist.csv", "kind": "flat" } }]
        }"#;
        let err = parse(json).build(Path::new(".")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
