//! One model per tax year from a directory of dated rule tables.

use super::table::{read_bands_file, TableKind};
use super::ImportError;
use crate::core::{Allowance, BandsGroup, TaxModel};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};

/// Build a single-rule model for every CSV table in `dir` whose file name
/// carries a year, e.g. `cuotas2024.csv` and `cuotas2025.csv`.
///
/// Models are ordered by year. The rule and model are named after the part of
/// the file name before the year. Files without a year are skipped.
pub fn read_yearly_tables(
    dir: &Path,
    kind: TableKind,
    multiplier: Decimal,
) -> Result<Vec<TaxModel>, ImportError> {
    let io_error = |source| ImportError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut tables: Vec<(i32, String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let dated = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| year_in_name(stem).map(|(prefix, year)| (year, rule_name(prefix, stem))));
        match dated {
            Some((year, name)) => tables.push((year, name, path)),
            None => log::debug!("skipping {}: no year in file name", path.display()),
        }
    }
    tables.sort();
    log::info!("Found {} yearly tables in {}", tables.len(), dir.display());

    tables
        .into_iter()
        .map(|(year, name, path)| {
            let specs = read_bands_file(&path, kind, multiplier)?;
            let rule = BandsGroup::new(name.clone(), specs, Allowance::default())?;
            Ok(TaxModel::new(vec![rule])?.with_name(name).with_year(year))
        })
        .collect()
}

/// The first standalone `20xx` in a file stem, with the text before it.
fn year_in_name(stem: &str) -> Option<(&str, i32)> {
    let bytes = stem.as_bytes();
    (0..bytes.len().saturating_sub(3)).find_map(|start| {
        let digits = &bytes[start..start + 4];
        let standalone = (start == 0 || !bytes[start - 1].is_ascii_digit())
            && bytes.get(start + 4).map_or(true, |b| !b.is_ascii_digit());
        if standalone && digits.starts_with(b"20") && digits.iter().all(u8::is_ascii_digit) {
            let year = stem[start..start + 4].parse().ok()?;
            Some((&stem[..start], year))
        } else {
            None
        }
    })
}

fn rule_name(prefix: &str, stem: &str) -> String {
    let name = prefix.trim_matches(|c: char| c == '_' || c == '-' || c.is_whitespace());
    if name.is_empty() {
        stem.to_string()
    } else {
        name.to_string()
    }
}
