//! Population reference tables.
//!
//! Two optional CSVs enrich the population and LGA dimensions: residents
//! per state/remoteness area and residents per local government area.
//! Rows with an unparseable population are skipped with a warning.

use std::io::Read;
use std::path::Path;

use crash_warehouse_models::{LgaReference, PopulationReference, present};
use csv::StringRecord;

use crate::SourceError;
use crate::parsing::parse_population;

/// Reads a `state,remoteness_area,population` reference file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or lacks a required
/// column.
pub fn read_population_csv(path: &Path) -> Result<Vec<PopulationReference>, SourceError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: label.clone(),
        source,
    })?;
    read_population_reader(file, &label)
}

/// Reads a population reference table from any reader.
///
/// # Errors
///
/// Returns [`SourceError`] if a required column is missing.
pub fn read_population_reader(
    reader: impl Read,
    label: &str,
) -> Result<Vec<PopulationReference>, SourceError> {
    read_reference(reader, label, &["state", "remoteness_area", "population"], |row| {
        Some(PopulationReference {
            state: present(row.first().copied())?.to_string(),
            remoteness_area: present(row.get(1).copied())?.to_string(),
            population: parse_population(present(row.get(2).copied())?)?,
        })
    })
}

/// Reads an `lga_name,population` reference file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or lacks a required
/// column.
pub fn read_lga_csv(path: &Path) -> Result<Vec<LgaReference>, SourceError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: label.clone(),
        source,
    })?;
    read_lga_reader(file, &label)
}

/// Reads an LGA reference table from any reader.
///
/// # Errors
///
/// Returns [`SourceError`] if a required column is missing.
pub fn read_lga_reader(reader: impl Read, label: &str) -> Result<Vec<LgaReference>, SourceError> {
    read_reference(reader, label, &["lga_name", "population"], |row| {
        Some(LgaReference {
            lga_name: present(row.first().copied())?.to_string(),
            population: parse_population(present(row.get(1).copied())?)?,
        })
    })
}

/// Reads a reference CSV, projecting each row onto `columns` (in that
/// order) before handing it to `convert`.
fn read_reference<T>(
    reader: impl Read,
    label: &str,
    columns: &[&str],
    convert: impl Fn(&[&str]) -> Option<T>,
) -> Result<Vec<T>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = reader.records();
    let headers = crate::header_row(&mut rows, label, 0)?;
    let positions = column_positions(&headers, columns, label)?;

    let mut out = Vec::new();
    for (index, result) in rows.enumerate() {
        let row = result.map_err(|source| SourceError::Csv {
            path: label.to_string(),
            source,
        })?;
        let projected: Vec<&str> = positions
            .iter()
            .map(|&pos| row.get(pos).unwrap_or(""))
            .collect();
        if let Some(value) = convert(&projected) {
            out.push(value);
        } else {
            log::warn!("[{label}] skipping reference row {}: {projected:?}", index + 2);
        }
    }

    log::info!("[{label}] loaded {} reference rows", out.len());
    Ok(out)
}

fn column_positions(
    headers: &StringRecord,
    columns: &[&str],
    label: &str,
) -> Result<Vec<usize>, SourceError> {
    columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| SourceError::MissingColumn {
                    path: label.to_string(),
                    column: (*column).to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_rows_in_any_column_order() {
        let csv = "Population,State,Remoteness Area\n\"5,000,000\",VIC,Major Cities of Australia\n12,NT,\n";
        let rows = read_population_reader(csv.as_bytes(), "pop").unwrap();
        assert_eq!(
            rows,
            vec![PopulationReference {
                state: "VIC".to_string(),
                remoteness_area: "Major Cities of Australia".to_string(),
                population: 5_000_000,
            }]
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "LGA,Population\nMelbourne,1\n";
        let err = read_lga_reader(csv.as_bytes(), "lga").unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { ref column, .. } if column == "lga_name"));
    }

    #[test]
    fn lga_rows() {
        let csv = "LGA Name,Population\nMelbourne,169860\nGeelong,x\n";
        let rows = read_lga_reader(csv.as_bytes(), "lga").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lga_name, "Melbourne");
        assert_eq!(rows[0].population, 169_860);
    }
}
