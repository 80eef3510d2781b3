//! Subcommand bodies shared by the flag-driven and interactive front ends.

use std::path::{Path, PathBuf};

use crash_warehouse_cli_utils::{IndicatifProgress, MultiProgress};
use crash_warehouse_database::{
    Connection, DbError, fetch_attribute_rows, open, quality_scan, run_query, schema, write_warehouse,
};
use crash_warehouse_etl::quality::{log_report, quality_report};
use crash_warehouse_etl::{EtlError, References, load_batch};
use crash_warehouse_etl_models::LoadOptions;
use crash_warehouse_mining::models::MiningConfig;
use crash_warehouse_mining::{MiningError, TransactionSet, mine_transactions};
use crash_warehouse_olap::models::QuerySpec;
use crash_warehouse_source::reference::{read_lga_csv, read_population_csv};
use crash_warehouse_source::{CsvOptions, SourceError, read_crash_csv};
use serde::Serialize;

use crate::output;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no warehouse loaded at {}; run `load` first", .0.display())]
    NotLoaded(PathBuf),
}

/// Inputs for one load.
#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub input: PathBuf,
    pub population: Option<PathBuf>,
    pub lga: Option<PathBuf>,
    pub options: LoadOptions,
    pub json: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_loaded(db_path: &Path) -> Result<Connection, CommandError> {
    if !db_path.exists() {
        return Err(CommandError::NotLoaded(db_path.to_path_buf()));
    }
    let conn = open(db_path)?;
    if !schema::is_loaded(&conn)? {
        return Err(CommandError::NotLoaded(db_path.to_path_buf()));
    }
    Ok(conn)
}

/// Reads the extract and references, builds the warehouse, and replaces
/// whatever was stored at `db_path`.
///
/// # Errors
///
/// * [`CommandError::Source`] if an input file cannot be read
/// * [`CommandError::Etl`] if the load is misconfigured or strict mode
///   hits a bad or undecodable row
/// * [`CommandError::Db`] if the warehouse cannot be written
pub fn run_load(
    multi: &MultiProgress,
    args: &LoadArgs,
    db_path: &Path,
) -> Result<(), CommandError> {
    log::info!("Reading {}", args.input.display());
    let batch = read_crash_csv(
        &args.input,
        CsvOptions {
            skip_rows: args.options.skip_rows,
        },
    )?;

    let population = args
        .population
        .as_deref()
        .map(read_population_csv)
        .transpose()?
        .unwrap_or_default();
    let lga = args
        .lga
        .as_deref()
        .map(read_lga_csv)
        .transpose()?
        .unwrap_or_default();
    let references = References::new(&population, &lga);

    let progress = IndicatifProgress::records_bar(multi, "loading");
    let outcome = load_batch(&batch, &args.options, &references, &progress)?;

    let report = quality_report(&outcome.warehouse, &outcome.summary);
    log_report(&report);

    let mut conn = open(db_path)?;
    write_warehouse(&mut conn, &outcome.warehouse, &outcome.summary)?;
    log::info!("Warehouse written to {}", db_path.display());

    if args.json {
        print_json(&outcome.summary)
    } else {
        output::print_summary(&outcome.summary);
        Ok(())
    }
}

/// Runs an aggregate query against the stored warehouse.
///
/// # Errors
///
/// * [`CommandError::NotLoaded`] if nothing has been loaded yet
/// * [`CommandError::Db`] if the query is invalid or fails
pub fn run_query_command(db_path: &Path, spec: &QuerySpec, json: bool) -> Result<(), CommandError> {
    let conn = open_loaded(db_path)?;
    let result = run_query(&conn, spec)?;
    if json {
        print_json(&result)
    } else {
        output::print_query(&result);
        Ok(())
    }
}

/// Mines association rules over the stored facts.
///
/// # Errors
///
/// * [`CommandError::Mining`] if the configuration is invalid
/// * [`CommandError::NotLoaded`] if nothing has been loaded yet
/// * [`CommandError::Db`] if the facts cannot be read
pub fn run_mine(
    db_path: &Path,
    config: &MiningConfig,
    top: Option<usize>,
    json: bool,
) -> Result<(), CommandError> {
    crash_warehouse_mining::validate(config)?;
    let conn = open_loaded(db_path)?;
    let rows = fetch_attribute_rows(&conn, &config.attributes)?;
    log::info!("Mining {} transactions", rows.len());
    let set = TransactionSet::from_rows(&config.attributes, rows, config.include_unknown);
    let report = mine_transactions(&set, config)?;
    if json {
        print_json(&report)
    } else {
        output::print_mining(&report, top);
        Ok(())
    }
}

/// Reports row counts, unknown references, and recorded load issues for
/// the stored warehouse.
///
/// # Errors
///
/// * [`CommandError::NotLoaded`] if nothing has been loaded yet
/// * [`CommandError::Db`] if a scan query fails
pub fn run_quality(db_path: &Path, json: bool) -> Result<(), CommandError> {
    let conn = open_loaded(db_path)?;
    let report = quality_scan(&conn)?;
    if json {
        print_json(&report)
    } else {
        output::print_quality(&report);
        Ok(())
    }
}
