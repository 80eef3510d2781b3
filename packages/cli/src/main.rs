#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crash warehouse.
//!
//! Runs a subcommand when one is given and otherwise falls back to an
//! interactive menu. Settings come from CLI flags first, then
//! `crash_warehouse.toml`, then built-in defaults.
//!
//! Uses `indicatif-log-bridge` (via [`crash_warehouse_cli_utils::init_logger`])
//! so that log lines and the load progress bar share the terminal.

mod commands;
mod config;
mod interactive;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crash_warehouse_database::paths::resolve_db_path;
use crash_warehouse_models::Attribute;
use crash_warehouse_olap::models::{Filter, Measure, QuerySpec};

use crate::commands::LoadArgs;
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "crash_warehouse",
    about = "Fatal crash star-schema warehouse: load, query, and mine"
)]
struct Cli {
    /// Config file (defaults to `crash_warehouse.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Warehouse database file (overrides `CRASH_WAREHOUSE_DB` and the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a crash extract into a fresh warehouse
    Load {
        /// Crash CSV extract
        input: PathBuf,
        /// Population reference CSV
        #[arg(long)]
        population: Option<PathBuf>,
        /// LGA reference CSV
        #[arg(long)]
        lga: Option<PathBuf>,
        /// Abort on the first bad record
        #[arg(long)]
        strict: bool,
        /// Preamble rows before the header row
        #[arg(long)]
        skip_rows: Option<usize>,
        /// Drop records before this year
        #[arg(long)]
        min_year: Option<i32>,
        /// Drop records after this year
        #[arg(long)]
        max_year: Option<i32>,
        /// Print the load summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Aggregate crashes and fatalities over dimension attributes
    Query {
        /// Comma-separated attributes to group by (e.g., `state,season`)
        #[arg(long, value_delimiter = ',')]
        group_by: Vec<Attribute>,
        /// Filter such as `state=NSW|VIC` or `gender!=unknown`; repeatable
        #[arg(long = "filter")]
        filters: Vec<Filter>,
        /// Add subtotal and grand total rows
        #[arg(long)]
        rollup: bool,
        /// Measure to sort by (`total_crashes`, `total_fatalities`, `rate`)
        #[arg(long)]
        order_by: Option<Measure>,
        /// Sort ascending instead of descending
        #[arg(long, requires = "order_by")]
        ascending: bool,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mine association rules over crash attributes
    Mine {
        #[arg(long)]
        min_support: Option<f64>,
        #[arg(long)]
        min_confidence: Option<f64>,
        /// Comma-separated attributes to turn into items
        #[arg(long, value_delimiter = ',')]
        attributes: Option<Vec<Attribute>>,
        #[arg(long)]
        min_lift: Option<f64>,
        /// Largest itemset size to search
        #[arg(long)]
        max_itemset_len: Option<usize>,
        /// Keep `attribute=Unknown` items
        #[arg(long)]
        include_unknown: bool,
        /// Print at most this many itemsets and rules
        #[arg(long)]
        top: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report row counts, unknown references, and load issues
    Quality {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crash_warehouse_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let db_path = resolve_db_path(cli.db.as_deref(), config.database.path.as_deref());

    let Some(command) = cli.command else {
        return interactive::run(&multi, &config, &db_path);
    };

    match command {
        Commands::Load {
            input,
            population,
            lga,
            strict,
            skip_rows,
            min_year,
            max_year,
            json,
        } => {
            let mut options = config.load;
            options.strict |= strict;
            if let Some(skip_rows) = skip_rows {
                options.skip_rows = skip_rows;
            }
            if min_year.is_some() {
                options.min_year = min_year;
            }
            if max_year.is_some() {
                options.max_year = max_year;
            }
            let args = LoadArgs {
                input,
                population,
                lga,
                options,
                json,
            };
            commands::run_load(&multi, &args, &db_path)?;
        }
        Commands::Query {
            group_by,
            filters,
            rollup,
            order_by,
            ascending,
            limit,
            json,
        } => {
            let mut spec = QuerySpec::group_by(group_by);
            spec.filters = filters;
            spec.rollup = rollup;
            if let Some(measure) = order_by {
                spec = spec.order_by(measure, !ascending);
            }
            spec.limit = limit;
            commands::run_query_command(&db_path, &spec, json)?;
        }
        Commands::Mine {
            min_support,
            min_confidence,
            attributes,
            min_lift,
            max_itemset_len,
            include_unknown,
            top,
            json,
        } => {
            let mut mining = config.mining;
            if let Some(min_support) = min_support {
                mining.min_support = min_support;
            }
            if let Some(min_confidence) = min_confidence {
                mining.min_confidence = min_confidence;
            }
            if let Some(attributes) = attributes {
                mining.attributes = attributes;
            }
            if min_lift.is_some() {
                mining.min_lift = min_lift;
            }
            if max_itemset_len.is_some() {
                mining.max_itemset_len = max_itemset_len;
            }
            mining.include_unknown |= include_unknown;
            commands::run_mine(&db_path, &mining, top, json)?;
        }
        Commands::Quality { json } => {
            commands::run_quality(&db_path, json)?;
        }
    }

    Ok(())
}
