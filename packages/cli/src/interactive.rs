//! Menu-driven front end used when no subcommand is given.

use std::path::{Path, PathBuf};

use crash_warehouse_cli_utils::MultiProgress;
use crash_warehouse_models::Attribute;
use crash_warehouse_olap::models::{Filter, Measure, QuerySpec};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use strum::IntoEnumIterator as _;

use crate::commands::{self, LoadArgs};
use crate::config::Config;

enum Action {
    Load,
    Query,
    Mine,
    Quality,
}

impl Action {
    const ALL: &[Self] = &[Self::Load, Self::Query, Self::Mine, Self::Quality];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Load => "Load a crash extract",
            Self::Query => "Run an aggregate query",
            Self::Mine => "Mine association rules",
            Self::Quality => "Show the data quality report",
        }
    }
}

/// Prompts for an action and its settings, seeded from `config`.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected command fails.
pub fn run(
    multi: &MultiProgress,
    config: &Config,
    db_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Crash Warehouse ({})", db_path.display());
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Load => load(multi, config, db_path)?,
        Action::Query => query(db_path)?,
        Action::Mine => mine(config, db_path)?,
        Action::Quality => commands::run_quality(db_path, false)?,
    }

    Ok(())
}

fn load(
    multi: &MultiProgress,
    config: &Config,
    db_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let input: String = Input::new().with_prompt("Crash CSV").interact_text()?;
    let population = prompt_optional_path("Population CSV (empty to skip)")?;
    let lga = prompt_optional_path("LGA CSV (empty to skip)")?;

    let mut options = config.load.clone();
    options.strict = Confirm::new()
        .with_prompt("Abort on the first bad record?")
        .default(options.strict)
        .interact()?;

    let args = LoadArgs {
        input: PathBuf::from(input.trim()),
        population,
        lga,
        options,
        json: false,
    };
    commands::run_load(multi, &args, db_path)?;
    Ok(())
}

fn query(db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let attributes: Vec<Attribute> = Attribute::iter().collect();
    let labels: Vec<&str> = attributes.iter().map(AsRef::as_ref).collect();

    let selected = MultiSelect::new()
        .with_prompt("Group by (space=toggle, enter=confirm)")
        .items(&labels)
        .max_length(20)
        .interact()?;
    let mut spec = QuerySpec::group_by(selected.iter().map(|&i| attributes[i]));

    let filters: String = Input::new()
        .with_prompt("Filters, space separated (e.g. state=NSW|VIC gender!=unknown)")
        .allow_empty(true)
        .interact_text()?;
    for expr in filters.split_whitespace() {
        spec = spec.filter(expr.parse::<Filter>()?);
    }

    spec.rollup = Confirm::new()
        .with_prompt("Include subtotals and a grand total?")
        .default(false)
        .interact()?;

    let measures = [
        Measure::TotalCrashes,
        Measure::TotalFatalities,
        Measure::FatalityRatePer100,
    ];
    let mut order_labels = vec!["(group order)"];
    order_labels.extend(measures.iter().map(AsRef::as_ref));
    let order = Select::new()
        .with_prompt("Order by")
        .items(&order_labels)
        .default(0)
        .interact()?;
    if order > 0 {
        spec = spec.order_by(measures[order - 1], true);
    }

    spec.limit = prompt_optional_usize("Row limit (empty for no limit)")?;

    commands::run_query_command(db_path, &spec, false)?;
    Ok(())
}

fn mine(config: &Config, db_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut mining = config.mining.clone();

    mining.min_support = Input::new()
        .with_prompt("Minimum support")
        .default(mining.min_support)
        .interact_text()?;
    mining.min_confidence = Input::new()
        .with_prompt("Minimum confidence")
        .default(mining.min_confidence)
        .interact_text()?;

    let attributes: Vec<Attribute> = Attribute::iter().collect();
    let labels: Vec<&str> = attributes.iter().map(AsRef::as_ref).collect();
    let checked: Vec<bool> = attributes
        .iter()
        .map(|a| mining.attributes.contains(a))
        .collect();
    let selected = MultiSelect::new()
        .with_prompt("Attributes (space=toggle, enter=confirm)")
        .items(&labels)
        .defaults(&checked)
        .max_length(20)
        .interact()?;
    mining.attributes = selected.iter().map(|&i| attributes[i]).collect();

    mining.include_unknown = Confirm::new()
        .with_prompt("Keep Unknown values as items?")
        .default(mining.include_unknown)
        .interact()?;

    let top = prompt_optional_usize("Show at most N itemsets and rules (empty for all)")?;

    commands::run_mine(db_path, &mining, top, false)?;
    Ok(())
}

fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok((!input.is_empty()).then(|| PathBuf::from(input)))
}

fn prompt_optional_usize(prompt: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}
