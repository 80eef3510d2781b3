//! Writes a loaded [`Warehouse`] to `DuckDB`.

use std::time::Instant;

use crash_warehouse_etl_models::{LoadSummary, RecordIssue};
use crash_warehouse_models::{SurrogateKey, Warehouse};
use duckdb::{Connection, params};

use crate::DbError;
use crate::schema;

fn key(id: SurrogateKey) -> i64 {
    i64::from(id.0)
}

fn population(value: Option<u64>) -> Option<i64> {
    value.and_then(|v| i64::try_from(v).ok())
}

/// Replaces the stored warehouse with `warehouse` and records the load's
/// issues.
///
/// Runs in one transaction; on error the previous contents are kept.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn write_warehouse(
    conn: &mut Connection,
    warehouse: &Warehouse,
    summary: &LoadSummary,
) -> Result<(), DbError> {
    let start = Instant::now();
    let tx = conn.transaction()?;
    schema::recreate(&tx)?;

    write_dimensions(&tx, warehouse)?;
    let facts = write_facts(&tx, warehouse)?;
    let issues = write_issues(&tx, summary)?;

    tx.commit()?;
    log::info!(
        "Wrote {facts} facts and {issues} load issues in {:.1}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn write_dimensions(conn: &Connection, warehouse: &Warehouse) -> Result<(), DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO time_dimension (time_id, year, month, date, hour, day_of_week, day_type, time_of_day, christmas_period, easter_period)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for row in warehouse.time.rows() {
        stmt.execute(params![
            key(row.time_id),
            row.year,
            row.month,
            row.date.map(|d| d.format("%Y-%m-%d").to_string()),
            row.hour.map(i16::from),
            row.day_of_week.to_string(),
            row.day_type.to_string(),
            row.time_of_day.to_string(),
            row.christmas_period,
            row.easter_period,
        ])?;
    }

    let mut stmt = conn.prepare("INSERT INTO season_dimension (season_id, season) VALUES (?, ?)")?;
    for row in warehouse.season.rows() {
        stmt.execute(params![key(row.season_id), row.season])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO season_dimension_clean (raw_label, season_id, clean_label) VALUES (?, ?, ?)",
    )?;
    for row in warehouse.season_clean.values() {
        stmt.execute(params![row.raw_label, key(row.season_id), row.clean_label])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO location_dimension (location_id, state, remoteness_area, sa4_name, lga_name)
         VALUES (?, ?, ?, ?, ?)",
    )?;
    for row in warehouse.location.rows() {
        stmt.execute(params![
            key(row.location_id),
            row.state.to_string(),
            row.remoteness_area.to_string(),
            row.sa4_name,
            row.lga_name,
        ])?;
    }

    let mut stmt =
        conn.prepare("INSERT INTO crash_type_dimension (crash_type_id, crash_type) VALUES (?, ?)")?;
    for row in warehouse.crash_type.rows() {
        stmt.execute(params![key(row.crash_type_id), row.crash_type.to_string()])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO road_condition_dimension (road_condition_id, speed_limit, road_type) VALUES (?, ?, ?)",
    )?;
    for row in warehouse.road_condition.rows() {
        stmt.execute(params![key(row.road_condition_id), row.speed_limit, row.road_type])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO vehicle_dimension (vehicle_id, bus_involvement, heavy_rigid_truck_involvement, articulated_truck_involvement, vehicle_type)
         VALUES (?, ?, ?, ?, ?)",
    )?;
    for row in warehouse.vehicle.rows() {
        stmt.execute(params![
            key(row.vehicle_id),
            row.bus_involvement,
            row.heavy_rigid_truck_involvement,
            row.articulated_truck_involvement,
            row.vehicle_type.to_string(),
        ])?;
    }

    let mut stmt =
        conn.prepare("INSERT INTO driver_dimension (driver_id, age_group, gender) VALUES (?, ?, ?)")?;
    for row in warehouse.driver.rows() {
        stmt.execute(params![
            key(row.driver_id),
            row.age_group.to_string(),
            row.gender.to_string(),
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO population_dimension (population_id, state, remoteness_area, population, data_source)
         VALUES (?, ?, ?, ?, ?)",
    )?;
    for row in warehouse.population.rows() {
        stmt.execute(params![
            key(row.population_id),
            row.state.to_string(),
            row.remoteness_area.to_string(),
            population(row.population),
            row.data_source.to_string(),
        ])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO lga_dimension (lga_id, lga_name, population, data_source) VALUES (?, ?, ?, ?)",
    )?;
    for row in warehouse.lga.rows() {
        stmt.execute(params![
            key(row.lga_id),
            row.lga_name,
            population(row.population),
            row.data_source.to_string(),
        ])?;
    }

    Ok(())
}

fn write_facts(conn: &Connection, warehouse: &Warehouse) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO fact_table (fact_id, crash_id, time_id, season_id, location_id, crash_type_id,
             road_condition_id, vehicle_id, driver_id, population_id, lga_id, fatalities)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for fact in warehouse.facts() {
        stmt.execute(params![
            key(fact.fact_id),
            fact.crash_id,
            key(fact.time_id),
            key(fact.season_id),
            key(fact.location_id),
            key(fact.crash_type_id),
            key(fact.road_condition_id),
            key(fact.vehicle_id),
            key(fact.driver_id),
            key(fact.population_id),
            key(fact.lga_id),
            i64::from(fact.fatalities),
        ])?;
    }
    Ok(warehouse.facts().len())
}

fn write_issues(conn: &Connection, summary: &LoadSummary) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO load_issue (issue_id, record_index, record, kind, field, message, outcome)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )?;
    let issues = summary
        .rejected
        .iter()
        .map(|issue| (issue, "rejected"))
        .chain(summary.sentineled.iter().map(|issue| (issue, "sentineled")));

    let mut written = 0usize;
    for (id, (issue, outcome)) in (1_i64..).zip(issues) {
        let RecordIssue {
            index,
            record,
            kind,
            field,
            message,
        } = issue;
        stmt.execute(params![
            id,
            i64::try_from(*index).unwrap_or(i64::MAX),
            record,
            kind.to_string(),
            field,
            message,
            outcome,
        ])?;
        written += 1;
    }
    Ok(written)
}
