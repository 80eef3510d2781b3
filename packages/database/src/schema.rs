//! Star schema DDL.

use duckdb::Connection;

use crate::DbError;

/// Table holding the row-level issues of the last load.
pub const LOAD_ISSUE_TABLE: &str = "load_issue";

/// Children first, so foreign keys never block a drop.
const DROP_ORDER: &[&str] = &[
    LOAD_ISSUE_TABLE,
    "fact_table",
    "season_dimension_clean",
    "time_dimension",
    "season_dimension",
    "location_dimension",
    "crash_type_dimension",
    "road_condition_dimension",
    "vehicle_dimension",
    "driver_dimension",
    "population_dimension",
    "lga_dimension",
];

const CREATE: &str = "
CREATE TABLE time_dimension (
    time_id INTEGER PRIMARY KEY,
    year INTEGER,
    month SMALLINT CHECK (month BETWEEN 1 AND 12),
    date DATE,
    hour SMALLINT CHECK (hour BETWEEN 0 AND 23),
    day_of_week VARCHAR NOT NULL,
    day_type VARCHAR NOT NULL,
    time_of_day VARCHAR NOT NULL,
    christmas_period BOOLEAN,
    easter_period BOOLEAN
);

CREATE TABLE season_dimension (
    season_id INTEGER PRIMARY KEY,
    season VARCHAR NOT NULL
);

CREATE TABLE season_dimension_clean (
    raw_label VARCHAR PRIMARY KEY,
    season_id INTEGER NOT NULL REFERENCES season_dimension (season_id),
    clean_label VARCHAR NOT NULL
);

CREATE TABLE location_dimension (
    location_id INTEGER PRIMARY KEY,
    state VARCHAR NOT NULL,
    remoteness_area VARCHAR NOT NULL,
    sa4_name VARCHAR NOT NULL,
    lga_name VARCHAR NOT NULL
);

CREATE TABLE crash_type_dimension (
    crash_type_id INTEGER PRIMARY KEY,
    crash_type VARCHAR NOT NULL
);

CREATE TABLE road_condition_dimension (
    road_condition_id INTEGER PRIMARY KEY,
    speed_limit VARCHAR NOT NULL,
    road_type VARCHAR NOT NULL
);

CREATE TABLE vehicle_dimension (
    vehicle_id INTEGER PRIMARY KEY,
    bus_involvement BOOLEAN,
    heavy_rigid_truck_involvement BOOLEAN,
    articulated_truck_involvement BOOLEAN,
    vehicle_type VARCHAR NOT NULL
);

CREATE TABLE driver_dimension (
    driver_id INTEGER PRIMARY KEY,
    age_group VARCHAR NOT NULL,
    gender VARCHAR NOT NULL
);

CREATE TABLE population_dimension (
    population_id INTEGER PRIMARY KEY,
    state VARCHAR NOT NULL,
    remoteness_area VARCHAR NOT NULL,
    population BIGINT,
    data_source VARCHAR NOT NULL
);

CREATE TABLE lga_dimension (
    lga_id INTEGER PRIMARY KEY,
    lga_name VARCHAR NOT NULL,
    population BIGINT,
    data_source VARCHAR NOT NULL
);

CREATE TABLE fact_table (
    fact_id INTEGER PRIMARY KEY,
    crash_id VARCHAR NOT NULL UNIQUE,
    time_id INTEGER NOT NULL REFERENCES time_dimension (time_id),
    season_id INTEGER NOT NULL REFERENCES season_dimension (season_id),
    location_id INTEGER NOT NULL REFERENCES location_dimension (location_id),
    crash_type_id INTEGER NOT NULL REFERENCES crash_type_dimension (crash_type_id),
    road_condition_id INTEGER NOT NULL REFERENCES road_condition_dimension (road_condition_id),
    vehicle_id INTEGER NOT NULL REFERENCES vehicle_dimension (vehicle_id),
    driver_id INTEGER NOT NULL REFERENCES driver_dimension (driver_id),
    population_id INTEGER NOT NULL REFERENCES population_dimension (population_id),
    lga_id INTEGER NOT NULL REFERENCES lga_dimension (lga_id),
    fatalities INTEGER NOT NULL CHECK (fatalities >= 0)
);

CREATE TABLE load_issue (
    issue_id INTEGER PRIMARY KEY,
    record_index BIGINT NOT NULL,
    record VARCHAR NOT NULL,
    kind VARCHAR NOT NULL,
    field VARCHAR NOT NULL,
    message VARCHAR NOT NULL,
    outcome VARCHAR NOT NULL
);
";

/// Drops every warehouse table and creates the schema from scratch.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn recreate(conn: &Connection) -> Result<(), DbError> {
    for table in DROP_ORDER {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    conn.execute_batch(CREATE)?;
    log::debug!("Recreated warehouse schema");
    Ok(())
}

/// Returns `true` if the fact table exists.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog cannot be read.
pub fn is_loaded(conn: &Connection) -> Result<bool, DbError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'fact_table'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_can_be_recreated_repeatedly() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!is_loaded(&conn).unwrap());
        recreate(&conn).unwrap();
        recreate(&conn).unwrap();
        assert!(is_loaded(&conn).unwrap());
    }
}
