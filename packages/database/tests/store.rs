use crash_warehouse_database::{
    fact_count, fetch_attribute_rows, open_in_memory, quality_scan, run_query, write_warehouse,
};
use crash_warehouse_etl::quality::quality_report;
use crash_warehouse_etl::{LoadOutcome, References, load};
use crash_warehouse_etl_models::LoadOptions;
use crash_warehouse_models::{Attribute, DimensionValue};
use crash_warehouse_olap::evaluate;
use crash_warehouse_olap::models::{Filter, Measure, QueryResult, QuerySpec};
use crash_warehouse_source::progress::null_progress;
use crash_warehouse_source::{CsvOptions, read_crash_reader};
use duckdb::Connection;

const EXTRACT: &str = "\
Crash ID,State,Month,Year,Dayweek,Time,Crash Type,Bus Involvement,Heavy Rigid Truck Involvement,Articulated Truck Involvement,Speed Limit,National Road Type,Gender,Age Group,National Remoteness Areas,National LGA Name 2021,Number Fatalities
20211001,NSW,1,2021,Friday,02:10,Single,No,No,No,100,Arterial Road,Male,17_to_25,Major Cities of Australia,Blacktown,1
20211002,NSW,1,2021,Friday,03:45,Single,No,No,No,100,Arterial Road,Male,17_to_25,Major Cities of Australia,Blacktown,2
20212003,Vic,7,2021,Tuesday,15:00,Multiple,No,Yes,No,80,Local Road,Female,40_to_64,Inner Regional Australia,Ballarat,1
20212004,Vic,7,2021,Tuesday,15:00,Multiple,No,Yes,No,80,Local Road,Robot,40_to_64,Inner Regional Australia,Ballarat,1
20212005,Vic,8,2021,Monday,-9,Pedestrian,-9,-9,-9,-9,-9,-9,-9,-9,-9,3
20212006,Vic,8,2021,Monday,09:00,Pedestrian,No,No,No,50,Local Road,Male,65_to_74,Major Cities of Australia,Melbourne,x
20223007,Qld,12,2022,Sunday,23:30,Single,No,No,Yes,110,National or State Highway,Male,26_to_39,Remote Australia,Longreach,2
20223008,Qld,12,2022,Monday,20:15,Single,Yes,No,No,100,National or State Highway,Female,26_to_39,Remote Australia,Longreach,1
";

fn loaded() -> (LoadOutcome, Connection) {
    let records = read_crash_reader(EXTRACT.as_bytes(), "extract", CsvOptions::default())
        .unwrap()
        .records;
    let outcome = load(
        &records,
        &LoadOptions::default(),
        &References::default(),
        &null_progress(),
    )
    .unwrap();
    let mut conn = open_in_memory().unwrap();
    write_warehouse(&mut conn, &outcome.warehouse, &outcome.summary).unwrap();
    (outcome, conn)
}

fn assert_same(a: &QueryResult, b: &QueryResult) {
    assert_eq!(a.columns, b.columns);
    assert_eq!(a.rows.len(), b.rows.len(), "{a:#?}\n{b:#?}");
    for (x, y) in a.rows.iter().zip(&b.rows) {
        assert_eq!(x.values, y.values);
        assert_eq!(x.total_crashes, y.total_crashes);
        assert_eq!(x.total_fatalities, y.total_fatalities);
        assert!((x.fatality_rate_per_100 - y.fatality_rate_per_100).abs() < 1e-9);
    }
}

#[test]
fn stored_facts_match_the_load() {
    let (outcome, conn) = loaded();
    assert_eq!(fact_count(&conn).unwrap(), 7);
    assert_eq!(outcome.warehouse.facts().len(), 7);
}

#[test]
fn sql_and_in_memory_queries_agree() {
    let (outcome, conn) = loaded();
    let specs = [
        QuerySpec::group_by([Attribute::State]).with_rollup(),
        QuerySpec::group_by([
            Attribute::Season,
            Attribute::State,
            Attribute::AgeGroup,
            Attribute::Gender,
        ]),
        QuerySpec::group_by([Attribute::Year, Attribute::Hour])
            .order_by(Measure::TotalFatalities, true),
        QuerySpec::group_by([Attribute::BusInvolvement, Attribute::ChristmasPeriod]),
        QuerySpec::group_by([Attribute::VehicleType])
            .filter(Filter::not_eq(Attribute::Gender, "unknown"))
            .order_by(Measure::FatalityRatePer100, true)
            .limit(2),
        QuerySpec::group_by([Attribute::RoadType, Attribute::SpeedLimit])
            .filter(Filter::one_of(Attribute::State, ["vic", "QLD"]))
            .with_rollup(),
        QuerySpec::default(),
    ];
    for spec in &specs {
        let memory = evaluate(&outcome.warehouse, spec).unwrap();
        let stored = run_query(&conn, spec).unwrap();
        assert_same(&memory, &stored);
    }
}

#[test]
fn missing_combinations_are_empty_in_sql() {
    let (_, conn) = loaded();
    let spec = QuerySpec::group_by([Attribute::State])
        .filter(Filter::eq(Attribute::State, "TAS"))
        .with_rollup();
    assert!(run_query(&conn, &spec).unwrap().rows.is_empty());
}

#[test]
fn rate_is_rounded_in_sql() {
    let (_, conn) = loaded();
    let spec = QuerySpec::group_by([Attribute::CrashType])
        .filter(Filter::eq(Attribute::CrashType, "Single"));
    let result = run_query(&conn, &spec).unwrap();
    let row = &result.rows[0];
    // Four single crashes, six deaths.
    assert_eq!(row.total_crashes, 4);
    assert_eq!(row.total_fatalities, 6);
    assert!((row.fatality_rate_per_100 - 150.0).abs() < 1e-9);
}

#[test]
fn stored_attribute_rows_match_the_warehouse() {
    let (outcome, conn) = loaded();
    let attributes = [Attribute::State, Attribute::Gender, Attribute::BusInvolvement];
    let stored = fetch_attribute_rows(&conn, &attributes).unwrap();
    let memory: Vec<Vec<DimensionValue>> = outcome
        .warehouse
        .facts()
        .iter()
        .map(|fact| {
            attributes
                .iter()
                .map(|&a| outcome.warehouse.value_of(fact, a))
                .collect()
        })
        .collect();
    assert_eq!(stored, memory);
}

#[test]
fn stored_quality_scan_matches_the_load_report() {
    let (outcome, conn) = loaded();
    let memory = quality_report(&outcome.warehouse, &outcome.summary);
    let stored = quality_scan(&conn).unwrap();
    assert_eq!(stored, memory);
    assert!(stored.referentially_intact());
    assert_eq!(stored.rejected_by_field["fatalities"], 1);
}

#[test]
fn rewriting_replaces_previous_contents() {
    let (outcome, mut conn) = loaded();
    write_warehouse(&mut conn, &outcome.warehouse, &outcome.summary).unwrap();
    assert_eq!(fact_count(&conn).unwrap(), 7);
}
