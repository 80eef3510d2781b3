//! Per-record conforming.
//!
//! Turns one [`RawCrashRecord`] into the natural key of every dimension.
//! This step is pure and independent per record, which is what lets the
//! loader run it on the `rayon` pool before any key is assigned.
//!
//! Missing values become the dimension's `Unknown` member silently.
//! Malformed values are recorded as data quality issues and send the
//! whole dimension tuple to its sentinel row.

use chrono::{Datelike as _, NaiveDate};
use crash_warehouse_crash_models::{
    AgeGroup, CrashType, DayOfWeek, DayType, Gender, InvalidValueError, RemotenessArea, Season,
    State, TimeOfDay,
};
use crash_warehouse_etl_models::{IssueKind, RecordIssue};
use crash_warehouse_models::{
    DriverKey, LocationKey, PopulationKey, RawCrashRecord, RoadConditionKey, TimeBucket, TimeKey,
    UNKNOWN_LABEL, VehicleKey, present,
};
use crash_warehouse_source::parsing::{
    parse_age, parse_count, parse_date, parse_flag, parse_hour, parse_month, parse_year,
};

/// Natural keys for one record, ready for key assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformedRecord {
    pub index: usize,
    pub crash_id: String,
    pub year: Option<i32>,
    /// Fatalities, or the reason the record must be rejected.
    pub fatalities: Result<u32, RecordIssue>,
    pub time: TimeKey,
    /// Season label as given, or derived from the month. `None` means the
    /// sentinel.
    pub season_label: Option<String>,
    pub location: LocationKey,
    pub crash_type: CrashType,
    pub road_condition: RoadConditionKey,
    pub vehicle: VehicleKey,
    pub driver: DriverKey,
    pub population: PopulationKey,
    pub lga_name: String,
    /// Problems recovered by sentineling.
    pub sentineled: Vec<RecordIssue>,
}

struct Issues {
    index: usize,
    record: String,
    found: Vec<RecordIssue>,
}

impl Issues {
    fn issue(&self, field: &str, message: String) -> RecordIssue {
        RecordIssue {
            index: self.index,
            record: self.record.clone(),
            kind: IssueKind::DataQuality,
            field: field.to_string(),
            message,
        }
    }

    fn sentinel(&mut self, field: &str, message: String) {
        log::warn!("record {}: {field}: {message}; using Unknown", self.record);
        let issue = self.issue(field, message);
        self.found.push(issue);
    }

    fn invalid(&mut self, error: &InvalidValueError) {
        self.sentinel(error.field, error.to_string());
    }
}

/// Year and state encoded in a BITRE crash id (`YYYYS...`).
fn crash_id_hints(crash_id: &str) -> (Option<i32>, Option<State>) {
    if crash_id.len() < 5 || !crash_id.bytes().all(|b| b.is_ascii_digit()) {
        return (None, None);
    }
    let year = parse_year(&crash_id[..4]);
    let state = crash_id[4..5]
        .parse::<u8>()
        .ok()
        .and_then(State::from_code);
    (year, state)
}

/// Conforms one raw record.
#[must_use]
pub fn conform(index: usize, raw: &RawCrashRecord) -> ConformedRecord {
    let crash_id = present(raw.crash_id.as_deref()).map(ToString::to_string);
    let mut issues = Issues {
        index,
        record: raw.identity(index),
        found: Vec::new(),
    };
    let crash_id = crash_id.unwrap_or_else(|| {
        issues.sentinel("crash_id", "missing crash id; using row position".to_string());
        issues.record.clone()
    });
    let (id_year, id_state) = crash_id_hints(&crash_id);

    let (date, year, month) = conform_date(raw, id_year, &mut issues);
    let time = conform_time(raw, date, year, month, &mut issues);

    let season_label = present(raw.season.as_deref())
        .map(ToString::to_string)
        .or_else(|| month.and_then(Season::from_month).map(|s| s.to_string()));

    let location = conform_location(raw, id_state, &mut issues);
    let population = PopulationKey {
        state: location.state,
        remoteness_area: location.remoteness_area,
    };
    let lga_name = location.lga_name.clone();

    let crash_type = match present(raw.crash_type.as_deref()).map(CrashType::parse) {
        None => CrashType::Unknown,
        Some(Ok(crash_type)) => crash_type,
        Some(Err(e)) => {
            issues.invalid(&e);
            CrashType::Unknown
        }
    };

    let road_condition = RoadConditionKey {
        speed_limit: text_or_unknown(raw.speed_limit.as_deref()),
        road_type: text_or_unknown(raw.national_road_type.as_deref()),
    };

    let vehicle = conform_vehicle(raw, &mut issues);
    let driver = conform_driver(raw, &mut issues);

    let fatalities = match present(raw.number_fatalities.as_deref()) {
        None => Err(issues.issue("fatalities", "missing fatalities count".to_string())),
        Some(text) => parse_count("fatalities", text)
            .map_err(|e| issues.issue("fatalities", format!("{e}; expected a non-negative integer"))),
    };

    ConformedRecord {
        index,
        crash_id,
        year,
        fatalities,
        time,
        season_label,
        location,
        crash_type,
        road_condition,
        vehicle,
        driver,
        population,
        lga_name,
        sentineled: issues.found,
    }
}

fn text_or_unknown(value: Option<&str>) -> String {
    present(value).map_or_else(
        || UNKNOWN_LABEL.to_string(),
        |v| v.split_whitespace().collect::<Vec<_>>().join(" "),
    )
}

/// Resolves the crash date along with the year and month.
///
/// The date is only set from a full `date` column. BITRE extracts give a
/// year and month alone, and no day is made up for them.
fn conform_date(
    raw: &RawCrashRecord,
    id_year: Option<i32>,
    issues: &mut Issues,
) -> (Option<NaiveDate>, Option<i32>, Option<u32>) {
    if let Some(text) = present(raw.date.as_deref()) {
        if let Some(date) = parse_date(text) {
            return (Some(date), Some(date.year()), Some(date.month()));
        }
        issues.sentinel("date", format!("unparseable date {text:?}"));
    }

    let year = match present(raw.year.as_deref()) {
        Some(text) => parse_year(text).or_else(|| {
            issues.sentinel("year", format!("unparseable year {text:?}"));
            None
        }),
        None => id_year,
    };
    let month = present(raw.month.as_deref()).and_then(|text| {
        parse_month(text).or_else(|| {
            issues.sentinel("month", format!("unparseable month {text:?}"));
            None
        })
    });
    (None, year, month)
}

/// Parses an optional source column. A malformed value is recorded and
/// treated as absent.
fn source_value<T>(
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, InvalidValueError>,
    issues: &mut Issues,
) -> Option<T> {
    match present(value).map(parse)? {
        Ok(value) => Some(value),
        Err(e) => {
            issues.invalid(&e);
            None
        }
    }
}

/// Builds the time key. Source calendar columns win over values derived
/// from a full date; without either the attribute stays unknown.
fn conform_time(
    raw: &RawCrashRecord,
    date: Option<NaiveDate>,
    year: Option<i32>,
    month: Option<u32>,
    issues: &mut Issues,
) -> TimeKey {
    let hour = conform_hour(raw, issues);
    let mut bucket = date.map_or_else(
        || TimeBucket {
            year,
            month,
            hour,
            time_of_day: TimeOfDay::from_hour(hour),
            ..TimeBucket::default()
        },
        |date| TimeBucket::from_date(date, hour),
    );

    if let Some(day) = source_value(raw.dayweek.as_deref(), DayOfWeek::parse, issues) {
        bucket.day_of_week = day;
        bucket.day_type = DayType::from_day(day);
    }
    if let Some(day_type) = source_value(raw.day_of_week.as_deref(), DayType::parse, issues) {
        bucket.day_type = day_type;
    }
    if hour.is_none()
        && let Some(time_of_day) = source_value(raw.time_of_day.as_deref(), TimeOfDay::parse, issues)
    {
        bucket.time_of_day = time_of_day;
    }
    if let Some(flag) = source_value(
        raw.christmas_period.as_deref(),
        |text| parse_flag("christmas_period", text),
        issues,
    ) {
        bucket.christmas_period = Some(flag);
    }
    if let Some(flag) = source_value(
        raw.easter_period.as_deref(),
        |text| parse_flag("easter_period", text),
        issues,
    ) {
        bucket.easter_period = Some(flag);
    }

    (!bucket.is_unknown()).then_some(bucket)
}

fn conform_hour(raw: &RawCrashRecord, issues: &mut Issues) -> Option<u8> {
    let text = present(raw.time.as_deref())?;
    let hour = parse_hour(text);
    if hour.is_none() {
        issues.sentinel("time", format!("malformed time {text:?}"));
    }
    hour
}

fn conform_location(
    raw: &RawCrashRecord,
    id_state: Option<State>,
    issues: &mut Issues,
) -> LocationKey {
    let state = match present(raw.state.as_deref()).map(State::parse) {
        None => Ok(id_state.unwrap_or(State::Unknown)),
        Some(parsed) => parsed,
    };
    let remoteness_area = present(raw.national_remoteness_areas.as_deref())
        .map_or(Ok(RemotenessArea::Unknown), RemotenessArea::parse);

    match (state, remoteness_area) {
        (Ok(state), Ok(remoteness_area)) => LocationKey {
            state,
            remoteness_area,
            sa4_name: text_or_unknown(raw.sa4_name_2021.as_deref()),
            lga_name: text_or_unknown(raw.national_lga_name_2021.as_deref()),
        },
        (state, remoteness_area) => {
            for e in [state.err(), remoteness_area.err()].iter().flatten() {
                issues.invalid(e);
            }
            LocationKey::unknown()
        }
    }
}

fn conform_vehicle(raw: &RawCrashRecord, issues: &mut Issues) -> VehicleKey {
    let flag = |field: &'static str, value: Option<&str>| {
        present(value).map(|text| parse_flag(field, text)).transpose()
    };
    let bus = flag("bus_involvement", raw.bus_involvement.as_deref());
    let heavy_rigid_truck = flag(
        "heavy_rigid_truck_involvement",
        raw.heavy_rigid_truck_involvement.as_deref(),
    );
    let articulated_truck = flag(
        "articulated_truck_involvement",
        raw.articulated_truck_involvement.as_deref(),
    );

    match (bus, heavy_rigid_truck, articulated_truck) {
        (Ok(bus), Ok(heavy_rigid_truck), Ok(articulated_truck)) => VehicleKey {
            bus,
            heavy_rigid_truck,
            articulated_truck,
        },
        (bus, heavy_rigid_truck, articulated_truck) => {
            for e in [bus.err(), heavy_rigid_truck.err(), articulated_truck.err()]
                .iter()
                .flatten()
            {
                issues.invalid(e);
            }
            VehicleKey::default()
        }
    }
}

fn conform_driver(raw: &RawCrashRecord, issues: &mut Issues) -> DriverKey {
    let gender = present(raw.gender.as_deref()).map_or(Ok(Gender::Unknown), Gender::parse);
    let age_group = match present(raw.age_group.as_deref()) {
        Some(text) => AgeGroup::parse(text),
        None => present(raw.age.as_deref()).map_or(Ok(AgeGroup::Unknown), |text| {
            parse_age(text)
                .map(AgeGroup::from_age)
                .ok_or_else(|| InvalidValueError::new("age", text))
        }),
    };

    match (age_group, gender) {
        (Ok(age_group), Ok(gender)) => DriverKey { age_group, gender },
        (age_group, gender) => {
            for e in [age_group.err(), gender.err()].iter().flatten() {
                issues.invalid(e);
            }
            DriverKey::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use crash_warehouse_crash_models::VehicleType;

    use super::*;

    fn record() -> RawCrashRecord {
        RawCrashRecord {
            crash_id: Some("20232001".to_string()),
            date: Some("2023-12-24".to_string()),
            time: Some("21:15".to_string()),
            crash_type: Some("Single".to_string()),
            bus_involvement: Some("No".to_string()),
            heavy_rigid_truck_involvement: Some("No".to_string()),
            articulated_truck_involvement: Some("Yes".to_string()),
            speed_limit: Some("100".to_string()),
            national_road_type: Some("National or State Highway".to_string()),
            gender: Some("Male".to_string()),
            age: Some("34".to_string()),
            national_remoteness_areas: Some("Inner Regional Australia".to_string()),
            sa4_name_2021: Some("Ballarat".to_string()),
            national_lga_name_2021: Some("Ballarat".to_string()),
            number_fatalities: Some("2".to_string()),
            ..RawCrashRecord::default()
        }
    }

    #[test]
    fn conforms_a_complete_record() {
        let conformed = conform(0, &record());
        assert!(conformed.sentineled.is_empty());
        assert_eq!(conformed.fatalities, Ok(2));
        assert_eq!(conformed.year, Some(2023));
        // State comes from the fifth digit of the crash id.
        assert_eq!(conformed.location.state, State::Vic);
        assert_eq!(conformed.location.remoteness_area, RemotenessArea::InnerRegional);
        assert_eq!(conformed.season_label.as_deref(), Some("Summer"));
        assert_eq!(
            conformed.time,
            Some(TimeBucket::from_date(
                NaiveDate::from_ymd_opt(2023, 12, 24).unwrap(),
                Some(21)
            ))
        );
        assert_eq!(conformed.driver.age_group, AgeGroup::From26To39);
        assert_eq!(
            VehicleType::from_involvement(
                conformed.vehicle.bus,
                conformed.vehicle.heavy_rigid_truck,
                conformed.vehicle.articulated_truck
            ),
            VehicleType::ArticulatedTruck
        );
    }

    #[test]
    fn missing_values_become_unknown_without_issues() {
        let raw = RawCrashRecord {
            crash_id: Some("X1".to_string()),
            number_fatalities: Some("0".to_string()),
            ..RawCrashRecord::default()
        };
        let conformed = conform(3, &raw);
        assert!(conformed.sentineled.is_empty());
        assert_eq!(conformed.time, None);
        assert_eq!(conformed.season_label, None);
        assert_eq!(conformed.location, LocationKey::unknown());
        assert_eq!(conformed.driver, DriverKey::unknown());
        assert_eq!(conformed.road_condition, RoadConditionKey::unknown());
        assert_eq!(conformed.fatalities, Ok(0));
    }

    #[test]
    fn invalid_gender_sentinels_the_driver() {
        let mut raw = record();
        raw.gender = Some("Robot".to_string());
        let conformed = conform(0, &raw);
        assert_eq!(conformed.driver, DriverKey::unknown());
        assert_eq!(conformed.sentineled.len(), 1);
        assert_eq!(conformed.sentineled[0].field, "gender");
        assert_eq!(conformed.sentineled[0].record, "20232001");
    }

    #[test]
    fn malformed_time_keeps_the_date() {
        let mut raw = record();
        raw.time = Some("25:99".to_string());
        let conformed = conform(0, &raw);
        assert_eq!(conformed.time.map(|bucket| bucket.hour), Some(None));
        assert_eq!(conformed.sentineled[0].field, "time");
    }

    #[test]
    fn bad_fatalities_reject_the_record() {
        let mut raw = record();
        raw.number_fatalities = Some("-1".to_string());
        assert!(conform(0, &raw).fatalities.is_err());
        raw.number_fatalities = None;
        assert!(conform(0, &raw).fatalities.is_err());
    }

    #[test]
    fn month_only_rows_take_calendar_values_from_the_source() {
        let mut raw = record();
        raw.date = None;
        raw.year = Some("2020".to_string());
        raw.month = Some("1".to_string());
        raw.season = Some(" WINTER ".to_string());
        raw.dayweek = Some("Friday".to_string());
        raw.day_of_week = Some("Weekday".to_string());
        raw.christmas_period = Some("No".to_string());
        raw.easter_period = Some("No".to_string());
        let conformed = conform(0, &raw);
        assert!(conformed.sentineled.is_empty());
        assert_eq!(conformed.season_label.as_deref(), Some("WINTER"));

        let bucket = conformed.time.unwrap();
        assert_eq!(bucket.date, None);
        assert_eq!(bucket.year, Some(2020));
        assert_eq!(bucket.month, Some(1));
        assert_eq!(bucket.day_of_week, DayOfWeek::Friday);
        assert_eq!(bucket.day_type, DayType::Weekday);
        assert_eq!(bucket.time_of_day, TimeOfDay::Night);
        assert_eq!(bucket.christmas_period, Some(false));
        assert_eq!(bucket.easter_period, Some(false));
    }

    #[test]
    fn month_only_rows_without_calendar_columns_leave_them_unknown() {
        let mut raw = record();
        raw.date = None;
        raw.year = Some("2018".to_string());
        raw.month = Some("4".to_string());
        let bucket = conform(0, &raw).time.unwrap();
        assert_eq!(bucket.date, None);
        assert_eq!(bucket.day_of_week, DayOfWeek::Unknown);
        assert_eq!(bucket.day_type, DayType::Unknown);
        assert_eq!(bucket.christmas_period, None);
        assert_eq!(bucket.easter_period, None);
    }

    #[test]
    fn source_flags_override_date_derivation() {
        let mut raw = record();
        raw.christmas_period = Some("No".to_string());
        raw.dayweek = Some("Sunday".to_string());
        let bucket = conform(0, &raw).time.unwrap();
        // 2023-12-24 is in the derived Christmas window and is a Sunday.
        assert_eq!(bucket.christmas_period, Some(false));
        assert_eq!(bucket.easter_period, Some(false));
        assert_eq!(bucket.day_type, DayType::Weekend);
    }

    #[test]
    fn malformed_calendar_columns_are_recorded() {
        let mut raw = record();
        raw.dayweek = Some("Funday".to_string());
        raw.easter_period = Some("maybe".to_string());
        let conformed = conform(0, &raw);
        let fields: Vec<&str> = conformed.sentineled.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["dayweek", "easter_period"]);
        // The date still supplies what the source could not.
        let bucket = conformed.time.unwrap();
        assert_eq!(bucket.day_of_week, DayOfWeek::Sunday);
        assert_eq!(bucket.easter_period, Some(false));
    }
}
