//! Dimension rows, their natural keys, and the generic lookup table.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{Datelike as _, NaiveDate};
use crash_warehouse_crash_models::{
    AgeGroup, CrashType, DataSource, DayOfWeek, DayType, Gender, RemotenessArea, State, TimeOfDay,
    VehicleType, is_christmas_period, is_easter_period,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Label stored in free-text columns of sentinel rows.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A system-generated surrogate key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SurrogateKey(pub u32);

impl std::fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of every dimension's unknown row. Sentinels are registered before
/// any record is resolved, so they always take the first key.
pub const SENTINEL_KEY: SurrogateKey = SurrogateKey(1);

/// The nine dimensions of the crash star schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DimensionKind {
    Time,
    Season,
    Location,
    CrashType,
    RoadCondition,
    Vehicle,
    Driver,
    Population,
    Lga,
}

impl DimensionKind {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Time,
            Self::Season,
            Self::Location,
            Self::CrashType,
            Self::RoadCondition,
            Self::Vehicle,
            Self::Driver,
            Self::Population,
            Self::Lga,
        ]
    }

    /// Name of the persisted dimension table.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Time => "time_dimension",
            Self::Season => "season_dimension",
            Self::Location => "location_dimension",
            Self::CrashType => "crash_type_dimension",
            Self::RoadCondition => "road_condition_dimension",
            Self::Vehicle => "vehicle_dimension",
            Self::Driver => "driver_dimension",
            Self::Population => "population_dimension",
            Self::Lga => "lga_dimension",
        }
    }

    /// Primary key column of the dimension table, which is also the
    /// foreign key column on the fact table.
    #[must_use]
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::Time => "time_id",
            Self::Season => "season_id",
            Self::Location => "location_id",
            Self::CrashType => "crash_type_id",
            Self::RoadCondition => "road_condition_id",
            Self::Vehicle => "vehicle_id",
            Self::Driver => "driver_id",
            Self::Population => "population_id",
            Self::Lga => "lga_id",
        }
    }

    /// Table alias used in generated SQL.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Time => "t",
            Self::Season => "sc",
            Self::Location => "l",
            Self::CrashType => "ct",
            Self::RoadCondition => "rc",
            Self::Vehicle => "v",
            Self::Driver => "d",
            Self::Population => "p",
            Self::Lga => "g",
        }
    }
}

/// Natural key of a time row: the calendar attributes of one crash.
///
/// BITRE extracts carry only a year and month, so `date` is set only
/// when the source gives a full date. The weekday, weekday/weekend split,
/// and holiday flags come from the source columns when present and are
/// derived from `date` otherwise. Buckets are compared structurally,
/// never through an encoded string.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeBucket {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub date: Option<NaiveDate>,
    /// Hour of day (0-23); `None` when the source time was missing or
    /// malformed.
    pub hour: Option<u8>,
    pub day_of_week: DayOfWeek,
    pub day_type: DayType,
    pub time_of_day: TimeOfDay,
    pub christmas_period: Option<bool>,
    pub easter_period: Option<bool>,
}

impl TimeBucket {
    /// A bucket whose calendar attributes are all derived from a full
    /// date.
    #[must_use]
    pub fn from_date(date: NaiveDate, hour: Option<u8>) -> Self {
        let day_of_week = DayOfWeek::from_weekday(date.weekday());
        Self {
            year: Some(date.year()),
            month: Some(date.month()),
            date: Some(date),
            hour,
            day_of_week,
            day_type: DayType::from_day(day_of_week),
            time_of_day: TimeOfDay::from_hour(hour),
            christmas_period: Some(is_christmas_period(date)),
            easter_period: Some(is_easter_period(date)),
        }
    }

    /// Returns `true` when nothing about the time is known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }
}

/// Natural key of the time dimension: a bucket, or the unknown sentinel.
pub type TimeKey = Option<TimeBucket>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRow {
    pub time_id: SurrogateKey,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub date: Option<NaiveDate>,
    pub hour: Option<u8>,
    pub day_of_week: DayOfWeek,
    pub day_type: DayType,
    pub time_of_day: TimeOfDay,
    pub christmas_period: Option<bool>,
    pub easter_period: Option<bool>,
}

impl TimeRow {
    /// Builds the row for a bucket; the sentinel row has every attribute
    /// unknown.
    #[must_use]
    pub fn from_key(time_id: SurrogateKey, key: TimeKey) -> Self {
        let bucket = key.unwrap_or_default();
        Self {
            time_id,
            year: bucket.year,
            month: bucket.month,
            date: bucket.date,
            hour: bucket.hour,
            day_of_week: bucket.day_of_week,
            day_type: bucket.day_type,
            time_of_day: bucket.time_of_day,
            christmas_period: bucket.christmas_period,
            easter_period: bucket.easter_period,
        }
    }
}

/// Season dimension row. `season` keeps the first label seen for the
/// canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRow {
    pub season_id: SurrogateKey,
    pub season: String,
}

/// One row of `season_dimension_clean`: a raw label and the clean label
/// it normalizes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCleanRow {
    pub raw_label: String,
    pub season_id: SurrogateKey,
    pub clean_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub state: State,
    pub remoteness_area: RemotenessArea,
    pub sa4_name: String,
    pub lga_name: String,
}

impl LocationKey {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            state: State::Unknown,
            remoteness_area: RemotenessArea::Unknown,
            sa4_name: UNKNOWN_LABEL.to_string(),
            lga_name: UNKNOWN_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    pub location_id: SurrogateKey,
    pub state: State,
    pub remoteness_area: RemotenessArea,
    pub sa4_name: String,
    pub lga_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashTypeRow {
    pub crash_type_id: SurrogateKey,
    pub crash_type: CrashType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoadConditionKey {
    pub speed_limit: String,
    pub road_type: String,
}

impl RoadConditionKey {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            speed_limit: UNKNOWN_LABEL.to_string(),
            road_type: UNKNOWN_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadConditionRow {
    pub road_condition_id: SurrogateKey,
    pub speed_limit: String,
    pub road_type: String,
}

/// Involvement flags; `None` means the source did not say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleKey {
    pub bus: Option<bool>,
    pub heavy_rigid_truck: Option<bool>,
    pub articulated_truck: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRow {
    pub vehicle_id: SurrogateKey,
    pub bus_involvement: Option<bool>,
    pub heavy_rigid_truck_involvement: Option<bool>,
    pub articulated_truck_involvement: Option<bool>,
    pub vehicle_type: VehicleType,
}

impl VehicleRow {
    #[must_use]
    pub const fn from_key(vehicle_id: SurrogateKey, key: VehicleKey) -> Self {
        Self {
            vehicle_id,
            bus_involvement: key.bus,
            heavy_rigid_truck_involvement: key.heavy_rigid_truck,
            articulated_truck_involvement: key.articulated_truck,
            vehicle_type: VehicleType::from_involvement(
                key.bus,
                key.heavy_rigid_truck,
                key.articulated_truck,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverKey {
    pub age_group: AgeGroup,
    pub gender: Gender,
}

impl DriverKey {
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            age_group: AgeGroup::Unknown,
            gender: Gender::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRow {
    pub driver_id: SurrogateKey,
    pub age_group: AgeGroup,
    pub gender: Gender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopulationKey {
    pub state: State,
    pub remoteness_area: RemotenessArea,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub population_id: SurrogateKey,
    pub state: State,
    pub remoteness_area: RemotenessArea,
    pub population: Option<u64>,
    pub data_source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LgaRow {
    pub lga_id: SurrogateKey,
    pub lga_name: String,
    pub population: Option<u64>,
    pub data_source: DataSource,
}

/// A dimension table: rows in insertion order, indexed by natural key and
/// by surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionTable<K: Eq + Hash, R> {
    rows: Vec<R>,
    by_natural: HashMap<K, SurrogateKey>,
    by_id: HashMap<SurrogateKey, usize>,
}

impl<K: Eq + Hash, R> Default for DimensionTable<K, R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            by_natural: HashMap::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, R> DimensionTable<K, R> {
    /// Returns the surrogate key already assigned to `key`, if any.
    #[must_use]
    pub fn key_of(&self, key: &K) -> Option<SurrogateKey> {
        self.by_natural.get(key).copied()
    }

    /// Inserts a new row under `key` with surrogate key `id`.
    ///
    /// Returns `false` (and leaves the table untouched) if either the
    /// natural key or the surrogate key is already present.
    pub fn insert(&mut self, key: K, id: SurrogateKey, row: R) -> bool {
        if self.by_natural.contains_key(&key) || self.by_id.contains_key(&id) {
            return false;
        }
        self.by_natural.insert(key, id);
        self.by_id.insert(id, self.rows.len());
        self.rows.push(row);
        true
    }

    #[must_use]
    pub fn get(&self, id: SurrogateKey) -> Option<&R> {
        self.by_id.get(&id).map(|&idx| &self.rows[idx])
    }

    #[must_use]
    pub fn contains(&self, id: SurrogateKey) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Rows in insertion (and therefore surrogate key) order.
    #[must_use]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
