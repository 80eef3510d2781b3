#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Star-schema types for the crash warehouse.
//!
//! A [`Warehouse`] holds the nine dimension tables, the
//! `season_dimension_clean` lookup and the fact table for one load. It is
//! rebuilt from scratch on every load and written to the store as a whole.

pub mod attribute;
pub mod dimensions;
pub mod raw;

use std::collections::{BTreeMap, HashSet};

use crash_warehouse_crash_models::{CrashType, Season, canonical_label};
use serde::{Deserialize, Serialize};

pub use attribute::{Attribute, DimensionValue, ValueKind};
pub use dimensions::*;
pub use raw::{LgaReference, PopulationReference, RawCrashRecord, present};

/// One row of the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRow {
    pub fact_id: SurrogateKey,
    /// Degenerate source identifier.
    pub crash_id: String,
    pub time_id: SurrogateKey,
    pub season_id: SurrogateKey,
    pub location_id: SurrogateKey,
    pub crash_type_id: SurrogateKey,
    pub road_condition_id: SurrogateKey,
    pub vehicle_id: SurrogateKey,
    pub driver_id: SurrogateKey,
    pub population_id: SurrogateKey,
    pub lga_id: SurrogateKey,
    pub fatalities: u32,
}

impl FactRow {
    /// The foreign key this fact holds for `dimension`.
    #[must_use]
    pub const fn key_for(&self, dimension: DimensionKind) -> SurrogateKey {
        match dimension {
            DimensionKind::Time => self.time_id,
            DimensionKind::Season => self.season_id,
            DimensionKind::Location => self.location_id,
            DimensionKind::CrashType => self.crash_type_id,
            DimensionKind::RoadCondition => self.road_condition_id,
            DimensionKind::Vehicle => self.vehicle_id,
            DimensionKind::Driver => self.driver_id,
            DimensionKind::Population => self.population_id,
            DimensionKind::Lga => self.lga_id,
        }
    }
}

/// Why a fact row could not be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactInsertError {
    /// The fact references keys absent from these dimensions.
    MissingDimensions(Vec<DimensionKind>),
    /// The fact id was already used in this load.
    DuplicateFactId(SurrogateKey),
    /// A fact for this crash id was already loaded.
    DuplicateCrash(String),
}

impl std::fmt::Display for FactInsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDimensions(dimensions) => {
                let names: Vec<&str> = dimensions.iter().map(AsRef::as_ref).collect();
                write!(f, "missing dimension keys for {}", names.join(", "))
            }
            Self::DuplicateFactId(id) => write!(f, "fact id {id} already exists"),
            Self::DuplicateCrash(crash_id) => write!(f, "crash {crash_id} already loaded"),
        }
    }
}

impl std::error::Error for FactInsertError {}

/// Derives the normalized season label for a raw label.
///
/// Labels naming a known season become that season's name; other labels
/// keep their canonical form. The empty and `unknown` labels normalize to
/// `Unknown`.
#[must_use]
pub fn clean_season_label(raw: &str) -> String {
    if let Some(season) = Season::from_label(raw) {
        return season.to_string();
    }
    let canonical = canonical_label(raw);
    if canonical.is_empty() || canonical == canonical_label(UNKNOWN_LABEL) {
        UNKNOWN_LABEL.to_string()
    } else {
        canonical
    }
}

/// All tables produced by one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warehouse {
    pub time: DimensionTable<TimeKey, TimeRow>,
    /// Keyed by the canonical season label.
    pub season: DimensionTable<String, SeasonRow>,
    /// Raw season label to clean label.
    pub season_clean: BTreeMap<String, SeasonCleanRow>,
    pub location: DimensionTable<LocationKey, LocationRow>,
    pub crash_type: DimensionTable<CrashType, CrashTypeRow>,
    pub road_condition: DimensionTable<RoadConditionKey, RoadConditionRow>,
    pub vehicle: DimensionTable<VehicleKey, VehicleRow>,
    pub driver: DimensionTable<DriverKey, DriverRow>,
    pub population: DimensionTable<PopulationKey, PopulationRow>,
    /// Keyed by LGA name.
    pub lga: DimensionTable<String, LgaRow>,
    facts: Vec<FactRow>,
    fact_ids: HashSet<SurrogateKey>,
    crash_ids: HashSet<String>,
}

impl Warehouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn facts(&self) -> &[FactRow] {
        &self.facts
    }

    #[must_use]
    pub fn contains_crash(&self, crash_id: &str) -> bool {
        self.crash_ids.contains(crash_id)
    }

    /// Returns `true` if `id` exists in the given dimension table.
    #[must_use]
    pub fn has_key(&self, dimension: DimensionKind, id: SurrogateKey) -> bool {
        match dimension {
            DimensionKind::Time => self.time.contains(id),
            DimensionKind::Season => self.season.contains(id),
            DimensionKind::Location => self.location.contains(id),
            DimensionKind::CrashType => self.crash_type.contains(id),
            DimensionKind::RoadCondition => self.road_condition.contains(id),
            DimensionKind::Vehicle => self.vehicle.contains(id),
            DimensionKind::Driver => self.driver.contains(id),
            DimensionKind::Population => self.population.contains(id),
            DimensionKind::Lga => self.lga.contains(id),
        }
    }

    /// Row count of a dimension table.
    #[must_use]
    pub fn dimension_len(&self, dimension: DimensionKind) -> usize {
        match dimension {
            DimensionKind::Time => self.time.len(),
            DimensionKind::Season => self.season.len(),
            DimensionKind::Location => self.location.len(),
            DimensionKind::CrashType => self.crash_type.len(),
            DimensionKind::RoadCondition => self.road_condition.len(),
            DimensionKind::Vehicle => self.vehicle.len(),
            DimensionKind::Driver => self.driver.len(),
            DimensionKind::Population => self.population.len(),
            DimensionKind::Lga => self.lga.len(),
        }
    }

    /// Dimensions whose key on `fact` has no matching row.
    #[must_use]
    pub fn dangling_references(&self, fact: &FactRow) -> Vec<DimensionKind> {
        DimensionKind::all()
            .iter()
            .copied()
            .filter(|&dimension| !self.has_key(dimension, fact.key_for(dimension)))
            .collect()
    }

    /// Appends a fact after checking that every foreign key resolves and
    /// that neither the fact id nor the crash id is already present.
    ///
    /// # Errors
    ///
    /// * [`FactInsertError::MissingDimensions`] if any key is dangling
    /// * [`FactInsertError::DuplicateFactId`] if the fact id is taken
    /// * [`FactInsertError::DuplicateCrash`] if the crash was already loaded
    pub fn push_fact(&mut self, fact: FactRow) -> Result<(), FactInsertError> {
        let missing = self.dangling_references(&fact);
        if !missing.is_empty() {
            return Err(FactInsertError::MissingDimensions(missing));
        }
        if self.fact_ids.contains(&fact.fact_id) {
            return Err(FactInsertError::DuplicateFactId(fact.fact_id));
        }
        if self.crash_ids.contains(&fact.crash_id) {
            return Err(FactInsertError::DuplicateCrash(fact.crash_id));
        }
        self.fact_ids.insert(fact.fact_id);
        self.crash_ids.insert(fact.crash_id.clone());
        self.facts.push(fact);
        Ok(())
    }

    /// Clean season label for a season key, read through
    /// `season_dimension_clean`.
    #[must_use]
    pub fn clean_season(&self, season_id: SurrogateKey) -> Option<&str> {
        self.season_clean
            .values()
            .find(|row| row.season_id == season_id)
            .map(|row| row.clean_label.as_str())
    }

    /// Reads `attribute` for `fact` through the owning dimension.
    ///
    /// Dangling keys and unknown members both read as
    /// [`DimensionValue::Unknown`].
    #[must_use]
    pub fn value_of(&self, fact: &FactRow, attribute: Attribute) -> DimensionValue {
        match attribute.dimension() {
            DimensionKind::Time => self
                .time
                .get(fact.time_id)
                .map_or(DimensionValue::Unknown, |row| time_value(row, attribute)),
            DimensionKind::Season => self
                .clean_season(fact.season_id)
                .map_or(DimensionValue::Unknown, DimensionValue::text),
            DimensionKind::Location => {
                self.location
                    .get(fact.location_id)
                    .map_or(DimensionValue::Unknown, |row| match attribute {
                        Attribute::State => DimensionValue::text(row.state),
                        Attribute::RemotenessArea => DimensionValue::text(row.remoteness_area),
                        Attribute::Sa4Name => DimensionValue::text(&row.sa4_name),
                        _ => DimensionValue::text(&row.lga_name),
                    })
            }
            DimensionKind::CrashType => self
                .crash_type
                .get(fact.crash_type_id)
                .map_or(DimensionValue::Unknown, |row| {
                    DimensionValue::text(row.crash_type)
                }),
            DimensionKind::RoadCondition => self
                .road_condition
                .get(fact.road_condition_id)
                .map_or(DimensionValue::Unknown, |row| match attribute {
                    Attribute::SpeedLimit => DimensionValue::text(&row.speed_limit),
                    _ => DimensionValue::text(&row.road_type),
                }),
            DimensionKind::Vehicle => {
                self.vehicle
                    .get(fact.vehicle_id)
                    .map_or(DimensionValue::Unknown, |row| match attribute {
                        Attribute::BusInvolvement => DimensionValue::flag(row.bus_involvement),
                        Attribute::HeavyRigidTruckInvolvement => {
                            DimensionValue::flag(row.heavy_rigid_truck_involvement)
                        }
                        Attribute::ArticulatedTruckInvolvement => {
                            DimensionValue::flag(row.articulated_truck_involvement)
                        }
                        _ => DimensionValue::text(row.vehicle_type),
                    })
            }
            DimensionKind::Driver => self
                .driver
                .get(fact.driver_id)
                .map_or(DimensionValue::Unknown, |row| match attribute {
                    Attribute::Gender => DimensionValue::text(row.gender),
                    _ => DimensionValue::text(row.age_group),
                }),
            DimensionKind::Population | DimensionKind::Lga => DimensionValue::Unknown,
        }
    }
}

fn time_value(row: &TimeRow, attribute: Attribute) -> DimensionValue {
    match attribute {
        Attribute::Year => DimensionValue::integer(row.year.map(i64::from)),
        Attribute::Month => DimensionValue::integer(row.month.map(i64::from)),
        Attribute::Hour => DimensionValue::integer(row.hour.map(i64::from)),
        Attribute::DayOfWeek => DimensionValue::text(row.day_of_week),
        Attribute::DayType => DimensionValue::text(row.day_type),
        Attribute::TimeOfDay => DimensionValue::text(row.time_of_day),
        Attribute::ChristmasPeriod => DimensionValue::flag(row.christmas_period),
        _ => DimensionValue::flag(row.easter_period),
    }
}
