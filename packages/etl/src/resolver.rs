//! Dimension resolution: natural key in, surrogate key out.
//!
//! [`LoadContext`] owns the warehouse under construction and its
//! [`KeyAllocator`]. Resolving a natural key that is already present
//! returns its existing key; otherwise a row is created under a freshly
//! allocated key. All resolution goes through `&mut self`, so there is
//! exactly one writer per dimension.

use std::collections::HashMap;
use std::hash::Hash;

use crash_warehouse_crash_models::{
    CrashType, DataSource, RemotenessArea, State, canonical_label,
};
use crash_warehouse_models::{
    CrashTypeRow, DimensionKind, DimensionTable, DriverKey, DriverRow, LgaReference, LgaRow,
    LocationKey, LocationRow, PopulationKey, PopulationReference, PopulationRow,
    RoadConditionKey, RoadConditionRow, SENTINEL_KEY, SeasonCleanRow, SeasonRow, SurrogateKey,
    TimeKey, TimeRow, UNKNOWN_LABEL, VehicleKey, VehicleRow, Warehouse, clean_season_label,
};

use crate::keys::KeyAllocator;

/// Reference populations, indexed for lookup during resolution.
#[derive(Debug, Clone, Default)]
pub struct References {
    population: HashMap<PopulationKey, u64>,
    /// `(canonical name, population)`, sorted by name.
    lga: Vec<(String, u64)>,
}

impl References {
    /// Indexes reference rows. Rows whose state or remoteness area does not
    /// parse are skipped with a warning.
    #[must_use]
    pub fn new(population: &[PopulationReference], lga: &[LgaReference]) -> Self {
        let mut index = HashMap::new();
        for row in population {
            match (
                State::parse(&row.state),
                RemotenessArea::parse(&row.remoteness_area),
            ) {
                (Ok(state), Ok(remoteness_area)) => {
                    index.insert(
                        PopulationKey {
                            state,
                            remoteness_area,
                        },
                        row.population,
                    );
                }
                (state, area) => {
                    log::warn!(
                        "skipping population reference {}/{}: {}",
                        row.state,
                        row.remoteness_area,
                        state.err().or_else(|| area.err()).map_or_else(String::new, |e| e.to_string())
                    );
                }
            }
        }

        let mut lga: Vec<(String, u64)> = lga
            .iter()
            .map(|row| (canonical_label(&row.lga_name), row.population))
            .collect();
        lga.sort();
        lga.dedup_by(|a, b| a.0 == b.0);

        Self {
            population: index,
            lga,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty() && self.lga.is_empty()
    }

    fn population_for(&self, key: &PopulationKey) -> Option<u64> {
        self.population.get(key).copied()
    }

    /// Exact (case-insensitive) name match first, then the first reference
    /// name that contains the LGA name or is contained in it.
    fn lga_population(&self, name: &str) -> Option<u64> {
        let name = canonical_label(name);
        if name.is_empty() || name == canonical_label(UNKNOWN_LABEL) {
            return None;
        }
        if let Ok(idx) = self.lga.binary_search_by(|(n, _)| n.as_str().cmp(&name)) {
            return Some(self.lga[idx].1);
        }
        self.lga
            .iter()
            .find(|(n, _)| n.contains(&name) || name.contains(n.as_str()))
            .map(|&(_, population)| population)
    }
}

/// State for one load: the warehouse being built, its key allocator, and
/// the reference data.
pub struct LoadContext<'a> {
    pub(crate) warehouse: Warehouse,
    pub(crate) keys: KeyAllocator,
    references: &'a References,
}

fn resolve_in<K, R>(
    table: &mut DimensionTable<K, R>,
    keys: &mut KeyAllocator,
    dimension: DimensionKind,
    key: K,
    make: impl FnOnce(SurrogateKey, &K) -> R,
) -> SurrogateKey
where
    K: Eq + Hash,
{
    if let Some(id) = table.key_of(&key) {
        return id;
    }
    let id = keys.next_dimension_key(dimension);
    let row = make(id, &key);
    let inserted = table.insert(key, id, row);
    debug_assert!(inserted, "fresh {dimension} key {id} collided");
    id
}

impl<'a> LoadContext<'a> {
    /// Creates a context with every dimension's unknown row registered.
    #[must_use]
    pub fn new(references: &'a References) -> Self {
        let mut context = Self {
            warehouse: Warehouse::new(),
            keys: KeyAllocator::new(),
            references,
        };
        context.register_sentinels();
        context
    }

    fn register_sentinels(&mut self) {
        let ids = [
            self.resolve_time(None),
            self.resolve_season(None),
            self.resolve_location(LocationKey::unknown()),
            self.resolve_crash_type(CrashType::Unknown),
            self.resolve_road_condition(RoadConditionKey::unknown()),
            self.resolve_vehicle(VehicleKey::default()),
            self.resolve_driver(DriverKey::unknown()),
            self.resolve_population(PopulationKey {
                state: State::Unknown,
                remoteness_area: RemotenessArea::Unknown,
            }),
            self.resolve_lga(UNKNOWN_LABEL),
        ];
        debug_assert!(ids.iter().all(|&id| id == SENTINEL_KEY));
    }

    #[must_use]
    pub const fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    #[must_use]
    pub fn into_warehouse(self) -> Warehouse {
        self.warehouse
    }

    pub fn resolve_time(&mut self, key: TimeKey) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.time,
            &mut self.keys,
            DimensionKind::Time,
            key,
            |id, key| TimeRow::from_key(id, *key),
        )
    }

    /// Resolves a season label case-insensitively and records the raw
    /// label in `season_dimension_clean`. `None` resolves to the unknown
    /// row.
    pub fn resolve_season(&mut self, label: Option<&str>) -> SurrogateKey {
        let raw_label = label.map_or_else(|| UNKNOWN_LABEL.to_string(), |l| l.trim().to_string());
        let id = resolve_in(
            &mut self.warehouse.season,
            &mut self.keys,
            DimensionKind::Season,
            canonical_label(&raw_label),
            |season_id, _| SeasonRow {
                season_id,
                season: raw_label.clone(),
            },
        );
        self.warehouse
            .season_clean
            .entry(raw_label.clone())
            .or_insert_with(|| SeasonCleanRow {
                clean_label: clean_season_label(&raw_label),
                raw_label,
                season_id: id,
            });
        id
    }

    pub fn resolve_location(&mut self, key: LocationKey) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.location,
            &mut self.keys,
            DimensionKind::Location,
            key,
            |location_id, key| LocationRow {
                location_id,
                state: key.state,
                remoteness_area: key.remoteness_area,
                sa4_name: key.sa4_name.clone(),
                lga_name: key.lga_name.clone(),
            },
        )
    }

    pub fn resolve_crash_type(&mut self, crash_type: CrashType) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.crash_type,
            &mut self.keys,
            DimensionKind::CrashType,
            crash_type,
            |crash_type_id, crash_type| CrashTypeRow {
                crash_type_id,
                crash_type: *crash_type,
            },
        )
    }

    pub fn resolve_road_condition(&mut self, key: RoadConditionKey) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.road_condition,
            &mut self.keys,
            DimensionKind::RoadCondition,
            key,
            |road_condition_id, key| RoadConditionRow {
                road_condition_id,
                speed_limit: key.speed_limit.clone(),
                road_type: key.road_type.clone(),
            },
        )
    }

    pub fn resolve_vehicle(&mut self, key: VehicleKey) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.vehicle,
            &mut self.keys,
            DimensionKind::Vehicle,
            key,
            |id, key| VehicleRow::from_key(id, *key),
        )
    }

    pub fn resolve_driver(&mut self, key: DriverKey) -> SurrogateKey {
        resolve_in(
            &mut self.warehouse.driver,
            &mut self.keys,
            DimensionKind::Driver,
            key,
            |driver_id, key| DriverRow {
                driver_id,
                age_group: key.age_group,
                gender: key.gender,
            },
        )
    }

    pub fn resolve_population(&mut self, key: PopulationKey) -> SurrogateKey {
        let references = self.references;
        resolve_in(
            &mut self.warehouse.population,
            &mut self.keys,
            DimensionKind::Population,
            key,
            |population_id, key| {
                let population = references.population_for(key);
                PopulationRow {
                    population_id,
                    state: key.state,
                    remoteness_area: key.remoteness_area,
                    population,
                    data_source: data_source(population),
                }
            },
        )
    }

    pub fn resolve_lga(&mut self, lga_name: &str) -> SurrogateKey {
        let references = self.references;
        resolve_in(
            &mut self.warehouse.lga,
            &mut self.keys,
            DimensionKind::Lga,
            lga_name.to_string(),
            |lga_id, name| {
                let population = references.lga_population(name);
                LgaRow {
                    lga_id,
                    lga_name: name.clone(),
                    population,
                    data_source: data_source(population),
                }
            },
        )
    }
}

const fn data_source(population: Option<u64>) -> DataSource {
    if population.is_some() {
        DataSource::Reference
    } else {
        DataSource::Derived
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crash_warehouse_crash_models::{AgeGroup, Gender};
    use crash_warehouse_models::TimeBucket;

    use super::*;

    #[test]
    fn sentinels_take_the_first_key() {
        let references = References::default();
        let context = LoadContext::new(&references);
        for &dimension in DimensionKind::all() {
            assert_eq!(context.warehouse().dimension_len(dimension), 1);
            assert!(context.warehouse().has_key(dimension, SENTINEL_KEY));
        }
    }

    #[test]
    fn equivalent_tuples_resolve_to_one_key() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        let driver = DriverKey {
            age_group: AgeGroup::From40To64,
            gender: Gender::Female,
        };
        let first = context.resolve_driver(driver);
        let second = context.resolve_driver(driver);
        assert_eq!(first, second);
        assert_ne!(first, SENTINEL_KEY);
        assert_eq!(context.warehouse().driver.len(), 2);

        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let bucket = TimeBucket::from_date(date, Some(3));
        assert_eq!(
            context.resolve_time(Some(bucket)),
            context.resolve_time(Some(bucket))
        );
        let other_hour = TimeBucket::from_date(date, Some(4));
        assert_ne!(
            context.resolve_time(Some(bucket)),
            context.resolve_time(Some(other_hour))
        );
    }

    #[test]
    fn season_labels_match_case_insensitively() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        let summer = context.resolve_season(Some("Summer"));
        assert_eq!(context.resolve_season(Some("  SUMMER ")), summer);
        assert_eq!(context.resolve_season(Some("summer")), summer);
        assert_eq!(context.resolve_season(Some("unknown")), SENTINEL_KEY);

        let warehouse = context.warehouse();
        assert_eq!(warehouse.season.len(), 2);
        assert_eq!(warehouse.season.get(summer).unwrap().season, "Summer");
        for label in ["Summer", "SUMMER", "summer"] {
            let row = &warehouse.season_clean[label];
            assert_eq!(row.season_id, summer);
            assert_eq!(row.clean_label, "Summer");
        }
    }

    #[test]
    fn population_comes_from_reference_data() {
        let references = References::new(
            &[PopulationReference {
                state: "VIC".to_string(),
                remoteness_area: "Major Cities of Australia".to_string(),
                population: 5_000_000,
            }],
            &[LgaReference {
                lga_name: "Greater Geelong".to_string(),
                population: 270_000,
            }],
        );
        let mut context = LoadContext::new(&references);

        let matched = context.resolve_population(PopulationKey {
            state: State::Vic,
            remoteness_area: RemotenessArea::MajorCities,
        });
        let row = context.warehouse().population.get(matched).unwrap();
        assert_eq!(row.population, Some(5_000_000));
        assert_eq!(row.data_source, DataSource::Reference);

        let unmatched = context.resolve_population(PopulationKey {
            state: State::Nt,
            remoteness_area: RemotenessArea::Remote,
        });
        let row = context.warehouse().population.get(unmatched).unwrap();
        assert_eq!(row.population, None);
        assert_eq!(row.data_source, DataSource::Derived);

        let geelong = context.resolve_lga("Geelong");
        let row = context.warehouse().lga.get(geelong).unwrap();
        assert_eq!(row.population, Some(270_000));
        let unknown = context.warehouse().lga.get(SENTINEL_KEY).unwrap();
        assert_eq!(unknown.data_source, DataSource::Derived);
    }
}
