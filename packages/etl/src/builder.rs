//! Fact row construction.

use crash_warehouse_etl_models::{IssueKind, RecordIssue};
use crash_warehouse_models::{FactInsertError, FactRow};

use crate::conform::ConformedRecord;
use crate::resolver::LoadContext;

impl LoadContext<'_> {
    /// Resolves all nine dimension keys for `record` and appends its fact.
    ///
    /// Records with an invalid fatalities count or an already-loaded crash
    /// id are rejected before any dimension row is created.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordIssue`] explaining why the record was rejected.
    pub fn build_fact(&mut self, record: &ConformedRecord) -> Result<&FactRow, RecordIssue> {
        let fatalities = record.fatalities.clone()?;
        let issue = |kind, field: &str, message: String| RecordIssue {
            index: record.index,
            record: record.crash_id.clone(),
            kind,
            field: field.to_string(),
            message,
        };

        if self.warehouse.contains_crash(&record.crash_id) {
            return Err(issue(
                IssueKind::DataQuality,
                "crash_id",
                format!("duplicate crash id {}", record.crash_id),
            ));
        }

        let fact = FactRow {
            fact_id: self.keys.next_fact_id(),
            crash_id: record.crash_id.clone(),
            time_id: self.resolve_time(record.time),
            season_id: self.resolve_season(record.season_label.as_deref()),
            location_id: self.resolve_location(record.location.clone()),
            crash_type_id: self.resolve_crash_type(record.crash_type),
            road_condition_id: self.resolve_road_condition(record.road_condition.clone()),
            vehicle_id: self.resolve_vehicle(record.vehicle),
            driver_id: self.resolve_driver(record.driver),
            population_id: self.resolve_population(record.population),
            lga_id: self.resolve_lga(&record.lga_name),
            fatalities,
        };

        self.push_fact(fact).map_err(|e| match e {
            FactInsertError::MissingDimensions(_) => {
                issue(IssueKind::ReferentialIntegrity, "fact", e.to_string())
            }
            FactInsertError::DuplicateFactId(_) | FactInsertError::DuplicateCrash(_) => {
                issue(IssueKind::DataQuality, "fact", e.to_string())
            }
        })?;

        self.warehouse
            .facts()
            .last()
            .ok_or_else(|| issue(IssueKind::DataQuality, "fact", "fact not stored".to_string()))
    }

    /// Appends an externally built fact, checking referential integrity.
    ///
    /// # Errors
    ///
    /// Returns [`FactInsertError`] if a key dangles or an id repeats.
    pub fn push_fact(&mut self, fact: FactRow) -> Result<(), FactInsertError> {
        self.warehouse.push_fact(fact)
    }
}

#[cfg(test)]
mod tests {
    use crash_warehouse_models::{DimensionKind, RawCrashRecord, SurrogateKey};

    use super::*;
    use crate::conform::conform;
    use crate::resolver::References;

    fn raw(crash_id: &str, fatalities: &str) -> RawCrashRecord {
        RawCrashRecord {
            crash_id: Some(crash_id.to_string()),
            state: Some("QLD".to_string()),
            gender: Some("Female".to_string()),
            age_group: Some("17_to_25".to_string()),
            number_fatalities: Some(fatalities.to_string()),
            ..RawCrashRecord::default()
        }
    }

    #[test]
    fn one_fact_per_record_with_fresh_ids() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        let first = context.build_fact(&conform(0, &raw("a", "1"))).unwrap().clone();
        let second = context.build_fact(&conform(1, &raw("b", "3"))).unwrap().clone();
        assert_ne!(first.fact_id, second.fact_id);
        assert_eq!(first.driver_id, second.driver_id);
        assert_eq!(second.fatalities, 3);
        assert_eq!(context.warehouse().facts().len(), 2);
    }

    #[test]
    fn duplicate_crash_ids_are_rejected() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        context.build_fact(&conform(0, &raw("a", "1"))).unwrap();
        let issue = context.build_fact(&conform(1, &raw("a", "1"))).unwrap_err();
        assert_eq!(issue.kind, IssueKind::DataQuality);
        assert_eq!(issue.field, "crash_id");
        assert_eq!(context.warehouse().facts().len(), 1);
    }

    #[test]
    fn invalid_fatalities_create_no_rows() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        let issue = context.build_fact(&conform(0, &raw("a", "two"))).unwrap_err();
        assert_eq!(issue.field, "fatalities");
        assert!(context.warehouse().facts().is_empty());
        assert_eq!(context.warehouse().driver.len(), 1);
    }

    #[test]
    fn dangling_keys_are_referential_integrity_errors() {
        let references = References::default();
        let mut context = LoadContext::new(&references);
        let fact = context.build_fact(&conform(0, &raw("a", "1"))).unwrap().clone();
        let dangling = FactRow {
            fact_id: SurrogateKey(99),
            crash_id: "b".to_string(),
            lga_id: SurrogateKey(404),
            ..fact
        };
        assert_eq!(
            context.push_fact(dangling),
            Err(FactInsertError::MissingDimensions(vec![DimensionKind::Lga]))
        );
    }
}
