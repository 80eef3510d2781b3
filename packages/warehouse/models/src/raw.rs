//! The raw, unconformed crash record as it arrives from a source.

use serde::{Deserialize, Serialize};

/// One crash record before conforming.
///
/// Every attribute is kept as the source's text so the resolver can
/// decide what counts as missing, malformed, or valid. Field names match
/// the normalized (lower snake case) BITRE column headers; aliases cover
/// the shorter names used by other extracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCrashRecord {
    /// Source crash identifier.
    pub crash_id: Option<String>,
    /// State or territory abbreviation.
    pub state: Option<String>,
    /// Full crash date (`YYYY-MM-DD` or `DD/MM/YYYY`).
    pub date: Option<String>,
    /// Crash year, used when `date` is absent.
    pub year: Option<String>,
    /// Crash month (1-12), used when `date` is absent.
    pub month: Option<String>,
    /// Time of the crash (`HH:MM`, `H:MM` or `HHMM`).
    pub time: Option<String>,
    /// Day name (`Friday`).
    #[serde(alias = "day_name")]
    pub dayweek: Option<String>,
    /// BITRE's `Day of week` column: `Weekday` or `Weekend`.
    #[serde(alias = "day_type")]
    pub day_of_week: Option<String>,
    /// `Day` or `Night`; only consulted when the time is unknown.
    pub time_of_day: Option<String>,
    pub christmas_period: Option<String>,
    pub easter_period: Option<String>,
    /// `Single`, `Multiple` or `Pedestrian`.
    pub crash_type: Option<String>,
    pub bus_involvement: Option<String>,
    pub heavy_rigid_truck_involvement: Option<String>,
    pub articulated_truck_involvement: Option<String>,
    /// Posted speed limit label.
    pub speed_limit: Option<String>,
    #[serde(alias = "road_type")]
    pub national_road_type: Option<String>,
    pub gender: Option<String>,
    /// Age in years; used to derive the age group when the band is absent.
    pub age: Option<String>,
    pub age_group: Option<String>,
    #[serde(alias = "remoteness_area")]
    pub national_remoteness_areas: Option<String>,
    #[serde(alias = "sa4_name")]
    pub sa4_name_2021: Option<String>,
    #[serde(alias = "lga_name")]
    pub national_lga_name_2021: Option<String>,
    /// Free-text season label.
    pub season: Option<String>,
    #[serde(alias = "fatalities")]
    pub number_fatalities: Option<String>,
}

/// Returns the trimmed value of a raw field, or `None` when the field is
/// missing.
///
/// Empty strings, `-9` (the BITRE missing marker) and `NA`/`NaN` all count
/// as missing.
#[must_use]
pub fn present(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    match value {
        "" | "-9" | "NA" | "NaN" | "nan" | "null" => None,
        v => Some(v),
    }
}

impl RawCrashRecord {
    /// Identity used when reporting issues with this record.
    #[must_use]
    pub fn identity(&self, index: usize) -> String {
        present(self.crash_id.as_deref())
            .map_or_else(|| format!("row {index}"), ToString::to_string)
    }
}

/// Reference population for a state/remoteness area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationReference {
    pub state: String,
    pub remoteness_area: String,
    pub population: u64,
}

/// Reference population for a local government area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LgaReference {
    pub lga_name: String,
    pub population: u64,
}
