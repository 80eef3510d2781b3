#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Categorical crash attribute types.
//!
//! This crate defines the canonical vocabulary used across the warehouse:
//! every raw source value is conformed into one of these enums before it
//! becomes part of a dimension row. Each enum carries an `Unknown`
//! variant that backs the dimension's sentinel row.

use chrono::{Datelike as _, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Error returned when a raw categorical value cannot be conformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValueError {
    /// Name of the attribute being parsed.
    pub field: &'static str,
    /// The raw value that was rejected.
    pub value: String,
}

impl InvalidValueError {
    #[must_use]
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for InvalidValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized {} value {:?}", self.field, self.value)
    }
}

impl std::error::Error for InvalidValueError {}

/// Canonicalizes a free-text label for case-insensitive comparison.
///
/// The rule is lowercase + trim, with interior whitespace runs collapsed
/// to a single space.
#[must_use]
pub fn canonical_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Australian state or territory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum State {
    /// New South Wales
    Nsw,
    /// Victoria
    Vic,
    /// Queensland
    Qld,
    /// South Australia
    Sa,
    /// Western Australia
    Wa,
    /// Tasmania
    Tas,
    /// Northern Territory
    Nt,
    /// Australian Capital Territory
    Act,
    /// Missing or unrecognized state
    #[serde(rename = "Unknown")]
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl State {
    /// Maps the ABS numeric state code (as embedded in BITRE crash ids)
    /// to a state.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Nsw),
            2 => Some(Self::Vic),
            3 => Some(Self::Qld),
            4 => Some(Self::Sa),
            5 => Some(Self::Wa),
            6 => Some(Self::Tas),
            7 => Some(Self::Nt),
            8 => Some(Self::Act),
            _ => None,
        }
    }

    /// Returns all real states (excluding the sentinel).
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Nsw,
            Self::Vic,
            Self::Qld,
            Self::Sa,
            Self::Wa,
            Self::Tas,
            Self::Nt,
            Self::Act,
        ]
    }

    /// Parses a state abbreviation, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] if the value is not a known state.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        match raw.trim().parse::<Self>() {
            Ok(Self::Unknown) | Err(_) => Err(InvalidValueError::new("state", raw)),
            Ok(state) => Ok(state),
        }
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Gender of the road user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Parses a gender code (`Male`/`M`, `Female`/`F`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] for any other code.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        match canonical_label(raw).as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "unknown" | "u" => Ok(Self::Unknown),
            _ => Err(InvalidValueError::new("gender", raw)),
        }
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// BITRE age-group bands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum AgeGroup {
    #[serde(rename = "0_to_16")]
    #[strum(serialize = "0_to_16")]
    UpTo16,
    #[serde(rename = "17_to_25")]
    #[strum(serialize = "17_to_25")]
    From17To25,
    #[serde(rename = "26_to_39")]
    #[strum(serialize = "26_to_39")]
    From26To39,
    #[serde(rename = "40_to_64")]
    #[strum(serialize = "40_to_64")]
    From40To64,
    #[serde(rename = "65_to_74")]
    #[strum(serialize = "65_to_74")]
    From65To74,
    #[serde(rename = "75_or_older")]
    #[strum(serialize = "75_or_older")]
    From75,
    Unknown,
}

impl AgeGroup {
    /// Returns the band containing `age`.
    #[must_use]
    pub const fn from_age(age: u16) -> Self {
        match age {
            0..=16 => Self::UpTo16,
            17..=25 => Self::From17To25,
            26..=39 => Self::From26To39,
            40..=64 => Self::From40To64,
            65..=74 => Self::From65To74,
            _ => Self::From75,
        }
    }

    /// Parses an age-group label.
    ///
    /// Accepts the canonical `17_to_25` form as well as `17 to 25`,
    /// `17-25` and `75+`/`75 or older` spellings.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] if the label names no known band.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        let label = canonical_label(raw).replace(['_', '-'], " ");
        let label = label.replace(" to ", " ");
        match label.as_str() {
            "0 16" => Ok(Self::UpTo16),
            "17 25" => Ok(Self::From17To25),
            "26 39" => Ok(Self::From26To39),
            "40 64" => Ok(Self::From40To64),
            "65 74" => Ok(Self::From65To74),
            "75 or older" | "75+" | "75 and over" => Ok(Self::From75),
            "unknown" => Ok(Self::Unknown),
            _ => Err(InvalidValueError::new("age_group", raw)),
        }
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Whether a crash happened in daylight hours.
///
/// BITRE defines `Day` as 06:00 to 17:59.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
pub enum TimeOfDay {
    Day,
    Night,
    #[default]
    Unknown,
}

impl TimeOfDay {
    #[must_use]
    pub const fn from_hour(hour: Option<u8>) -> Self {
        match hour {
            Some(6..=17) => Self::Day,
            Some(_) => Self::Night,
            None => Self::Unknown,
        }
    }

    /// Parses a `Day`/`Night` label.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] for any other label.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        match canonical_label(raw).as_str() {
            "day" => Ok(Self::Day),
            "night" => Ok(Self::Night),
            "unknown" => Ok(Self::Unknown),
            _ => Err(InvalidValueError::new("time_of_day", raw)),
        }
    }
}

/// Day of the week.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    #[default]
    Unknown,
}

impl DayOfWeek {
    #[must_use]
    pub const fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }

    /// Parses a day name (`Friday`, `fri`), case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] if the value names no day.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        let label = canonical_label(raw);
        if label == "unknown" {
            return Ok(Self::Unknown);
        }
        label
            .parse::<Weekday>()
            .map(Self::from_weekday)
            .map_err(|_| InvalidValueError::new("dayweek", raw))
    }

    #[must_use]
    pub const fn is_weekend(self) -> bool {
        matches!(self, Self::Saturday | Self::Sunday)
    }
}

/// BITRE's weekday/weekend split (the `Day of week` column).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
pub enum DayType {
    Weekday,
    Weekend,
    #[default]
    Unknown,
}

impl DayType {
    #[must_use]
    pub const fn from_day(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Unknown => Self::Unknown,
            day if day.is_weekend() => Self::Weekend,
            _ => Self::Weekday,
        }
    }

    /// Parses a `Weekday`/`Weekend` label.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] for any other label.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        match canonical_label(raw).as_str() {
            "weekday" => Ok(Self::Weekday),
            "weekend" => Ok(Self::Weekend),
            "unknown" => Ok(Self::Unknown),
            _ => Err(InvalidValueError::new("day_of_week", raw)),
        }
    }
}

/// Australian (southern hemisphere) season.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    /// Returns the season for a calendar month (1-12).
    #[must_use]
    pub const fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Summer),
            3..=5 => Some(Self::Autumn),
            6..=8 => Some(Self::Winter),
            9..=11 => Some(Self::Spring),
            _ => None,
        }
    }

    /// Matches a free-text season label against the known seasons.
    ///
    /// Matching is done on [`canonical_label`], so `" SUMMER "` and
    /// `"summer"` are the same season. `fall` is accepted as autumn.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        match canonical_label(raw).as_str() {
            "fall" => Some(Self::Autumn),
            other => other.parse().ok(),
        }
    }
}

/// Heavy-vehicle class involved in a crash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum VehicleType {
    #[strum(serialize = "Articulated Truck")]
    ArticulatedTruck,
    #[strum(serialize = "Heavy Rigid Truck")]
    HeavyRigidTruck,
    Bus,
    Other,
    Unknown,
}

impl VehicleType {
    /// Derives the vehicle class from the involvement flags.
    ///
    /// Priority is articulated truck, then heavy rigid truck, then bus.
    /// When no flag is set but at least one is unknown the class is
    /// [`VehicleType::Unknown`].
    #[must_use]
    pub const fn from_involvement(
        bus: Option<bool>,
        heavy_rigid_truck: Option<bool>,
        articulated_truck: Option<bool>,
    ) -> Self {
        match (articulated_truck, heavy_rigid_truck, bus) {
            (Some(true), _, _) => Self::ArticulatedTruck,
            (_, Some(true), _) => Self::HeavyRigidTruck,
            (_, _, Some(true)) => Self::Bus,
            (Some(false), Some(false), Some(false)) => Self::Other,
            _ => Self::Unknown,
        }
    }
}

/// Crash classification by number of vehicles/pedestrian involvement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum CrashType {
    Single,
    Multiple,
    Pedestrian,
    Unknown,
}

impl CrashType {
    /// Parses a crash type label (`Single`, `Multiple`, `Pedestrian`).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] for any other label.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        match canonical_label(raw).as_str() {
            "single" | "single vehicle" => Ok(Self::Single),
            "multiple" | "multiple vehicle" | "multiple vehicles" => Ok(Self::Multiple),
            "pedestrian" => Ok(Self::Pedestrian),
            "unknown" => Ok(Self::Unknown),
            _ => Err(InvalidValueError::new("crash_type", raw)),
        }
    }
}

/// ABS remoteness area classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum RemotenessArea {
    #[strum(serialize = "Major Cities")]
    MajorCities,
    #[strum(serialize = "Inner Regional")]
    InnerRegional,
    #[strum(serialize = "Outer Regional")]
    OuterRegional,
    Remote,
    #[strum(serialize = "Very Remote")]
    VeryRemote,
    Unknown,
}

impl RemotenessArea {
    /// Parses labels such as `Major Cities of Australia` or
    /// `Inner Regional Australia (Vic)`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidValueError`] if no category prefix matches.
    pub fn parse(raw: &str) -> Result<Self, InvalidValueError> {
        let label = canonical_label(raw);
        // "very remote" must be tested before "remote".
        let prefixes = [
            ("major cities", Self::MajorCities),
            ("inner regional", Self::InnerRegional),
            ("outer regional", Self::OuterRegional),
            ("very remote", Self::VeryRemote),
            ("remote", Self::Remote),
            ("unknown", Self::Unknown),
        ];
        prefixes
            .iter()
            .find(|(prefix, _)| label.starts_with(prefix))
            .map(|&(_, area)| area)
            .ok_or_else(|| InvalidValueError::new("remoteness_area", raw))
    }
}

/// Where a population figure came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
pub enum DataSource {
    /// Matched against a reference population table.
    #[strum(serialize = "Reference Data")]
    Reference,
    /// No reference match; the row only carries what the crash data says.
    Derived,
}

/// Returns `true` if `date` falls in the BITRE Christmas period: the
/// twelve days commencing 23 December.
#[must_use]
pub fn is_christmas_period(date: NaiveDate) -> bool {
    matches!((date.month(), date.day()), (12, 23..=31) | (1, 1..=3))
}

/// Returns `true` if `date` falls in the BITRE Easter period: the five
/// days commencing on the Thursday before Good Friday.
#[must_use]
pub fn is_easter_period(date: NaiveDate) -> bool {
    let Some(easter) = easter_sunday(date.year()) else {
        return false;
    };
    let offset = date.signed_duration_since(easter).num_days();
    (-3..=1).contains(&offset)
}

/// Computes the Gregorian Easter Sunday for `year` (anonymous Gregorian
/// algorithm).
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parse_is_case_insensitive() {
        assert_eq!(State::parse("Vic").unwrap(), State::Vic);
        assert_eq!(State::parse(" nsw ").unwrap(), State::Nsw);
        assert_eq!(State::parse("ACT").unwrap(), State::Act);
        assert!(State::parse("Victoria").is_err());
        assert!(State::parse("unknown").is_err());
    }

    #[test]
    fn state_codes_cover_all_states() {
        for (code, state) in (1..=8u8).zip(State::all()) {
            assert_eq!(State::from_code(code), Some(*state));
        }
        assert_eq!(State::from_code(9), None);
    }

    #[test]
    fn gender_codes() {
        assert_eq!(Gender::parse("Male").unwrap(), Gender::Male);
        assert_eq!(Gender::parse("f").unwrap(), Gender::Female);
        assert!(Gender::parse("X").is_err());
    }

    #[test]
    fn age_group_spellings() {
        assert_eq!(AgeGroup::parse("17_to_25").unwrap(), AgeGroup::From17To25);
        assert_eq!(AgeGroup::parse("17 to 25").unwrap(), AgeGroup::From17To25);
        assert_eq!(AgeGroup::parse("40-64").unwrap(), AgeGroup::From40To64);
        assert_eq!(AgeGroup::parse("75_or_older").unwrap(), AgeGroup::From75);
        assert!(AgeGroup::parse("teen").is_err());
        assert_eq!(AgeGroup::From26To39.to_string(), "26_to_39");
    }

    #[test]
    fn age_group_from_age_boundaries() {
        assert_eq!(AgeGroup::from_age(16), AgeGroup::UpTo16);
        assert_eq!(AgeGroup::from_age(17), AgeGroup::From17To25);
        assert_eq!(AgeGroup::from_age(64), AgeGroup::From40To64);
        assert_eq!(AgeGroup::from_age(101), AgeGroup::From75);
    }

    #[test]
    fn seasons_follow_southern_hemisphere() {
        assert_eq!(Season::from_month(1), Some(Season::Summer));
        assert_eq!(Season::from_month(4), Some(Season::Autumn));
        assert_eq!(Season::from_month(7), Some(Season::Winter));
        assert_eq!(Season::from_month(10), Some(Season::Spring));
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn season_labels_match_case_insensitively() {
        assert_eq!(Season::from_label("  SUMMER "), Some(Season::Summer));
        assert_eq!(Season::from_label("Fall"), Some(Season::Autumn));
        assert_eq!(Season::from_label("monsoon"), None);
    }

    #[test]
    fn vehicle_type_priority() {
        assert_eq!(
            VehicleType::from_involvement(Some(true), Some(true), Some(true)),
            VehicleType::ArticulatedTruck
        );
        assert_eq!(
            VehicleType::from_involvement(Some(true), Some(true), Some(false)),
            VehicleType::HeavyRigidTruck
        );
        assert_eq!(
            VehicleType::from_involvement(Some(true), None, Some(false)),
            VehicleType::Bus
        );
        assert_eq!(
            VehicleType::from_involvement(Some(false), Some(false), Some(false)),
            VehicleType::Other
        );
        assert_eq!(
            VehicleType::from_involvement(None, Some(false), Some(false)),
            VehicleType::Unknown
        );
    }

    #[test]
    fn remoteness_prefixes() {
        assert_eq!(
            RemotenessArea::parse("Major Cities of Australia").unwrap(),
            RemotenessArea::MajorCities
        );
        assert_eq!(
            RemotenessArea::parse("Very Remote Australia").unwrap(),
            RemotenessArea::VeryRemote
        );
        assert_eq!(
            RemotenessArea::parse("Remote Australia").unwrap(),
            RemotenessArea::Remote
        );
        assert!(RemotenessArea::parse("Suburbia").is_err());
    }

    #[test]
    fn time_of_day_bands() {
        assert_eq!(TimeOfDay::from_hour(Some(6)), TimeOfDay::Day);
        assert_eq!(TimeOfDay::from_hour(Some(17)), TimeOfDay::Day);
        assert_eq!(TimeOfDay::from_hour(Some(18)), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(None), TimeOfDay::Unknown);
    }

    #[test]
    fn day_labels_parse_case_insensitively() {
        assert_eq!(DayOfWeek::parse("Friday").unwrap(), DayOfWeek::Friday);
        assert_eq!(DayOfWeek::parse(" tue ").unwrap(), DayOfWeek::Tuesday);
        assert!(DayOfWeek::parse("Funday").is_err());
        assert_eq!(DayType::parse("Weekend").unwrap(), DayType::Weekend);
        assert_eq!(DayType::from_day(DayOfWeek::Sunday), DayType::Weekend);
        assert_eq!(DayType::from_day(DayOfWeek::Monday), DayType::Weekday);
        assert_eq!(DayType::from_day(DayOfWeek::Unknown), DayType::Unknown);
        assert_eq!(TimeOfDay::parse("NIGHT").unwrap(), TimeOfDay::Night);
        assert!(TimeOfDay::parse("dusk").is_err());
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(easter_sunday(2019), NaiveDate::from_ymd_opt(2019, 4, 21));
        // Thursday before Good Friday through Easter Monday.
        assert!(is_easter_period(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap()));
        assert!(is_easter_period(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
        assert!(!is_easter_period(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()));
    }

    #[test]
    fn christmas_window() {
        assert!(is_christmas_period(NaiveDate::from_ymd_opt(2020, 12, 23).unwrap()));
        assert!(is_christmas_period(NaiveDate::from_ymd_opt(2021, 1, 3).unwrap()));
        assert!(!is_christmas_period(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()));
        assert!(!is_christmas_period(NaiveDate::from_ymd_opt(2020, 12, 22).unwrap()));
    }
}
