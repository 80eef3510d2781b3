//! Analysis attributes: the descriptive columns reachable from a fact row
//! through its dimensions.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::dimensions::{DimensionKind, UNKNOWN_LABEL};

/// A dimension attribute that can be grouped on, filtered on, or turned
/// into a mining item.
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
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Attribute {
    Year,
    Month,
    Hour,
    DayOfWeek,
    DayType,
    TimeOfDay,
    ChristmasPeriod,
    EasterPeriod,
    Season,
    State,
    RemotenessArea,
    #[strum(serialize = "sa4_name")]
    #[serde(rename = "sa4_name")]
    Sa4Name,
    LgaName,
    CrashType,
    SpeedLimit,
    RoadType,
    VehicleType,
    BusInvolvement,
    HeavyRigidTruckInvolvement,
    ArticulatedTruckInvolvement,
    AgeGroup,
    Gender,
}

/// How an attribute's values are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Flag,
}

impl Attribute {
    /// The dimension this attribute is read from.
    #[must_use]
    pub const fn dimension(self) -> DimensionKind {
        match self {
            Self::Year
            | Self::Month
            | Self::Hour
            | Self::DayOfWeek
            | Self::DayType
            | Self::TimeOfDay
            | Self::ChristmasPeriod
            | Self::EasterPeriod => DimensionKind::Time,
            Self::Season => DimensionKind::Season,
            Self::State | Self::RemotenessArea | Self::Sa4Name | Self::LgaName => {
                DimensionKind::Location
            }
            Self::CrashType => DimensionKind::CrashType,
            Self::SpeedLimit | Self::RoadType => DimensionKind::RoadCondition,
            Self::VehicleType
            | Self::BusInvolvement
            | Self::HeavyRigidTruckInvolvement
            | Self::ArticulatedTruckInvolvement => DimensionKind::Vehicle,
            Self::AgeGroup | Self::Gender => DimensionKind::Driver,
        }
    }

    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Year | Self::Month | Self::Hour => ValueKind::Integer,
            Self::ChristmasPeriod
            | Self::EasterPeriod
            | Self::BusInvolvement
            | Self::HeavyRigidTruckInvolvement
            | Self::ArticulatedTruckInvolvement => ValueKind::Flag,
            _ => ValueKind::Text,
        }
    }

    /// SQL expression selecting this attribute, in terms of the aliases
    /// from [`DimensionKind::alias`].
    #[must_use]
    pub const fn sql_expr(self) -> &'static str {
        match self {
            Self::Year => "t.year",
            Self::Month => "t.month",
            Self::Hour => "t.hour",
            Self::DayOfWeek => "t.day_of_week",
            Self::DayType => "t.day_type",
            Self::TimeOfDay => "t.time_of_day",
            Self::ChristmasPeriod => "t.christmas_period",
            Self::EasterPeriod => "t.easter_period",
            Self::Season => "sc.clean_label",
            Self::State => "l.state",
            Self::RemotenessArea => "l.remoteness_area",
            Self::Sa4Name => "l.sa4_name",
            Self::LgaName => "l.lga_name",
            Self::CrashType => "ct.crash_type",
            Self::SpeedLimit => "rc.speed_limit",
            Self::RoadType => "rc.road_type",
            Self::VehicleType => "v.vehicle_type",
            Self::BusInvolvement => "v.bus_involvement",
            Self::HeavyRigidTruckInvolvement => "v.heavy_rigid_truck_involvement",
            Self::ArticulatedTruckInvolvement => "v.articulated_truck_involvement",
            Self::AgeGroup => "d.age_group",
            Self::Gender => "d.gender",
        }
    }

    /// Parses the textual rendering of a value of this attribute back into
    /// a [`DimensionValue`].
    #[must_use]
    pub fn value_from_text(self, text: &str) -> DimensionValue {
        let text = text.trim();
        if text.eq_ignore_ascii_case(UNKNOWN_LABEL) || text.is_empty() {
            return DimensionValue::Unknown;
        }
        match self.kind() {
            ValueKind::Text => DimensionValue::Text(text.to_string()),
            ValueKind::Integer => text
                .parse()
                .map_or(DimensionValue::Unknown, DimensionValue::Integer),
            ValueKind::Flag => match text.to_ascii_lowercase().as_str() {
                "yes" | "true" => DimensionValue::Flag(true),
                "no" | "false" => DimensionValue::Flag(false),
                _ => DimensionValue::Unknown,
            },
        }
    }
}

/// A single attribute value as seen by the query and mining layers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Integer(i64),
    Flag(bool),
    Text(String),
    Unknown,
}

impl DimensionValue {
    /// Wraps a text value, mapping the `Unknown` label to
    /// [`DimensionValue::Unknown`].
    #[must_use]
    pub fn text(value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        if value.eq_ignore_ascii_case(UNKNOWN_LABEL) {
            Self::Unknown
        } else {
            Self::Text(value.to_string())
        }
    }

    #[must_use]
    pub fn flag(value: Option<bool>) -> Self {
        value.map_or(Self::Unknown, Self::Flag)
    }

    #[must_use]
    pub fn integer(value: Option<i64>) -> Self {
        value.map_or(Self::Unknown, Self::Integer)
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Flag(true) => f.write_str("Yes"),
            Self::Flag(false) => f.write_str("No"),
            Self::Text(s) => f.write_str(s),
            Self::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn attribute_names_round_trip_through_strum() {
        for attribute in Attribute::iter() {
            let name = attribute.to_string();
            assert_eq!(name.parse::<Attribute>().unwrap(), attribute);
        }
        assert_eq!(Attribute::Sa4Name.as_ref(), "sa4_name");
        assert_eq!("TIME_OF_DAY".parse::<Attribute>().unwrap(), Attribute::TimeOfDay);
    }

    #[test]
    fn value_text_parsing_matches_display() {
        let values = [
            (Attribute::Year, DimensionValue::Integer(2021)),
            (Attribute::BusInvolvement, DimensionValue::Flag(true)),
            (Attribute::State, DimensionValue::Text("VIC".to_string())),
            (Attribute::Gender, DimensionValue::Unknown),
        ];
        for (attribute, value) in values {
            assert_eq!(attribute.value_from_text(&value.to_string()), value);
        }
        assert_eq!(
            Attribute::ChristmasPeriod.value_from_text("false"),
            DimensionValue::Flag(false)
        );
    }

    #[test]
    fn integers_sort_numerically_before_unknown() {
        let mut values = vec![
            DimensionValue::Unknown,
            DimensionValue::Integer(10),
            DimensionValue::Integer(9),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                DimensionValue::Integer(9),
                DimensionValue::Integer(10),
                DimensionValue::Unknown
            ]
        );
    }
}
