use chrono::NaiveDateTime;
use chrono::Timelike;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

use super::fixtures::FixtureRegistry;

/// On/off status shared by fixtures and the thermostat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerStatus {
    On,
    #[default]
    Off,
}

impl PowerStatus {
    /// The opposite status (on -> off, off -> on).
    pub fn toggled(self) -> Self {
        match self {
            PowerStatus::On => PowerStatus::Off,
            PowerStatus::Off => PowerStatus::On,
        }
    }
}

/// State of a single light fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub status: PowerStatus,

    /// When the fixture was created, at minute precision.
    #[serde(with = "installed_format")]
    pub installed: NaiveDateTime,
}

impl FixtureRecord {
    pub fn new(status: PowerStatus, installed: NaiveDateTime) -> Self {
        Self {
            status,
            installed: truncate_to_minute(installed),
        }
    }
}

/// Lowest accepted thermostat setting, inclusive.
pub const MIN_TEMP_SETTING: i64 = 60;

/// Highest accepted thermostat setting, inclusive.
pub const MAX_TEMP_SETTING: i64 = 80;

/// State of the thermostat. Exactly one exists per home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatRecord {
    pub status: PowerStatus,
    pub temp_setting: i64,
}

impl Default for ThermostatRecord {
    fn default() -> Self {
        Self {
            status: PowerStatus::Off,
            temp_setting: 70,
        }
    }
}

/// The complete persisted state of the home.
///
/// This is the unit of persistence: it is loaded once at startup and written
/// back in full after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HomeSnapshot {
    pub fixtures: FixtureRegistry,
    pub thermostat: ThermostatRecord,
}

fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// (De)serializes install timestamps as `YYYY-MM-DD HH:MM`.
mod installed_format {
    use chrono::NaiveDateTime;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
