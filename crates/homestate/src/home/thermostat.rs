//! Partial updates to the thermostat.
//!
//! Each field of a [`ThermostatUpdate`] is validated on its own. Values that
//! fail validation are not errors: the field keeps its current value and the
//! rejection is reported back so it can be written to the audit log.

use std::fmt;

use super::state::PowerStatus;
use super::state::ThermostatRecord;
use super::state::MAX_TEMP_SETTING;
use super::state::MIN_TEMP_SETTING;

/// Requested thermostat changes. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThermostatUpdate {
    /// Raw status text; only exactly `on` or `off` is accepted.
    pub status: Option<String>,

    /// Requested temperature, accepted within 60..=80.
    pub temp_setting: Option<i64>,
}

/// A field that was changed by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatChange {
    Status(PowerStatus),
    TempSetting(i64),
}

impl fmt::Display for ThermostatChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermostatChange::Status(status) => write!(f, "Turned thermostat '{}'", status),
            ThermostatChange::TempSetting(temp) => write!(f, "Set temp_setting to '{}'", temp),
        }
    }
}

/// A field value that was refused and left unapplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Status(String),
    TempSetting(i64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Status(value) => write!(f, "Sent invalid param '{}' to 'status'", value),
            Rejection::TempSetting(value) => {
                write!(f, "Sent invalid param '{}' to 'temp_setting'", value)
            }
        }
    }
}

/// Outcome of applying a [`ThermostatUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub applied: Vec<ThermostatChange>,
    pub rejected: Vec<Rejection>,
}

impl ThermostatRecord {
    /// Apply the valid parts of `update`, status first, then temperature.
    pub fn apply(&mut self, update: &ThermostatUpdate) -> UpdateReport {
        let mut report = UpdateReport::default();

        if let Some(raw) = &update.status {
            match raw.parse::<PowerStatus>() {
                Ok(status) => {
                    self.status = status;
                    report.applied.push(ThermostatChange::Status(status));
                }
                Err(_) => report.rejected.push(Rejection::Status(raw.clone())),
            }
        }

        if let Some(temp) = update.temp_setting {
            if (MIN_TEMP_SETTING..=MAX_TEMP_SETTING).contains(&temp) {
                self.temp_setting = temp;
                report.applied.push(ThermostatChange::TempSetting(temp));
            } else {
                report.rejected.push(Rejection::TempSetting(temp));
            }
        }

        report
    }
}
