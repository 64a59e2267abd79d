use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use super::error::HomeError;
use super::error::Result;
use super::state::FixtureRecord;
use super::state::PowerStatus;

/// Named light fixtures, keyed by fixture name.
///
/// Every mutating method checks existence before touching the map, so a
/// rejected call leaves the registry exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureRegistry {
    fixtures: BTreeMap<String, FixtureRecord>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All fixtures in name order.
    pub fn list(&self) -> &BTreeMap<String, FixtureRecord> {
        &self.fixtures
    }

    pub fn get(&self, name: &str) -> Result<&FixtureRecord> {
        self.fixtures
            .get(name)
            .ok_or_else(|| HomeError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Add a fixture named `name`, off unless `status` says otherwise.
    pub fn create(
        &mut self,
        name: &str,
        status: Option<PowerStatus>,
        installed: NaiveDateTime,
    ) -> Result<FixtureRecord> {
        if self.contains(name) {
            return Err(HomeError::Conflict(name.to_string()));
        }

        let record = FixtureRecord::new(status.unwrap_or_default(), installed);
        self.fixtures.insert(name.to_string(), record.clone());
        Ok(record)
    }

    /// Flip a fixture between on and off, returning its new state.
    pub fn toggle(&mut self, name: &str) -> Result<FixtureRecord> {
        let record = self
            .fixtures
            .get_mut(name)
            .ok_or_else(|| HomeError::NotFound(name.to_string()))?;
        record.status = record.status.toggled();
        Ok(record.clone())
    }

    /// Remove a fixture, returning the record it had.
    pub fn delete(&mut self, name: &str) -> Result<FixtureRecord> {
        self.fixtures
            .remove(name)
            .ok_or_else(|| HomeError::NotFound(name.to_string()))
    }
}
