use chrono::Local;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use tracing::info;

use super::error::HomeError;
use super::error::Result;
use super::fixtures::FixtureRegistry;
use super::state::FixtureRecord;
use super::state::HomeSnapshot;
use super::state::PowerStatus;
use super::state::ThermostatRecord;
use super::store::SnapshotStore;
use super::thermostat::ThermostatUpdate;
use crate::telemetry::AUDIT_TARGET;

/// Owner of the home's fixtures and thermostat.
///
/// A single lock covers the whole snapshot because every save writes both.
/// Mutations run against a copy of the snapshot, and the copy only replaces
/// the live state once the store has accepted it, so memory never runs ahead
/// of what is on disk.
///
/// Saves are synchronous and happen under the write lock, so a request that
/// mutates the home blocks its handler until the file write has finished.
pub struct Home {
    state: RwLock<HomeSnapshot>,
    store: Box<dyn SnapshotStore>,
    clock: fn() -> NaiveDateTime,
}

impl Home {
    /// Create a home from a loaded snapshot, persisting changes to `store`.
    pub fn new(snapshot: HomeSnapshot, store: impl SnapshotStore + 'static) -> Self {
        Self {
            state: RwLock::new(snapshot),
            store: Box::new(store),
            clock: || Local::now().naive_local(),
        }
    }

    /// Use `clock` for fixture install times instead of the local time.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Everything in the home.
    pub fn snapshot(&self) -> HomeSnapshot {
        info!(target: AUDIT_TARGET, "Viewed home systems.");
        self.state.read().clone()
    }

    /// All fixtures.
    pub fn fixtures(&self) -> FixtureRegistry {
        info!(target: AUDIT_TARGET, "Viewed all fixtures");
        self.state.read().fixtures.clone()
    }

    /// A single fixture by name.
    pub fn fixture(&self, name: &str) -> Result<FixtureRecord> {
        let state = self.state.read();
        let record = state
            .fixtures
            .get(name)
            .inspect_err(|e| audit_missing(e, name))?
            .clone();
        info!(target: AUDIT_TARGET, "Viewed fixture '{}'", name);
        Ok(record)
    }

    pub fn create_fixture(&self, name: &str, status: Option<PowerStatus>) -> Result<FixtureRecord> {
        let installed = (self.clock)();
        let record = self
            .mutate(|snapshot| snapshot.fixtures.create(name, status, installed))
            .inspect_err(|e| {
                if matches!(e, HomeError::Conflict(_)) {
                    info!(target: AUDIT_TARGET, "Failed to create duplicate fixture '{}'", name);
                }
            })?;

        info!(target: AUDIT_TARGET, "Added fixture '{}'", name);
        if record.status == PowerStatus::On {
            info!(target: AUDIT_TARGET, "--> defaulted '{}' to 'on'", name);
        }
        Ok(record)
    }

    pub fn toggle_fixture(&self, name: &str) -> Result<FixtureRecord> {
        let record = self
            .mutate(|snapshot| snapshot.fixtures.toggle(name))
            .inspect_err(|e| audit_missing(e, name))?;
        info!(target: AUDIT_TARGET, "Toggled fixture '{}' to '{}'", name, record.status);
        Ok(record)
    }

    pub fn delete_fixture(&self, name: &str) -> Result<FixtureRecord> {
        let record = self
            .mutate(|snapshot| snapshot.fixtures.delete(name))
            .inspect_err(|e| audit_missing(e, name))?;
        info!(target: AUDIT_TARGET, "Deleted fixture '{}'", name);
        Ok(record)
    }

    pub fn thermostat(&self) -> ThermostatRecord {
        info!(target: AUDIT_TARGET, "Viewed thermostat readings.");
        self.state.read().thermostat.clone()
    }

    /// Apply the valid parts of `update` and save, even if nothing changed.
    ///
    /// Rejected fields are logged, never returned as errors.
    pub fn update_thermostat(&self, update: &ThermostatUpdate) -> Result<ThermostatRecord> {
        let (thermostat, report) = self.mutate(|snapshot| {
            let report = snapshot.thermostat.apply(update);
            Ok((snapshot.thermostat.clone(), report))
        })?;

        for change in &report.applied {
            info!(target: AUDIT_TARGET, "{}", change);
        }
        for rejection in &report.rejected {
            info!(target: AUDIT_TARGET, "{}", rejection);
        }
        Ok(thermostat)
    }

    /// Run `op` on a copy of the snapshot, save it, then make it live.
    fn mutate<T>(&self, op: impl FnOnce(&mut HomeSnapshot) -> Result<T>) -> Result<T> {
        let mut state = self.state.write();
        let mut working = state.clone();
        let out = op(&mut working)?;

        if let Err(e) = self.store.save(&working) {
            tracing::error!("Failed to save home state: {}", e);
            return Err(HomeError::Persistence(e));
        }

        *state = working;
        Ok(out)
    }
}

fn audit_missing(err: &HomeError, name: &str) {
    if matches!(err, HomeError::NotFound(_)) {
        info!(target: AUDIT_TARGET, "Failed to interact with non-existent fixture '{}'", name);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;

    use super::*;
    use crate::home::store::StoreError;

    /// Counts saves and fails them on demand.
    #[derive(Clone, Default)]
    struct TestStore {
        saves: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
        last: Arc<parking_lot::Mutex<Option<HomeSnapshot>>>,
    }

    impl SnapshotStore for TestStore {
        fn save(&self, snapshot: &HomeSnapshot) -> std::result::Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    path: "data.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(snapshot.clone());
            Ok(())
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
    }

    fn new_home() -> (Home, TestStore) {
        let store = TestStore::default();
        let home = Home::new(HomeSnapshot::default(), store.clone()).with_clock(fixed_clock);
        (home, store)
    }

    fn update(status: Option<&str>, temp_setting: Option<i64>) -> ThermostatUpdate {
        ThermostatUpdate {
            status: status.map(str::to_string),
            temp_setting,
        }
    }

    #[test]
    fn test_scenario() {
        let (home, store) = new_home();

        let created = home.create_fixture("kitchen", None).unwrap();
        assert_eq!(created.status, PowerStatus::Off);
        assert_eq!(created.installed.format("%H:%M:%S").to_string(), "12:34:00");

        let toggled = home.toggle_fixture("kitchen").unwrap();
        assert_eq!(toggled.status, PowerStatus::On);

        let thermostat = home.update_thermostat(&update(Some("on"), Some(69))).unwrap();
        assert_eq!(
            thermostat,
            ThermostatRecord {
                status: PowerStatus::On,
                temp_setting: 69
            }
        );

        let thermostat = home.update_thermostat(&update(None, Some(81))).unwrap();
        assert_eq!(thermostat.temp_setting, 69);
        assert_eq!(thermostat.status, PowerStatus::On);

        assert_eq!(store.saves.load(Ordering::SeqCst), 4);
        assert_eq!(store.last.lock().clone().unwrap(), home.snapshot());
    }

    #[test]
    fn test_rejected_calls_do_not_save() {
        let (home, store) = new_home();
        home.create_fixture("office", None).unwrap();

        assert!(matches!(
            home.create_fixture("office", Some(PowerStatus::On)),
            Err(HomeError::Conflict(_))
        ));
        assert!(matches!(
            home.toggle_fixture("studio"),
            Err(HomeError::NotFound(_))
        ));
        assert!(matches!(
            home.delete_fixture("studio"),
            Err(HomeError::NotFound(_))
        ));
        assert!(matches!(home.fixture("studio"), Err(HomeError::NotFound(_))));

        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(home.fixture("office").unwrap().status, PowerStatus::Off);
    }

    #[test]
    fn test_thermostat_update_always_saves() {
        let (home, store) = new_home();
        let thermostat = home.update_thermostat(&update(Some("onff"), None)).unwrap();
        assert_eq!(thermostat, ThermostatRecord::default());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let (home, store) = new_home();
        home.create_fixture("porch", None).unwrap();
        let before = home.snapshot();

        store.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            home.toggle_fixture("porch"),
            Err(HomeError::Persistence(_))
        ));
        assert!(matches!(
            home.create_fixture("garden", None),
            Err(HomeError::Persistence(_))
        ));
        assert!(matches!(
            home.update_thermostat(&update(Some("on"), Some(75))),
            Err(HomeError::Persistence(_))
        ));
        assert_eq!(home.snapshot(), before);

        store.fail.store(false, Ordering::SeqCst);
        assert_eq!(home.toggle_fixture("porch").unwrap().status, PowerStatus::On);
    }

    #[test]
    fn test_delete_returns_removed_record() {
        let (home, _store) = new_home();
        home.create_fixture("bathroom", Some(PowerStatus::On)).unwrap();

        let removed = home.delete_fixture("bathroom").unwrap();
        assert_eq!(removed.status, PowerStatus::On);
        assert!(home.fixtures().is_empty());
        assert!(matches!(
            home.fixture("bathroom"),
            Err(HomeError::NotFound(_))
        ));
    }
}
