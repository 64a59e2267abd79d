//! Fixtures, thermostat and their persisted snapshot.

mod error;
mod fixtures;
#[allow(clippy::module_inception)]
mod home;
mod state;
mod store;
mod thermostat;

pub use error::HomeError;
pub use fixtures::FixtureRegistry;
pub use home::Home;
pub use state::FixtureRecord;
pub use state::HomeSnapshot;
pub use state::PowerStatus;
pub use state::ThermostatRecord;
pub use state::MAX_TEMP_SETTING;
pub use state::MIN_TEMP_SETTING;
pub use store::load_snapshot;
pub use store::JsonFileStore;
pub use store::SnapshotStore;
pub use store::StoreError;
pub use thermostat::Rejection;
pub use thermostat::ThermostatChange;
pub use thermostat::ThermostatUpdate;
pub use thermostat::UpdateReport;
