pub mod api;
pub mod config;
pub mod home;
pub mod telemetry;

pub use config::Config;
pub use config::LogLevel;
pub use home::Home;
pub use home::HomeError;
pub use home::HomeSnapshot;
