pub mod config;
pub mod loader;

pub use config::{SimulationConfig, load_config};
pub use loader::ConfigError;
