//! Simulation configuration: defaults, loading, validation, and conversion
//! into a [`SimulationBuilder`].
//!
//! Every field has a default, so a config file only needs the values it
//! changes. The legacy property names (`Floors`, `Mail_to_Create`, ...) are
//! accepted as aliases.

use std::path::Path;

use automail_core::building::Building;
use automail_core::engine::SimulationBuilder;
use automail_core::fixed::{Ticks, f64_to_fixed64};
use automail_core::generator::GeneratorConfig;
use automail_core::robot::{ROBOT_MAX_ITEM_WEIGHT, RobotKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loader::{ConfigError, deserialize_file, find_config_file};

/// Base name of the configuration file looked up by [`load_config_dir`].
pub const CONFIG_BASE_NAME: &str = "automail";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    #[serde(alias = "Floors")]
    pub floors: u32,
    pub mailroom_floor: u32,
    #[serde(alias = "Robots")]
    pub robots: usize,
    /// Robots are fragile-capable.
    #[serde(alias = "Caution")]
    pub caution: bool,
    /// The generator emits fragile items.
    #[serde(alias = "Fragile")]
    pub fragile: bool,
    /// Print the statistics block in the report.
    #[serde(alias = "Statistics")]
    pub statistics: bool,
    #[serde(alias = "Mail_to_Create")]
    pub mail_to_create: u32,
    #[serde(alias = "Mail_Max_Weight")]
    pub mail_max_weight: u32,
    #[serde(alias = "Last_Delivery_Time")]
    pub last_delivery_time: Ticks,
    #[serde(alias = "Seed")]
    pub seed: Option<u64>,
    pub fragile_chance: f64,
    pub max_ticks: Option<Ticks>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            floors: 10,
            mailroom_floor: Building::LOWEST_FLOOR,
            robots: 3,
            caution: true,
            fragile: false,
            statistics: false,
            mail_to_create: 80,
            mail_max_weight: 2000,
            last_delivery_time: 100,
            seed: None,
            fragile_chance: 0.1,
            max_ticks: None,
        }
    }
}

impl SimulationConfig {
    /// Check every field against the limits the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.floors < 1 {
            return Err(invalid("floors", "must be at least 1"));
        }
        let top = self.floors - 1 + Building::LOWEST_FLOOR;
        if !(Building::LOWEST_FLOOR..=top).contains(&self.mailroom_floor) {
            return Err(invalid(
                "mailroom_floor",
                format!("{} is outside floors 1..={top}", self.mailroom_floor),
            ));
        }
        if self.robots < 1 {
            return Err(invalid("robots", "at least one robot is required"));
        }
        if !(1..=ROBOT_MAX_ITEM_WEIGHT).contains(&self.mail_max_weight) {
            return Err(invalid(
                "mail_max_weight",
                format!("must be between 1 and {ROBOT_MAX_ITEM_WEIGHT}"),
            ));
        }
        if self.last_delivery_time < 1 {
            return Err(invalid("last_delivery_time", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.fragile_chance) {
            return Err(invalid("fragile_chance", "must be within [0, 1]"));
        }
        if self.fragile && !self.caution {
            return Err(invalid(
                "fragile",
                "fragile mail needs caution mode (fragile-capable robots)",
            ));
        }
        Ok(())
    }

    pub fn robot_kind(&self) -> RobotKind {
        if self.caution {
            RobotKind::FragileCapable
        } else {
            RobotKind::Standard
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            mail_to_create: self.mail_to_create,
            mail_max_weight: self.mail_max_weight,
            last_delivery_time: self.last_delivery_time,
            fragile_chance: self.fragile.then(|| f64_to_fixed64(self.fragile_chance)),
        }
    }

    /// A builder for this configuration, seeded with `seed`.
    pub fn builder(&self, seed: u64) -> SimulationBuilder {
        SimulationBuilder::new()
            .floors(self.floors)
            .mailroom(self.mailroom_floor)
            .robots(self.robot_kind(), self.robots)
            .mail(self.generator_config())
            .seed(seed)
            .max_ticks(self.max_ticks)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<SimulationConfig, ConfigError> {
    let config: SimulationConfig = deserialize_file(path)?;
    config.validate()?;
    debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}

/// Load `automail.{ron,toml,json}` from `dir`, or the defaults if none
/// exists.
pub fn load_config_dir(dir: &Path) -> Result<SimulationConfig, ConfigError> {
    match find_config_file(dir, CONFIG_BASE_NAME)? {
        Some(path) => load_config(&path),
        None => {
            debug!(dir = %dir.display(), "no configuration file, using defaults");
            Ok(SimulationConfig::default())
        }
    }
}
