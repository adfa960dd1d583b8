//! Configuration loading and typed config structures for the Hearth simulation.
//!
//! The canonical configuration lives in `hearth-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file. The
//! `trade` section deserializes straight into the agents crate's
//! [`TradePolicy`].

use std::collections::BTreeMap;
use std::path::Path;

use hearth_agents::{AgentError, TradePolicy};
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The trade policy failed validation.
    #[error("invalid trade policy: {source}")]
    Policy {
        /// The underlying validation error.
        #[from]
        source: AgentError,
    },

    /// A value outside the trade policy is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `hearth-config.yaml`. All fields have
/// defaults, so a partial file parses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, pacing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Simulated time per tick.
    #[serde(default)]
    pub time: TimeConfig,

    /// Negotiation protocol tunables.
    #[serde(default)]
    pub trade: TradePolicy,

    /// Societies to create at start.
    #[serde(default = "default_societies")]
    pub societies: Vec<SocietyConfig>,

    /// Demo population parameters.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Logging and telemetry configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            time: TimeConfig::default(),
            trade: TradePolicy::default(),
            societies: default_societies(),
            population: PopulationConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimulationBoundsConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `HEARTH_SEED`, when set to an integer, overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.world.apply_env_overrides();
        Ok(config)
    }

    /// Check cross-field constraints and the trade policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] for an invalid trade policy and
    /// [`ConfigError::Invalid`] for any other out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trade.validate()?;
        if !self.time.hours_per_tick.is_finite() || self.time.hours_per_tick <= 0.0 {
            return Err(invalid("time.hours_per_tick must be positive"));
        }
        if !(0.0..24.0).contains(&self.time.start_hour) {
            return Err(invalid("time.start_hour must lie in [0, 24)"));
        }
        if self.logging.event_log_capacity == 0 {
            return Err(invalid("logging.event_log_capacity must be at least 1"));
        }
        for society in &self.societies {
            if society.name.trim().is_empty() {
                return Err(invalid("society names must not be empty"));
            }
            if society.trade_tick_rate.is_some_and(|r| !r.is_finite() || r < 0.0) {
                return Err(invalid("trade_tick_rate must not be negative"));
            }
            if !society.time_scale.is_finite() || society.time_scale <= 0.0 {
                return Err(invalid("time_scale must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds per tick (0 runs as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl WorldConfig {
    /// Override the seed with `HEARTH_SEED` when it is set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEARTH_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.seed = seed,
                Err(_err) => warn!(value = %val, "Ignoring non-numeric HEARTH_SEED"),
            }
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Time configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Simulated hours covered by one tick.
    #[serde(default = "default_hours_per_tick")]
    pub hours_per_tick: f64,

    /// Hour of day at which the simulation starts.
    #[serde(default = "default_start_hour")]
    pub start_hour: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            hours_per_tick: default_hours_per_tick(),
            start_hour: default_start_hour(),
        }
    }
}

/// One society created at start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SocietyConfig {
    /// Unique society name.
    pub name: String,

    /// Trade passes per simulated hour; falls back to the policy's
    /// `default_trade_tick_rate` when absent. 0 processes every tick.
    #[serde(default)]
    pub trade_tick_rate: Option<f32>,

    /// Multiplier from world hours to this society's local hours.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Initial contents of the shared pool.
    #[serde(default)]
    pub pool: BTreeMap<String, f32>,
}

/// Demo population configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Agents spawned in each society.
    #[serde(default = "default_agents_per_society")]
    pub agents_per_society: u32,

    /// Flat need growth per simulated hour.
    #[serde(default = "default_need_decay_per_hour")]
    pub need_decay_per_hour: f32,

    /// Upper bound of each randomly rolled starting stock.
    #[serde(default = "default_max_starting_stock")]
    pub max_starting_stock: f32,

    /// Need id to the resource that satisfies it.
    #[serde(default = "default_needs")]
    pub needs: BTreeMap<String, String>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agents_per_society: default_agents_per_society(),
            need_decay_per_hour: default_need_decay_per_hour(),
            max_starting_stock: default_max_starting_stock(),
            needs: default_needs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Events retained by the telemetry ring buffer.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Where to dump retained events as JSON lines at shutdown.
    #[serde(default)]
    pub event_dump_path: Option<String>,

    /// Log a per-society status line every N ticks (0 disables).
    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            event_log_capacity: default_event_log_capacity(),
            event_dump_path: None,
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Ticks of ledger history kept after each audit (0 = keep all).
    #[serde(default = "default_ledger_retention_ticks")]
    pub ledger_retention_ticks: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            ledger_retention_ticks: default_ledger_retention_ticks(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Hearth".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_hours_per_tick() -> f64 {
    0.25
}

const fn default_start_hour() -> f64 {
    6.0
}

const fn default_time_scale() -> f64 {
    1.0
}

fn default_societies() -> Vec<SocietyConfig> {
    vec![
        SocietyConfig {
            name: "Riverside".to_owned(),
            trade_tick_rate: None,
            time_scale: 1.0,
            pool: BTreeMap::from([("water".to_owned(), 8.0)]),
        },
        SocietyConfig {
            name: "Hillfort".to_owned(),
            trade_tick_rate: Some(2.0),
            time_scale: 1.0,
            pool: BTreeMap::new(),
        },
    ]
}

const fn default_agents_per_society() -> u32 {
    6
}

const fn default_need_decay_per_hour() -> f32 {
    0.04
}

const fn default_max_starting_stock() -> f32 {
    6.0
}

fn default_needs() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("thirst".to_owned(), "water".to_owned()),
        ("hunger".to_owned(), "bread".to_owned()),
        ("cold".to_owned(), "firewood".to_owned()),
    ])
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_event_log_capacity() -> usize {
    4096
}

const fn default_status_interval_ticks() -> u64 {
    96
}

const fn default_max_ticks() -> u64 {
    960
}

const fn default_ledger_retention_ticks() -> u64 {
    96
}
