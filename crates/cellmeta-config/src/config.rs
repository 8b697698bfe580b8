//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the config file inside the config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Attribute relocation settings.
    pub relocation: RelocationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
    /// Settings for the simulated demo host.
    pub demo: DemoConfig,
}

/// When the write pass of a bulk push runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum WritePlacement {
    /// Write destinations inside the same turn as the push notification.
    ///
    /// Only correct for hosts that report destination cell types as
    /// post-move while the notification is being delivered.
    Immediate,
    /// Queue the writes and run them on the host's next turn, after the
    /// move has been committed.
    #[default]
    Deferred,
}

/// Attribute relocation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelocationConfig {
    /// Placement of the write pass.
    pub write_placement: WritePlacement,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level filter (e.g., "debug", "info", "cellmeta_relocate=trace").
    pub log_level: String,
}

/// Simulated host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Seed for the randomized push run.
    pub seed: u64,
    /// Number of random pushes to simulate.
    pub random_pushes: u32,
    /// Half-width of the cube the random run operates in, in cells.
    ///
    /// Must lie in `MIN_WORLD_RADIUS..=MAX_WORLD_RADIUS`.
    pub world_radius: i32,
}

impl DemoConfig {
    /// Smallest accepted `world_radius`.
    pub const MIN_WORLD_RADIUS: i32 = 2;
    /// Largest accepted `world_radius`.
    pub const MAX_WORLD_RADIUS: i32 = 256;

    /// `world_radius` forced into the accepted range.
    pub fn clamped_radius(&self) -> i32 {
        self.world_radius
            .clamp(Self::MIN_WORLD_RADIUS, Self::MAX_WORLD_RADIUS)
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            random_pushes: 500,
            world_radius: 20,
        }
    }
}

/// Default config directory (`<platform config dir>/cellmeta`).
///
/// Returns `None` on platforms without a config directory.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cellmeta"))
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    ///
    /// A loaded file that parses but fails [`validate`](Config::validate) is
    /// rejected.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                    path: config_path.clone(),
                    source,
                })?;
            let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Checks settings that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.demo.world_radius;
        if !(DemoConfig::MIN_WORLD_RADIUS..=DemoConfig::MAX_WORLD_RADIUS).contains(&radius) {
            return Err(ConfigError::InvalidValue {
                field: "demo.world_radius",
                reason: format!(
                    "{radius} is outside {}..={}",
                    DemoConfig::MIN_WORLD_RADIUS,
                    DemoConfig::MAX_WORLD_RADIUS
                ),
            });
        }
        if self.debug.log_level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "debug.log_level",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
