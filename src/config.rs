//! Configuration loading via Figment.
//!
//! Settings come from a TOML file merged with `WIRELAB_`-prefixed
//! environment variables, e.g. `WIRELAB_SIMULATION_TICK_RATE_HZ=240`.
//! Loaded configuration is validated before use; validation failures name
//! the offending field and the accepted range.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirelabConfig {
    /// Application-wide settings.
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Simulation loop settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Editor settings.
    #[serde(default)]
    pub editor: EditorSettings,
}

/// Application-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Application name shown in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Simulation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Free-running tick rate in ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// Zero-delay re-entry bound per node per tick.
    #[serde(default = "default_oscillation_limit")]
    pub oscillation_limit: u32,
}

/// Editor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Maximum retained undo entries.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

fn default_name() -> String {
    "wirelab".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_rate() -> u32 {
    60
}

fn default_oscillation_limit() -> u32 {
    64
}

fn default_history_depth() -> usize {
    256
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        ApplicationSettings {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            tick_rate_hz: default_tick_rate(),
            oscillation_limit: default_oscillation_limit(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            history_depth: default_history_depth(),
        }
    }
}

impl Default for WirelabConfig {
    fn default() -> Self {
        WirelabConfig {
            application: ApplicationSettings::default(),
            simulation: SimulationSettings::default(),
            editor: EditorSettings::default(),
        }
    }
}

impl WirelabConfig {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("config/wirelab.toml")
    }

    /// Load from a specific TOML file plus environment overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("WIRELAB_").split("_"))
            .extract()
    }

    /// Validate semantic constraints after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "invalid log_level '{}'; must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }
        if self.simulation.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be at least 1".to_string());
        }
        if self.simulation.oscillation_limit == 0 {
            return Err("oscillation_limit must be at least 1".to_string());
        }
        if self.editor.history_depth == 0 {
            return Err("history_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = WirelabConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.tick_rate_hz, 60);
        assert_eq!(config.simulation.oscillation_limit, 64);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let mut config = WirelabConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let mut config = WirelabConfig::default();
        config.simulation.tick_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = WirelabConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let reparsed: WirelabConfig = toml::from_str(&text).unwrap();
        assert_eq!(reparsed.simulation.tick_rate_hz, config.simulation.tick_rate_hz);
        assert_eq!(reparsed.editor.history_depth, config.editor.history_depth);
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wirelab.toml");
        std::fs::write(
            &path,
            "[simulation]\ntick_rate_hz = 120\noscillation_limit = 8\n",
        )
        .unwrap();
        let config = WirelabConfig::load_from(&path).unwrap();
        assert_eq!(config.simulation.tick_rate_hz, 120);
        assert_eq!(config.simulation.oscillation_limit, 8);
        assert_eq!(config.application.name, "wirelab");
    }
}
