//! Server configuration from environment.

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use skyguard_core::{ConflictEngine, EngineConfig, ZoneSet};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// JSON file with an `EngineConfig`; defaults when unset
    pub engine_config_path: Option<String>,
    /// JSON file with an array of conflict zones
    pub zones_path: Option<String>,
    /// Snapshots with more aircraft than this are refused
    pub max_aircraft: usize,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            engine_config_path: None,
            zones_path: None,
            max_aircraft: 5000,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SKYGUARD_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.server_port),
            engine_config_path: env::var("SKYGUARD_ENGINE_CONFIG").ok().filter(|s| !s.is_empty()),
            zones_path: env::var("SKYGUARD_ZONES_FILE").ok().filter(|s| !s.is_empty()),
            max_aircraft: env::var("SKYGUARD_MAX_AIRCRAFT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_aircraft),
            log_json: env::var("SKYGUARD_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Build the engine from the configured files.
    pub fn build_engine(&self) -> Result<ConflictEngine> {
        let engine_config = match &self.engine_config_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading engine config {path}"))?;
                EngineConfig::from_json(&json).with_context(|| format!("loading engine config {path}"))?
            }
            None => EngineConfig::default(),
        };

        let mut engine = ConflictEngine::new(engine_config)?;

        if let Some(path) = &self.zones_path {
            let json =
                std::fs::read_to_string(path).with_context(|| format!("reading zones {path}"))?;
            let zones = ZoneSet::from_json(&json).with_context(|| format!("loading zones {path}"))?;
            tracing::info!("Loaded {} conflict zone(s) from {}", zones.len(), path);
            engine = engine.with_zones(Arc::new(zones));
        }

        Ok(engine)
    }
}
