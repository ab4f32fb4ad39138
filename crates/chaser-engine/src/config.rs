//! Engine configuration.

use chaser_core::{ChaserError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the engine worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Loop iterations per second.
    pub tick_rate_hz: u32,
    /// Emit a loading notice every this many decoded frames.
    pub progress_interval: usize,
    /// Upper bound on messages taken from each inbound queue per tick.
    pub max_drain_per_tick: usize,
    /// Capacity of every queue created by [`crate::worker::EngineWorker::new`].
    pub channel_capacity: usize,
    /// Name of the save folder created next to the video.
    pub save_dir_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            progress_interval: 500,
            max_drain_per_tick: 64,
            channel_capacity: 256,
            save_dir_name: "save".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data).map_err(|e| {
            ChaserError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tick_rate_hz", self.tick_rate_hz as usize),
            ("progress_interval", self.progress_interval),
            ("max_drain_per_tick", self.max_drain_per_tick),
            ("channel_capacity", self.channel_capacity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ChaserError::Config(format!("{name} must be greater than 0")));
            }
        }

        let name = self.save_dir_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ChaserError::Config(format!(
                "save_dir_name must be a plain folder name, got {:?}",
                name
            )));
        }
        Ok(())
    }

    /// Length of one tick.
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / self.tick_rate_hz.max(1) as u64)
    }
}
