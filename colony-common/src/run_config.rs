use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u64,
    /// Record a snapshot every this many ticks.
    pub record_interval_steps: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            total_steps: 500,
            record_interval_steps: 50,
        }
    }
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub save_final_lattice: bool,
    #[serde(default)]
    pub save_fields_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "colony".to_string(),
            save_stats: true,
            save_final_lattice: true,
            save_fields_in_snapshot: false,
            format: None,
        }
    }
}

/// Settings of a batch run, loaded from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    /// Loads the run settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read run settings '{}': {}", path_ref.display(), e))?;
        let config: RunConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        if config.timing.record_interval_steps == 0 {
            anyhow::bail!("record_interval_steps must be greater than 0.");
        }

        Ok(config)
    }
}
