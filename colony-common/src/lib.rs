pub mod config;
pub mod error;
pub mod run_config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{BoundaryType, ColonyConfig, NutrientPattern, CROWDING_TABLE_LEN};
pub use error::ConfigError;
pub use run_config::{OutputConfig, RunConfig, TimingConfig};
pub use sim_params::SimParams;
pub use snapshot::Snapshot;
