use crate::config::{BoundaryType, NutrientPattern, CROWDING_TABLE_LEN};
use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, consumed by the engine components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Lattice
    pub width: usize,
    pub height: usize,
    pub num_cells: usize,

    // Diffusion
    pub delta: f64,
    pub boundary: BoundaryType,
    pub nutrient_pattern: NutrientPattern,

    // Growth rule
    pub sustenance_cost: f64,
    pub growth_cost: f64,
    pub division_threshold: f64,
    pub division_probability: f64,
    pub division_period: u32,
    pub crowding_table: [f64; CROWDING_TABLE_LEN],
}

impl SimParams {
    /// Flat nutrient index of the first cell of the absorbing middle row, if that pattern is active.
    pub fn middle_row_start(&self) -> Option<usize> {
        match self.nutrient_pattern {
            NutrientPattern::AbsorbingMiddle => Some((self.height / 2) * self.width),
            _ => None,
        }
    }
}
