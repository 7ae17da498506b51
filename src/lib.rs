pub mod diffusion;
pub mod grid;
pub mod growth;
pub mod lattice;
pub mod simulation;

pub use diffusion::{DiffusionOperator, MatrixEntry};
pub use growth::{GrowthRule, GrowthStats};
pub use lattice::{CellState, Lattice};
pub use simulation::{ColonySimulation, StepOutcome, MAX_NUTRIENT};
