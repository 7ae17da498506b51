use serde::{Deserialize, Serialize};

/// Occupancy of one lattice cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Empty,
    Alive,
    /// Remains of a starved bacterium. Blocks growth like a live one.
    Dead,
}

impl CellState {
    /// Alive and dead remains both occupy the space; only empty cells can be colonised.
    pub fn is_occupied(self) -> bool {
        !matches!(self, CellState::Empty)
    }

    /// Compact code used in recorded snapshots and CSV output.
    pub fn code(self) -> u8 {
        match self {
            CellState::Empty => 0,
            CellState::Alive => 1,
            CellState::Dead => 2,
        }
    }
}

/// Cell states plus the parallel nutrient field, both stored flat as `x + y * width`.
///
/// Plain arrays keep `snapshot()` a cheap value copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
    nutrients: Vec<f64>,
}

impl Lattice {
    /// Creates an all-empty lattice with a zero nutrient field.
    pub fn new(width: usize, height: usize) -> Self {
        let num_cells = width * height;
        Self {
            width,
            height,
            cells: vec![CellState::Empty; num_cells],
            nutrients: vec![0.0; num_cells],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline(always)]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) outside {}x{} lattice",
            self.width,
            self.height
        );
        x + y * self.width
    }

    pub fn get(&self, x: usize, y: usize) -> CellState {
        self.cells[self.index_of(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, state: CellState) {
        let idx = self.index_of(x, y);
        self.cells[idx] = state;
    }

    pub fn nutrient(&self, index: usize) -> f64 {
        self.nutrients[index]
    }

    pub fn set_nutrient(&mut self, index: usize, value: f64) {
        self.nutrients[index] = value;
    }

    /// Removes up to `amount` nutrient from `index`, never leaving a negative level.
    pub fn debit_nutrient(&mut self, index: usize, amount: f64) {
        let slot = &mut self.nutrients[index];
        *slot = (*slot - amount).max(0.0);
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    pub fn nutrients(&self) -> &[f64] {
        &self.nutrients
    }

    pub fn nutrients_mut(&mut self) -> &mut [f64] {
        &mut self.nutrients
    }

    /// Deep copy used as the read-only "before this tick" view.
    pub fn snapshot(&self) -> Lattice {
        self.clone()
    }

    /// Number of cells currently in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    pub fn total_nutrient(&self) -> f64 {
        self.nutrients.iter().sum()
    }
}
