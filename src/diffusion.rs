use crate::grid::{neighbor_index, ORTHOGONAL_OFFSETS};
use colony_common::{BoundaryType, SimParams};
use log::debug;
use rayon::prelude::*;
use std::ops::Range;

/// One non-zero of the update matrix: `weight` of the old value at `col` lands in `row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixEntry {
    pub row: usize,
    pub col: usize,
    pub weight: f64,
}

/// One diffusion tick as a sparse linear map `v' = M * v` over the flat nutrient field.
///
/// Every cell keeps its self-coefficient of its own nutrient and sends `delta / 4`
/// to each orthogonal neighbour that exists under the boundary type. Entries are
/// kept sorted by row with `row_starts` marking each row's slice, so a product
/// costs O(cells) rather than O(cells^2).
#[derive(Debug, Clone)]
pub struct DiffusionOperator {
    num_cells: usize,
    entries: Vec<MatrixEntry>,
    row_starts: Vec<usize>,
    /// Nutrient indices forced to zero after every product (absorbing middle row).
    sink: Option<Range<usize>>,
}

impl DiffusionOperator {
    /// Builds the operator for the lattice size, diffusion rate and boundary type in `params`.
    pub fn new(params: &SimParams) -> Self {
        let width = params.width;
        let height = params.height;
        let num_cells = params.num_cells;
        let delta = params.delta;
        let share = delta / 4.0;

        let mut entries = Vec::with_capacity(num_cells * 5);
        for y in 0..height {
            for x in 0..width {
                let idx = x + y * width;
                let mut valid_neighbors = 0usize;
                for (dx, dy) in ORTHOGONAL_OFFSETS {
                    if let Some(n) = neighbor_index(x, y, dx, dy, width, height, params.boundary) {
                        valid_neighbors += 1;
                        entries.push(MatrixEntry {
                            row: n,
                            col: idx,
                            weight: share,
                        });
                    }
                }
                let self_weight = match params.boundary {
                    BoundaryType::Periodic | BoundaryType::Absorbent => 1.0 - delta,
                    // Corner 1 - delta/2, edge 1 - 3*delta/4, interior 1 - delta.
                    BoundaryType::Reflecting => 1.0 - valid_neighbors as f64 * share,
                };
                entries.push(MatrixEntry {
                    row: idx,
                    col: idx,
                    weight: self_weight,
                });
            }
        }

        entries.sort_by_key(|e| (e.row, e.col));

        let mut row_starts = vec![0usize; num_cells + 1];
        for entry in &entries {
            row_starts[entry.row + 1] += 1;
        }
        for i in 0..num_cells {
            row_starts[i + 1] += row_starts[i];
        }

        let sink = params
            .middle_row_start()
            .map(|start| start..start + width);

        debug!(
            "Built {} diffusion operator for {}x{} lattice: {} entries, delta = {}",
            params.boundary,
            width,
            height,
            entries.len(),
            delta
        );

        Self {
            num_cells,
            entries,
            row_starts,
            sink,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    /// Total weight at `(row, col)`; repeated neighbour terms on tiny periodic lattices add up.
    pub fn weight(&self, row: usize, col: usize) -> f64 {
        self.row(row)
            .iter()
            .filter(|e| e.col == col)
            .map(|e| e.weight)
            .sum()
    }

    fn row(&self, row: usize) -> &[MatrixEntry] {
        &self.entries[self.row_starts[row]..self.row_starts[row + 1]]
    }

    /// Replaces `nutrients` with `M * nutrients`, then empties the sink row if one is configured.
    pub fn apply(&self, nutrients: &mut [f64]) {
        assert_eq!(
            nutrients.len(),
            self.num_cells,
            "nutrient field length does not match the diffusion operator"
        );
        let previous = nutrients.to_vec();

        nutrients
            .par_iter_mut()
            .enumerate()
            .for_each(|(row, value_out)| {
                *value_out = self
                    .row(row)
                    .iter()
                    .map(|e| e.weight * previous[e.col])
                    .sum();
            });

        if let Some(sink) = &self.sink {
            nutrients[sink.clone()].fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_common::{ColonyConfig, NutrientPattern};

    fn params(width: u32, height: u32, delta: f64, boundary: BoundaryType) -> SimParams {
        ColonyConfig {
            grid_width: width,
            grid_height: height,
            diffusion_rate: delta,
            boundary,
            ..ColonyConfig::default()
        }
        .get_sim_params()
    }

    fn column_sum(op: &DiffusionOperator, col: usize) -> f64 {
        op.entries().iter().filter(|e| e.col == col).map(|e| e.weight).sum()
    }

    #[test]
    fn reflecting_self_coefficients_follow_neighbor_count() {
        let op = DiffusionOperator::new(&params(4, 3, 0.4, BoundaryType::Reflecting));
        // corner, top edge, left edge, interior
        assert!((op.weight(0, 0) - 0.8).abs() < 1e-12);
        assert!((op.weight(1, 1) - 0.7).abs() < 1e-12);
        assert!((op.weight(4, 4) - 0.7).abs() < 1e-12);
        assert!((op.weight(5, 5) - 0.6).abs() < 1e-12);
        assert!((op.weight(4, 5) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn absorbent_keeps_unscaled_self_coefficient_at_edges() {
        let op = DiffusionOperator::new(&params(3, 3, 0.4, BoundaryType::Absorbent));
        assert!((op.weight(0, 0) - 0.6).abs() < 1e-12);
        assert_eq!(op.weight(0, 2), 0.0);
        // A corner only passes on two quarters, so its column sums to less than one.
        assert!((column_sum(&op, 0) - 0.8).abs() < 1e-12);
        assert!((column_sum(&op, 4) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn periodic_and_reflecting_columns_sum_to_one() {
        for boundary in [BoundaryType::Periodic, BoundaryType::Reflecting] {
            for (w, h) in [(5, 4), (1, 3), (2, 2), (1, 1)] {
                let op = DiffusionOperator::new(&params(w, h, 0.3, boundary));
                for col in 0..op.num_cells() {
                    assert!(
                        (column_sum(&op, col) - 1.0).abs() < 1e-12,
                        "{boundary} {w}x{h} column {col}"
                    );
                }
            }
        }
    }

    #[test]
    fn periodic_single_step_is_exact() {
        let op = DiffusionOperator::new(&params(3, 3, 0.5, BoundaryType::Periodic));
        let mut field = vec![0.0, 0.0, 0.0, 0.0, 90.0, 0.0, 0.0, 0.0, 0.0];
        op.apply(&mut field);
        assert_eq!(field, vec![0.0, 11.25, 0.0, 11.25, 45.0, 11.25, 0.0, 11.25, 0.0]);

        op.apply(&mut field);
        assert_eq!(field[0], 2.8125);
        assert_eq!(field[1], 12.65625);
        assert_eq!(field[4], 45.0 * 0.5 + 4.0 * 11.25 * 0.125);
    }

    #[test]
    fn sink_row_is_zeroed_after_every_product() {
        let p = ColonyConfig {
            grid_width: 3,
            grid_height: 5,
            nutrient_pattern: NutrientPattern::AbsorbingMiddle,
            ..ColonyConfig::default()
        }
        .get_sim_params();
        let op = DiffusionOperator::new(&p);
        let mut field = vec![100.0; 15];
        op.apply(&mut field);
        assert_eq!(&field[6..9], &[0.0, 0.0, 0.0]);
        assert!((field[3] - 100.0).abs() < 1e-9);

        // The next tick pulls nutrient from the rows bordering the sink.
        op.apply(&mut field);
        assert_eq!(&field[6..9], &[0.0, 0.0, 0.0]);
        assert!(field[3] < 99.0);
        assert!(field[9] < 99.0);
        assert!((field[0] - 100.0).abs() < 1e-9);
    }
}
