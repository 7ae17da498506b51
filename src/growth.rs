use crate::grid::for_each_moore_neighbor;
use crate::lattice::{CellState, Lattice};
use colony_common::{BoundaryType, SimParams, CROWDING_TABLE_LEN};
use rand::Rng;

/// Births and deaths produced by one reaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthStats {
    pub births: u32,
    pub deaths: u32,
}

/// Consumption, starvation and crowding-gated division of bacteria.
///
/// Every decision reads the pre-tick snapshot; every write goes to the live lattice.
#[derive(Debug, Clone)]
pub struct GrowthRule {
    boundary: BoundaryType,
    sustenance_cost: f64,
    growth_cost: f64,
    division_threshold: f64,
    division_probability: f64,
    division_period: u32,
    crowding_table: [f64; CROWDING_TABLE_LEN],
    /// Counts 1..=division_period; division is evaluated when it reaches the period.
    division_counter: u32,
}

impl GrowthRule {
    pub fn new(params: &SimParams) -> Self {
        let mut rule = Self {
            boundary: params.boundary,
            sustenance_cost: 0.0,
            growth_cost: 0.0,
            division_threshold: 0.0,
            division_probability: 0.0,
            division_period: 1,
            crowding_table: [0.0; CROWDING_TABLE_LEN],
            division_counter: 1,
        };
        rule.update_params(params);
        rule
    }

    /// Takes new rule parameters without touching the lattice.
    ///
    /// The division counter keeps running unless it is already past a shortened period.
    pub fn update_params(&mut self, params: &SimParams) {
        self.boundary = params.boundary;
        self.sustenance_cost = params.sustenance_cost;
        self.growth_cost = params.growth_cost;
        self.division_threshold = params.division_threshold;
        self.division_probability = params.division_probability;
        self.division_period = params.division_period.max(1);
        self.crowding_table = params.crowding_table;
        if self.division_counter > self.division_period {
            self.division_counter = 1;
        }
    }

    pub fn division_counter(&self) -> u32 {
        self.division_counter
    }

    pub fn reset_division_counter(&mut self) {
        self.division_counter = 1;
    }

    /// True when empty cells are eligible for division this tick.
    pub fn is_division_tick(&self) -> bool {
        self.division_counter == self.division_period
    }

    /// Resets the counter after a division tick, otherwise increments it.
    pub fn advance_division_counter(&mut self) {
        if self.is_division_tick() {
            self.division_counter = 1;
        } else {
            self.division_counter += 1;
        }
    }

    /// Alive cells among the 8 Moore neighbours of `(x, y)`.
    ///
    /// Positions off a reflecting or absorbent lattice are simply not counted,
    /// so an isolated cell reports 0.
    pub fn alive_neighbors(&self, snapshot: &Lattice, x: usize, y: usize) -> usize {
        let mut count = 0;
        for_each_moore_neighbor(
            x,
            y,
            snapshot.width(),
            snapshot.height(),
            self.boundary,
            |idx| {
                if snapshot.cells()[idx] == CellState::Alive {
                    count += 1;
                }
            },
        );
        count
    }

    /// Crowding test plus probability gate for the empty cell at `(x, y)`.
    ///
    /// A uniform draw is taken only when `crowding[n] * nutrient` exceeds the threshold.
    pub fn should_divide<R: Rng>(
        &self,
        snapshot: &Lattice,
        x: usize,
        y: usize,
        rng: &mut R,
    ) -> bool {
        let nutrient = snapshot.nutrient(snapshot.index_of(x, y));
        let neighbors = self.alive_neighbors(snapshot, x, y);
        if self.crowding_table[neighbors] * nutrient > self.division_threshold {
            return rng.random::<f64>() < self.division_probability;
        }
        false
    }

    /// Runs consumption/starvation on every alive cell and, on division ticks,
    /// division on every empty cell. Scans x-major then y so a seeded RNG sees
    /// a fixed draw order.
    pub fn react<R: Rng>(
        &self,
        snapshot: &Lattice,
        live: &mut Lattice,
        rng: &mut R,
    ) -> GrowthStats {
        debug_assert_eq!(snapshot.num_cells(), live.num_cells());
        let division_tick = self.is_division_tick();
        let mut stats = GrowthStats::default();

        for x in 0..snapshot.width() {
            for y in 0..snapshot.height() {
                let idx = snapshot.index_of(x, y);
                let nutrient = snapshot.nutrient(idx);

                match snapshot.get(x, y) {
                    CellState::Alive => {
                        if nutrient >= self.sustenance_cost {
                            live.debit_nutrient(idx, self.sustenance_cost);
                        } else {
                            live.set(x, y, CellState::Dead);
                            live.set_nutrient(idx, 0.0);
                            stats.deaths += 1;
                        }
                    }
                    CellState::Empty if division_tick => {
                        if self.should_divide(snapshot, x, y, rng) && nutrient >= self.growth_cost {
                            live.set(x, y, CellState::Alive);
                            live.debit_nutrient(idx, self.growth_cost);
                            stats.births += 1;
                        }
                    }
                    CellState::Empty | CellState::Dead => {}
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_common::ColonyConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rule_for(config: ColonyConfig) -> GrowthRule {
        GrowthRule::new(&config.get_sim_params())
    }

    fn filled(width: usize, height: usize, state: CellState, nutrient: f64) -> Lattice {
        let mut lattice = Lattice::new(width, height);
        for y in 0..height {
            for x in 0..width {
                lattice.set(x, y, state);
            }
        }
        lattice.nutrients_mut().fill(nutrient);
        lattice
    }

    #[test]
    fn all_alive_periodic_grid_counts_eight_everywhere() {
        let rule = rule_for(ColonyConfig {
            boundary: BoundaryType::Periodic,
            ..ColonyConfig::default()
        });
        let lattice = filled(3, 3, CellState::Alive, 0.0);
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(rule.alive_neighbors(&lattice, x, y), 8);
            }
        }
    }

    #[test]
    fn bounded_grids_count_zero_without_alive_cells() {
        for boundary in [BoundaryType::Reflecting, BoundaryType::Absorbent] {
            let rule = rule_for(ColonyConfig {
                boundary,
                ..ColonyConfig::default()
            });
            let lattice = filled(3, 3, CellState::Dead, 50.0);
            for y in 0..3 {
                for x in 0..3 {
                    assert_eq!(rule.alive_neighbors(&lattice, x, y), 0);
                }
            }
        }
    }

    #[test]
    fn bounded_corner_counts_only_in_range_neighbors() {
        let rule = rule_for(ColonyConfig::default());
        let lattice = filled(3, 3, CellState::Alive, 0.0);
        assert_eq!(rule.alive_neighbors(&lattice, 0, 0), 3);
        assert_eq!(rule.alive_neighbors(&lattice, 1, 0), 5);
        assert_eq!(rule.alive_neighbors(&lattice, 1, 1), 8);
    }

    #[test]
    fn consumption_debits_alive_cells_only() {
        let rule = rule_for(ColonyConfig::default());
        let mut live = filled(3, 3, CellState::Alive, 50.0);
        live.set(0, 1, CellState::Dead);
        live.set(1, 2, CellState::Dead);
        live.set(2, 2, CellState::Dead);
        let snapshot = live.snapshot();

        let mut rng = StdRng::seed_from_u64(1);
        let stats = rule.react(&snapshot, &mut live, &mut rng);

        assert_eq!(stats, GrowthStats::default());
        let expected = [40.0, 40.0, 40.0, 50.0, 40.0, 40.0, 40.0, 50.0, 50.0];
        assert_eq!(live.nutrients(), &expected);
    }

    #[test]
    fn starvation_kills_and_empties_the_cell() {
        let rule = rule_for(ColonyConfig::default());
        let mut live = Lattice::new(2, 1);
        live.set(0, 0, CellState::Alive);
        live.set_nutrient(0, 9.5);
        live.set(1, 0, CellState::Alive);
        live.set_nutrient(1, 10.0);
        let snapshot = live.snapshot();

        let stats = rule.react(&snapshot, &mut live, &mut StdRng::seed_from_u64(3));

        assert_eq!(stats.deaths, 1);
        assert_eq!(live.get(0, 0), CellState::Dead);
        assert_eq!(live.nutrient(0), 0.0);
        // Exactly the sustenance cost is enough to survive.
        assert_eq!(live.get(1, 0), CellState::Alive);
        assert_eq!(live.nutrient(1), 0.0);
    }

    #[test]
    fn no_division_without_nutrient_even_when_crowded() {
        let rule = rule_for(ColonyConfig {
            crowding_table: [1000; CROWDING_TABLE_LEN],
            division_threshold: 0,
            division_probability: 1.0,
            division_period: 1,
            ..ColonyConfig::default()
        });
        let mut live = Lattice::new(3, 3);
        for x in 0..3 {
            live.set(x, 0, CellState::Alive);
        }
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let snapshot = live.snapshot();
            assert!(!rule.should_divide(&snapshot, 1, 1, &mut rng));
            rule.react(&snapshot, &mut live, &mut rng);
        }
        assert_eq!(live.count(CellState::Alive), 0);
        assert_eq!(live.count(CellState::Empty), 6);
    }

    #[test]
    fn certain_division_needs_enough_nutrient_for_growth() {
        let rule = rule_for(ColonyConfig {
            division_threshold: 0,
            division_probability: 1.0,
            division_period: 1,
            ..ColonyConfig::default()
        });
        let mut live = Lattice::new(3, 1);
        live.set(1, 0, CellState::Alive);
        live.nutrients_mut().copy_from_slice(&[80.0, 100.0, 59.0]);
        let snapshot = live.snapshot();

        let stats = rule.react(&snapshot, &mut live, &mut StdRng::seed_from_u64(5));

        // Left: one alive neighbour, 40 * 80 > 0 and 80 >= 60.
        assert_eq!(live.get(0, 0), CellState::Alive);
        assert_eq!(live.nutrient(0), 20.0);
        // Right: passes the crowding test but 59 < 60.
        assert_eq!(live.get(2, 0), CellState::Empty);
        assert_eq!(live.nutrient(2), 59.0);
        assert_eq!(stats.births, 1);
    }

    #[test]
    fn decisions_ignore_births_made_earlier_in_the_same_scan() {
        let rule = rule_for(ColonyConfig {
            crowding_table: [0, 0, 40, 0, 0, 0, 0, 0, 0],
            division_threshold: 0,
            division_probability: 1.0,
            division_period: 1,
            ..ColonyConfig::default()
        });
        // Only (1,0) sees two alive neighbours in the snapshot; a birth there
        // must not make (2,0) or (0,0) eligible within the same tick.
        let mut live = Lattice::new(3, 2);
        live.set(0, 1, CellState::Alive);
        live.set(2, 1, CellState::Alive);
        live.nutrients_mut().fill(100.0);
        let snapshot = live.snapshot();

        rule.react(&snapshot, &mut live, &mut StdRng::seed_from_u64(9));

        assert_eq!(live.get(1, 0), CellState::Alive);
        assert_eq!(live.get(0, 0), CellState::Empty);
        assert_eq!(live.get(2, 0), CellState::Empty);
    }

    #[test]
    fn division_counter_cycles_through_the_period() {
        let mut rule = rule_for(ColonyConfig {
            division_period: 3,
            ..ColonyConfig::default()
        });
        let mut pattern = Vec::new();
        for _ in 0..7 {
            pattern.push(rule.is_division_tick());
            rule.advance_division_counter();
        }
        assert_eq!(pattern, vec![false, false, true, false, false, true, false]);
    }
}
