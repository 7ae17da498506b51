use crate::diffusion::DiffusionOperator;
use crate::growth::GrowthRule;
use crate::lattice::{CellState, Lattice};
use colony_common::{
    BoundaryType, ColonyConfig, ConfigError, NutrientPattern, SimParams, Snapshot,
    CROWDING_TABLE_LEN,
};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Nominal upper bound of the nutrient field, used for display saturation.
pub const MAX_NUTRIENT: f64 = 100.0;

/// What happened during one call to [`ColonySimulation::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Number of completed ticks, including this one.
    pub tick: u64,
    /// Whether empty cells were eligible for division this tick.
    pub division_tick: bool,
    pub births: u32,
    pub deaths: u32,
}

// How much state a configuration change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebuild {
    Growth,
    Operator,
    Lattice,
}

/// Manages the lattice, the diffusion operator and the growth rule of one colony run.
///
/// `step()` takes `&mut self`, so a tick runs to completion before the lattice
/// can be observed again; callers that drive it from a timer need their own
/// mutual exclusion per instance.
pub struct ColonySimulation<R: Rng = StdRng> {
    config: ColonyConfig,
    params: SimParams,
    lattice: Lattice,
    diffusion: DiffusionOperator,
    growth: GrowthRule,
    /// Source of the division draws and the random nutrient pattern.
    rng: R,
    current_tick: u64,
    save_fields_in_snapshot: bool,
    recorded_snapshots: Vec<Snapshot>,
}

impl ColonySimulation<StdRng> {
    /// Creates a simulation seeded from `config.seed`, or from the OS when no seed is set.
    pub fn new(config: ColonyConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> ColonySimulation<R> {
    /// Creates a simulation drawing randomness from `rng`.
    ///
    /// The configuration is validated before anything is allocated.
    pub fn with_rng(config: ColonyConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let params = config.get_sim_params();
        let lattice = build_lattice(&params, &mut rng);
        let diffusion = DiffusionOperator::new(&params);
        let growth = GrowthRule::new(&params);

        info!(
            "Colony initialised: {}x{} lattice, {} boundary, {} nutrient pattern, delta = {}",
            params.width, params.height, params.boundary, params.nutrient_pattern, params.delta
        );

        Ok(Self {
            config,
            params,
            lattice,
            diffusion,
            growth,
            rng,
            current_tick: 0,
            save_fields_in_snapshot: false,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the colony by one tick: snapshot, diffuse, react, advance the division counter.
    pub fn step(&mut self) -> StepOutcome {
        // --- 1. Pre-tick view ---
        let before = self.lattice.snapshot();

        // --- 2. Diffusion on the live field ---
        self.diffusion.apply(self.lattice.nutrients_mut());

        // --- 3. Consumption, starvation and division ---
        let division_tick = self.growth.is_division_tick();
        let stats = self.growth.react(&before, &mut self.lattice, &mut self.rng);

        // --- 4. Division counter ---
        self.growth.advance_division_counter();

        self.current_tick += 1;

        trace!(
            "Tick {} (division: {}): {} births, {} deaths",
            self.current_tick,
            division_tick,
            stats.births,
            stats.deaths
        );

        StepOutcome {
            tick: self.current_tick,
            division_tick,
            births: stats.births,
            deaths: stats.deaths,
        }
    }

    // --- Accessors ---

    pub fn width(&self) -> usize {
        self.lattice.width()
    }

    pub fn height(&self) -> usize {
        self.lattice.height()
    }

    pub fn get_cell(&self, x: usize, y: usize) -> CellState {
        self.lattice.get(x, y)
    }

    pub fn get_nutrient(&self, index: usize) -> f64 {
        self.lattice.nutrient(index)
    }

    /// Nutrient level scaled to 0..=1 for colouring a cell.
    pub fn nutrient_saturation(&self, index: usize) -> f64 {
        self.lattice.nutrient(index) / MAX_NUTRIENT
    }

    pub fn index_of(&self, x: usize, y: usize) -> usize {
        self.lattice.index_of(x, y)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn diffusion(&self) -> &DiffusionOperator {
        &self.diffusion
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn division_counter(&self) -> u32 {
        self.growth.division_counter()
    }

    pub fn alive_count(&self) -> usize {
        self.lattice.count(CellState::Alive)
    }

    // --- External toggling ---

    pub fn set_cell_alive(&mut self, x: usize, y: usize) {
        self.lattice.set(x, y, CellState::Alive);
    }

    pub fn set_cell_dead(&mut self, x: usize, y: usize) {
        self.lattice.set(x, y, CellState::Dead);
    }

    pub fn set_cell_empty(&mut self, x: usize, y: usize) {
        self.lattice.set(x, y, CellState::Empty);
    }

    /// Click behaviour: an alive cell is cleared, anything else becomes alive.
    pub fn toggle_cell(&mut self, x: usize, y: usize) {
        let next = match self.lattice.get(x, y) {
            CellState::Alive => CellState::Empty,
            CellState::Empty | CellState::Dead => CellState::Alive,
        };
        self.lattice.set(x, y, next);
    }

    pub fn set_nutrient(&mut self, index: usize, value: f64) {
        self.lattice.set_nutrient(index, value);
    }

    /// Replaces the whole nutrient field.
    pub fn set_nutrient_levels(&mut self, levels: &[f64]) -> Result<(), ConfigError> {
        let expected = self.lattice.num_cells();
        if levels.len() != expected {
            return Err(ConfigError::NutrientLength {
                expected,
                found: levels.len(),
            });
        }
        self.lattice.nutrients_mut().copy_from_slice(levels);
        Ok(())
    }

    // --- Reconfiguration ---

    /// Changes the lattice height, rebuilding lattice, nutrient field and operator together.
    pub fn set_grid_height(&mut self, height: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Lattice, |c| c.grid_height = height)
    }

    /// Changes the lattice width, rebuilding lattice, nutrient field and operator together.
    pub fn set_grid_width(&mut self, width: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Lattice, |c| c.grid_width = width)
    }

    pub fn set_diffusion_rate(&mut self, delta: f64) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Operator, |c| c.diffusion_rate = delta)
    }

    pub fn set_boundary_type(&mut self, boundary: BoundaryType) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Operator, |c| c.boundary = boundary)
    }

    /// Changes the pattern used by the sink row and by later resets.
    /// The current nutrient field is left as it is.
    pub fn set_nutrient_pattern(&mut self, pattern: NutrientPattern) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Operator, |c| c.nutrient_pattern = pattern)
    }

    pub fn set_sustenance_cost(&mut self, cost: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.nutrient_for_sustenance = cost)
    }

    pub fn set_growth_cost(&mut self, cost: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.nutrient_for_growth = cost)
    }

    pub fn set_division_threshold(&mut self, threshold: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.division_threshold = threshold)
    }

    pub fn set_crowding_table(
        &mut self,
        table: [i32; CROWDING_TABLE_LEN],
    ) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.crowding_table = table)
    }

    pub fn set_division_probability(&mut self, probability: f64) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.division_probability = probability)
    }

    pub fn set_division_period(&mut self, period: u32) -> Result<(), ConfigError> {
        self.reconfigure(Rebuild::Growth, |c| c.division_period = period)
    }

    // Validates the edited configuration, then swaps in everything it invalidates.
    // Nothing is mutated when validation fails.
    fn reconfigure<F>(&mut self, rebuild: Rebuild, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut ColonyConfig),
    {
        let mut next = self.config.clone();
        edit(&mut next);
        next.validate()?;
        let params = next.get_sim_params();

        match rebuild {
            Rebuild::Growth => self.growth.update_params(&params),
            Rebuild::Operator => {
                self.diffusion = DiffusionOperator::new(&params);
                self.growth.update_params(&params);
            }
            Rebuild::Lattice => self.install_lattice(&params),
        }

        debug!("Configuration updated ({:?} rebuild)", rebuild);
        self.config = next;
        self.params = params;
        Ok(())
    }

    fn install_lattice(&mut self, params: &SimParams) {
        let lattice = build_lattice(params, &mut self.rng);
        let diffusion = DiffusionOperator::new(params);
        self.lattice = lattice;
        self.diffusion = diffusion;
        self.growth = GrowthRule::new(params);
        self.current_tick = 0;
        self.recorded_snapshots.clear();
        info!(
            "Lattice rebuilt: {}x{} ({} cells)",
            params.width, params.height, params.num_cells
        );
    }

    // --- Recording ---

    /// Include the full cell-state and nutrient fields in recorded snapshots.
    pub fn set_save_fields_in_snapshot(&mut self, save: bool) {
        self.save_fields_in_snapshot = save;
    }

    /// Collects colony metrics for the current tick.
    pub fn current_snapshot(&self) -> Snapshot {
        let nutrients = self.lattice.nutrients();
        let num_cells = nutrients.len();
        let total_nutrient: f64 = nutrients.iter().sum();
        let (min_nutrient, max_nutrient) = nutrients
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let mean_nutrient = if num_cells > 0 {
            total_nutrient / num_cells as f64
        } else {
            0.0
        };

        let (cells, fields) = if self.save_fields_in_snapshot {
            (
                Some(self.lattice.cells().iter().map(|c| c.code()).collect()),
                Some(nutrients.to_vec()),
            )
        } else {
            (None, None)
        };

        Snapshot {
            tick: self.current_tick,
            alive_count: self.lattice.count(CellState::Alive) as u32,
            dead_count: self.lattice.count(CellState::Dead) as u32,
            empty_count: self.lattice.count(CellState::Empty) as u32,
            total_nutrient,
            mean_nutrient,
            min_nutrient,
            max_nutrient,
            cells,
            nutrients: fields,
        }
    }

    /// Collects colony metrics and stores them as a Snapshot.
    pub fn record_snapshot(&mut self) {
        let snapshot = self.current_snapshot();
        debug!(
            "Recorded tick {}: alive={}, dead={}, mean nutrient={:.3}",
            snapshot.tick, snapshot.alive_count, snapshot.dead_count, snapshot.mean_nutrient
        );
        self.recorded_snapshots.push(snapshot);
    }

    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

impl<R: Rng + SeedableRng> ColonySimulation<R> {
    /// Adopts a whole new configuration and restarts the run on a fresh lattice.
    ///
    /// A configured seed restarts the random stream, so the result matches a
    /// simulation freshly constructed from `config`.
    pub fn replace_config(&mut self, config: ColonyConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.reseed(config.seed);
        self.reconfigure(Rebuild::Lattice, |c| *c = config)
    }

    /// Restarts the run on a fresh lattice with the current configuration.
    pub fn reset(&mut self) {
        self.reseed(self.config.seed);
        let params = self.params.clone();
        self.install_lattice(&params);
    }

    // Without a seed the stream simply continues.
    fn reseed(&mut self, seed: Option<u64>) {
        if let Some(seed) = seed {
            self.rng = R::seed_from_u64(seed);
        }
    }
}

/// Builds a lattice with the configured nutrient pattern and one bacterium in the centre.
fn build_lattice<R: Rng>(params: &SimParams, rng: &mut R) -> Lattice {
    let mut lattice = Lattice::new(params.width, params.height);
    fill_initial_nutrients(params, lattice.nutrients_mut(), rng);
    lattice.set(params.width / 2, params.height / 2, CellState::Alive);
    lattice
}

fn fill_initial_nutrients<R: Rng>(params: &SimParams, nutrients: &mut [f64], rng: &mut R) {
    match params.nutrient_pattern {
        NutrientPattern::Default => nutrients.fill(MAX_NUTRIENT),
        NutrientPattern::Random => {
            for value in nutrients.iter_mut() {
                *value = f64::from(rng.random_range(0..=100u32));
            }
        }
        NutrientPattern::AbsorbingMiddle => {
            nutrients.fill(MAX_NUTRIENT);
            if let Some(start) = params.middle_row_start() {
                nutrients[start..start + params.width].fill(0.0);
            }
        }
    }
}
