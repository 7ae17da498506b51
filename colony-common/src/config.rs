use crate::error::ConfigError;
use crate::sim_params::SimParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Number of entries in the crowding table, one per alive-neighbour count 0..=8.
pub const CROWDING_TABLE_LEN: usize = 9;

// Keys of the line-oriented parameter format. Matched case-insensitively.
const KEY_GRID_HEIGHT: &str = "grid height";
const KEY_GRID_WIDTH: &str = "grid width";
const KEY_CELL_HEIGHT: &str = "cell height";
const KEY_CELL_WIDTH: &str = "cell width";
const KEY_DIFFUSION_RATE: &str = "rate of diffusion";
const KEY_SUSTENANCE: &str = "nutrient for sustenance";
const KEY_GROWTH: &str = "nutrient for growth";
const KEY_THRESHOLD: &str = "threshold for cell division";
const KEY_DIVISION_PERIOD: &str = "number of timesteps for cell division";
const KEY_BOUNDARY: &str = "boundary condition";
const KEY_PATTERN: &str = "initial nutrient pattern";
const KEY_PROBABILITY: &str = "probability of cell division";
const KEY_CROWDING: &str = "crowding function";
const KEY_SEED: &str = "random seed";

/// How the diffusion operator and the neighbour count treat the lattice edges.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryType {
    /// Nutrient that would leave the lattice stays in the edge cell.
    #[default]
    Reflecting,
    /// Nutrient that would leave the lattice is lost.
    Absorbent,
    /// Opposite edges are joined (torus).
    Periodic,
}

impl BoundaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryType::Reflecting => "reflecting",
            BoundaryType::Absorbent => "absorbent",
            BoundaryType::Periodic => "periodic",
        }
    }
}

impl FromStr for BoundaryType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reflecting" => Ok(BoundaryType::Reflecting),
            "absorbent" => Ok(BoundaryType::Absorbent),
            "periodic" => Ok(BoundaryType::Periodic),
            _ => Err(ConfigError::UnknownBoundary(s.trim().to_string())),
        }
    }
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initial layout of the nutrient field.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NutrientPattern {
    /// Every cell starts at 100.
    #[default]
    Default,
    /// Every cell starts at an integer drawn uniformly from 0..=100.
    Random,
    /// Every cell starts at 100 except the middle row, which is a permanent sink.
    AbsorbingMiddle,
}

impl NutrientPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientPattern::Default => "default",
            NutrientPattern::Random => "random",
            NutrientPattern::AbsorbingMiddle => "missingmiddle",
        }
    }
}

impl FromStr for NutrientPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(NutrientPattern::Default),
            "random" => Ok(NutrientPattern::Random),
            "missingmiddle" | "absorbingmiddle" | "absorbing-middle" => {
                Ok(NutrientPattern::AbsorbingMiddle)
            }
            _ => Err(ConfigError::UnknownPattern(s.trim().to_string())),
        }
    }
}

impl fmt::Display for NutrientPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a colony run, read from the `key: value` parameter format.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ColonyConfig {
    pub grid_height: u32,
    pub grid_width: u32,
    /// Rendering only.
    pub cell_height: u32,
    /// Rendering only.
    pub cell_width: u32,
    /// Fraction of a cell's nutrient exchanged with its neighbours per tick (delta).
    pub diffusion_rate: f64,
    /// Nutrient an alive bacterium consumes every tick to survive.
    pub nutrient_for_sustenance: u32,
    /// Nutrient consumed when a bacterium divides into an empty cell.
    pub nutrient_for_growth: u32,
    /// `crowding_table[n] * nutrient` must exceed this for division to be attempted.
    pub division_threshold: u32,
    /// Empty cells are considered for division once every this many ticks.
    pub division_period: u32,
    pub boundary: BoundaryType,
    pub nutrient_pattern: NutrientPattern,
    pub division_probability: f64,
    pub crowding_table: [i32; CROWDING_TABLE_LEN],
    /// Fixed RNG seed; `None` seeds from the operating system.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        ColonyConfig {
            grid_height: 80,
            grid_width: 80,
            cell_height: 5,
            cell_width: 5,
            diffusion_rate: 0.4,
            nutrient_for_sustenance: 10,
            nutrient_for_growth: 60,
            division_threshold: 100,
            division_period: 8,
            boundary: BoundaryType::Reflecting,
            nutrient_pattern: NutrientPattern::Default,
            division_probability: 0.5,
            crowding_table: [0, 40, 40, 40, 30, 20, 10, 0, 0],
            seed: None,
        }
    }
}

impl ColonyConfig {
    /// Parses a parameter document on top of the defaults.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        ColonyConfig::default().apply_text(text)
    }

    /// Loads a parameter file on top of the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ColonyConfig::default().apply_file(path)
    }

    /// Reads a parameter file and applies it on top of `self`.
    pub fn apply_file<P: AsRef<Path>>(&self, path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        self.apply_text(&text)
    }

    /// Applies every recognised `key: value` line of `text` to a copy of `self`.
    ///
    /// The result is validated as a whole. On any error `self` is untouched,
    /// so a caller can keep running with its previous configuration.
    /// Unknown keys are ignored; blank lines and `#` comments are skipped.
    pub fn apply_text(&self, text: &str) -> Result<Self, ConfigError> {
        let mut config = self.clone();

        for (line_idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (raw_key, raw_value) =
                line.split_once(':').ok_or_else(|| ConfigError::MalformedLine {
                    line: line_idx + 1,
                    content: line.to_string(),
                })?;
            let key = raw_key.trim().to_ascii_lowercase();
            let value = raw_value.trim();

            match key.as_str() {
                KEY_GRID_HEIGHT => config.grid_height = parse_positive(KEY_GRID_HEIGHT, value)?,
                KEY_GRID_WIDTH => config.grid_width = parse_positive(KEY_GRID_WIDTH, value)?,
                KEY_CELL_HEIGHT => config.cell_height = parse_positive(KEY_CELL_HEIGHT, value)?,
                KEY_CELL_WIDTH => config.cell_width = parse_positive(KEY_CELL_WIDTH, value)?,
                KEY_DIFFUSION_RATE => {
                    config.diffusion_rate = parse_unit_interval(KEY_DIFFUSION_RATE, value)?
                }
                KEY_SUSTENANCE => {
                    config.nutrient_for_sustenance = parse_nutrient_amount(KEY_SUSTENANCE, value)?
                }
                KEY_GROWTH => config.nutrient_for_growth = parse_nutrient_amount(KEY_GROWTH, value)?,
                KEY_THRESHOLD => config.division_threshold = parse_int(KEY_THRESHOLD, value)?,
                KEY_DIVISION_PERIOD => {
                    config.division_period = parse_positive(KEY_DIVISION_PERIOD, value)?
                }
                KEY_BOUNDARY => config.boundary = value.parse()?,
                KEY_PATTERN => config.nutrient_pattern = value.parse()?,
                KEY_PROBABILITY => {
                    config.division_probability = parse_unit_interval(KEY_PROBABILITY, value)?
                }
                KEY_CROWDING => config.crowding_table = parse_crowding_table(value)?,
                KEY_SEED => config.seed = Some(parse_int(KEY_SEED, value)?),
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Serializes into the `key: value` format accepted by [`ColonyConfig::parse`].
    pub fn to_text(&self) -> String {
        let crowding = self
            .crowding_table
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut lines = vec![
            format!("{KEY_GRID_HEIGHT}: {}", self.grid_height),
            format!("{KEY_GRID_WIDTH}: {}", self.grid_width),
            format!("{KEY_CELL_HEIGHT}: {}", self.cell_height),
            format!("{KEY_CELL_WIDTH}: {}", self.cell_width),
            format!("{KEY_DIFFUSION_RATE}: {}", self.diffusion_rate),
            format!("{KEY_SUSTENANCE}: {}", self.nutrient_for_sustenance),
            format!("{KEY_GROWTH}: {}", self.nutrient_for_growth),
            format!("{KEY_THRESHOLD}: {}", self.division_threshold),
            format!("{KEY_DIVISION_PERIOD}: {}", self.division_period),
            format!("{KEY_BOUNDARY}: {}", self.boundary),
            format!("{KEY_PATTERN}: {}", self.nutrient_pattern),
            format!("{KEY_PROBABILITY}: {}", self.division_probability),
            format!("{KEY_CROWDING}: {crowding}"),
        ];
        if let Some(seed) = self.seed {
            lines.push(format!("{KEY_SEED}: {seed}"));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Checks every declared range plus the cross-field dimension rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            (KEY_GRID_HEIGHT, self.grid_height),
            (KEY_GRID_WIDTH, self.grid_width),
            (KEY_CELL_HEIGHT, self.cell_height),
            (KEY_CELL_WIDTH, self.cell_width),
            (KEY_DIVISION_PERIOD, self.division_period),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(key, value, "must be a positive integer"));
            }
        }
        check_unit_interval(KEY_DIFFUSION_RATE, self.diffusion_rate)?;
        check_unit_interval(KEY_PROBABILITY, self.division_probability)?;
        check_nutrient_amount(KEY_SUSTENANCE, self.nutrient_for_sustenance)?;
        check_nutrient_amount(KEY_GROWTH, self.nutrient_for_growth)?;
        check_pattern_fits(self.nutrient_pattern, self.grid_height)?;
        Ok(())
    }

    /// Number of lattice cells (`width * height`).
    pub fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// Converts the configuration into the parameters the engine consumes.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            width: self.grid_width as usize,
            height: self.grid_height as usize,
            num_cells: self.cell_count(),
            delta: self.diffusion_rate,
            boundary: self.boundary,
            nutrient_pattern: self.nutrient_pattern,
            sustenance_cost: f64::from(self.nutrient_for_sustenance),
            growth_cost: f64::from(self.nutrient_for_growth),
            division_threshold: f64::from(self.division_threshold),
            division_probability: self.division_probability,
            division_period: self.division_period,
            crowding_table: self.crowding_table.map(f64::from),
        }
    }
}

/// Fails when the absorbing-middle sink would leave no row above or below it.
pub fn check_pattern_fits(pattern: NutrientPattern, grid_height: u32) -> Result<(), ConfigError> {
    if pattern == NutrientPattern::AbsorbingMiddle && grid_height < 3 {
        return Err(ConfigError::Dimension {
            height: grid_height,
        });
    }
    Ok(())
}

pub fn check_unit_interval(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(key, value, "must lie in [0, 1]"));
    }
    Ok(())
}

pub fn check_nutrient_amount(key: &'static str, value: u32) -> Result<(), ConfigError> {
    if value > 100 {
        return Err(ConfigError::invalid(key, value, "must lie in [0, 100]"));
    }
    Ok(())
}

fn parse_int<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(key, value, "expected a non-negative integer"))
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    let parsed: u32 = parse_int(key, value)?;
    if parsed == 0 {
        return Err(ConfigError::invalid(key, value, "must be a positive integer"));
    }
    Ok(parsed)
}

fn parse_nutrient_amount(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    let parsed: u32 = parse_int(key, value)?;
    check_nutrient_amount(key, parsed)?;
    Ok(parsed)
}

fn parse_unit_interval(key: &'static str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "expected a number"))?;
    check_unit_interval(key, parsed)?;
    Ok(parsed)
}

fn parse_crowding_table(value: &str) -> Result<[i32; CROWDING_TABLE_LEN], ConfigError> {
    let fields: Vec<&str> = value.split(',').map(str::trim).collect();
    if fields.len() != CROWDING_TABLE_LEN {
        return Err(ConfigError::CrowdingArity {
            found: fields.len(),
        });
    }
    let mut table = [0i32; CROWDING_TABLE_LEN];
    for (slot, field) in table.iter_mut().zip(fields) {
        *slot = field
            .parse()
            .map_err(|_| ConfigError::invalid(KEY_CROWDING, field, "expected an integer"))?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
grid height: 40
grid width: 60
cell height: 7
cell width: 7
rate of diffusion: 0.25
nutrient for sustenance: 12
nutrient for growth: 55
threshold for cell division: 2600
number of timesteps for cell division: 4
boundary condition: periodic
initial nutrient pattern: missingmiddle
probability of cell division: 0.75
crowding function: 0,40,40,40,30,20,10,0,0
";

    #[test]
    fn parses_every_documented_key() {
        let config = ColonyConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.grid_height, 40);
        assert_eq!(config.grid_width, 60);
        assert_eq!(config.cell_height, 7);
        assert_eq!(config.diffusion_rate, 0.25);
        assert_eq!(config.nutrient_for_sustenance, 12);
        assert_eq!(config.nutrient_for_growth, 55);
        assert_eq!(config.division_threshold, 2600);
        assert_eq!(config.division_period, 4);
        assert_eq!(config.boundary, BoundaryType::Periodic);
        assert_eq!(config.nutrient_pattern, NutrientPattern::AbsorbingMiddle);
        assert_eq!(config.division_probability, 0.75);
        assert_eq!(config.crowding_table, [0, 40, 40, 40, 30, 20, 10, 0, 0]);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn unknown_keys_comments_and_case_are_tolerated() {
        let text = "# colony\n\nGrid Height :  12 \ncolour scheme: viridis\n";
        let config = ColonyConfig::parse(text).unwrap();
        assert_eq!(config.grid_height, 12);
        assert_eq!(config.grid_width, ColonyConfig::default().grid_width);
    }

    #[test]
    fn malformed_values_fail_the_whole_parse() {
        assert!(matches!(
            ColonyConfig::parse("grid height: tall"),
            Err(ConfigError::InvalidValue { key: "grid height", .. })
        ));
        assert!(matches!(
            ColonyConfig::parse("grid width: 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ColonyConfig::parse("rate of diffusion: 1.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ColonyConfig::parse("nutrient for growth: 101"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ColonyConfig::parse("boundary condition: sticky"),
            Err(ConfigError::UnknownBoundary(_))
        ));
        assert!(matches!(
            ColonyConfig::parse("initial nutrient pattern: stripes"),
            Err(ConfigError::UnknownPattern(_))
        ));
        assert!(matches!(
            ColonyConfig::parse("crowding function: 1,2,3"),
            Err(ConfigError::CrowdingArity { found: 3 })
        ));
        assert!(matches!(
            ColonyConfig::parse("just some words"),
            Err(ConfigError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn failed_apply_leaves_the_base_untouched() {
        let base = ColonyConfig::parse("grid height: 20").unwrap();
        let result = base.apply_text("grid height: 30\nprobability of cell division: 2");
        assert!(result.is_err());
        assert_eq!(base.grid_height, 20);
    }

    #[test]
    fn absorbing_middle_needs_three_rows() {
        let err = ColonyConfig::parse("grid height: 2\ninitial nutrient pattern: missingmiddle")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Dimension { height: 2 }));
        assert!(ColonyConfig::parse("grid height: 3\ninitial nutrient pattern: absorbingmiddle").is_ok());
    }

    #[test]
    fn text_round_trip_preserves_values() {
        let mut config = ColonyConfig::parse(SAMPLE).unwrap();
        config.seed = Some(99);
        config.diffusion_rate = 0.1 + 0.2;
        let reparsed = ColonyConfig::parse(&config.to_text()).unwrap();
        assert_eq!(reparsed, config);

        let defaults = ColonyConfig::default();
        assert_eq!(ColonyConfig::parse(&defaults.to_text()).unwrap(), defaults);
    }

    #[test]
    fn text_has_one_line_per_key_and_seed_only_when_set() {
        let mut config = ColonyConfig::default();
        let text = config.to_text();
        assert_eq!(text.lines().count(), 13);
        assert!(text.ends_with("crowding function: 0,40,40,40,30,20,10,0,0\n"));
        assert!(!text.contains(KEY_SEED));

        config.seed = Some(5);
        let text = config.to_text();
        assert_eq!(text.lines().count(), 14);
        assert!(text.ends_with("random seed: 5\n"));
    }

    #[test]
    fn sim_params_mirror_the_config() {
        let params = ColonyConfig::parse(SAMPLE).unwrap().get_sim_params();
        assert_eq!(params.num_cells, 40 * 60);
        assert_eq!(params.sustenance_cost, 12.0);
        assert_eq!(params.crowding_table[4], 30.0);
    }
}
