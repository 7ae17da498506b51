use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, parsing or validating colony parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read.
    #[error("failed to read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A non-blank line did not contain a `key: value` separator.
    #[error("line {line} is not a 'key: value' pair: '{content}'")]
    MalformedLine { line: usize, content: String },
    /// A value had the wrong type or fell outside its declared range.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    /// The crowding function did not list one weight per neighbour count.
    #[error("crowding function needs exactly 9 comma-separated values, found {found}")]
    CrowdingArity { found: usize },
    #[error("unknown boundary condition '{0}' (expected reflecting, absorbent or periodic)")]
    UnknownBoundary(String),
    #[error("unknown initial nutrient pattern '{0}' (expected default, random or missingmiddle)")]
    UnknownPattern(String),
    /// The absorbing-middle pattern needs a row above and below the sink.
    #[error("grid height {height} is too small for the absorbing middle pattern (minimum 3)")]
    Dimension { height: u32 },
    /// An explicit nutrient field did not match the lattice size.
    #[error("nutrient field has {found} values but the lattice has {expected} cells")]
    NutrientLength { expected: usize, found: usize },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: impl ToString, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
