use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error("Failed to read configuration file '{path}': {message}")]
    File { path: String, message: String },
}

fn check_fraction(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

fn check_positive(parameter: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: "must be at least 1".to_string(),
        })
    }
}

// --- Split search ---

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSearchConfig {
    pub max_splits: usize,
    pub max_combinatorial_hits: usize,
    /// Cuts within this many bonds (inclusive) of a cut of an earlier hit for
    /// the same reaction are skipped; 0 only skips reuse of the same bond.
    pub connector_proximity: usize,
    pub exclude_found_reactions: bool,
}

#[derive(Default)]
pub struct SplitSearchConfigBuilder {
    max_splits: Option<usize>,
    max_combinatorial_hits: Option<usize>,
    connector_proximity: Option<usize>,
    exclude_found_reactions: Option<bool>,
}

impl SplitSearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_splits(mut self, n: usize) -> Self {
        self.max_splits = Some(n);
        self
    }
    pub fn max_combinatorial_hits(mut self, n: usize) -> Self {
        self.max_combinatorial_hits = Some(n);
        self
    }
    pub fn connector_proximity(mut self, bonds: usize) -> Self {
        self.connector_proximity = Some(bonds);
        self
    }
    pub fn exclude_found_reactions(mut self, exclude: bool) -> Self {
        self.exclude_found_reactions = Some(exclude);
        self
    }

    pub fn build(self) -> Result<SplitSearchConfig, ConfigError> {
        Ok(SplitSearchConfig {
            max_splits: self
                .max_splits
                .ok_or(ConfigError::MissingParameter("max_splits"))?,
            max_combinatorial_hits: self
                .max_combinatorial_hits
                .ok_or(ConfigError::MissingParameter("max_combinatorial_hits"))?,
            connector_proximity: self.connector_proximity.unwrap_or(1),
            exclude_found_reactions: self.exclude_found_reactions.unwrap_or(true),
        })
    }
}

// --- Downsampling ---

#[derive(Debug, Clone, PartialEq)]
pub struct DownsampleConfig {
    pub max_centers: usize,
    pub min_similarity: f64,
    pub random_seed: u64,
    pub enforce_connector_equivalence: bool,
}

#[derive(Default)]
pub struct DownsampleConfigBuilder {
    max_centers: Option<usize>,
    min_similarity: Option<f64>,
    random_seed: Option<u64>,
    enforce_connector_equivalence: Option<bool>,
}

impl DownsampleConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_centers(mut self, n: usize) -> Self {
        self.max_centers = Some(n);
        self
    }
    pub fn min_similarity(mut self, similarity: f64) -> Self {
        self.min_similarity = Some(similarity);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
    pub fn enforce_connector_equivalence(mut self, enforce: bool) -> Self {
        self.enforce_connector_equivalence = Some(enforce);
        self
    }

    pub fn build(self) -> Result<DownsampleConfig, ConfigError> {
        let max_centers = self
            .max_centers
            .ok_or(ConfigError::MissingParameter("max_centers"))?;
        let min_similarity = self
            .min_similarity
            .ok_or(ConfigError::MissingParameter("min_similarity"))?;
        Ok(DownsampleConfig {
            max_centers: check_positive("max_centers", max_centers)?,
            min_similarity: check_fraction("min_similarity", min_similarity)?,
            random_seed: self
                .random_seed
                .ok_or(ConfigError::MissingParameter("random_seed"))?,
            enforce_connector_equivalence: self.enforce_connector_equivalence.unwrap_or(true),
        })
    }
}

// --- Seed finder ---

#[derive(Debug, Clone, PartialEq)]
pub struct SeedFinderConfig {
    pub attempts_per_reaction: usize,
    /// Lower atom-count bound; 0 disables it.
    pub min_atoms: usize,
    /// Upper atom-count bound; 0 disables it.
    pub max_atoms: usize,
    pub max_rotatable_bonds: usize,
    pub min_similarity: f64,
    pub random_seed: u64,
    pub max_hits_per_file: usize,
    pub num_threads: usize,
    pub conformers: usize,
}

impl SeedFinderConfig {
    pub fn accepts_atom_count(&self, atoms: usize) -> bool {
        (self.min_atoms == 0 || atoms >= self.min_atoms)
            && (self.max_atoms == 0 || atoms <= self.max_atoms)
    }
}

#[derive(Default)]
pub struct SeedFinderConfigBuilder {
    attempts_per_reaction: Option<usize>,
    min_atoms: Option<usize>,
    max_atoms: Option<usize>,
    max_rotatable_bonds: Option<usize>,
    min_similarity: Option<f64>,
    random_seed: Option<u64>,
    max_hits_per_file: Option<usize>,
    num_threads: Option<usize>,
    conformers: Option<usize>,
}

impl SeedFinderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts_per_reaction(mut self, n: usize) -> Self {
        self.attempts_per_reaction = Some(n);
        self
    }
    pub fn min_atoms(mut self, n: usize) -> Self {
        self.min_atoms = Some(n);
        self
    }
    pub fn max_atoms(mut self, n: usize) -> Self {
        self.max_atoms = Some(n);
        self
    }
    pub fn max_rotatable_bonds(mut self, n: usize) -> Self {
        self.max_rotatable_bonds = Some(n);
        self
    }
    pub fn min_similarity(mut self, similarity: f64) -> Self {
        self.min_similarity = Some(similarity);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
    pub fn max_hits_per_file(mut self, n: usize) -> Self {
        self.max_hits_per_file = Some(n);
        self
    }
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }
    pub fn conformers(mut self, n: usize) -> Self {
        self.conformers = Some(n);
        self
    }

    pub fn build(self) -> Result<SeedFinderConfig, ConfigError> {
        let min_atoms = self.min_atoms.unwrap_or(0);
        let max_atoms = self.max_atoms.unwrap_or(0);
        if max_atoms != 0 && min_atoms > max_atoms {
            return Err(ConfigError::InvalidValue {
                parameter: "min_atoms",
                reason: format!("{min_atoms} exceeds max_atoms {max_atoms}"),
            });
        }
        let min_similarity = self
            .min_similarity
            .ok_or(ConfigError::MissingParameter("min_similarity"))?;
        Ok(SeedFinderConfig {
            attempts_per_reaction: self
                .attempts_per_reaction
                .ok_or(ConfigError::MissingParameter("attempts_per_reaction"))?,
            min_atoms,
            max_atoms,
            max_rotatable_bonds: self
                .max_rotatable_bonds
                .ok_or(ConfigError::MissingParameter("max_rotatable_bonds"))?,
            min_similarity: check_fraction("min_similarity", min_similarity)?,
            random_seed: self
                .random_seed
                .ok_or(ConfigError::MissingParameter("random_seed"))?,
            max_hits_per_file: self.max_hits_per_file.unwrap_or(0),
            num_threads: check_positive(
                "num_threads",
                self.num_threads
                    .ok_or(ConfigError::MissingParameter("num_threads"))?,
            )?,
            conformers: check_positive("conformers", self.conformers.unwrap_or(16))?,
        })
    }
}

// --- Beam optimizer ---

/// How much the beam optimizer reports about its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    None,
    #[default]
    Improvements,
    Verbose,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "improvements" => Ok(LogLevel::Improvements),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(ConfigError::InvalidValue {
                parameter: "log_level",
                reason: format!("unknown level '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationRequest {
    pub beam_size: usize,
    pub neighbor_pool_size: usize,
    pub sampled_neighbors: usize,
    pub per_position_cap: usize,
    pub max_rounds: usize,
    pub patience: usize,
    pub min_score: f64,
    pub random_seed: u64,
    pub log_level: LogLevel,
    pub conformers: usize,
}

#[derive(Default)]
pub struct OptimizationRequestBuilder {
    beam_size: Option<usize>,
    neighbor_pool_size: Option<usize>,
    sampled_neighbors: Option<usize>,
    per_position_cap: Option<usize>,
    max_rounds: Option<usize>,
    patience: Option<usize>,
    min_score: Option<f64>,
    random_seed: Option<u64>,
    log_level: Option<LogLevel>,
    conformers: Option<usize>,
}

impl OptimizationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beam_size(mut self, n: usize) -> Self {
        self.beam_size = Some(n);
        self
    }
    pub fn neighbor_pool_size(mut self, n: usize) -> Self {
        self.neighbor_pool_size = Some(n);
        self
    }
    pub fn sampled_neighbors(mut self, n: usize) -> Self {
        self.sampled_neighbors = Some(n);
        self
    }
    pub fn per_position_cap(mut self, n: usize) -> Self {
        self.per_position_cap = Some(n);
        self
    }
    pub fn max_rounds(mut self, n: usize) -> Self {
        self.max_rounds = Some(n);
        self
    }
    pub fn patience(mut self, n: usize) -> Self {
        self.patience = Some(n);
        self
    }
    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }
    pub fn conformers(mut self, n: usize) -> Self {
        self.conformers = Some(n);
        self
    }

    pub fn build(self) -> Result<OptimizationRequest, ConfigError> {
        Ok(OptimizationRequest {
            beam_size: check_positive(
                "beam_size",
                self.beam_size
                    .ok_or(ConfigError::MissingParameter("beam_size"))?,
            )?,
            neighbor_pool_size: check_positive(
                "neighbor_pool_size",
                self.neighbor_pool_size
                    .ok_or(ConfigError::MissingParameter("neighbor_pool_size"))?,
            )?,
            sampled_neighbors: check_positive(
                "sampled_neighbors",
                self.sampled_neighbors
                    .ok_or(ConfigError::MissingParameter("sampled_neighbors"))?,
            )?,
            per_position_cap: check_positive(
                "per_position_cap",
                self.per_position_cap
                    .ok_or(ConfigError::MissingParameter("per_position_cap"))?,
            )?,
            max_rounds: self
                .max_rounds
                .ok_or(ConfigError::MissingParameter("max_rounds"))?,
            patience: check_positive(
                "patience",
                self.patience
                    .ok_or(ConfigError::MissingParameter("patience"))?,
            )?,
            min_score: self.min_score.unwrap_or(0.0),
            random_seed: self
                .random_seed
                .ok_or(ConfigError::MissingParameter("random_seed"))?,
            log_level: self.log_level.unwrap_or_default(),
            conformers: check_positive("conformers", self.conformers.unwrap_or(16))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_search_builder_applies_defaults() {
        let config = SplitSearchConfigBuilder::new()
            .max_splits(2)
            .max_combinatorial_hits(10)
            .build()
            .unwrap();
        assert_eq!(config.connector_proximity, 1);
        assert!(config.exclude_found_reactions);
    }

    #[test]
    fn missing_parameters_are_named() {
        let err = DownsampleConfigBuilder::new()
            .max_centers(5)
            .min_similarity(0.5)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("random_seed"));
    }

    #[test]
    fn similarity_thresholds_must_be_fractions() {
        let err = DownsampleConfigBuilder::new()
            .max_centers(5)
            .min_similarity(1.5)
            .random_seed(1)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "min_similarity",
                ..
            }
        ));
    }

    #[test]
    fn seed_finder_rejects_inverted_atom_bounds() {
        let err = SeedFinderConfigBuilder::new()
            .attempts_per_reaction(10)
            .min_atoms(30)
            .max_atoms(20)
            .max_rotatable_bonds(5)
            .min_similarity(0.5)
            .random_seed(1)
            .num_threads(2)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "min_atoms", .. }));
    }

    #[test]
    fn zero_atom_bounds_mean_unbounded() {
        let config = SeedFinderConfigBuilder::new()
            .attempts_per_reaction(1)
            .max_rotatable_bonds(5)
            .min_similarity(0.0)
            .random_seed(1)
            .num_threads(1)
            .build()
            .unwrap();
        assert!(config.accepts_atom_count(0));
        assert!(config.accepts_atom_count(10_000));

        let bounded = SeedFinderConfig {
            min_atoms: 5,
            max_atoms: 10,
            ..config
        };
        assert!(!bounded.accepts_atom_count(4));
        assert!(bounded.accepts_atom_count(10));
        assert!(!bounded.accepts_atom_count(11));
    }

    #[test]
    fn optimization_request_requires_positive_beam() {
        let err = OptimizationRequestBuilder::new()
            .beam_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { parameter: "beam_size", .. }));
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("VERBOSE".parse::<LogLevel>().unwrap(), LogLevel::Verbose);
        assert_eq!("none".parse::<LogLevel>().unwrap(), LogLevel::None);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
