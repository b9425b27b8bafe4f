use super::config::{
    ConfigError, DownsampleConfig, DownsampleConfigBuilder, LogLevel, OptimizationRequest,
    OptimizationRequestBuilder, SeedFinderConfig, SeedFinderConfigBuilder, SplitSearchConfig,
    SplitSearchConfigBuilder,
};
use crate::logging::LogConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Values used for every setting a run file leaves out.
pub struct Defaults {
    pub attempts_per_reaction: usize,
    pub min_atoms: usize,
    pub max_atoms: usize,
    pub max_rotatable_bonds: usize,
    pub seed_min_similarity: f64,
    pub random_seed: u64,
    pub max_hits_per_file: usize,
    pub conformers: usize,
    pub beam_size: usize,
    pub neighbor_pool_size: usize,
    pub sampled_neighbors: usize,
    pub per_position_cap: usize,
    pub max_rounds: usize,
    pub patience: usize,
    pub min_score: f64,
    pub max_centers: usize,
    pub downsample_min_similarity: f64,
    pub enforce_connector_equivalence: bool,
    pub max_splits: usize,
    pub max_combinatorial_hits: usize,
    pub connector_proximity: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            attempts_per_reaction: 1000,
            min_atoms: 0,
            max_atoms: 0,
            max_rotatable_bonds: 15,
            seed_min_similarity: 0.6,
            random_seed: 42,
            max_hits_per_file: 0,
            conformers: 16,
            beam_size: 10,
            neighbor_pool_size: 20,
            sampled_neighbors: 5,
            per_position_cap: 3,
            max_rounds: 20,
            patience: 3,
            min_score: 0.0,
            max_centers: 1000,
            downsample_min_similarity: 0.7,
            enforce_connector_equivalence: true,
            max_splits: 3,
            max_combinatorial_hits: 1000,
            connector_proximity: 1,
        }
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSeedFinderSettings {
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

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialOptimizerSettings {
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
    num_threads: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDownsampleSettings {
    max_centers: Option<usize>,
    min_similarity: Option<f64>,
    random_seed: Option<u64>,
    enforce_connector_equivalence: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSplitSearchSettings {
    max_splits: Option<usize>,
    max_combinatorial_hits: Option<usize>,
    connector_proximity: Option<usize>,
    exclude_found_reactions: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialLoggingSettings {
    verbosity: Option<u8>,
    quiet: Option<bool>,
    log_file: Option<PathBuf>,
}

/// A parsed run file. Every section and key is optional.
///
/// ```toml
/// [seed-finder]
/// attempts-per-reaction = 5000
/// min-similarity = 0.65
///
/// [optimizer]
/// beam-size = 8
/// log-level = "verbose"
/// ```
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RunSettings {
    seed_finder: Option<PartialSeedFinderSettings>,
    optimizer: Option<PartialOptimizerSettings>,
    downsampling: Option<PartialDownsampleSettings>,
    split_search: Option<PartialSplitSearchSettings>,
    logging: Option<PartialLoggingSettings>,
}

impl RunSettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading run settings from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::File { message, .. } => ConfigError::File {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::File {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn seed_finder(&self) -> Result<SeedFinderConfig, ConfigError> {
        let d = Defaults::default();
        let s = self.seed_finder.clone().unwrap_or_default();
        SeedFinderConfigBuilder::new()
            .attempts_per_reaction(s.attempts_per_reaction.unwrap_or(d.attempts_per_reaction))
            .min_atoms(s.min_atoms.unwrap_or(d.min_atoms))
            .max_atoms(s.max_atoms.unwrap_or(d.max_atoms))
            .max_rotatable_bonds(s.max_rotatable_bonds.unwrap_or(d.max_rotatable_bonds))
            .min_similarity(s.min_similarity.unwrap_or(d.seed_min_similarity))
            .random_seed(s.random_seed.unwrap_or(d.random_seed))
            .max_hits_per_file(s.max_hits_per_file.unwrap_or(d.max_hits_per_file))
            .num_threads(s.num_threads.unwrap_or_else(available_threads))
            .conformers(s.conformers.unwrap_or(d.conformers))
            .build()
    }

    pub fn optimization(&self) -> Result<OptimizationRequest, ConfigError> {
        let d = Defaults::default();
        let s = self.optimizer.clone().unwrap_or_default();
        OptimizationRequestBuilder::new()
            .beam_size(s.beam_size.unwrap_or(d.beam_size))
            .neighbor_pool_size(s.neighbor_pool_size.unwrap_or(d.neighbor_pool_size))
            .sampled_neighbors(s.sampled_neighbors.unwrap_or(d.sampled_neighbors))
            .per_position_cap(s.per_position_cap.unwrap_or(d.per_position_cap))
            .max_rounds(s.max_rounds.unwrap_or(d.max_rounds))
            .patience(s.patience.unwrap_or(d.patience))
            .min_score(s.min_score.unwrap_or(d.min_score))
            .random_seed(s.random_seed.unwrap_or(d.random_seed))
            .log_level(s.log_level.unwrap_or_default())
            .conformers(s.conformers.unwrap_or(d.conformers))
            .build()
    }

    /// Worker count for batch optimization runs.
    pub fn optimizer_threads(&self) -> usize {
        self.optimizer
            .as_ref()
            .and_then(|o| o.num_threads)
            .filter(|&n| n > 0)
            .unwrap_or_else(available_threads)
    }

    pub fn downsampling(&self) -> Result<DownsampleConfig, ConfigError> {
        let d = Defaults::default();
        let s = self.downsampling.clone().unwrap_or_default();
        DownsampleConfigBuilder::new()
            .max_centers(s.max_centers.unwrap_or(d.max_centers))
            .min_similarity(s.min_similarity.unwrap_or(d.downsample_min_similarity))
            .random_seed(s.random_seed.unwrap_or(d.random_seed))
            .enforce_connector_equivalence(
                s.enforce_connector_equivalence
                    .unwrap_or(d.enforce_connector_equivalence),
            )
            .build()
    }

    pub fn split_search(&self) -> Result<SplitSearchConfig, ConfigError> {
        let d = Defaults::default();
        let s = self.split_search.clone().unwrap_or_default();
        SplitSearchConfigBuilder::new()
            .max_splits(s.max_splits.unwrap_or(d.max_splits))
            .max_combinatorial_hits(s.max_combinatorial_hits.unwrap_or(d.max_combinatorial_hits))
            .connector_proximity(s.connector_proximity.unwrap_or(d.connector_proximity))
            .exclude_found_reactions(s.exclude_found_reactions.unwrap_or(true))
            .build()
    }

    pub fn logging(&self) -> LogConfig {
        let s = self.logging.clone().unwrap_or_default();
        LogConfig {
            verbosity: s.verbosity.unwrap_or(0),
            quiet: s.quiet.unwrap_or(false),
            log_file: s.log_file,
        }
    }
}
