use crate::core::chem::{ChemToolkit, describe_shape};
use crate::core::models::assembly::SeedHit;
use crate::core::models::fragment::FragmentRecord;
use crate::core::models::ids::ReactionId;
use crate::core::store::FragmentStore;
use crate::engine::config::SeedFinderConfig;
use crate::engine::error::EngineError;
use crate::engine::scheduler::JobContext;
use crate::engine::stats::SeedStats;
use crate::engine::utils::sampling::reaction_rng;
use rand::Rng;
use tracing::{debug, instrument, trace, warn};

const CANCEL_CHECK_INTERVAL: usize = 64;

/// Everything one reaction produced. Hits are in attempt order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionSeeds {
    pub reaction: ReactionId,
    pub hits: Vec<SeedHit>,
    pub stats: SeedStats,
    /// A position had no usable record, so no attempts were made.
    pub exhausted: bool,
}

impl ReactionSeeds {
    fn empty(reaction: &ReactionId) -> Self {
        Self {
            reaction: reaction.clone(),
            hits: Vec::new(),
            stats: SeedStats::default(),
            exhausted: false,
        }
    }
}

/// Reactions the seed finder works on: those with at least two positions,
/// in canonical order.
pub fn eligible_reactions(store: &FragmentStore) -> Vec<ReactionId> {
    store
        .reactions()
        .filter(|r| store.positions(r).len() >= 2)
        .cloned()
        .collect()
}

/// Randomly assembles products of one reaction and keeps those whose shape
/// resembles the query.
///
/// Each attempt draws one record per position with the reaction's own RNG,
/// so the outcome depends only on the seed, the reaction id and the store.
/// Toolkit failures on an attempt skip that attempt.
#[instrument(skip_all, name = "seed_finder_task", fields(reaction = %reaction))]
pub fn run_reaction<T: ChemToolkit>(
    toolkit: &T,
    store: &FragmentStore,
    reaction: &ReactionId,
    query: &T::Descriptor,
    config: &SeedFinderConfig,
    ctx: &JobContext,
) -> Result<ReactionSeeds, EngineError> {
    let mut result = ReactionSeeds::empty(reaction);
    let positions = store.positions(reaction);
    if positions.len() < 2 {
        debug!("Reaction has fewer than two positions; skipping.");
        return Ok(result);
    }

    let mut pools: Vec<Vec<(&FragmentRecord, T::Molecule)>> = Vec::with_capacity(positions.len());
    for &position in &positions {
        let pool: Vec<_> = store
            .records(reaction, position)
            .iter()
            .filter_map(|record| match toolkit.parse_structure(&record.structure) {
                Ok(molecule) => Some((record, molecule)),
                Err(e) => {
                    warn!(fragment = %record.id, "Dropping unparsable record from the pool: {}", e);
                    None
                }
            })
            .collect();
        if pool.is_empty() {
            warn!(position, "Pool is empty; abandoning reaction.");
            result.exhausted = true;
            return Ok(result);
        }
        pools.push(pool);
    }

    let mut rng = reaction_rng(config.random_seed, reaction);
    let stats = &mut result.stats;

    for attempt in 0..config.attempts_per_reaction {
        if attempt % CANCEL_CHECK_INTERVAL == 0 && ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let picks: Vec<usize> = pools.iter().map(|pool| rng.gen_range(0..pool.len())).collect();
        stats.attempts += 1;

        let molecules: Vec<&T::Molecule> = pools
            .iter()
            .zip(&picks)
            .map(|(pool, &i)| &pool[i].1)
            .collect();
        let product = match toolkit.assemble_fragments(&molecules) {
            Ok(p) => p,
            Err(e) => {
                trace!(attempt, "Assembly failed: {}", e);
                continue;
            }
        };
        stats.assemblies += 1;

        let atoms = toolkit.atom_count(&product);
        let rotatable_bonds = toolkit.count_rotatable_bonds(&product);
        if !config.accepts_atom_count(atoms) || rotatable_bonds > config.max_rotatable_bonds {
            continue;
        }
        stats.threshold_passes += 1;

        let descriptor = match describe_shape(toolkit, &product, config.conformers) {
            Ok(d) => d,
            Err(e) => {
                trace!(attempt, "Shape description failed: {}", e);
                continue;
            }
        };
        stats.descriptor_evaluations += 1;

        let similarity = toolkit.shape_similarity(query, &descriptor);
        if similarity < config.min_similarity {
            continue;
        }
        stats.hits += 1;
        result.hits.push(SeedHit {
            reaction: reaction.clone(),
            fragments: pools
                .iter()
                .zip(&picks)
                .map(|(pool, &i)| pool[i].0.clone())
                .collect(),
            structure: toolkit.structure_code(&product),
            atoms,
            rotatable_bonds,
            similarity,
            attempt,
        });
    }

    debug!(
        attempts = result.stats.attempts,
        hits = result.stats.hits,
        "Reaction finished."
    );
    Ok(result)
}
