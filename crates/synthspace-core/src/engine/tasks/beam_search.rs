use crate::core::chem::{ChemError, ChemToolkit, describe_shape};
use crate::core::models::assembly::{OptimizationResult, SeedAssembly, Termination};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::fragment::FragmentRecord;
use crate::core::models::ids::{FragType, FragmentId};
use crate::core::store::FragmentStore;
use crate::engine::config::{LogLevel, OptimizationRequest};
use crate::engine::error::EngineError;
use crate::engine::scheduler::JobContext;
use crate::engine::state::Beam;
use crate::engine::utils::sampling::{job_rng, sample_distinct};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// A scored product of one choice list.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProduct {
    pub structure: String,
    pub score: f64,
}

/// Scores the product assembled from one record per position.
pub trait AssemblyScorer: Send + Sync {
    fn score(&self, choices: &[FragmentRecord]) -> Result<ScoredProduct, ChemError>;
}

/// Supplies replacement candidates for one position.
pub trait NeighborSource: Send + Sync {
    /// Up to `limit` other records of `current`'s position, nearest first.
    /// `current` itself is never returned.
    fn neighbors(&self, current: &FragmentRecord, limit: usize) -> Vec<FragmentRecord>;
}

/// Scores by 3D shape similarity of the assembled product to a query.
pub struct ShapeScorer<'a, T: ChemToolkit> {
    toolkit: &'a T,
    query: T::Descriptor,
    conformers: usize,
    cache: Option<Mutex<HashMap<String, f64>>>,
}

impl<'a, T: ChemToolkit> ShapeScorer<'a, T> {
    pub fn new(toolkit: &'a T, query: T::Descriptor, conformers: usize) -> Self {
        Self {
            toolkit,
            query,
            conformers,
            cache: None,
        }
    }

    /// Remembers scores by structure code so repeated products skip the
    /// conformer pipeline.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Mutex::new(HashMap::new()));
        self
    }

    fn cached(&self, structure: &str) -> Option<f64> {
        let cache = self.cache.as_ref()?.lock().ok()?;
        cache.get(structure).copied()
    }

    fn remember(&self, structure: &str, score: f64) {
        if let Some(Ok(mut cache)) = self.cache.as_ref().map(|c| c.lock()) {
            cache.insert(structure.to_string(), score);
        }
    }
}

impl<T: ChemToolkit> AssemblyScorer for ShapeScorer<'_, T> {
    fn score(&self, choices: &[FragmentRecord]) -> Result<ScoredProduct, ChemError> {
        let molecules = choices
            .iter()
            .map(|r| self.toolkit.parse_structure(&r.structure))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&T::Molecule> = molecules.iter().collect();
        let product = self.toolkit.assemble_fragments(&refs)?;
        let structure = self.toolkit.structure_code(&product);
        if let Some(score) = self.cached(&structure) {
            return Ok(ScoredProduct { structure, score });
        }
        let descriptor = describe_shape(self.toolkit, &product, self.conformers)?;
        let score = self.toolkit.shape_similarity(&self.query, &descriptor);
        self.remember(&structure, score);
        Ok(ScoredProduct { structure, score })
    }
}

/// Ranks a position's records by fingerprint similarity to the current choice.
///
/// Fingerprints are computed once per record up front; records the toolkit
/// cannot fingerprint never appear as neighbors.
pub struct SimilarityNeighbors<'a, T: ChemToolkit> {
    toolkit: &'a T,
    fingerprints: BTreeMap<FragType, Vec<(FragmentRecord, Fingerprint)>>,
}

impl<'a, T: ChemToolkit> SimilarityNeighbors<'a, T> {
    pub fn new(toolkit: &'a T, store: &FragmentStore) -> Self {
        let mut fingerprints = BTreeMap::new();
        for frag_type in store.frag_types() {
            let entries: Vec<_> = store
                .records_of(&frag_type)
                .iter()
                .filter_map(|record| match fingerprint_of(toolkit, record) {
                    Ok(fp) => Some((record.clone(), fp)),
                    Err(e) => {
                        warn!(fragment = %record.id, "Record cannot serve as a neighbor: {}", e);
                        None
                    }
                })
                .collect();
            fingerprints.insert(frag_type, entries);
        }
        Self {
            toolkit,
            fingerprints,
        }
    }
}

fn fingerprint_of<T: ChemToolkit>(toolkit: &T, record: &FragmentRecord) -> Result<Fingerprint, ChemError> {
    toolkit.fingerprint(&toolkit.parse_structure(&record.structure)?)
}

impl<T: ChemToolkit> NeighborSource for SimilarityNeighbors<'_, T> {
    fn neighbors(&self, current: &FragmentRecord, limit: usize) -> Vec<FragmentRecord> {
        let Some(entries) = self.fingerprints.get(&current.frag_type) else {
            return Vec::new();
        };
        let reference = match entries.iter().find(|(r, _)| r.id == current.id) {
            Some((_, fp)) => fp.clone(),
            None => match fingerprint_of(self.toolkit, current) {
                Ok(fp) => fp,
                Err(_) => return Vec::new(),
            },
        };
        let mut ranked: Vec<(f64, &FragmentRecord)> = entries
            .iter()
            .filter(|(r, _)| r.id != current.id)
            .map(|(r, fp)| (self.toolkit.structural_similarity(&reference, fp), r))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.into_iter().take(limit).map(|(_, r)| r.clone()).collect()
    }
}

/// Refines one seed by swapping one position at a time.
///
/// The best assembly only ever changes to a strictly better one, so the
/// returned trace is non-decreasing. The run stops after `max_rounds` rounds
/// or once `patience` consecutive rounds brought no improvement.
#[instrument(skip_all, name = "beam_search_task", fields(seed = %seed.structure))]
pub fn optimize<S, N>(
    seed: SeedAssembly,
    scorer: &S,
    neighbors: &N,
    request: &OptimizationRequest,
    ctx: &JobContext,
) -> Result<OptimizationResult, EngineError>
where
    S: AssemblyScorer + ?Sized,
    N: NeighborSource + ?Sized,
{
    let mut seed = seed;
    match scorer.score(&seed.choices) {
        Ok(scored) => {
            seed.structure = scored.structure;
            seed.score = scored.score;
        }
        Err(e) => debug!("Keeping the seed's own score; rescoring failed: {}", e),
    }

    let mut rng = job_rng(request.random_seed, &seed.structure);
    let mut beam = Beam::seeded(seed.clone(), request.beam_size);
    let mut best = seed.clone();
    let mut trace = vec![seed.score];
    let mut rounds = 0;
    let mut stale = 0;
    let mut evaluated = 0;

    while rounds < request.max_rounds && stale < request.patience {
        if ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        rounds += 1;

        let mut per_prior: HashMap<(usize, FragmentId), usize> = HashMap::new();
        let mut proposed: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for member in beam.members() {
            for (slot, current) in member.choices.iter().enumerate() {
                let pool = neighbors.neighbors(current, request.neighbor_pool_size);
                for replacement in sample_distinct(&pool, request.sampled_neighbors, &mut rng) {
                    let taken = per_prior.entry((slot, current.id.clone())).or_default();
                    if *taken >= request.per_position_cap {
                        break;
                    }
                    let choices = member.with_choice(slot, replacement);
                    let key = choices.iter().map(|r| r.id.as_str()).collect::<Vec<_>>().join(";");
                    if !proposed.insert(key) {
                        continue;
                    }
                    *taken += 1;
                    candidates.push(choices);
                }
            }
        }

        let mut scored = Vec::with_capacity(candidates.len());
        for choices in candidates {
            match scorer.score(&choices) {
                Ok(product) => {
                    evaluated += 1;
                    if product.score < request.min_score {
                        continue;
                    }
                    scored.push(SeedAssembly {
                        reaction: seed.reaction.clone(),
                        choices,
                        structure: product.structure,
                        score: product.score,
                    });
                }
                Err(e) => {
                    if request.log_level == LogLevel::Verbose {
                        debug!(round = rounds, "Skipping candidate: {}", e);
                    }
                }
            }
        }

        let produced = scored.len();
        beam.advance(scored);

        match beam.leader() {
            Some(leader) if leader.score > best.score => {
                if request.log_level != LogLevel::None {
                    info!(round = rounds, from = best.score, to = leader.score, structure = %leader.structure, "Improved.");
                }
                best = leader.clone();
                stale = 0;
            }
            _ => stale += 1,
        }
        trace.push(best.score);

        if request.log_level == LogLevel::Verbose {
            info!(round = rounds, candidates = produced, beam = beam.len(), best = best.score, "Round finished.");
        }
    }

    let termination = if stale >= request.patience {
        Termination::Converged
    } else {
        Termination::RoundsExhausted
    };
    Ok(OptimizationResult {
        seed,
        best,
        trace,
        rounds,
        termination,
        evaluated,
    })
}
