use crate::core::chem::{QueryFragment, SubstructureToolkit};
use crate::core::index::FragmentIndex;
use crate::core::models::fragment::FragmentRecord;
use crate::core::models::hit::{CombinatorialHit, SplitAssignment};
use crate::core::models::ids::{FragType, ReactionId};
use crate::core::store::FragmentStore;
use crate::engine::config::SplitSearchConfig;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, trace, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSearchReport {
    pub levels_evaluated: usize,
    pub cut_sets: usize,
    /// Reaction / cut-set pairs skipped because a cut sat within
    /// `connector_proximity` bonds of a cut of an earlier hit.
    pub pruned: usize,
    /// Positions whose union fingerprint admitted a query fragment.
    pub positions_screened: usize,
    pub exact_matches: usize,
    pub failures: usize,
    /// The hit cap was reached before the search space was exhausted.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct SplitSearchOutcome {
    pub hits: Vec<CombinatorialHit>,
    pub report: SplitSearchReport,
}

/// Records matched by one query fragment: reaction → position → records.
type FragmentMatches = BTreeMap<ReactionId, BTreeMap<usize, Vec<FragmentRecord>>>;

struct Search<'a, T: SubstructureToolkit> {
    toolkit: &'a T,
    query: &'a T::Molecule,
    store: &'a FragmentStore,
    index: &'a FragmentIndex<T::Molecule>,
    config: &'a SplitSearchConfig,
    hits: Vec<CombinatorialHit>,
    report: SplitSearchReport,
    found: BTreeSet<ReactionId>,
    earlier_cuts: BTreeMap<ReactionId, Vec<usize>>,
}

/// Splits the query into `k + 1` fragments for `k = 0..=max_splits` and
/// matches every fragment against the synthons of the store.
///
/// Level 0 screens the whole query against the building blocks and is always
/// evaluated. Hits come back in discovery order and at most
/// `max_combinatorial_hits` of them are returned; once that many have been
/// found no further cut set or level is examined.
#[instrument(skip_all, name = "split_search_task", fields(max_splits = config.max_splits, cap = config.max_combinatorial_hits))]
pub fn run<T: SubstructureToolkit>(
    toolkit: &T,
    query: &T::Molecule,
    store: &FragmentStore,
    index: &FragmentIndex<T::Molecule>,
    config: &SplitSearchConfig,
) -> SplitSearchOutcome {
    let mut search = Search {
        toolkit,
        query,
        store,
        index,
        config,
        hits: Vec::new(),
        report: SplitSearchReport::default(),
        found: BTreeSet::new(),
        earlier_cuts: BTreeMap::new(),
    };
    let cuttable = toolkit.cuttable_bonds(query);
    let cap = config.max_combinatorial_hits;

    for level in 0..=config.max_splits {
        if level > 0 && search.hits.len() >= cap {
            search.report.truncated = true;
            break;
        }
        if level > cuttable.len() {
            break;
        }
        search.report.levels_evaluated += 1;
        let level_start = search.hits.len();

        for cuts in Combinations::new(&cuttable, level) {
            if search.hits.len() >= cap {
                search.report.truncated = true;
                break;
            }
            search.evaluate_cut_set(level, &cuts);
        }

        for hit in &search.hits[level_start..] {
            search.found.insert(hit.reaction.clone());
            search
                .earlier_cuts
                .entry(hit.reaction.clone())
                .or_default()
                .extend(hit.cut_bonds());
        }
        debug!(level, hits = search.hits.len() - level_start, "Split level finished.");
    }

    info!(
        hits = search.hits.len(),
        levels = search.report.levels_evaluated,
        cut_sets = search.report.cut_sets,
        failures = search.report.failures,
        "Split search finished."
    );
    SplitSearchOutcome {
        hits: search.hits,
        report: search.report,
    }
}

impl<T: SubstructureToolkit> Search<'_, T> {
    fn evaluate_cut_set(&mut self, level: usize, cuts: &[usize]) {
        self.report.cut_sets += 1;
        let pieces = match self.toolkit.split(self.query, cuts) {
            Ok(pieces) if pieces.len() == level + 1 => pieces,
            Ok(pieces) => {
                trace!(?cuts, pieces = pieces.len(), "Cut set does not yield {} fragments.", level + 1);
                return;
            }
            Err(e) => {
                warn!(?cuts, "Skipping cut set: {}", e);
                self.report.failures += 1;
                return;
            }
        };

        let blocked = self.blocked_reactions(cuts);
        let mut per_fragment = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            match self.match_fragment(piece, &blocked) {
                Some(matches) => per_fragment.push(matches),
                None => return,
            }
        }

        let Some((first, rest)) = per_fragment.split_first() else {
            return;
        };
        let candidates: Vec<&ReactionId> = first
            .keys()
            .filter(|reaction| rest.iter().all(|m| m.contains_key(*reaction)))
            .collect();

        for reaction in candidates {
            if self.hits.len() >= self.config.max_combinatorial_hits {
                self.report.truncated = true;
                return;
            }
            let options: Vec<&BTreeMap<usize, Vec<FragmentRecord>>> = per_fragment
                .iter()
                .filter_map(|m| m.get(reaction))
                .collect();
            let Some(assignment) = assign_positions(&options) else {
                continue;
            };
            let hit = self.build_hit(reaction, level, &pieces, &options, &assignment);
            debug!(reaction = %reaction, level, expanded = hit.expanded_count(), "Combinatorial hit.");
            self.hits.push(hit);
        }
    }

    /// Reactions that may not be hit by this cut set.
    fn blocked_reactions(&mut self, cuts: &[usize]) -> BTreeSet<ReactionId> {
        let mut blocked = BTreeSet::new();
        for (reaction, prior) in &self.earlier_cuts {
            if self.config.exclude_found_reactions && self.found.contains(reaction) {
                blocked.insert(reaction.clone());
                continue;
            }
            let too_close = cuts.iter().any(|&cut| {
                prior.iter().any(|&p| {
                    self.toolkit
                        .bond_distance(self.query, cut, p)
                        .is_some_and(|d| d <= self.config.connector_proximity)
                })
            });
            if too_close {
                self.report.pruned += 1;
                blocked.insert(reaction.clone());
            }
        }
        blocked
    }

    /// Screens one query fragment against every eligible position. Returns
    /// `None` when the fragment cannot be fingerprinted.
    fn match_fragment(
        &mut self,
        piece: &QueryFragment<T::Molecule>,
        blocked: &BTreeSet<ReactionId>,
    ) -> Option<FragmentMatches> {
        let fingerprint = match self.toolkit.fingerprint(&piece.molecule) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(atoms = ?piece.query_atoms, "Skipping query fragment: {}", e);
                self.report.failures += 1;
                return None;
            }
        };
        let connectors = piece.connector_count();
        let mut matches = FragmentMatches::new();

        for (frag_type, position) in self.index.iter() {
            if blocked.contains(&frag_type.reaction) || !fingerprint.is_subset_of(&position.union) {
                continue;
            }
            self.report.positions_screened += 1;
            for entry in &position.records {
                if entry.connector_count < connectors || !fingerprint.is_subset_of(&entry.fingerprint) {
                    continue;
                }
                self.report.exact_matches += 1;
                match self.toolkit.is_substructure(&piece.molecule, &entry.molecule) {
                    Ok(true) => matches
                        .entry(frag_type.reaction.clone())
                        .or_default()
                        .entry(frag_type.position)
                        .or_default()
                        .push(entry.record.clone()),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(fragment = %entry.record.id, %frag_type, "Substructure match failed: {}", e);
                        self.report.failures += 1;
                    }
                }
            }
        }
        Some(matches)
    }

    fn build_hit(
        &self,
        reaction: &ReactionId,
        level: usize,
        pieces: &[QueryFragment<T::Molecule>],
        options: &[&BTreeMap<usize, Vec<FragmentRecord>>],
        assignment: &[usize],
    ) -> CombinatorialHit {
        let mut matches = BTreeMap::new();
        for frag_type in self.store.frag_types_of(reaction) {
            let records = assignment
                .iter()
                .position(|&p| p == frag_type.position)
                .and_then(|piece| options[piece].get(&frag_type.position))
                .cloned()
                .unwrap_or_else(|| self.store.records_of(&frag_type).to_vec());
            matches.insert(frag_type, records);
        }
        let assignments = pieces
            .iter()
            .zip(assignment)
            .map(|(piece, &position)| SplitAssignment {
                frag_type: FragType::new(reaction.clone(), position),
                query_atoms: piece.query_atoms.clone(),
                cut_bonds: piece.cut_bonds.clone(),
            })
            .collect();
        CombinatorialHit {
            reaction: reaction.clone(),
            split_level: level,
            matches,
            assignments,
        }
    }
}

/// Assigns every query fragment to a distinct position that matched it,
/// trying positions in ascending order.
fn assign_positions(options: &[&BTreeMap<usize, Vec<FragmentRecord>>]) -> Option<Vec<usize>> {
    fn extend(options: &[&BTreeMap<usize, Vec<FragmentRecord>>], chosen: &mut Vec<usize>) -> bool {
        let Some(current) = options.get(chosen.len()) else {
            return true;
        };
        for &position in current.keys() {
            if chosen.contains(&position) {
                continue;
            }
            chosen.push(position);
            if extend(options, chosen) {
                return true;
            }
            chosen.pop();
        }
        false
    }

    let mut chosen = Vec::with_capacity(options.len());
    extend(options, &mut chosen).then_some(chosen)
}

/// Lexicographic `k`-subsets of a slice.
struct Combinations<'a> {
    items: &'a [usize],
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl<'a> Combinations<'a> {
    fn new(items: &'a [usize], k: usize) -> Self {
        Self {
            items,
            indices: (0..k).collect(),
            started: false,
            done: k > items.len(),
        }
    }

    fn current(&self) -> Vec<usize> {
        self.indices.iter().map(|&i| self.items[i]).collect()
    }
}

impl Iterator for Combinations<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.current());
        }
        let n = self.items.len();
        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] != i + n - k {
                break;
            }
        }
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.current())
    }
}
