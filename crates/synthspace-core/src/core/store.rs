use crate::core::chem::ChemToolkit;
use crate::core::models::fragment::{ConnectorSet, FragmentRecord};
use crate::core::models::ids::{FragType, FragmentId, ReactionId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Malformed store header in '{path}': {message}")]
    Header { path: String, message: String },
    #[error("Duplicate fragment '{fragment}' at {frag_type}")]
    DuplicateFragment {
        frag_type: FragType,
        fragment: FragmentId,
    },
    #[error(
        "Fragment '{fragment}' at {frag_type} has connectors {found:?}, expected {expected:?}"
    )]
    ConnectorMismatch {
        frag_type: FragType,
        fragment: FragmentId,
        expected: Vec<u8>,
        found: Vec<u8>,
    },
}

type PositionMap = BTreeMap<usize, Vec<FragmentRecord>>;

/// Immutable map from reaction to position to the ordered synthon list.
///
/// The store is read-only once built and is shared between worker threads
/// without synchronization. Reactions and positions iterate in ascending
/// order, which is the canonical order used by every algorithm in the crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentStore {
    reactions: BTreeMap<ReactionId, PositionMap>,
}

impl FragmentStore {
    pub fn reactions(&self) -> impl Iterator<Item = &ReactionId> {
        self.reactions.keys()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    /// Ordered position indices of a reaction; empty for unknown reactions.
    pub fn positions(&self, reaction: &ReactionId) -> Vec<usize> {
        self.reactions
            .get(reaction)
            .map(|positions| positions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Records of one position; empty for unknown reactions or positions.
    pub fn records(&self, reaction: &ReactionId, position: usize) -> &[FragmentRecord] {
        self.reactions
            .get(reaction)
            .and_then(|positions| positions.get(&position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn records_of(&self, frag_type: &FragType) -> &[FragmentRecord] {
        self.records(&frag_type.reaction, frag_type.position)
    }

    pub fn frag_types(&self) -> impl Iterator<Item = FragType> + '_ {
        self.reactions.iter().flat_map(|(reaction, positions)| {
            positions
                .keys()
                .map(move |&position| FragType::new(reaction.clone(), position))
        })
    }

    pub fn frag_types_of(&self, reaction: &ReactionId) -> Vec<FragType> {
        self.positions(reaction)
            .into_iter()
            .map(|position| FragType::new(reaction.clone(), position))
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.reactions
            .values()
            .flat_map(|positions| positions.values())
            .map(Vec::len)
            .sum()
    }

    pub fn find(&self, frag_type: &FragType, fragment: &FragmentId) -> Option<&FragmentRecord> {
        self.records_of(frag_type).iter().find(|r| &r.id == fragment)
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Checks that all records of each position share one connector configuration.
    ///
    /// Records that fail to parse are logged and ignored. With `allow_mixing`
    /// the check is skipped entirely.
    pub fn validate_connectors<T: ChemToolkit>(
        &self,
        toolkit: &T,
        allow_mixing: bool,
    ) -> Result<(), StoreError> {
        if allow_mixing {
            return Ok(());
        }
        for frag_type in self.frag_types() {
            let mut expected: Option<ConnectorSet> = None;
            for record in self.records_of(&frag_type) {
                let molecule = match toolkit.parse_structure(&record.structure) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(fragment = %record.id, %frag_type, "Skipping unparsable record: {}", e);
                        continue;
                    }
                };
                let found = toolkit.connectors(&molecule);
                match &expected {
                    None => expected = Some(found),
                    Some(exp) if *exp != found => {
                        return Err(StoreError::ConnectorMismatch {
                            frag_type: frag_type.clone(),
                            fragment: record.id.clone(),
                            expected: exp.labels().to_vec(),
                            found: found.labels().to_vec(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Accumulates records and freezes them into a [`FragmentStore`].
#[derive(Debug, Default)]
pub struct FragmentStoreBuilder {
    reactions: BTreeMap<ReactionId, PositionMap>,
}

impl FragmentStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to its position, preserving insertion order.
    pub fn insert(&mut self, record: FragmentRecord) -> Result<(), StoreError> {
        let list = self
            .reactions
            .entry(record.frag_type.reaction.clone())
            .or_default()
            .entry(record.frag_type.position)
            .or_default();
        if list.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateFragment {
                frag_type: record.frag_type,
                fragment: record.id,
            });
        }
        list.push(record);
        Ok(())
    }

    /// Registers a position with no records yet.
    pub fn declare_position(&mut self, frag_type: &FragType) {
        self.reactions
            .entry(frag_type.reaction.clone())
            .or_default()
            .entry(frag_type.position)
            .or_default();
    }

    pub fn build(self) -> FragmentStore {
        FragmentStore {
            reactions: self.reactions,
        }
    }
}

/// A store whose positions have been reduced to representative centers.
#[derive(Debug, Clone, PartialEq)]
pub struct DownsampledStore {
    store: FragmentStore,
    algorithm: String,
    min_similarity: f64,
}

impl DownsampledStore {
    pub fn new(store: FragmentStore, algorithm: impl Into<String>, min_similarity: f64) -> Self {
        Self {
            store,
            algorithm: algorithm.into(),
            min_similarity,
        }
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    pub fn into_store(self) -> FragmentStore {
        self.store
    }
}
