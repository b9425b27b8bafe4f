use super::fragment::FragmentRecord;
use super::ids::{FragType, ReactionId};
use std::collections::BTreeMap;

/// Which query atoms one fragment of a split covers, and where it was matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAssignment {
    pub frag_type: FragType,
    pub query_atoms: Vec<usize>,
    pub cut_bonds: Vec<usize>,
}

/// A reaction together with, for each of its positions, the records
/// consistent with a query match.
///
/// Every position of the reaction is present in `matches`. Positions not
/// covered by any query fragment carry their complete record list, so
/// [`expanded_count`](Self::expanded_count) reflects the full combinatorial
/// product rather than only the constrained positions.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorialHit {
    pub reaction: ReactionId,
    pub split_level: usize,
    pub matches: BTreeMap<FragType, Vec<FragmentRecord>>,
    pub assignments: Vec<SplitAssignment>,
}

impl CombinatorialHit {
    /// Number of concrete products this hit expands to.
    pub fn expanded_count(&self) -> u128 {
        self.matches
            .values()
            .map(|records| records.len() as u128)
            .product()
    }

    /// Positions whose record list was constrained by a query fragment.
    pub fn matched_positions(&self) -> impl Iterator<Item = &FragType> {
        self.assignments.iter().map(|a| &a.frag_type)
    }

    pub fn is_matched(&self, frag_type: &FragType) -> bool {
        self.assignments.iter().any(|a| &a.frag_type == frag_type)
    }

    /// All bonds of the query cut to produce this hit.
    pub fn cut_bonds(&self) -> Vec<usize> {
        let mut bonds: Vec<usize> = self
            .assignments
            .iter()
            .flat_map(|a| a.cut_bonds.iter().copied())
            .collect();
        bonds.sort_unstable();
        bonds.dedup();
        bonds
    }
}
