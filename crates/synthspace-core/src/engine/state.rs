use crate::core::models::assembly::SeedAssembly;
use std::cmp::Ordering;
use std::collections::HashSet;

/// An assembly ranked for beam selection: higher score first, ties broken by
/// structure code so selection never depends on evaluation order.
#[derive(Debug, Clone)]
pub struct RankedAssembly(pub SeedAssembly);

impl PartialEq for RankedAssembly {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for RankedAssembly {}

impl PartialOrd for RankedAssembly {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedAssembly {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .partial_cmp(&self.0.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.0.structure.cmp(&other.0.structure))
    }
}

/// The working set of one beam optimization.
#[derive(Debug, Clone)]
pub struct Beam {
    members: Vec<SeedAssembly>,
    capacity: usize,
}

impl Beam {
    pub fn seeded(seed: SeedAssembly, capacity: usize) -> Self {
        Self {
            members: vec![seed],
            capacity: capacity.max(1),
        }
    }

    pub fn members(&self) -> &[SeedAssembly] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Highest-ranked member.
    pub fn leader(&self) -> Option<&SeedAssembly> {
        self.members.first()
    }

    /// Replaces the beam with the best `capacity` candidates, keeping the
    /// first occurrence of each structure code. An empty candidate list
    /// leaves the beam unchanged.
    pub fn advance(&mut self, candidates: Vec<SeedAssembly>) {
        if candidates.is_empty() {
            return;
        }
        let mut ranked: Vec<RankedAssembly> = candidates.into_iter().map(RankedAssembly).collect();
        ranked.sort();
        let mut seen = HashSet::new();
        self.members = ranked
            .into_iter()
            .filter(|r| seen.insert(r.0.structure.clone()))
            .take(self.capacity)
            .map(|r| r.0)
            .collect();
    }
}
