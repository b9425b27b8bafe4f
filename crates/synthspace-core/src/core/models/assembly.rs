use super::fragment::FragmentRecord;
use super::ids::{FragmentId, ReactionId};

/// One concrete product: a record chosen for every position of a reaction.
///
/// `choices` is ordered by position index. Assemblies are immutable; the beam
/// optimizer derives new ones with [`with_choice`](Self::with_choice).
#[derive(Debug, Clone, PartialEq)]
pub struct SeedAssembly {
    pub reaction: ReactionId,
    pub choices: Vec<FragmentRecord>,
    pub structure: String,
    pub score: f64,
}

impl SeedAssembly {
    pub fn fragment_ids(&self) -> Vec<&FragmentId> {
        self.choices.iter().map(|r| &r.id).collect()
    }

    /// `;`-joined fragment ids, the form used in persisted hit files.
    pub fn joined_fragment_ids(&self) -> String {
        join_fragment_ids(self.choices.iter())
    }

    /// Returns a copy of the choice list with the record at `slot` replaced.
    pub fn with_choice(&self, slot: usize, record: FragmentRecord) -> Vec<FragmentRecord> {
        let mut choices = self.choices.clone();
        if let Some(existing) = choices.get_mut(slot) {
            *existing = record;
        }
        choices
    }
}

pub(crate) fn join_fragment_ids<'a>(records: impl Iterator<Item = &'a FragmentRecord>) -> String {
    records
        .map(|r| r.id.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// An accepted seed-finder attempt, as persisted to the hit file.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedHit {
    pub reaction: ReactionId,
    pub fragments: Vec<FragmentRecord>,
    pub structure: String,
    pub atoms: usize,
    pub rotatable_bonds: usize,
    pub similarity: f64,
    pub attempt: usize,
}

impl SeedHit {
    pub fn joined_fragment_ids(&self) -> String {
        join_fragment_ids(self.fragments.iter())
    }

    pub fn into_assembly(self) -> SeedAssembly {
        SeedAssembly {
            reaction: self.reaction,
            choices: self.fragments,
            structure: self.structure,
            score: self.similarity,
        }
    }
}

/// Why a beam optimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `patience` consecutive rounds passed without a strict improvement.
    Converged,
    /// `max_rounds` rounds were performed.
    RoundsExhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::RoundsExhausted => "rounds-exhausted",
        }
    }
}

/// Outcome of refining one seed.
///
/// `trace[0]` is the seed score and `trace[i]` the best-so-far score after
/// round `i`, so the trace is non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub seed: SeedAssembly,
    pub best: SeedAssembly,
    pub trace: Vec<f64>,
    pub rounds: usize,
    pub termination: Termination,
    pub evaluated: usize,
}

impl OptimizationResult {
    pub fn improvement(&self) -> f64 {
        self.best.score - self.seed.score
    }
}
