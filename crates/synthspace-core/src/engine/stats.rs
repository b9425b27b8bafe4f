use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Per-reaction seed-finder counters.
///
/// Each stage only counts work that survived the previous one, so for any
/// run `attempts >= assemblies >= threshold_passes >= descriptor_evaluations >= hits`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub attempts: u64,
    pub assemblies: u64,
    pub threshold_passes: u64,
    pub descriptor_evaluations: u64,
    pub hits: u64,
}

impl SeedStats {
    pub fn is_consistent(&self) -> bool {
        self.attempts >= self.assemblies
            && self.assemblies >= self.threshold_passes
            && self.threshold_passes >= self.descriptor_evaluations
            && self.descriptor_evaluations >= self.hits
    }
}

impl AddAssign for SeedStats {
    fn add_assign(&mut self, other: Self) {
        self.attempts += other.attempts;
        self.assemblies += other.assemblies;
        self.threshold_passes += other.threshold_passes;
        self.descriptor_evaluations += other.descriptor_evaluations;
        self.hits += other.hits;
    }
}

impl Add for SeedStats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl Sum for SeedStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Per-reaction downsampling totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownsampleCounts {
    pub original: usize,
    pub retained: usize,
    /// Everything not retained, unparsable records included.
    pub discarded: usize,
    pub unparsable: usize,
}

impl AddAssign for DownsampleCounts {
    fn add_assign(&mut self, other: Self) {
        self.original += other.original;
        self.retained += other.retained;
        self.discarded += other.discarded;
        self.unparsable += other.unparsable;
    }
}
