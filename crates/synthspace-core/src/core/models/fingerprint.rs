/// A fixed-width structural fingerprint stored as packed 64-bit words.
///
/// Fingerprints are produced by the chemistry toolkit; the engine only needs
/// the two set operations below. Substructure screening relies on the usual
/// monotonicity guarantee: if `a` is a substructure of `b`, every bit set in
/// `fingerprint(a)` is also set in `fingerprint(b)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    words: Vec<u64>,
}

impl Fingerprint {
    /// Creates an all-zero fingerprint wide enough to hold `bits` bits.
    pub fn with_bits(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn bit_len(&self) -> usize {
        self.words.len() * 64
    }

    pub fn set(&mut self, bit: usize) {
        let bit = bit % self.bit_len().max(1);
        if let Some(word) = self.words.get_mut(bit / 64) {
            *word |= 1u64 << (bit % 64);
        }
    }

    pub fn is_set(&self, bit: usize) -> bool {
        self.words
            .get(bit / 64)
            .is_some_and(|word| word & (1u64 << (bit % 64)) != 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Returns `true` when every bit of `self` is also set in `other`.
    ///
    /// Words missing from the shorter fingerprint are treated as zero.
    pub fn is_subset_of(&self, other: &Fingerprint) -> bool {
        self.words.iter().enumerate().all(|(i, &word)| {
            let theirs = other.words.get(i).copied().unwrap_or(0);
            word & !theirs == 0
        })
    }

    /// In-place union, used to build position-level screening fingerprints.
    pub fn union_with(&mut self, other: &Fingerprint) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine |= *theirs;
        }
    }

    /// Tanimoto (Jaccard) similarity in `[0, 1]`. Two empty fingerprints score 1.
    pub fn tanimoto(&self, other: &Fingerprint) -> f64 {
        let len = self.words.len().max(other.words.len());
        let (mut common, mut either) = (0u32, 0u32);
        for i in 0..len {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            common += (a & b).count_ones();
            either += (a | b).count_ones();
        }
        if either == 0 {
            1.0
        } else {
            common as f64 / either as f64
        }
    }
}
