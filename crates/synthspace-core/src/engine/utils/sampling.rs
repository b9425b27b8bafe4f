use crate::core::models::ids::{FragType, ReactionId};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over raw bytes. Used for seeding, so it must never change between
/// releases or platforms.
pub fn stable_hash(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(FNV_PRIME)
    })
}

/// RNG owned by one reaction: `seed XOR hash(reaction id)`.
pub fn reaction_rng(seed: u64, reaction: &ReactionId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ stable_hash(reaction.as_str().as_bytes()))
}

/// RNG owned by one frag type. Independent of the order in which frag types
/// are visited.
pub fn frag_type_rng(seed: u64, frag_type: &FragType) -> ChaCha8Rng {
    let mut key = frag_type.reaction.as_str().as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&(frag_type.position as u64).to_le_bytes());
    ChaCha8Rng::seed_from_u64(seed ^ stable_hash(&key))
}

/// RNG owned by one optimization job, keyed by the seed's structure code.
pub fn job_rng(seed: u64, key: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ stable_hash(key.as_bytes()).rotate_left(17))
}

/// Shuffled visiting order `0..len`.
pub fn shuffled_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Up to `k` distinct items drawn uniformly, in draw order.
pub fn sample_distinct<T: Clone>(items: &[T], k: usize, rng: &mut ChaCha8Rng) -> Vec<T> {
    items.choose_multiple(rng, k).cloned().collect()
}
