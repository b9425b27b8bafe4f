use super::tsv_writer::{RotatingTsvWriter, WriterError};
use crate::core::models::assembly::SeedHit;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SEED_HIT_HEADER: [&str; 7] = [
    "rxnId",
    "fragIds",
    "assembledIdcode",
    "atoms",
    "rotatableBonds",
    "phesaSimilarity",
    "attemptIndex",
];

/// Persists accepted seed-finder hits as rotating TSV files.
///
/// Structure codes and ids are written verbatim; a hit whose fields contain a
/// tab or line break is refused rather than corrupting the row.
pub struct SeedHitWriter {
    inner: RotatingTsvWriter,
    written: AtomicUsize,
}

impl SeedHitWriter {
    /// Opens `base` for writing. `max_hits_per_file == 0` disables rotation.
    pub fn create(base: impl Into<PathBuf>, max_hits_per_file: usize) -> Result<Self, WriterError> {
        Ok(Self {
            inner: RotatingTsvWriter::create(base, &SEED_HIT_HEADER, max_hits_per_file)?,
            written: AtomicUsize::new(0),
        })
    }

    pub fn write_hit(&self, hit: &SeedHit) -> Result<(), WriterError> {
        self.inner.write_row([
            hit.reaction.to_string(),
            hit.joined_fragment_ids(),
            hit.structure.clone(),
            hit.atoms.to_string(),
            hit.rotatable_bonds.to_string(),
            format!("{:.4}", hit.similarity),
            hit.attempt.to_string(),
        ])?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn hits_written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> Result<(), WriterError> {
        self.inner.flush()
    }

    pub fn finish(self) -> Result<Vec<PathBuf>, WriterError> {
        self.inner.finish()
    }
}
