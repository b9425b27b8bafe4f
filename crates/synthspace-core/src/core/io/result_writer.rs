use super::tsv_writer::{RotatingTsvWriter, WriterError};
use crate::core::models::assembly::OptimizationResult;
use std::path::PathBuf;

pub const OPTIMIZATION_HEADER: [&str; 10] = [
    "rxnId",
    "seedFragIds",
    "seedIdcode",
    "seedScore",
    "bestFragIds",
    "bestIdcode",
    "bestScore",
    "rounds",
    "termination",
    "scoreTrace",
];

/// Writes one row per optimized seed.
pub struct OptimizationResultWriter {
    inner: RotatingTsvWriter,
}

impl OptimizationResultWriter {
    pub fn create(base: impl Into<PathBuf>, max_rows_per_file: usize) -> Result<Self, WriterError> {
        Ok(Self {
            inner: RotatingTsvWriter::create(base, &OPTIMIZATION_HEADER, max_rows_per_file)?,
        })
    }

    pub fn write_result(&self, result: &OptimizationResult) -> Result<(), WriterError> {
        let trace = result
            .trace
            .iter()
            .map(|s| format!("{s:.4}"))
            .collect::<Vec<_>>()
            .join(";");
        self.inner.write_row([
            result.seed.reaction.to_string(),
            result.seed.joined_fragment_ids(),
            result.seed.structure.clone(),
            format!("{:.4}", result.seed.score),
            result.best.joined_fragment_ids(),
            result.best.structure.clone(),
            format!("{:.4}", result.best.score),
            result.rounds.to_string(),
            result.termination.as_str().to_string(),
            trace,
        ])
    }

    pub fn finish(self) -> Result<Vec<PathBuf>, WriterError> {
        self.inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::assembly::{SeedAssembly, Termination};
    use crate::core::models::fragment::FragmentRecord;
    use crate::core::models::ids::FragType;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn result_rows_carry_seed_best_and_trace() {
        let seed = SeedAssembly {
            reaction: "R1".into(),
            choices: vec![FragmentRecord::new(FragType::new("R1", 0), "a", "1C")],
            structure: "C".to_string(),
            score: 0.25,
        };
        let mut best = seed.clone();
        best.choices[0] = FragmentRecord::new(FragType::new("R1", 0), "b", "1N");
        best.structure = "N".to_string();
        best.score = 0.5;
        let result = OptimizationResult {
            seed,
            best,
            trace: vec![0.25, 0.5, 0.5],
            rounds: 2,
            termination: Termination::Converged,
            evaluated: 7,
        };

        let dir = tempdir().unwrap();
        let base = dir.path().join("opt.tsv");
        let writer = OptimizationResultWriter::create(&base, 0).unwrap();
        writer.write_result(&result).unwrap();
        writer.finish().unwrap();

        let content = fs::read_to_string(base).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "R1\ta\tC\t0.2500\tb\tN\t0.5000\t2\tconverged\t0.2500;0.5000;0.5000"
        );
    }
}
