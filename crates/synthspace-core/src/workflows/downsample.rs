use crate::core::chem::ChemToolkit;
use crate::core::io::store_file::StoreFile;
use crate::core::store::FragmentStore;
use crate::engine::config::DownsampleConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::downsample::{self, DownsampleOutcome};
use std::path::Path;
use tracing::{info, instrument};

/// Reads a store from `input`, reduces every position to representative
/// synthons and writes the result, with its provenance headers, to `output`.
#[instrument(skip_all, name = "downsample_workflow", fields(input = %input.display(), output = %output.display()))]
pub fn run<T: ChemToolkit>(
    toolkit: &T,
    input: &Path,
    output: &Path,
    config: &DownsampleConfig,
    reporter: &ProgressReporter,
) -> Result<DownsampleOutcome, EngineError> {
    // === Phase 1: Load ===
    reporter.report(Progress::PhaseStart {
        name: "Loading Store",
    });
    let store = FragmentStore::read_from_path(input)?;
    info!(
        reactions = store.reaction_count(),
        records = store.record_count(),
        "Store loaded."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Downsample ===
    reporter.report(Progress::PhaseStart {
        name: "Downsampling",
    });
    let outcome = downsample::run(toolkit, &store, config)?;
    for (reaction, counts) in &outcome.per_reaction {
        reporter.report(Progress::JobFinished {
            label: reaction.to_string(),
            accepted: counts.retained,
        });
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Persist ===
    reporter.report(Progress::PhaseStart {
        name: "Writing Store",
    });
    outcome.store.write_to_path(output)?;
    reporter.report(Progress::PhaseFinish);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ReactionId;
    use crate::core::store::DownsampledStore;
    use crate::engine::config::DownsampleConfigBuilder;
    use crate::engine::stats::DownsampleCounts;
    use crate::engine::tasks::seed_finder;
    use crate::testing::{ChainToolkit, store};
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn config() -> DownsampleConfig {
        DownsampleConfigBuilder::new()
            .max_centers(10)
            .min_similarity(0.9)
            .random_seed(3)
            .build()
            .unwrap()
    }

    #[test]
    fn downsampled_store_is_written_with_provenance() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("space.tsv");
        let output = dir.path().join("reduced.tsv");
        store(&[
            ("R1", 0, &["1CC", "1CC", "1NO"]),
            ("R1", 1, &["1S", "bad!"]),
        ])
        .write_to_path(&input)
        .unwrap();

        let labels = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::JobFinished { label, accepted } = event {
                labels.lock().unwrap().push((label, accepted));
            }
        }));
        let outcome = run(&ChainToolkit, &input, &output, &config(), &reporter).unwrap();
        drop(reporter);

        assert_eq!(
            outcome.totals,
            DownsampleCounts {
                original: 5,
                retained: 3,
                discarded: 2,
                unparsable: 1,
            }
        );
        assert_eq!(labels.into_inner().unwrap(), vec![("R1".to_string(), 3)]);

        let reread = DownsampledStore::read_from_path(&output).unwrap();
        assert_eq!(reread.algorithm(), downsample::ALGORITHM_NAME);
        assert!((reread.min_similarity() - 0.9).abs() < 1e-12);
        assert_eq!(reread.store().record_count(), 3);
    }

    #[test]
    fn emptied_positions_keep_their_reaction_eligible_after_reload() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("space.tsv");
        let output = dir.path().join("reduced.tsv");
        store(&[("R1", 0, &["bad!", "worse!"]), ("R1", 1, &["1S"])])
            .write_to_path(&input)
            .unwrap();

        let outcome = run(&ChainToolkit, &input, &output, &config(), &ProgressReporter::new()).unwrap();
        let r1 = ReactionId::new("R1");
        assert_eq!(outcome.store.store().positions(&r1), vec![0, 1]);

        let reread = DownsampledStore::read_from_path(&output).unwrap();
        assert_eq!(reread.store().positions(&r1), vec![0, 1]);
        assert_eq!(seed_finder::eligible_reactions(reread.store()), vec![r1]);
    }

    #[test]
    fn missing_input_is_a_store_error() {
        let dir = tempdir().unwrap();
        let err = run(
            &ChainToolkit,
            &dir.path().join("absent.tsv"),
            &dir.path().join("out.tsv"),
            &config(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Store { .. }));
        assert!(!dir.path().join("out.tsv").exists());
    }
}
