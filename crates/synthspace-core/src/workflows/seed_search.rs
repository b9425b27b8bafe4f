use crate::core::chem::{ChemToolkit, describe_shape};
use crate::core::io::hit_writer::SeedHitWriter;
use crate::core::models::ids::ReactionId;
use crate::core::store::FragmentStore;
use crate::engine::config::SeedFinderConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scheduler::{CollectOrder, JobContext, Scheduler};
use crate::engine::stats::SeedStats;
use crate::engine::tasks::seed_finder::{self, ReactionSeeds};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

/// What a seed search did, including when it was cut short.
#[derive(Debug, Default)]
pub struct SeedSearchReport {
    pub totals: SeedStats,
    pub per_reaction: BTreeMap<ReactionId, SeedStats>,
    /// Reactions abandoned because a position had no usable record.
    pub exhausted: Vec<ReactionId>,
    pub hits_written: usize,
    pub files: Vec<PathBuf>,
    /// The failure that stopped the run; everything above still describes the
    /// work committed before it.
    pub error: Option<EngineError>,
}

impl SeedSearchReport {
    fn record(&mut self, seeds: &ReactionSeeds) {
        self.totals += seeds.stats;
        self.per_reaction.insert(seeds.reaction.clone(), seeds.stats);
        if seeds.exhausted {
            self.exhausted.push(seeds.reaction.clone());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Searches every eligible reaction for shape-similar products of `query`
/// and streams accepted hits to `output`.
///
/// Reactions run in parallel on `num_threads` workers. Their results are
/// committed in reaction order, so the hit file is identical for identical
/// inputs regardless of the thread count.
///
/// # Errors
///
/// Fails up front when the query cannot be described or the output cannot be
/// created. Failures after that point stop the run and are returned inside the
/// report, next to the statistics of every reaction committed so far.
#[instrument(skip_all, name = "seed_search_workflow", fields(reactions = store.reaction_count(), threads = config.num_threads))]
pub fn run<T: ChemToolkit>(
    toolkit: &T,
    store: &FragmentStore,
    query: &str,
    config: &SeedFinderConfig,
    output: &Path,
    reporter: &ProgressReporter,
) -> Result<SeedSearchReport, EngineError> {
    // === Phase 1: Query preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparing Query",
    });
    let molecule = toolkit
        .parse_structure(query)
        .map_err(|source| EngineError::Query { source })?;
    let descriptor = describe_shape(toolkit, &molecule, config.conformers)
        .map_err(|source| EngineError::Query { source })?;
    let writer = SeedHitWriter::create(output, config.max_hits_per_file)?;
    let scheduler = Scheduler::new(config.num_threads)?.with_order(CollectOrder::Submission);
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Random assembly per reaction ===
    let reactions = seed_finder::eligible_reactions(store);
    info!(
        eligible = reactions.len(),
        attempts_per_reaction = config.attempts_per_reaction,
        "Starting seed search."
    );
    reporter.report(Progress::PhaseStart {
        name: "Seed Search",
    });
    reporter.report(Progress::TaskStart {
        total: reactions.len() as u64,
    });

    let mut report = SeedSearchReport::default();
    let mut commit = |_: usize, seeds: ReactionSeeds| -> Result<(), EngineError> {
        for hit in &seeds.hits {
            writer.write_hit(hit)?;
        }
        report.record(&seeds);
        reporter.report(Progress::JobFinished {
            label: seeds.reaction.to_string(),
            accepted: seeds.hits.len(),
        });
        reporter.report(Progress::TaskIncrement);
        Ok(())
    };
    let outcome = scheduler.run(
        reactions,
        |reaction: ReactionId, ctx: &JobContext| {
            seed_finder::run_reaction(toolkit, store, &reaction, &descriptor, config, ctx)
        },
        &mut commit,
    );
    reporter.report(Progress::TaskFinish);

    if let Err(e) = outcome {
        error!("Seed search stopped early: {}", e);
        report.error = Some(e);
    }

    report.hits_written = writer.hits_written();
    match writer.finish() {
        Ok(files) => report.files = files,
        Err(e) => {
            error!("Failed to finalize hit files: {}", e);
            report.error.get_or_insert(e.into());
        }
    }
    reporter.report(Progress::PhaseFinish);

    info!(
        attempts = report.totals.attempts,
        assemblies = report.totals.assemblies,
        threshold_passes = report.totals.threshold_passes,
        descriptor_evaluations = report.totals.descriptor_evaluations,
        hits = report.totals.hits,
        files = report.files.len(),
        "Seed search finished."
    );
    Ok(report)
}
