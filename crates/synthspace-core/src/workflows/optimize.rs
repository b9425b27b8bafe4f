use crate::core::chem::{ChemToolkit, describe_shape};
use crate::core::io::result_writer::OptimizationResultWriter;
use crate::core::models::assembly::{OptimizationResult, SeedAssembly};
use crate::core::store::FragmentStore;
use crate::engine::config::OptimizationRequest;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scheduler::{JobContext, ResultSink, Scheduler};
use crate::engine::tasks::beam_search::{self, AssemblyScorer, NeighborSource, ShapeScorer, SimilarityNeighbors};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub seeds: usize,
    pub completed: usize,
    /// Seeds whose best assembly scored strictly higher than the seed.
    pub improved: usize,
    pub best_score: Option<f64>,
}

/// Refines every seed independently and hands each result to `sink` as soon
/// as its job finishes.
#[instrument(skip_all, name = "optimize_batch_workflow", fields(seeds = seeds.len(), threads = threads))]
pub fn run_batch<S, N, K>(
    seeds: Vec<SeedAssembly>,
    scorer: &S,
    neighbors: &N,
    request: &OptimizationRequest,
    threads: usize,
    sink: &mut K,
    reporter: &ProgressReporter,
) -> Result<BatchSummary, EngineError>
where
    S: AssemblyScorer + ?Sized,
    N: NeighborSource + ?Sized,
    K: ResultSink<OptimizationResult>,
{
    let scheduler = Scheduler::new(threads)?;
    let mut summary = BatchSummary {
        seeds: seeds.len(),
        ..Default::default()
    };

    reporter.report(Progress::PhaseStart {
        name: "Beam Optimization",
    });
    reporter.report(Progress::TaskStart {
        total: seeds.len() as u64,
    });

    let mut forward = |job: usize, result: OptimizationResult| -> Result<(), EngineError> {
        summary.completed += 1;
        if result.improvement() > 0.0 {
            summary.improved += 1;
        }
        summary.best_score = Some(
            summary
                .best_score
                .map_or(result.best.score, |b| b.max(result.best.score)),
        );
        reporter.report(Progress::JobFinished {
            label: result.best.structure.clone(),
            accepted: result.rounds,
        });
        reporter.report(Progress::TaskIncrement);
        sink.accept(job, result)
    };
    let outcome = scheduler.run(
        seeds,
        |seed: SeedAssembly, ctx: &JobContext| beam_search::optimize(seed, scorer, neighbors, request, ctx),
        &mut forward,
    );
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    outcome?;

    info!(
        completed = summary.completed,
        improved = summary.improved,
        best = ?summary.best_score,
        "Batch optimization finished."
    );
    Ok(summary)
}

/// Refines seeds against a query shape and writes one row per seed to `output`.
///
/// Uses a cached [`ShapeScorer`] and [`SimilarityNeighbors`] over `store`.
#[instrument(skip_all, name = "optimize_workflow")]
pub fn run<T: ChemToolkit>(
    toolkit: &T,
    store: &FragmentStore,
    query: &str,
    seeds: Vec<SeedAssembly>,
    request: &OptimizationRequest,
    threads: usize,
    output: &Path,
    reporter: &ProgressReporter,
) -> Result<(BatchSummary, Vec<PathBuf>), EngineError> {
    let molecule = toolkit
        .parse_structure(query)
        .map_err(|source| EngineError::Query { source })?;
    let descriptor = describe_shape(toolkit, &molecule, request.conformers)
        .map_err(|source| EngineError::Query { source })?;

    let scorer = ShapeScorer::new(toolkit, descriptor, request.conformers).with_cache();
    let neighbors = SimilarityNeighbors::new(toolkit, store);
    let writer = OptimizationResultWriter::create(output, 0)?;

    let mut persist = |_: usize, result: OptimizationResult| -> Result<(), EngineError> {
        writer.write_result(&result)?;
        Ok(())
    };
    let summary = run_batch(seeds, &scorer, &neighbors, request, threads, &mut persist, reporter)?;
    let files = writer.finish()?;
    Ok((summary, files))
}
