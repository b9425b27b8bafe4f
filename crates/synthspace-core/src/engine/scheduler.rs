use crate::engine::error::EngineError;
use crossbeam_channel::{Receiver, unbounded};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, instrument};

/// Order in which finished results are handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectOrder {
    /// As soon as a job finishes.
    #[default]
    Completion,
    /// In submission order. Jobs still finish in any order; early finishers
    /// are held back until every job before them has been delivered.
    Submission,
}

/// Receives results on the collector thread, one at a time.
pub trait ResultSink<R> {
    fn accept(&mut self, job: usize, result: R) -> Result<(), EngineError>;
}

impl<R, F> ResultSink<R> for F
where
    F: FnMut(usize, R) -> Result<(), EngineError>,
{
    fn accept(&mut self, job: usize, result: R) -> Result<(), EngineError> {
        self(job, result)
    }
}

/// Handle passed to every job so long-running work can stop early once the
/// run has been aborted.
pub struct JobContext<'a> {
    pub index: usize,
    cancelled: &'a AtomicBool,
}

static NEVER_CANCELLED: AtomicBool = AtomicBool::new(false);

impl JobContext<'static> {
    /// A context for running a task outside any scheduler; never cancelled.
    pub fn standalone(index: usize) -> Self {
        Self {
            index,
            cancelled: &NEVER_CANCELLED,
        }
    }
}

impl JobContext<'_> {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub delivered: usize,
}

enum JobOutcome<R> {
    Done(R),
    Failed(EngineError),
    Panicked(String),
    Skipped,
}

/// Runs independent jobs on a fixed-size pool owned by one run.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    threads: usize,
    order: CollectOrder,
}

impl Scheduler {
    pub fn new(threads: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("synthspace-worker-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool,
            threads,
            order: CollectOrder::default(),
        })
    }

    pub fn with_order(mut self, order: CollectOrder) -> Self {
        self.order = order;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Submits every job, then collects results on the calling thread.
    ///
    /// The first failing or panicking job aborts the run: queued jobs are
    /// skipped, running jobs observe [`JobContext::is_cancelled`], and the
    /// failure is returned wrapped in [`EngineError::JobFailed`] or
    /// [`EngineError::JobPanicked`]. Results already finished but still held
    /// back for submission order are delivered before the error is returned.
    /// A sink error aborts the run the same way and is returned unchanged.
    /// Whatever the sink accepted before the abort stays accepted.
    #[instrument(skip_all, name = "scheduler_run", fields(jobs = jobs.len(), threads = self.threads))]
    pub fn run<J, R, F, S>(&self, jobs: Vec<J>, work: F, sink: &mut S) -> Result<RunSummary, EngineError>
    where
        J: Send,
        R: Send,
        F: Fn(J, &JobContext) -> Result<R, EngineError> + Sync,
        S: ResultSink<R>,
    {
        let total = jobs.len();
        let cancelled = AtomicBool::new(false);
        let (tx, rx) = unbounded::<(usize, JobOutcome<R>)>();
        let work = &work;
        let cancelled_ref = &cancelled;

        self.pool.in_place_scope(|scope| {
            for (index, job) in jobs.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = if cancelled_ref.load(Ordering::Acquire) {
                        JobOutcome::Skipped
                    } else {
                        let ctx = JobContext {
                            index,
                            cancelled: cancelled_ref,
                        };
                        match panic::catch_unwind(AssertUnwindSafe(|| work(job, &ctx))) {
                            Ok(Ok(result)) => JobOutcome::Done(result),
                            Ok(Err(e)) => JobOutcome::Failed(e),
                            Err(payload) => JobOutcome::Panicked(panic_message(payload)),
                        }
                    };
                    // The collector may already have given up; nothing to do then.
                    let _ = tx.send((index, outcome));
                });
            }
            drop(tx);
            self.collect(total, &rx, cancelled_ref, sink)
        })
    }

    fn collect<R, S>(
        &self,
        total: usize,
        rx: &Receiver<(usize, JobOutcome<R>)>,
        cancelled: &AtomicBool,
        sink: &mut S,
    ) -> Result<RunSummary, EngineError>
    where
        S: ResultSink<R>,
    {
        let abort = |e: EngineError| {
            cancelled.store(true, Ordering::Release);
            error!("Aborting run: {}", e);
            e
        };

        let mut summary = RunSummary {
            submitted: total,
            delivered: 0,
        };
        let mut held_back: BTreeMap<usize, R> = BTreeMap::new();
        let mut next_in_order = 0;

        for _ in 0..total {
            let Ok((index, outcome)) = rx.recv() else {
                let e = abort(EngineError::Cancelled);
                flush_held_back(&mut held_back, sink);
                return Err(e);
            };
            let failure = match outcome {
                JobOutcome::Done(result) => {
                    match self.order {
                        CollectOrder::Completion => {
                            sink.accept(index, result).map_err(abort)?;
                            summary.delivered += 1;
                        }
                        CollectOrder::Submission => {
                            held_back.insert(index, result);
                            while let Some(result) = held_back.remove(&next_in_order) {
                                sink.accept(next_in_order, result).map_err(abort)?;
                                summary.delivered += 1;
                                next_in_order += 1;
                            }
                        }
                    }
                    continue;
                }
                JobOutcome::Failed(e) => EngineError::JobFailed {
                    job: index,
                    source: Box::new(e),
                },
                JobOutcome::Panicked(message) => EngineError::JobPanicked { job: index, message },
                JobOutcome::Skipped => EngineError::Cancelled,
            };
            let e = abort(failure);
            flush_held_back(&mut held_back, sink);
            return Err(e);
        }

        debug!(delivered = summary.delivered, "All jobs collected.");
        Ok(summary)
    }
}

/// Hands results that finished but were waiting for an earlier job to the
/// sink, in submission order, so an aborted run keeps all completed work.
fn flush_held_back<R, S: ResultSink<R>>(held_back: &mut BTreeMap<usize, R>, sink: &mut S) {
    for (index, result) in std::mem::take(held_back) {
        if let Err(e) = sink.accept(index, result) {
            error!(job = index, "Could not deliver a completed result: {}", e);
            break;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn every_result_is_delivered_exactly_once() {
        let scheduler = Scheduler::new(4).unwrap();
        let mut seen = Vec::new();
        let mut sink = |job: usize, value: usize| -> Result<(), EngineError> {
            assert_eq!(value, job * 2);
            seen.push(job);
            Ok(())
        };
        let summary = scheduler
            .run((0..64).collect(), |j: usize, _| Ok(j * 2), &mut sink)
            .unwrap();
        assert_eq!(summary, RunSummary { submitted: 64, delivered: 64 });
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn submission_order_is_restored_when_requested() {
        let scheduler = Scheduler::new(4).unwrap().with_order(CollectOrder::Submission);
        let mut seen = Vec::new();
        let mut sink = |job: usize, _: ()| -> Result<(), EngineError> {
            seen.push(job);
            Ok(())
        };
        scheduler
            .run(
                (0..16u64).collect(),
                |j: u64, _| {
                    std::thread::sleep(Duration::from_millis((16 - j) % 5));
                    Ok(())
                },
                &mut sink,
            )
            .unwrap();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn empty_job_list_completes_immediately() {
        let scheduler = Scheduler::new(2).unwrap();
        let mut sink = |_: usize, _: ()| -> Result<(), EngineError> { Ok(()) };
        let summary = scheduler
            .run(Vec::<()>::new(), |_, _| Ok(()), &mut sink)
            .unwrap();
        assert_eq!(summary.delivered, 0);
    }

    #[test]
    fn a_failing_job_aborts_the_run_and_skips_queued_work() {
        let scheduler = Scheduler::new(2).unwrap();
        let executed = AtomicUsize::new(0);
        let mut delivered = 0;
        let mut sink = |_: usize, _: ()| -> Result<(), EngineError> {
            delivered += 1;
            Ok(())
        };
        let err = scheduler
            .run(
                (0..200usize).collect(),
                |j, ctx| {
                    executed.fetch_add(1, Ordering::SeqCst);
                    if j == 0 {
                        return Err(EngineError::Internal("boom".to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(2));
                    if ctx.is_cancelled() {
                        return Err(EngineError::Cancelled);
                    }
                    Ok(())
                },
                &mut sink,
            )
            .unwrap_err();
        match err {
            EngineError::JobFailed { job, source } => {
                assert_eq!(job, 0);
                assert!(matches!(*source, EngineError::Internal(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(executed.load(Ordering::SeqCst) < 200);
        assert!(delivered < 200);
    }

    #[test]
    fn panics_are_reported_as_job_panics() {
        let scheduler = Scheduler::new(2).unwrap();
        let mut sink = |_: usize, _: ()| -> Result<(), EngineError> { Ok(()) };
        let err = scheduler
            .run(
                vec![1, 2, 3],
                |j: i32, _| {
                    if j == 2 {
                        panic!("job two exploded");
                    }
                    Ok(())
                },
                &mut sink,
            )
            .unwrap_err();
        match err {
            EngineError::JobPanicked { job, message } => {
                assert_eq!(job, 1);
                assert!(message.contains("exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn slow_failure_behind_fast_jobs(order: CollectOrder) -> (Vec<usize>, EngineError) {
        let scheduler = Scheduler::new(4).unwrap().with_order(order);
        let mut seen = Vec::new();
        let mut sink = |job: usize, _: ()| -> Result<(), EngineError> {
            seen.push(job);
            Ok(())
        };
        let err = scheduler
            .run(
                (0..4usize).collect(),
                |j, _| {
                    if j == 0 {
                        std::thread::sleep(Duration::from_millis(200));
                        return Err(EngineError::Internal("late failure".to_string()));
                    }
                    Ok(())
                },
                &mut sink,
            )
            .unwrap_err();
        (seen, err)
    }

    #[test]
    fn finished_results_survive_a_later_failure_in_completion_order() {
        let (mut seen, err) = slow_failure_behind_fast_jobs(CollectOrder::Completion);
        assert!(matches!(err, EngineError::JobFailed { job: 0, .. }));
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn held_back_results_are_flushed_when_an_earlier_job_fails() {
        let (seen, err) = slow_failure_behind_fast_jobs(CollectOrder::Submission);
        assert!(matches!(err, EngineError::JobFailed { job: 0, .. }));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn sink_failures_are_fatal_and_returned_as_is() {
        let scheduler = Scheduler::new(2).unwrap();
        let mut calls = 0;
        let mut sink = |_: usize, _: ()| -> Result<(), EngineError> {
            calls += 1;
            Err(EngineError::Internal("disk full".to_string()))
        };
        let err = scheduler
            .run(vec![(); 10], |_, _| Ok(()), &mut sink)
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(ref m) if m == "disk full"));
        assert_eq!(calls, 1);
    }
}
