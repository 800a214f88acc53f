// Test executor: one isolated worker per statistical test
//
// Some tests loop over the integral or expand slowly converging series, and a
// pathological pair can keep them busy far longer than a dashboard request can
// wait. Each test therefore runs on its own thread with its own deadline:
//
//   compare() ─┬─ dispatch chisq ──► worker ──► channel ─┐
//              ├─ dispatch KS    ──► worker ──► channel ─┼─► collect (per-test deadline)
//              └─ dispatch AD    ──► worker ──► channel ─┘
//
// A test that errors, panics, misses its deadline, or returns a non-finite
// value is recorded as a failure for that key only. The pool lives for a
// single comparison; dropping it joins finished workers and detaches the
// ones still running, whose results are discarded.

use crate::comparison::config::CompareOptions;
use crate::comparison::result::{ComparisonResult, TestOutcome};
use crate::metrics::{Budget, StatTest, TestStatistic};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Slack allowed on p-values that drift outside [0, 1] through rounding
const PVALUE_TOLERANCE: f64 = 1e-9;

type WorkerOutcome = Result<TestStatistic, String>;

/// Runs a battery of tests against one pair of bin sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    short_timeout: Duration,
    long_timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::from_options(&CompareOptions::default())
    }
}

impl Executor {
    pub fn from_options(options: &CompareOptions) -> Self {
        Self {
            short_timeout: options.timeout_for(Budget::Short),
            long_timeout: options.timeout_for(Budget::Long),
        }
    }

    pub fn with_timeouts(short_timeout: Duration, long_timeout: Duration) -> Self {
        Self {
            short_timeout,
            long_timeout,
        }
    }

    pub fn timeout_for(&self, budget: Budget) -> Duration {
        match budget {
            Budget::Short => self.short_timeout,
            Budget::Long => self.long_timeout,
        }
    }

    /// Run every test in `battery` and merge the outcomes by test name
    ///
    /// Never fails: problems in individual tests become failure records.
    pub fn run(
        &self,
        battery: &[Arc<dyn StatTest>],
        left: &[f64],
        right: &[f64],
    ) -> ComparisonResult {
        let mut pool = WorkerPool::new(left, right);
        for test in battery {
            pool.dispatch(Arc::clone(test), self.timeout_for(test.budget()));
        }
        pool.collect()
    }
}

struct Worker {
    name: String,
    timeout: Duration,
    deadline: Instant,
    receiver: Receiver<WorkerOutcome>,
    handle: Option<JoinHandle<()>>,
}

/// Worker threads scoped to a single comparison
struct WorkerPool {
    samples: Arc<(Vec<f64>, Vec<f64>)>,
    workers: Vec<Worker>,
    spawn_failures: Vec<(String, String)>,
}

impl WorkerPool {
    fn new(left: &[f64], right: &[f64]) -> Self {
        Self {
            samples: Arc::new((left.to_vec(), right.to_vec())),
            workers: Vec::new(),
            spawn_failures: Vec::new(),
        }
    }

    fn dispatch(&mut self, test: Arc<dyn StatTest>, timeout: Duration) {
        let name = test.name().to_string();
        let (sender, receiver) = channel::bounded(1);
        let samples = Arc::clone(&self.samples);

        tracing::debug!("Dispatching {} with a {:?} budget", name, timeout);

        let spawned = thread::Builder::new()
            .name(format!("histcmp-{}", name))
            .spawn(move || {
                let (left, right) = &*samples;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| test.evaluate(left, right)));
                let message = match outcome {
                    Ok(Ok(statistic)) => Ok(statistic),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
                };
                // The receiver is gone once the deadline passed
                let _ = sender.send(message);
            });

        match spawned {
            Ok(handle) => self.workers.push(Worker {
                name,
                timeout,
                deadline: Instant::now() + timeout,
                receiver,
                handle: Some(handle),
            }),
            Err(e) => {
                tracing::warn!("Failed to spawn worker for {}: {}", name, e);
                self.spawn_failures
                    .push((name, format!("failed to spawn worker: {}", e)));
            }
        }
    }

    fn collect(mut self) -> ComparisonResult {
        let mut result = ComparisonResult::new();

        for (name, error) in self.spawn_failures.drain(..) {
            result.insert(name, TestOutcome::failure(error));
        }

        for worker in &self.workers {
            let outcome = match worker.receiver.recv_deadline(worker.deadline) {
                Ok(Ok(statistic)) => checked_outcome(statistic),
                Ok(Err(error)) => TestOutcome::failure(error),
                Err(RecvTimeoutError::Timeout) => {
                    TestOutcome::failure(format!("timed out after {:?}", worker.timeout))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    TestOutcome::failure("worker exited without a result")
                }
            };

            if let Some(error) = &outcome.error {
                tracing::warn!("Test {} failed: {}", worker.name, error);
            }
            result.insert(worker.name.clone(), outcome);
        }

        result
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            let Some(handle) = worker.handle.take() else {
                continue;
            };
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::debug!("Detaching unfinished worker for {}", worker.name);
            }
        }
    }
}

/// Reject results that cannot be reported as a statistic and p-value
fn checked_outcome(statistic: TestStatistic) -> TestOutcome {
    let TestStatistic { statistic, pvalue } = statistic;

    if !statistic.is_finite() || !pvalue.is_finite() {
        return TestOutcome::failure(format!(
            "non-finite result (T={}, pvalue={})",
            statistic, pvalue
        ));
    }

    if !(-PVALUE_TOLERANCE..=1.0 + PVALUE_TOLERANCE).contains(&pvalue) {
        return TestOutcome::failure(format!("p-value {} outside [0, 1]", pvalue));
    }

    TestOutcome::success(statistic, pvalue.clamp(0.0, 1.0))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
