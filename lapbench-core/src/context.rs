//! Invocation Context
//!
//! The handle a benchmark case receives for one invocation. It knows the plan
//! (threads, iterations, samples), gives access to the parameters, collects
//! custom outputs, and runs the workload through the invocation engine.
//!
//! The context is also published in a thread-local slot for code that cannot
//! take it as a parameter. The slot is only populated on the thread that runs
//! `BenchmarkCase::execute`, never on worker threads.

use crate::clock::Clock;
use crate::error::{BoxError, Error};
use crate::invoker::ThreadableInvoker;
use crate::param::{BenchmarkCondition, FromParamValue};
use lapbench_stats::{AnalysisType, CustomStatOutput, DurationMatrix};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Everything recorded during one invocation
#[derive(Debug)]
pub(crate) struct Recorded {
    pub durations: DurationMatrix,
    pub custom_stat_outputs: Vec<Arc<CustomStatOutput>>,
    pub custom_outputs: Vec<(String, f64)>,
}

#[derive(Default)]
struct State {
    durations: Option<DurationMatrix>,
    custom_stat_outputs: Vec<Arc<CustomStatOutput>>,
    custom_outputs: Vec<(String, f64)>,
}

struct Inner {
    condition: BenchmarkCondition,
    iterations: usize,
    samples: usize,
    warm_up_samples: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

/// Handle passed to `BenchmarkCase::execute`
///
/// Cloning is cheap; clones share the same recorded results.
#[derive(Clone)]
pub struct InvocationContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("condition", &self.inner.condition)
            .field("iterations", &self.inner.iterations)
            .field("samples", &self.inner.samples)
            .field("warm_up_samples", &self.inner.warm_up_samples)
            .finish_non_exhaustive()
    }
}

impl InvocationContext {
    /// Create a context for one invocation
    ///
    /// `samples` counts every sample round including the warm-up ones.
    pub fn new(
        condition: BenchmarkCondition,
        iterations: usize,
        samples: usize,
        warm_up_samples: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                condition,
                iterations,
                samples,
                warm_up_samples,
                clock,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.inner.condition.threads()
    }

    /// Workload calls per sample
    pub fn iterations(&self) -> usize {
        self.inner.iterations
    }

    /// Sample rounds including warm-up
    pub fn samples(&self) -> usize {
        self.inner.samples
    }

    /// Untimed leading sample rounds
    pub fn warm_up_samples(&self) -> usize {
        self.inner.warm_up_samples
    }

    /// Condition being measured
    pub fn condition(&self) -> &BenchmarkCondition {
        &self.inner.condition
    }

    /// Typed parameter lookup
    pub fn get_param<T: FromParamValue>(&self, name: &str) -> Result<T, Error> {
        Ok(self.inner.condition.params().get(name)?)
    }

    /// Declare a metric recorded per `(thread, sample)` inside the workload
    pub fn add_custom_stat(
        &self,
        name: impl Into<String>,
        analysis_type: AnalysisType,
    ) -> Arc<CustomStatOutput> {
        let output = Arc::new(CustomStatOutput::new(
            name,
            self.threads(),
            self.inner.samples,
            self.inner.warm_up_samples,
            self.inner.iterations,
            analysis_type,
        ));
        self.state().custom_stat_outputs.push(Arc::clone(&output));
        output
    }

    /// Record a plain named value reported without statistics
    pub fn add_custom_output(&self, name: impl Into<String>, value: f64) {
        self.state().custom_outputs.push((name.into(), value));
    }

    /// Run an infallible workload `work(thread_index, sample_index, iteration_index)`
    pub fn measure<F, R>(&self, work: F) -> Result<(), Error>
    where
        F: Fn(usize, usize, usize) -> R + Sync,
    {
        let durations = self.invoker()?.measure(self.inner.clock.as_ref(), work)?;
        self.store(durations);
        Ok(())
    }

    /// Run a fallible workload, surfacing the first worker failure
    pub fn try_measure<F, R, E>(&self, work: F) -> Result<(), Error>
    where
        F: Fn(usize, usize, usize) -> Result<R, E> + Sync,
        E: Into<BoxError>,
    {
        let durations = self
            .invoker()?
            .try_measure(self.inner.clock.as_ref(), work)?;
        self.store(durations);
        Ok(())
    }

    /// Take the recorded results; `None` if nothing was measured
    pub(crate) fn take_recorded(&self) -> Option<Recorded> {
        let mut state = self.state();
        let durations = state.durations.take()?;
        Some(Recorded {
            durations,
            custom_stat_outputs: std::mem::take(&mut state.custom_stat_outputs),
            custom_outputs: std::mem::take(&mut state.custom_outputs),
        })
    }

    fn invoker(&self) -> Result<ThreadableInvoker, Error> {
        ThreadableInvoker::new(
            self.threads(),
            self.inner.iterations,
            self.inner.samples,
            self.inner.warm_up_samples,
        )
    }

    fn store(&self, durations: DurationMatrix) {
        let mut state = self.state();
        if state.durations.is_some() {
            warn!("Workload measured more than once in one invocation; keeping the latest");
        }
        state.durations = Some(durations);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── Current context registry ────────────────────────────────────────────────

thread_local! {
    static CURRENT: RefCell<Option<InvocationContext>> = const { RefCell::new(None) };
}

/// The context of the invocation running on this thread, if any
pub fn current_invocation_context() -> Option<InvocationContext> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Publishes a context for the current thread until dropped
pub(crate) struct ContextGuard {
    // Must be dropped on the thread that installed it.
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub(crate) fn install(context: &InvocationContext) -> Self {
        // Replacing drops whatever a previous invocation left behind.
        CURRENT.with(|current| current.replace(Some(context.clone())));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|current| current.borrow_mut().take());
    }
}
