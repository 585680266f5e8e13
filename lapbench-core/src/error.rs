//! Error Types

use crate::param::ParamError;
use lapbench_stats::StatsError;
use thiserror::Error;

/// Boxed user error returned by a workload
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of the user workload on one worker thread
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The workload returned an error
    #[error("{0}")]
    Failed(#[source] BoxError),

    /// The workload panicked
    #[error("Workload panicked: {0}")]
    Panicked(String),
}

impl WorkloadError {
    /// Build from a `catch_unwind` payload
    pub(crate) fn from_panic(panic: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Self::Panicked(message)
    }

    /// The user's error, if the workload returned one
    pub fn user_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Failed(err) => Some(err.as_ref()),
            Self::Panicked(_) => None,
        }
    }
}

/// Errors from the measurement engine
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid thread, sample, warm-up or iteration counts
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Statistics could not be computed
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// Parameter lookup failed
    #[error(transparent)]
    Param(#[from] ParamError),

    /// The case returned without measuring anything
    #[error("No measurement performed in `{case}`")]
    NoMeasurementPerformed {
        /// Case name (`group/name`)
        case: String,
    },

    /// The workload failed on a worker thread
    #[error("Workload failed on thread {thread_index}: {source}")]
    Workload {
        /// First failing thread, by index
        thread_index: usize,
        /// What went wrong
        #[source]
        source: WorkloadError,
    },
}

impl Error {
    /// Downcast the user's workload error to a concrete type
    pub fn downcast_workload_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Workload { source, .. } => source.user_error()?.downcast_ref::<E>(),
            _ => None,
        }
    }
}
