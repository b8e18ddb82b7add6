// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use hostaffinity_core::HostAffinityError;
use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// A required affinity term carries a malformed label selector
    #[error("Invalid label selector in affinity term {term_index} of pod {pod_name}")]
    #[diagnostic(
        code(scheduler::invalid_selector),
        help("Fix the labelSelector of the pod's requiredDuringSchedulingIgnoredDuringExecution terms")
    )]
    InvalidSelector {
        pod_name: String,
        term_index: usize,
        #[source]
        source: HostAffinityError,
    },

    /// The pod lister could not answer
    #[error("Pod discovery failed: {message}")]
    #[diagnostic(
        code(scheduler::discovery_failed),
        help("Check that the pod store backing the lister is reachable")
    )]
    Discovery {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A cluster snapshot could not be read
    #[error("Failed to read cluster snapshot {path}")]
    #[diagnostic(
        code(scheduler::snapshot_load),
        help("Verify the snapshot path exists and is readable")
    )]
    SnapshotLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Core error
    #[error("Core error: {0}")]
    #[diagnostic(
        code(scheduler::core_error),
        help("The document could not be decoded into Kubernetes objects")
    )]
    CoreError(#[from] HostAffinityError),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create an InvalidSelector error
    pub fn invalid_selector(
        pod_name: impl Into<String>,
        term_index: usize,
        source: HostAffinityError,
    ) -> Self {
        Self::InvalidSelector {
            pod_name: pod_name.into(),
            term_index,
            source,
        }
    }

    /// Create a Discovery error
    pub fn discovery(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Discovery {
            message: message.into(),
            source,
        }
    }

    /// Create a SnapshotLoad error
    pub fn snapshot_load(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::SnapshotLoad {
            path: path.into(),
            source,
        }
    }
}
