//! Hostaffinity Scheduler - Host-scoped pod affinity filtering
//!
//! This crate provides:
//! - The `Filter` seam used by the placement pipeline
//! - Required pod affinity at physical-host granularity
//! - Selector conjunctions handed to pod listers
//! - Pod lister and host topology seams with in-memory implementations
//! - Cluster snapshot loading

pub mod error;
pub mod filter;
pub mod lister;
pub mod selector;
pub mod snapshot;
pub mod topology;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, SchedulerError};
pub use filter::{Filter, PodAffinity, PodAffinityConfig};
pub use lister::InMemoryPodLister;
pub use selector::SelectorConjunction;
pub use snapshot::ClusterSnapshot;
pub use topology::TopologyCache;
pub use traits::{HostCache, PodLister};
