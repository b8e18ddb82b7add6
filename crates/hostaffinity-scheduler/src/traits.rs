use crate::error::Result;
use hostaffinity_core::{LabelMatcher, Pod};

/// Source of cluster-wide pod state
///
/// Implementations are shared across concurrent filter invocations and
/// must be safe for concurrent reads.
pub trait PodLister: Send + Sync {
    /// Every pod whose labels satisfy `selector`
    ///
    /// An empty conjunction is a valid selector and matches every pod.
    fn list_pods(&self, selector: &dyn LabelMatcher) -> Result<Vec<Pod>>;
}

/// Node to physical host topology
///
/// A node belongs to exactly one host at any instant.
pub trait HostCache: Send + Sync {
    /// Host owning `node`, or `None` when the node is unknown
    fn host_of(&self, node: &str) -> Option<String>;

    /// Every node on `host`; empty for an unknown host
    fn nodes_of(&self, host: &str) -> Vec<String>;
}
