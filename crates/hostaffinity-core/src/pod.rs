use crate::labels::Labels;
use k8s_openapi::api::core::v1::{Node, Pod, PodAffinityTerm};
use std::sync::OnceLock;

/// Topology key scoping an affinity term to the physical host
pub const HOST_TOPOLOGY_KEY: &str = "host";

/// Node label carrying the name of the physical host a node runs on
pub const HOST_LABEL: &str = HOST_TOPOLOGY_KEY;

fn empty_labels() -> &'static Labels {
    static EMPTY: OnceLock<Labels> = OnceLock::new();
    EMPTY.get_or_init(Labels::new)
}

/// `namespace/name` of a pod, for logs and lookups
///
/// A pod without a namespace lives in `default`; a missing name reads `unknown`.
pub fn pod_name(pod: &Pod) -> String {
    format!(
        "{}/{}",
        pod.metadata.namespace.as_deref().unwrap_or("default"),
        pod.metadata.name.as_deref().unwrap_or("unknown")
    )
}

/// Node the pod is bound to; an empty `nodeName` counts as unscheduled
pub fn assigned_node(pod: &Pod) -> Option<&str> {
    pod.spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .filter(|n| !n.is_empty())
}

pub fn pod_labels(pod: &Pod) -> &Labels {
    pod.metadata.labels.as_ref().unwrap_or_else(|| empty_labels())
}

/// Required pod-affinity terms, or `None` when the pod declares none
pub fn required_affinity_terms(pod: &Pod) -> Option<&[PodAffinityTerm]> {
    pod.spec
        .as_ref()?
        .affinity
        .as_ref()?
        .pod_affinity
        .as_ref()?
        .required_during_scheduling_ignored_during_execution
        .as_deref()
}

pub fn node_name(node: &Node) -> Option<&str> {
    node.metadata.name.as_deref()
}
