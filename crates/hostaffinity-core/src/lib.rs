//! Hostaffinity Core - Shared types for host-scoped pod affinity
//!
//! This crate provides:
//! - Label selector conversion and evaluation
//! - Pod and node accessors used by scheduling filters
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod error;
pub mod labels;
pub mod pod;

// Re-export commonly used types
pub use error::{HostAffinityError, Result};
pub use labels::{label_selector_as_selector, LabelMatcher, Labels, Operator, Requirement, Selector};
pub use pod::{
    assigned_node, node_name, pod_labels, pod_name, required_affinity_terms, HOST_LABEL,
    HOST_TOPOLOGY_KEY,
};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod, PodAffinityTerm};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

/// Serialize a resource to JSON
pub fn to_json<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_json::to_string(resource).map_err(|e| {
        HostAffinityError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        HostAffinityError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        HostAffinityError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}
