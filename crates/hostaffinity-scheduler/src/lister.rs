use crate::error::{Result, SchedulerError};
use crate::traits::PodLister;
use hostaffinity_core::{pod_labels, pod_name, LabelMatcher, Pod};
use std::sync::RwLock;
use tracing::debug;

/// Pod lister over an in-memory pod list
///
/// Pods are keyed by `namespace/name`; `upsert` replaces an existing entry
/// in place so listing order stays stable.
#[derive(Debug, Default)]
pub struct InMemoryPodLister {
    pods: RwLock<Vec<Pod>>,
}

impl InMemoryPodLister {
    pub fn new(pods: Vec<Pod>) -> Self {
        Self {
            pods: RwLock::new(pods),
        }
    }

    /// Insert a pod, replacing any pod with the same namespace and name
    pub fn upsert(&self, pod: Pod) -> Result<()> {
        let mut pods = self.pods.write().map_err(|_| poisoned())?;
        let key = pod_name(&pod);
        match pods.iter_mut().find(|p| pod_name(p) == key) {
            Some(existing) => *existing = pod,
            None => pods.push(pod),
        }
        debug!("Pod {} stored", key);
        Ok(())
    }

    /// Remove a pod, returning it if it was present
    pub fn remove(&self, namespace: &str, name: &str) -> Result<Option<Pod>> {
        let mut pods = self.pods.write().map_err(|_| poisoned())?;
        let key = format!("{}/{}", namespace, name);
        let removed = pods
            .iter()
            .position(|p| pod_name(p) == key)
            .map(|idx| pods.remove(idx));
        Ok(removed)
    }

    /// Number of stored pods
    pub fn len(&self) -> Result<usize> {
        let pods = self.pods.read().map_err(|_| poisoned())?;
        Ok(pods.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        let pods = self.pods.read().map_err(|_| poisoned())?;
        Ok(pods.is_empty())
    }
}

impl PodLister for InMemoryPodLister {
    fn list_pods(&self, selector: &dyn LabelMatcher) -> Result<Vec<Pod>> {
        let pods = self.pods.read().map_err(|_| poisoned())?;
        Ok(pods
            .iter()
            .filter(|p| selector.matches(pod_labels(p)))
            .cloned()
            .collect())
    }
}

fn poisoned() -> SchedulerError {
    SchedulerError::discovery("in-memory pod store lock poisoned", None)
}
