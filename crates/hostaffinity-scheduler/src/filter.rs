use crate::error::{Result, SchedulerError};
use crate::selector::SelectorConjunction;
use crate::traits::{HostCache, PodLister};
use hostaffinity_core::{
    assigned_node, label_selector_as_selector, pod_name, required_affinity_terms, Pod,
    PodAffinityTerm, HOST_TOPOLOGY_KEY,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Node filter in the placement pipeline
///
/// Given a pod and the candidate node names offered by the scheduler,
/// returns the candidates that remain eligible. The result is always a
/// subsequence of `nodes`. An error means no node is eligible for this
/// call; the caller decides whether to retry.
pub trait Filter: Send + Sync {
    /// Filter candidate nodes for the given pod
    fn filter(&self, pod: &Pod, nodes: &[String]) -> Result<Vec<String>>;

    /// Name of the filter
    fn name(&self) -> &str;
}

/// Configuration for the pod affinity filter
#[derive(Debug, Clone)]
pub struct PodAffinityConfig {
    /// Topology key whose terms this filter enforces
    pub topology_key: String,
}

impl Default for PodAffinityConfig {
    fn default() -> Self {
        Self {
            topology_key: HOST_TOPOLOGY_KEY.to_string(),
        }
    }
}

/// Required pod affinity at physical-host granularity
///
/// A candidate passes when it shares a host with at least one running pod
/// matching every host-scoped required term of the pod being placed.
/// Preferred terms and anti-affinity are not evaluated here.
pub struct PodAffinity {
    pod_lister: Arc<dyn PodLister>,
    host_cache: Arc<dyn HostCache>,
    config: PodAffinityConfig,
}

impl PodAffinity {
    /// Create a filter enforcing terms with the `host` topology key
    pub fn new(pod_lister: Arc<dyn PodLister>, host_cache: Arc<dyn HostCache>) -> Self {
        Self::with_config(pod_lister, host_cache, PodAffinityConfig::default())
    }

    pub fn with_config(
        pod_lister: Arc<dyn PodLister>,
        host_cache: Arc<dyn HostCache>,
        config: PodAffinityConfig,
    ) -> Self {
        Self {
            pod_lister,
            host_cache,
            config,
        }
    }

    /// AND together the selectors of every host-scoped term
    fn host_selectors(&self, name: &str, terms: &[PodAffinityTerm]) -> Result<SelectorConjunction> {
        let mut selectors = SelectorConjunction::new();
        for (idx, term) in terms.iter().enumerate() {
            if term.topology_key != self.config.topology_key {
                continue;
            }
            let selector = label_selector_as_selector(term.label_selector.as_ref())
                .map_err(|e| SchedulerError::invalid_selector(name, idx, e))?;
            selectors.push(selector);
        }
        Ok(selectors)
    }

    /// Every node sharing a host with one of `pods`
    fn eligible_nodes(&self, pods: &[Pod]) -> HashSet<String> {
        let mut hosts = HashSet::new();
        for pod in pods {
            let Some(node) = assigned_node(pod) else {
                continue;
            };
            match self.host_cache.host_of(node) {
                Some(host) => {
                    hosts.insert(host);
                }
                None => debug!(
                    "Node {} of matching pod {} has no known host, ignoring it",
                    node,
                    pod_name(pod)
                ),
            }
        }

        let mut eligible = HashSet::new();
        for host in &hosts {
            eligible.extend(self.host_cache.nodes_of(host));
        }
        eligible
    }
}

impl Filter for PodAffinity {
    fn filter(&self, pod: &Pod, nodes: &[String]) -> Result<Vec<String>> {
        let name = pod_name(pod);
        debug!("Applying {} filter to pod {}, nodes: {:?}", self.name(), name, nodes);

        let terms = match required_affinity_terms(pod) {
            Some(terms) if !terms.is_empty() => terms,
            _ => return Ok(nodes.to_vec()),
        };

        let selectors = self.host_selectors(&name, terms)?;
        if selectors.is_empty() {
            debug!(
                "Pod {} has no '{}' scoped affinity terms, keeping all nodes",
                name, self.config.topology_key
            );
            return Ok(nodes.to_vec());
        }

        let pods = self.pod_lister.list_pods(&selectors)?;
        if pods.is_empty() {
            // Required affinity with no matching pod can't be satisfied anywhere
            debug!("No pods match {} for pod {}, rejecting all nodes", selectors, name);
            return Ok(Vec::new());
        }

        let eligible = self.eligible_nodes(&pods);
        let filtered: Vec<String> = nodes
            .iter()
            .filter(|n| eligible.contains(n.as_str()))
            .cloned()
            .collect();

        debug!("Applied {} filter to pod {}, nodes: {:?}", self.name(), name, filtered);

        Ok(filtered)
    }

    fn name(&self) -> &str {
        "PodAffinity"
    }
}
