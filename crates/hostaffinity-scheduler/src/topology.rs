use crate::traits::HostCache;
use hostaffinity_core::{node_name, Node};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Node/host topology held in memory
///
/// Keeps both directions of the mapping; a node belongs to at most one
/// host, so re-inserting a node under another host moves it.
#[derive(Debug, Clone, Default)]
pub struct TopologyCache {
    node_hosts: HashMap<String, String>,
    host_nodes: BTreeMap<String, Vec<String>>,
}

impl TopologyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the topology from the host label carried by each node
    pub fn from_nodes(nodes: &[Node], host_label: &str) -> Self {
        let mut cache = Self::new();
        for node in nodes {
            let Some(name) = node_name(node) else {
                warn!("Skipping node without a name");
                continue;
            };
            let host = node
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(host_label));
            match host {
                Some(host) if !host.is_empty() => cache.insert(name, host.as_str()),
                _ => warn!("Node {} has no '{}' label; not part of any host", name, host_label),
            }
        }
        cache
    }

    /// Assign `node` to `host`
    pub fn insert(&mut self, node: impl Into<String>, host: impl Into<String>) {
        let node = node.into();
        let host = host.into();

        if let Some(previous) = self.node_hosts.insert(node.clone(), host.clone()) {
            if previous == host {
                return;
            }
            if let Some(members) = self.host_nodes.get_mut(&previous) {
                members.retain(|n| n != &node);
                if members.is_empty() {
                    self.host_nodes.remove(&previous);
                }
            }
        }

        self.host_nodes.entry(host).or_default().push(node);
    }

    /// Known hosts in name order
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.host_nodes
            .iter()
            .map(|(host, nodes)| (host.as_str(), nodes.as_slice()))
    }
}

impl HostCache for TopologyCache {
    fn host_of(&self, node: &str) -> Option<String> {
        self.node_hosts.get(node).cloned()
    }

    fn nodes_of(&self, host: &str) -> Vec<String> {
        self.host_nodes.get(host).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_node(name: &str, host: Option<&str>) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        if let Some(host) = host {
            node.metadata.labels = Some(BTreeMap::from([("host".to_string(), host.to_string())]));
        }
        node
    }

    #[test]
    fn test_insert_both_directions() {
        let mut cache = TopologyCache::new();
        cache.insert("n1", "h1");
        cache.insert("n2", "h1");
        cache.insert("n3", "h2");

        assert_eq!(cache.host_of("n1"), Some("h1".to_string()));
        assert_eq!(cache.nodes_of("h1"), vec!["n1", "n2"]);
        assert_eq!(cache.nodes_of("h2"), vec!["n3"]);
        assert!(cache.nodes_of("h9").is_empty());
        assert_eq!(cache.host_of("n9"), None);
    }

    #[test]
    fn test_reinsert_moves_node() {
        let mut cache = TopologyCache::new();
        cache.insert("n1", "h1");
        cache.insert("n1", "h1");
        assert_eq!(cache.nodes_of("h1"), vec!["n1"]);

        cache.insert("n1", "h2");
        assert_eq!(cache.host_of("n1"), Some("h2".to_string()));
        assert!(cache.nodes_of("h1").is_empty());
        assert_eq!(cache.hosts().count(), 1);
    }

    #[test]
    fn test_from_nodes() {
        let nodes = vec![
            create_test_node("n1", Some("h1")),
            create_test_node("n2", Some("h1")),
            create_test_node("n3", None),
            create_test_node("n4", Some("")),
            Node::default(),
        ];
        let cache = TopologyCache::from_nodes(&nodes, "host");

        assert_eq!(cache.nodes_of("h1"), vec!["n1", "n2"]);
        assert_eq!(cache.host_of("n3"), None);
        assert_eq!(cache.host_of("n4"), None);
        let hosts: Vec<&str> = cache.hosts().map(|(h, _)| h).collect();
        assert_eq!(hosts, vec!["h1"]);
    }
}
