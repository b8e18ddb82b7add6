use crate::error::{Result, SchedulerError};
use hostaffinity_core::{assigned_node, from_json, from_yaml, node_name, pod_name, Node, Pod};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Point-in-time view of cluster pods and nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl ClusterSnapshot {
    /// Load a snapshot; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::snapshot_load(path.display().to_string(), e))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let snapshot: Self = if is_yaml {
            from_yaml(&data)?
        } else {
            from_json(&data)?
        };

        debug!(
            "Loaded snapshot {} with {} pods and {} nodes",
            path.display(),
            snapshot.pods.len(),
            snapshot.nodes.len()
        );

        Ok(snapshot)
    }

    /// Pods not yet bound to a node
    pub fn pending_pods(&self) -> Vec<&Pod> {
        self.pods
            .iter()
            .filter(|p| assigned_node(p).is_none())
            .collect()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|n| node_name(n).map(String::from))
            .collect()
    }

    /// Find a pod by `namespace/name`, or by bare name in any namespace
    pub fn find_pod(&self, name: &str) -> Option<&Pod> {
        if name.contains('/') {
            self.pods.iter().find(|p| pod_name(p) == name)
        } else {
            self.pods
                .iter()
                .find(|p| p.metadata.name.as_deref() == Some(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, PodAffinity};
    use crate::lister::InMemoryPodLister;
    use crate::topology::TopologyCache;
    use hostaffinity_core::HOST_LABEL;
    use std::sync::Arc;
    use tempfile::tempdir;

    const SNAPSHOT: &str = r#"
pods:
  - apiVersion: v1
    kind: Pod
    metadata:
      name: cache-0
      namespace: default
      labels:
        app: cache
    spec:
      nodeName: n1
      containers: []
  - apiVersion: v1
    kind: Pod
    metadata:
      name: web-0
      namespace: prod
    spec:
      containers: []
      affinity:
        podAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: host
              labelSelector:
                matchLabels:
                  app: cache
nodes:
  - apiVersion: v1
    kind: Node
    metadata:
      name: n1
      labels:
        host: h1
  - apiVersion: v1
    kind: Node
    metadata:
      name: n2
      labels:
        host: h1
  - apiVersion: v1
    kind: Node
    metadata:
      name: n3
      labels:
        host: h2
"#;

    #[test]
    fn test_load_yaml_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let snapshot = ClusterSnapshot::load(&path).unwrap();

        assert_eq!(snapshot.pods.len(), 2);
        assert_eq!(snapshot.node_names(), vec!["n1", "n2", "n3"]);
        let pending: Vec<String> = snapshot.pending_pods().into_iter().map(pod_name).collect();
        assert_eq!(pending, vec!["prod/web-0"]);
        assert!(snapshot.find_pod("prod/web-0").is_some());
        assert!(snapshot.find_pod("web-0").is_some());
        assert!(snapshot.find_pod("default/web-0").is_none());
    }

    #[test]
    fn test_snapshot_drives_filter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.yml");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let snapshot = ClusterSnapshot::load(&path).unwrap();

        let filter = PodAffinity::new(
            Arc::new(InMemoryPodLister::new(snapshot.pods.clone())),
            Arc::new(TopologyCache::from_nodes(&snapshot.nodes, HOST_LABEL)),
        );
        let pod = snapshot.find_pod("prod/web-0").unwrap();

        let result = filter.filter(pod, &snapshot.node_names()).unwrap();

        assert_eq!(result, vec!["n1", "n2"]);
    }

    #[test]
    fn test_load_json_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.json");
        let snapshot = ClusterSnapshot {
            pods: Vec::new(),
            nodes: vec![Node {
                metadata: hostaffinity_core::ObjectMeta {
                    name: Some("n1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }],
        };
        std::fs::write(&path, hostaffinity_core::to_json(&snapshot).unwrap()).unwrap();

        let loaded = ClusterSnapshot::load(&path).unwrap();

        assert!(loaded.pods.is_empty());
        assert_eq!(loaded.node_names(), vec!["n1"]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();

        let err = ClusterSnapshot::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, SchedulerError::SnapshotLoad { .. }));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"pods\": 3}").unwrap();
        let err = ClusterSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, SchedulerError::CoreError(_)));
    }
}
