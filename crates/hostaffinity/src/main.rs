use clap::{Parser, Subcommand, ValueEnum};
use hostaffinity_core::{pod_name, to_json, Pod, HOST_LABEL};
use hostaffinity_scheduler::{ClusterSnapshot, Filter, InMemoryPodLister, PodAffinity, TopologyCache};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "hostaffinity", about = "Host-scoped pod affinity filter")]
struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter candidate nodes for pods in a cluster snapshot
    Filter {
        /// Path to the cluster snapshot (YAML or JSON)
        #[arg(long, env = "HOSTAFFINITY_SNAPSHOT")]
        snapshot: PathBuf,
        /// Pod to evaluate as namespace/name; repeatable, defaults to every pending pod
        #[arg(long = "pod")]
        pods: Vec<String>,
        /// Comma-separated candidate nodes; defaults to every node in the snapshot
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
        /// Node label naming the physical host
        #[arg(long, env = "HOSTAFFINITY_HOST_LABEL", default_value = HOST_LABEL)]
        host_label: String,
    },
    /// Print the host to node mapping derived from a cluster snapshot
    Topology {
        /// Path to the cluster snapshot (YAML or JSON)
        #[arg(long, env = "HOSTAFFINITY_SNAPSHOT")]
        snapshot: PathBuf,
        /// Node label naming the physical host
        #[arg(long, env = "HOSTAFFINITY_HOST_LABEL", default_value = HOST_LABEL)]
        host_label: String,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    match cli.command {
        Commands::Filter {
            snapshot,
            pods,
            nodes,
            host_label,
        } => run_filter(&snapshot, &pods, nodes, &host_label).await,
        Commands::Topology {
            snapshot,
            host_label,
        } => run_topology(&snapshot, &host_label),
    }
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Result of filtering one pod: its `namespace/name` and the surviving nodes
type PodOutcome = (String, hostaffinity_scheduler::Result<Vec<String>>);

/// Run the affinity filter for each selected pod, printing one JSON line per pod
async fn run_filter(
    snapshot_path: &Path,
    pod_names: &[String],
    nodes: Vec<String>,
    host_label: &str,
) -> miette::Result<()> {
    let snapshot = ClusterSnapshot::load(snapshot_path)?;

    for (name, result) in evaluate_snapshot(&snapshot, pod_names, nodes, host_label).await? {
        let line = outcome_line(&name, &result);
        println!("{}", to_json(&line)?);
    }

    Ok(())
}

/// Filter the selected pods concurrently, returning outcomes in selection order
///
/// Candidates default to every snapshot node and pods to every pending pod.
async fn evaluate_snapshot(
    snapshot: &ClusterSnapshot,
    pod_names: &[String],
    nodes: Vec<String>,
    host_label: &str,
) -> miette::Result<Vec<PodOutcome>> {
    let candidates = if nodes.is_empty() {
        snapshot.node_names()
    } else {
        nodes
    };

    let pods: Vec<Pod> = if pod_names.is_empty() {
        snapshot.pending_pods().into_iter().cloned().collect()
    } else {
        pod_names
            .iter()
            .map(|name| {
                snapshot
                    .find_pod(name)
                    .cloned()
                    .ok_or_else(|| miette::miette!("Pod '{}' not found in snapshot", name))
            })
            .collect::<miette::Result<_>>()?
    };

    info!(
        "Evaluating {} pods against {} candidate nodes",
        pods.len(),
        candidates.len()
    );

    let filter: Arc<dyn Filter> = Arc::new(PodAffinity::new(
        Arc::new(InMemoryPodLister::new(snapshot.pods.clone())),
        Arc::new(TopologyCache::from_nodes(&snapshot.nodes, host_label)),
    ));
    let candidates = Arc::new(candidates);

    let mut tasks = JoinSet::new();
    for (idx, pod) in pods.into_iter().enumerate() {
        let filter = filter.clone();
        let candidates = candidates.clone();
        tasks.spawn_blocking(move || {
            let result = filter.filter(&pod, &candidates);
            (idx, pod_name(&pod), result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(|e| miette::miette!("Filter task failed: {}", e))?;
        results.push(outcome);
    }
    results.sort_by_key(|(idx, _, _)| *idx);

    Ok(results
        .into_iter()
        .map(|(_, name, result)| (name, result))
        .collect())
}

fn outcome_line(name: &str, result: &hostaffinity_scheduler::Result<Vec<String>>) -> serde_json::Value {
    match result {
        Ok(nodes) => {
            info!("Pod {} is eligible on {} nodes", name, nodes.len());
            json!({ "pod": name, "nodes": nodes })
        }
        Err(e) => {
            let message = error_chain(e);
            error!("Filtering pod {} failed: {}", name, message);
            json!({ "pod": name, "error": message })
        }
    }
}

/// An error followed by each of its sources, joined by `: `
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

/// Print the snapshot topology as a JSON object of host to nodes
fn run_topology(snapshot_path: &Path, host_label: &str) -> miette::Result<()> {
    let snapshot = ClusterSnapshot::load(snapshot_path)?;
    let cache = TopologyCache::from_nodes(&snapshot.nodes, host_label);

    let hosts: BTreeMap<&str, &[String]> = cache.hosts().collect();
    info!("Snapshot has {} hosts", hosts.len());

    println!("{}", to_json(&hosts)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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
      name: db-0
      namespace: default
      labels:
        app: db
    spec:
      nodeName: n3
      containers: []
  - apiVersion: v1
    kind: Pod
    metadata:
      name: web-0
      namespace: default
    spec:
      containers: []
      affinity:
        podAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: host
              labelSelector:
                matchLabels:
                  app: cache
  - apiVersion: v1
    kind: Pod
    metadata:
      name: api-0
      namespace: default
    spec:
      containers: []
      affinity:
        podAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: host
              labelSelector:
                matchLabels:
                  app: db
  - apiVersion: v1
    kind: Pod
    metadata:
      name: bad-0
      namespace: default
    spec:
      containers: []
      affinity:
        podAffinity:
          requiredDuringSchedulingIgnoredDuringExecution:
            - topologyKey: host
              labelSelector:
                matchExpressions:
                  - key: tier
                    operator: In
  - apiVersion: v1
    kind: Pod
    metadata:
      name: free-0
      namespace: default
    spec:
      containers: []
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
  - apiVersion: v1
    kind: Node
    metadata:
      name: n4
      labels:
        host: h3
"#;

    fn load_test_snapshot() -> ClusterSnapshot {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, SNAPSHOT).unwrap();
        ClusterSnapshot::load(&path).unwrap()
    }

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_defaults_to_pending_pods_and_all_nodes() {
        let snapshot = load_test_snapshot();

        let outcomes = evaluate_snapshot(&snapshot, &[], Vec::new(), HOST_LABEL)
            .await
            .unwrap();

        let names: Vec<&str> = outcomes.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec!["default/web-0", "default/api-0", "default/bad-0", "default/free-0"]
        );
        assert_eq!(outcomes[0].1.as_ref().unwrap(), &nodes(&["n1", "n2"]));
        assert_eq!(outcomes[1].1.as_ref().unwrap(), &nodes(&["n3"]));
        assert!(outcomes[2].1.is_err());
        assert_eq!(outcomes[3].1.as_ref().unwrap(), &nodes(&["n1", "n2", "n3", "n4"]));
    }

    #[tokio::test]
    async fn test_named_pods_and_nodes_keep_given_order() {
        let snapshot = load_test_snapshot();
        let pods = vec!["default/free-0".to_string(), "api-0".to_string(), "web-0".to_string()];

        let outcomes = evaluate_snapshot(&snapshot, &pods, nodes(&["n4", "n3", "n2"]), HOST_LABEL)
            .await
            .unwrap();

        let names: Vec<&str> = outcomes.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["default/free-0", "default/api-0", "default/web-0"]);
        assert_eq!(outcomes[0].1.as_ref().unwrap(), &nodes(&["n4", "n3", "n2"]));
        assert_eq!(outcomes[1].1.as_ref().unwrap(), &nodes(&["n3"]));
        assert_eq!(outcomes[2].1.as_ref().unwrap(), &nodes(&["n2"]));
    }

    #[tokio::test]
    async fn test_unknown_pod_is_an_error() {
        let snapshot = load_test_snapshot();
        let pods = vec!["web-0".to_string(), "default/missing".to_string()];

        let err = evaluate_snapshot(&snapshot, &pods, Vec::new(), HOST_LABEL)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Pod 'default/missing' not found in snapshot"));
    }

    #[tokio::test]
    async fn test_error_line_carries_source_chain() {
        let snapshot = load_test_snapshot();
        let pods = vec!["bad-0".to_string()];

        let outcomes = evaluate_snapshot(&snapshot, &pods, Vec::new(), HOST_LABEL)
            .await
            .unwrap();
        let (name, result) = &outcomes[0];
        let line = outcome_line(name, result);

        assert_eq!(line["pod"], "default/bad-0");
        let message = line["error"].as_str().unwrap();
        assert!(message.starts_with("Invalid label selector in affinity term 0 of pod default/bad-0: "));
        assert!(message.contains("requires at least one value"));
        assert!(line.get("nodes").is_none());
    }

    #[test]
    fn test_success_line() {
        let line = outcome_line("default/web-0", &Ok(nodes(&["n1", "n2"])));
        let rendered = to_json(&line).unwrap();
        assert!(!rendered.contains('\n'));
        assert_eq!(line["pod"], "default/web-0");
        assert_eq!(line["nodes"], json!(["n1", "n2"]));
        assert!(line.get("error").is_none());
    }
}
