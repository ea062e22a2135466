use super::common::{capture, run_checked};
use async_trait::async_trait;
use clustertest_core::constants::{defaults, targets};
use clustertest_executor::{
    CapturedOutput, ClusterError, Inventory, Invocation, RemoteExecution, Scaling, Worker,
    WorkerPhase,
};
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMetadata,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: String,
}

/// Parses `kubectl get pods --output=json`, keeping the listed order.
pub fn parse_pods(json: &str) -> Result<Vec<Worker>, ClusterError> {
    let pods: PodList = serde_json::from_str(json).map_err(|e| ClusterError::Parse {
        what: "kubectl pod list".to_string(),
        reason: e.to_string(),
    })?;
    Ok(pods
        .items
        .into_iter()
        .map(|pod| Worker::new(pod.metadata.name, WorkerPhase::from(pod.status.phase.as_str())))
        .collect())
}

/// Workers are the pods of a Kubernetes deployment, driven through `kubectl`.
pub struct KubectlCluster {
    deployment: String,
}

impl KubectlCluster {
    pub fn new(deployment: &str) -> Self {
        Self {
            deployment: deployment.to_string(),
        }
    }

    fn kubectl(&self) -> Command {
        Command::new(targets::KUBECTL)
    }
}

impl Default for KubectlCluster {
    fn default() -> Self {
        Self::new(defaults::DEPLOYMENT)
    }
}

#[async_trait]
impl Inventory for KubectlCluster {
    async fn list_workers(&self, selector: &str) -> Result<Vec<Worker>, ClusterError> {
        let mut cmd = self.kubectl();
        cmd.arg("get")
            .arg("pods")
            .arg("--output=json")
            .arg(format!("--selector={}", selector));
        let stdout = run_checked(&mut cmd).await?;
        parse_pods(&stdout)
    }
}

#[async_trait]
impl Scaling for KubectlCluster {
    async fn scale_to(&self, _selector: &str, replicas: usize) -> Result<(), ClusterError> {
        let mut cmd = self.kubectl();
        cmd.arg("scale")
            .arg(format!("--replicas={}", replicas))
            .arg(format!("deployment/{}", self.deployment));
        run_checked(&mut cmd).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteExecution for KubectlCluster {
    async fn run(&self, invocation: Invocation) -> Result<CapturedOutput, ClusterError> {
        let mut cmd = self.kubectl();
        cmd.arg("exec")
            .arg(&invocation.worker_id)
            .arg("-t")
            .arg("--")
            .arg(defaults::SHELL)
            .arg("-c")
            .arg(invocation.shell_script());
        capture(&mut cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PODS: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {"metadata": {"name": "go-ipfs-stress-1", "labels": {"app": "ipfs"}}, "status": {"phase": "Running"}},
            {"metadata": {"name": "go-ipfs-stress-2"}, "status": {"phase": "Pending"}},
            {"metadata": {"name": "go-ipfs-stress-3"}, "status": {"phase": "Running"}},
            {"metadata": {"name": "go-ipfs-stress-4"}}
        ]
    }"#;

    #[test]
    fn test_parse_pods_keeps_order_and_phase() {
        let workers = parse_pods(PODS).unwrap();
        let names: Vec<&str> = workers.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "go-ipfs-stress-1",
                "go-ipfs-stress-2",
                "go-ipfs-stress-3",
                "go-ipfs-stress-4"
            ]
        );
        assert_eq!(workers.iter().filter(|w| w.is_running()).count(), 2);
        assert_eq!(workers[1].phase, WorkerPhase::Pending);
        assert_eq!(workers[3].phase, WorkerPhase::Unknown(String::new()));
    }

    #[test]
    fn test_parse_pods_rejects_garbage() {
        assert!(matches!(
            parse_pods("not json").unwrap_err(),
            ClusterError::Parse { .. }
        ));
        assert!(parse_pods(r#"{"items": []}"#).unwrap().is_empty());
    }
}
