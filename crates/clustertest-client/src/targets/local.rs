use super::common::capture;
use async_trait::async_trait;
use clustertest_core::constants::{defaults, env_vars};
use clustertest_executor::{
    CapturedOutput, ClusterError, Inventory, Invocation, RemoteExecution, Scaling, Worker,
    WorkerPhase,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;

/// Simulated workers `local-1..local-N` that run commands in a local shell.
///
/// Every worker is always running; scaling only changes how many exist.
pub struct LocalCluster {
    replicas: AtomicUsize,
}

impl LocalCluster {
    pub fn new(replicas: usize) -> Self {
        Self {
            replicas: AtomicUsize::new(replicas),
        }
    }

    pub fn worker_id(index: usize) -> String {
        format!("local-{}", index)
    }

    pub fn replicas(&self) -> usize {
        self.replicas.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Inventory for LocalCluster {
    async fn list_workers(&self, _selector: &str) -> Result<Vec<Worker>, ClusterError> {
        Ok((1..=self.replicas())
            .map(|i| Worker::new(Self::worker_id(i), WorkerPhase::Running))
            .collect())
    }
}

#[async_trait]
impl Scaling for LocalCluster {
    async fn scale_to(&self, _selector: &str, replicas: usize) -> Result<(), ClusterError> {
        tracing::info!("Scaling local cluster to {} workers", replicas);
        self.replicas.store(replicas, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RemoteExecution for LocalCluster {
    async fn run(&self, invocation: Invocation) -> Result<CapturedOutput, ClusterError> {
        let mut cmd = Command::new(defaults::SHELL);
        cmd.arg("-c")
            .arg(invocation.shell_script())
            .env(env_vars::WORKER, &invocation.worker_id);
        capture(&mut cmd).await
    }
}
