use std::time::Duration;
use thiserror::Error;

/// Failures of the cluster ports: inventory, scaling and remote execution.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Failed to execute command '{command}': {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed with exit code {code}.\n--- STDERR ---\n{stderr}")]
    CommandExited {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Timed out after {waited:?} waiting for {required} running workers ({running} running)")]
    ScaleTimeout {
        required: usize,
        running: usize,
        waited: Duration,
    },

    #[error("Only {running} of the {required} required workers are running")]
    NotEnoughWorkers { required: usize, running: usize },
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("Node {node} has no worker assigned ({available} workers available)")]
    NoWorkerForNode { node: usize, available: usize },

    #[error("Collected {received} of {expected} results before all workers hung up")]
    LostResults { received: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
