//! Ports to the cluster under test.
//!
//! The run loop only talks to workers through these traits, so the same
//! harness drives kubectl, local shells and the in-memory fakes used in tests.

use crate::error::ClusterError;
use async_trait::async_trait;
use clustertest_core::constants::phases;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl From<&str> for WorkerPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => WorkerPhase::Pending,
            phases::RUNNING => WorkerPhase::Running,
            "Succeeded" => WorkerPhase::Succeeded,
            "Failed" => WorkerPhase::Failed,
            other => WorkerPhase::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerPhase::Pending => write!(f, "Pending"),
            WorkerPhase::Running => write!(f, "{}", phases::RUNNING),
            WorkerPhase::Succeeded => write!(f, "Succeeded"),
            WorkerPhase::Failed => write!(f, "Failed"),
            WorkerPhase::Unknown(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: String,
    pub phase: WorkerPhase,
}

impl Worker {
    pub fn new(id: impl Into<String>, phase: WorkerPhase) -> Self {
        Self {
            id: id.into(),
            phase,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == WorkerPhase::Running
    }
}

/// One command to run on one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub worker_id: String,
    pub command: String,
    /// Shell assignments prepended to the command.
    pub env: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// The full `bash -c` script: `A='x' B=('y') && command`.
    pub fn shell_script(&self) -> String {
        if self.env.is_empty() {
            self.command.clone()
        } else {
            format!("{} && {}", self.env.join(" "), self.command)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub lines: Vec<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CapturedOutput {
    pub fn from_raw(stdout: &[u8], stderr: &[u8], exit_code: Option<i32>) -> Self {
        Self {
            lines: split_lines(&String::from_utf8_lossy(stdout)),
            stderr: String::from_utf8_lossy(stderr).trim_end().to_string(),
            exit_code,
        }
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}

/// Splits captured stdout into lines; a trailing newline does not add an
/// empty line and `\r\n` from a pseudo-terminal is handled.
pub fn split_lines(stdout: &str) -> Vec<String> {
    stdout.lines().map(str::to_string).collect()
}

#[async_trait]
pub trait Inventory: Send + Sync {
    /// Workers matching `selector`, in inventory order.
    async fn list_workers(&self, selector: &str) -> Result<Vec<Worker>, ClusterError>;

    async fn running_count(&self, selector: &str) -> Result<usize, ClusterError> {
        let workers = self.list_workers(selector).await?;
        Ok(workers.iter().filter(|w| w.is_running()).count())
    }
}

#[async_trait]
pub trait Scaling: Send + Sync {
    async fn scale_to(&self, selector: &str, replicas: usize) -> Result<(), ClusterError>;
}

#[async_trait]
pub trait RemoteExecution: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// Dropping the returned future must terminate the remote command; the
    /// executor relies on that to enforce timeouts.
    async fn run(&self, invocation: Invocation) -> Result<CapturedOutput, ClusterError>;
}

pub trait Cluster: Inventory + Scaling + RemoteExecution {}

impl<T: Inventory + Scaling + RemoteExecution + ?Sized> Cluster for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_script_prelude() {
        let mut invocation = Invocation {
            worker_id: "w".to_string(),
            command: "echo $A".to_string(),
            env: vec![],
            timeout: None,
        };
        assert_eq!(invocation.shell_script(), "echo $A");
        invocation.env = vec!["A='1'".to_string(), "B=('x' 'y')".to_string()];
        assert_eq!(invocation.shell_script(), "A='1' B=('x' 'y') && echo $A");
    }

    #[test]
    fn test_split_lines_drops_trailing_newline() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb\r\n"), vec!["a", "b"]);
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("\nx"), vec!["", "x"]);
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(WorkerPhase::from("Running"), WorkerPhase::Running);
        assert_eq!(
            WorkerPhase::from("CrashLoopBackOff"),
            WorkerPhase::Unknown("CrashLoopBackOff".to_string())
        );
        assert!(Worker::new("p", WorkerPhase::Running).is_running());
        assert!(!Worker::new("p", WorkerPhase::Pending).is_running());
    }
}
