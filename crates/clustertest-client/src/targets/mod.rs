mod common;
mod kubectl;
mod local;

pub use kubectl::{parse_pods, KubectlCluster};
pub use local::LocalCluster;

use crate::error::ClientError;
use clustertest_core::constants::{defaults, targets};
use clustertest_executor::Cluster;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterTarget {
    #[default]
    Kubectl,
    Local,
}

impl fmt::Display for ClusterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterTarget::Kubectl => write!(f, "{}", targets::KUBECTL),
            ClusterTarget::Local => write!(f, "{}", targets::LOCAL),
        }
    }
}

impl FromStr for ClusterTarget {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            targets::KUBECTL => Ok(ClusterTarget::Kubectl),
            targets::LOCAL => Ok(ClusterTarget::Local),
            _ => Err(ClientError::UnknownTarget(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetOptions {
    pub deployment: String,
    /// Workers a local cluster starts with.
    pub initial_workers: usize,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            deployment: defaults::DEPLOYMENT.to_string(),
            initial_workers: 0,
        }
    }
}

pub fn connect(target: ClusterTarget, options: &TargetOptions) -> Arc<dyn Cluster> {
    match target {
        ClusterTarget::Kubectl => Arc::new(KubectlCluster::new(&options.deployment)),
        ClusterTarget::Local => Arc::new(LocalCluster::new(options.initial_workers)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("kubectl".parse::<ClusterTarget>().unwrap(), ClusterTarget::Kubectl);
        assert_eq!("local".parse::<ClusterTarget>().unwrap(), ClusterTarget::Local);
        assert_eq!(
            "ssh".parse::<ClusterTarget>().unwrap_err(),
            ClientError::UnknownTarget("ssh".to_string())
        );
        assert_eq!(ClusterTarget::Local.to_string(), "local");
    }
}
