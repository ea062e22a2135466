pub mod error;
pub mod targets;

pub use error::{ClientError, Result};
pub use targets::{connect, ClusterTarget, KubectlCluster, LocalCluster, TargetOptions};
