mod cluster;
mod command;
mod error;
mod executor;

pub use cluster::{
    split_lines, CapturedOutput, Cluster, Inventory, Invocation, RemoteExecution, Scaling, Worker,
    WorkerPhase,
};
pub use command::{referenced_arrays, render};
pub use error::{ClusterError, ExecutorError, Result};
pub use executor::{iteration_count, AssertionRecord, StepExecutor, StepOutcome};
