use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Spec(#[from] clustertest_core::errors::SpecError),

    #[error(transparent)]
    Params(#[from] clustertest_core::errors::ParamsError),

    #[error(transparent)]
    Partition(#[from] clustertest_core::errors::PartitionError),

    #[error(transparent)]
    Validation(#[from] clustertest_core::errors::ValidationError),

    #[error(transparent)]
    Executor(#[from] clustertest_executor::ExecutorError),

    #[error(transparent)]
    Cluster(#[from] clustertest_executor::ClusterError),

    #[error(transparent)]
    Client(#[from] clustertest_client::error::ClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
