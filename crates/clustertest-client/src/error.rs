use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Unknown target '{0}'. Valid values are: kubectl, local")]
    UnknownTarget(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
