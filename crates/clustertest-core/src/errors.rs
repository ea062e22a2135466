use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path '{path}': {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse test document: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error("Invalid test configuration: {0}")]
    InvalidConfig(String),

    #[error("Step {step} ('{name}'): {reason}")]
    InvalidStep {
        step: usize,
        name: String,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("Missing value in parameter arg: {0}")]
    MissingValue(String),

    #[error("Invalid parameter name '{0}'. Names must match [A-Za-z_][0-9A-Za-z_]*.")]
    InvalidName(String),

    #[error("Parameter {0} not specified")]
    Unspecified(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Total subset percentages add to {0}, expected 100")]
    PercentSum(u64),

    #[error("More partitions ({partitions}) than number of nodes ({nodes})")]
    TooManyPartitions { partitions: usize, nodes: usize },

    #[error("Even partitioning requires at least one partition")]
    NoPartitions,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionIssue {
    #[error("no selection method")]
    NoSelectionMethod,

    #[error("two node selection methods (on_node and selection)")]
    TwoSelectionMethods,

    #[error("two selection formats (range and percent)")]
    TwoSelectionFormats,

    #[error("legacy node range {on_node}..{end_node} is outside 1..{nodes}")]
    InvalidLegacyRange {
        on_node: usize,
        end_node: usize,
        nodes: usize,
    },

    #[error("subset specified without a subset_partition in the config")]
    SubsetWithoutPartition,

    #[error("subset {id} does not exist (partitions: {available})")]
    UnknownSubset { id: usize, available: usize },

    #[error("invalid range {start}..{end} for a universe of {universe} nodes")]
    InvalidRange {
        start: usize,
        end: usize,
        universe: usize,
    },

    #[error("cannot pick {number} random nodes from a universe of {universe} nodes")]
    TooManyRandomNodes { number: usize, universe: usize },

    #[error("invalid percent {0}")]
    InvalidPercent(i32),

    #[error("invalid start position {start} for {count} nodes in a universe of {universe} nodes")]
    InvalidStart {
        start: usize,
        count: usize,
        universe: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{issue} on test step {step} ('{name}')")]
pub struct ValidationError {
    pub step: usize,
    pub name: String,
    pub issue: SelectionIssue,
}
