use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::defaults;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Order {
    Random,
    Sequential,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Random => write!(f, "RANDOM"),
            Order::Sequential => write!(f, "SEQUENTIAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrderError(pub String);

impl fmt::Display for ParseOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid order: '{}'. Valid values are: RANDOM, SEQUENTIAL",
            self.0
        )
    }
}

impl std::error::Error for ParseOrderError {}

impl FromStr for Order {
    type Err = ParseOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RANDOM" => Ok(Order::Random),
            "SEQUENTIAL" => Ok(Order::Sequential),
            _ => Err(ParseOrderError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionType {
    Even,
    Weighted,
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionType::Even => write!(f, "EVEN"),
            PartitionType::Weighted => write!(f, "WEIGHTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePartitionTypeError(pub String);

impl fmt::Display for ParsePartitionTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid partition type: '{}'. Valid values are: EVEN, WEIGHTED",
            self.0
        )
    }
}

impl std::error::Error for ParsePartitionTypeError {}

impl FromStr for PartitionType {
    type Err = ParsePartitionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVEN" => Ok(PartitionType::Even),
            "WEIGHTED" => Ok(PartitionType::Weighted),
            _ => Err(ParsePartitionTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Expected {
    #[serde(default)]
    pub successes: usize,
    #[serde(default)]
    pub failures: usize,
    #[serde(default)]
    pub timeouts: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubsetPartitionSpec {
    pub partition_type: PartitionType,
    pub order: Order,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub percents: Vec<u32>,
    #[serde(default)]
    pub number_partitions: usize,
}

fn default_times() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub nodes: usize,
    #[serde(default)]
    pub selector: String,
    #[serde(default = "default_times")]
    pub times: usize,
    /// Seconds to wait after the last repetition.
    #[serde(default)]
    pub grace_shutdown: u64,
    #[serde(default)]
    pub expected: Expected,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset_partition: Option<SubsetPartitionSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_poll_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_timeout: Option<u64>,
}

impl Config {
    pub fn grace_shutdown(&self) -> Duration {
        Duration::from_secs(self.grace_shutdown)
    }

    pub fn deployment(&self) -> &str {
        self.deployment.as_deref().unwrap_or(defaults::DEPLOYMENT)
    }

    pub fn scale_poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.scale_poll_interval
                .unwrap_or(defaults::SCALE_POLL_INTERVAL_SECS),
        )
    }

    /// `None` means the scale-up wait is unbounded.
    pub fn scale_timeout(&self) -> Option<Duration> {
        self.scale_timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub order: Order,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub number: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PercentSpec {
    pub order: Order,
    #[serde(default)]
    pub start: usize,
    pub percent: i32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubsetForm {
    List(Vec<usize>),
    Indices { indices: Vec<usize> },
}

/// Accepts both `subset: [1, 2]` and the older `subset: { indices: [1, 2] }`.
fn deserialize_subsets<'de, D>(deserializer: D) -> Result<Option<Vec<usize>>, D::Error>
where
    D: Deserializer<'de>,
{
    let form = Option::<SubsetForm>::deserialize(deserializer)?;
    Ok(form.map(|f| match f {
        SubsetForm::List(ids) => ids,
        SubsetForm::Indices { indices } => indices,
    }))
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(
        default,
        alias = "subsets",
        deserialize_with = "deserialize_subsets",
        skip_serializing_if = "Option::is_none"
    )]
    pub subset: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<PercentSpec>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_to: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputTarget<'a> {
    Scalar(&'a str),
    Array(&'a str),
}

impl Output {
    /// `None` unless exactly one of `save_to` / `append_to` is set.
    pub fn target(&self) -> Option<OutputTarget<'_>> {
        match (&self.save_to, &self.append_to) {
            (Some(name), None) => Some(OutputTarget::Scalar(name)),
            (None, Some(name)) => Some(OutputTarget::Array(name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub line: usize,
    pub should_be_equal_to: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ForSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Iteration<'a> {
    Bound(usize),
    OverArray(&'a str),
}

impl ForSpec {
    pub fn iteration(&self) -> Option<Iteration<'_>> {
        match (self.bound, &self.array) {
            (Some(n), None) => Some(Iteration::Bound(n)),
            (None, Some(name)) => Some(Iteration::OverArray(name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,

    #[serde(default)]
    pub on_node: usize,
    #[serde(default)]
    pub end_node: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,

    pub cmd: String,
    /// Seconds; 0 leaves the command unbounded.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_to_file: Option<PathBuf>,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub iterate: Option<ForSpec>,
}

impl Step {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn iteration(&self) -> Option<Iteration<'_>> {
        self.iterate.as_ref().and_then(ForSpec::iteration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    pub name: String,
    pub config: Config,
    #[serde(default)]
    pub steps: Vec<Step>,
}
