use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Distributed integration tests for container clusters.",
    long_about = "Reads a test description and runs its steps in parallel on the workers of a cluster, checking outputs against expectations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity level (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        help = "Also write logs to this file (without colors)"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run a test against a cluster")]
    Run(RunArgs),
    #[command(about = "Check a test and print the nodes each step would run on")]
    Validate(ValidateArgs),
    #[command(about = "Print a test document with its parameters substituted")]
    Render(RenderArgs),
}

#[derive(Args, Clone)]
pub struct ParamArgs {
    #[arg(help = "Path to the test document")]
    pub file: PathBuf,

    #[arg(
        short,
        long = "param",
        value_name = "NAME=VALUE",
        help = "Value for a template parameter; may be repeated or comma separated"
    )]
    pub params: Vec<String>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: ParamArgs,

    #[arg(long, help = "Seed for partitioning and random node selection")]
    pub seed: Option<u64>,

    #[arg(
        long,
        default_value = "kubectl",
        help = "Where workers live: 'kubectl' or 'local'"
    )]
    pub target: String,

    #[arg(long, help = "Deployment to scale. Overrides the test's config")]
    pub deployment: Option<String>,

    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between inventory polls while scaling up"
    )]
    pub poll_interval: Option<u64>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Give up waiting for workers after this many seconds"
    )]
    pub scale_timeout: Option<u64>,

    #[arg(long, help = "Hide the spinner shown while waiting for workers")]
    pub no_progress: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: ParamArgs,

    #[arg(long, help = "Seed for partitioning and random node selection")]
    pub seed: Option<u64>,
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: ParamArgs,
}
