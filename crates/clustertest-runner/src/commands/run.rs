use crate::cli::RunArgs;
use crate::commands::{collect_params, seeded_rng};
use crate::error::CliError;
use crate::run_loop::{RunLoop, RunOptions};
use clustertest_client::{connect, ClusterTarget, TargetOptions};
use clustertest_core::loader;
use colored::Colorize;
use std::time::Duration;
use tokio::runtime::Runtime as TokioRuntime;

/// Runs the test and returns the process exit code.
pub fn handle_run(args: RunArgs) -> Result<i32, CliError> {
    let rt = TokioRuntime::new()?;
    rt.block_on(async_handle_run(args))
}

async fn async_handle_run(args: RunArgs) -> Result<i32, CliError> {
    let params = collect_params(&args.input)?;
    let spec = loader::load_from_path(&args.input.file, &params)?;
    let target: ClusterTarget = args.target.parse()?;

    let mut options = RunOptions::from_config(&spec.config);
    if let Some(secs) = args.poll_interval {
        options.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.scale_timeout {
        options.scale_timeout = Some(Duration::from_secs(secs));
    }
    options.show_progress = !args.no_progress;

    let deployment = args
        .deployment
        .unwrap_or_else(|| spec.config.deployment().to_string());
    println!(
        "- Running '{}' against {} target (deployment '{}')",
        spec.name.cyan(),
        target.to_string().cyan(),
        deployment
    );
    let cluster = connect(
        target,
        &TargetOptions {
            deployment,
            ..TargetOptions::default()
        },
    );

    let expected = spec.config.expected.clone();
    let run_loop = RunLoop::new(cluster, spec, seeded_rng(args.seed), options)?;
    let summary = run_loop.run().await?;
    println!("{}", summary.report(&expected));
    Ok(summary.evaluate(&expected).exit_code())
}
