use crate::error::CliError;
use clustertest_core::environment::Environment;
use clustertest_core::errors::ValidationError;
use clustertest_core::model::{Config, Step, TestSpec};
use clustertest_core::partition::{self, PartitionMap};
use clustertest_core::selection::{self, NodeSelection};
use clustertest_core::summary::Summary;
use clustertest_core::validation;
use clustertest_executor::{AssertionRecord, Cluster, ClusterError, StepExecutor, StepOutcome};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Builds the partition map once and rejects malformed selections before any
/// cluster work happens.
pub fn plan(spec: &TestSpec, rng: &mut StdRng) -> Result<Option<PartitionMap>, CliError> {
    let partitions = partition::build(
        spec.config.nodes,
        spec.config.subset_partition.as_ref(),
        rng,
    )?;
    validation::validate(&spec.steps, partitions.as_ref(), &spec.config)?;
    Ok(partitions)
}

/// Resolves the nodes a step runs on, drawing from `rng` for random rules.
pub fn resolve_nodes(
    index: usize,
    step: &Step,
    config: &Config,
    partitions: Option<&PartitionMap>,
    rng: &mut StdRng,
) -> Result<Vec<usize>, ValidationError> {
    let selection = NodeSelection::from_step(step).map_err(|issue| ValidationError {
        step: index + 1,
        name: step.name.clone(),
        issue,
    })?;
    Ok(selection::select_nodes(
        &selection,
        config.nodes,
        partitions,
        rng,
    ))
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll_interval: Duration,
    /// `None` waits for workers forever.
    pub scale_timeout: Option<Duration>,
    pub show_progress: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.scale_poll_interval(),
            scale_timeout: config.scale_timeout(),
            show_progress: true,
        }
    }
}

pub struct RunLoop {
    cluster: Arc<dyn Cluster>,
    spec: TestSpec,
    partitions: Option<PartitionMap>,
    rng: StdRng,
    options: RunOptions,
}

impl RunLoop {
    pub fn new(
        cluster: Arc<dyn Cluster>,
        spec: TestSpec,
        mut rng: StdRng,
        options: RunOptions,
    ) -> Result<Self, CliError> {
        let partitions = plan(&spec, &mut rng)?;
        Ok(Self {
            cluster,
            spec,
            partitions,
            rng,
            options,
        })
    }

    /// Runs every repetition, then waits out the grace period.
    ///
    /// Infrastructure failures abort the run; timeouts and failed assertions
    /// only show up in the returned summary.
    pub async fn run(mut self) -> Result<Summary, CliError> {
        let config = self.spec.config.clone();
        let mut summary = Summary::start(config.times);

        for repetition in 1..=config.times {
            println!(
                "{}",
                format!(
                    "## Running test '{}' ({}/{})",
                    self.spec.name, repetition, config.times
                )
                .cyan()
            );
            let workers = self.ensure_capacity().await?;
            println!(
                "{}",
                format!("## Using {} nodes for this test", config.nodes).cyan()
            );

            let executor = StepExecutor::new(Arc::clone(&self.cluster), workers);
            let mut env = Environment::new();
            for (index, step) in self.spec.steps.iter().enumerate() {
                let nodes = resolve_nodes(
                    index,
                    step,
                    &config,
                    self.partitions.as_ref(),
                    &mut self.rng,
                )?;
                announce(step, &nodes);
                let StepOutcome {
                    env: next,
                    tally,
                    records,
                } = executor.execute(step, &nodes, &env).await?;
                records.iter().for_each(print_record);
                tracing::debug!(
                    "Step '{}' finished: {} passed, {} failed, {} timed out",
                    step.name,
                    tally.successes,
                    tally.failures,
                    tally.timeouts
                );
                summary.absorb(tally);
                env = next;
            }
            summary.tests_ran += 1;
        }

        let grace = config.grace_shutdown();
        if !grace.is_zero() {
            println!(
                "Now waiting for {} seconds before shutdown...",
                grace.as_secs()
            );
            tokio::time::sleep(grace).await;
        }
        summary.finish();
        Ok(summary)
    }

    /// Scales up when fewer than `nodes` workers run, then returns the ids of
    /// the running workers in inventory order.
    async fn ensure_capacity(&self) -> Result<Vec<String>, CliError> {
        let config = &self.spec.config;
        let required = config.nodes;
        let running = self.cluster.running_count(&config.selector).await?;
        if running < required {
            println!("Not enough nodes running. Scaling up...");
            self.cluster.scale_to(&config.selector, required).await?;
            self.wait_for_workers(required).await?;
        }

        let workers: Vec<String> = self
            .cluster
            .list_workers(&config.selector)
            .await?
            .into_iter()
            .filter(|w| w.is_running())
            .map(|w| w.id)
            .collect();
        if workers.len() < required {
            return Err(ClusterError::NotEnoughWorkers {
                required,
                running: workers.len(),
            }
            .into());
        }
        Ok(workers)
    }

    async fn wait_for_workers(&self, required: usize) -> Result<(), CliError> {
        let started = Instant::now();
        let spinner = self.spinner();

        loop {
            let running = self
                .cluster
                .running_count(&self.spec.config.selector)
                .await?;
            spinner.set_message(format!(
                "Containers running (current/target): ({}/{})",
                running, required
            ));
            tracing::debug!("{} of {} workers running", running, required);
            if running >= required {
                spinner.finish_with_message("Scale complete");
                return Ok(());
            }

            let waited = started.elapsed();
            if let Some(limit) = self.options.scale_timeout {
                if waited >= limit {
                    spinner.abandon();
                    return Err(ClusterError::ScaleTimeout {
                        required,
                        running,
                        waited,
                    }
                    .into());
                }
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn spinner(&self) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Scaling in progress...");
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

fn announce(step: &Step, nodes: &[usize]) {
    println!(
        "{}",
        format!("### Running step {} on nodes {:?}", step.name, nodes).blue()
    );
    for input in &step.inputs {
        println!("{}", format!("### Getting variable {}", input).blue());
    }
    println!("{}", format!("$ {}", step.cmd).magenta());
    println!(
        "{}",
        format!("Running parallel on {} nodes.", nodes.len()).magenta()
    );
}

fn print_record(record: &AssertionRecord) {
    if record.passed {
        println!("{}", "Assertion passed".green());
    } else {
        println!("{}", "Assertion failed!".red());
        println!("{}", format!("Actual value={}", record.actual).red());
        println!("{}\n", format!("Expected value={}", record.expected).red());
    }
}
