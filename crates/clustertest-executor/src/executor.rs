use crate::cluster::{CapturedOutput, Invocation, RemoteExecution};
use crate::command;
use crate::error::{ExecutorError, Result};
use clustertest_core::environment::Environment;
use clustertest_core::model::{Iteration, OutputTarget, Step};
use clustertest_core::summary::Tally;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One evaluated assertion, kept for the step report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRecord {
    pub node: usize,
    pub iteration: usize,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub env: Environment,
    pub tally: Tally,
    pub records: Vec<AssertionRecord>,
}

enum Completion {
    Finished(CapturedOutput),
    TimedOut,
}

struct NodeResult {
    node: usize,
    completion: Completion,
}

/// Number of times a step fans out: once, a fixed bound, or once per element
/// of an array variable as it stands before the step runs.
pub fn iteration_count(step: &Step, env: &Environment) -> usize {
    match step.iteration() {
        None => 1,
        Some(Iteration::Bound(n)) => n,
        Some(Iteration::OverArray(name)) => env.array_len(name),
    }
}

/// Runs steps on the workers backing node indices `1..=workers.len()`.
pub struct StepExecutor<R: RemoteExecution + ?Sized + 'static> {
    remote: Arc<R>,
    workers: Vec<String>,
}

impl<R: RemoteExecution + ?Sized + 'static> StepExecutor<R> {
    pub fn new(remote: Arc<R>, workers: Vec<String>) -> Self {
        Self { remote, workers }
    }

    fn worker_for(&self, node: usize) -> Result<&str> {
        node.checked_sub(1)
            .and_then(|i| self.workers.get(i))
            .map(String::as_str)
            .ok_or(ExecutorError::NoWorkerForNode {
                node,
                available: self.workers.len(),
            })
    }

    /// Runs `step` on every node of `nodes` for each iteration and folds the
    /// results into a copy of `env`.
    ///
    /// Nodes of one iteration run concurrently; the next iteration starts only
    /// once every node of the previous one has reported.
    pub async fn execute(
        &self,
        step: &Step,
        nodes: &[usize],
        env: &Environment,
    ) -> Result<StepOutcome> {
        let iterations = iteration_count(step, env);
        let arrays = command::referenced_arrays(&step.cmd);
        let prelude = env.shell_bindings(arrays.iter().map(String::as_str));
        let workers = nodes
            .iter()
            .map(|&node| self.worker_for(node).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let mut outcome = StepOutcome {
            env: env.clone(),
            tally: Tally::default(),
            records: Vec::new(),
        };

        if nodes.is_empty() || iterations == 0 {
            tracing::warn!(
                "Step '{}' has nothing to run ({} nodes, {} iterations)",
                step.name,
                nodes.len(),
                iterations
            );
            return Ok(outcome);
        }

        for iteration in 0..iterations {
            let (tx, mut rx) = mpsc::channel::<NodeResult>(nodes.len());

            for (&node, worker_id) in nodes.iter().zip(&workers) {
                let invocation = Invocation {
                    worker_id: worker_id.clone(),
                    command: command::render(&step.cmd, node - 1, iteration),
                    env: prelude.clone(),
                    timeout: step.timeout(),
                };
                tracing::debug!(
                    "Dispatching step '{}' iteration {} to node {} ({})",
                    step.name,
                    iteration,
                    node,
                    worker_id
                );

                let remote = Arc::clone(&self.remote);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let completion = dispatch(remote.as_ref(), invocation).await;
                    let _ = tx.send(NodeResult { node, completion }).await;
                });
            }
            drop(tx);

            for received in 0..nodes.len() {
                let result = rx.recv().await.ok_or(ExecutorError::LostResults {
                    received,
                    expected: nodes.len(),
                })?;
                fold(step, iteration, result, &mut outcome);
            }
        }

        Ok(outcome)
    }
}

async fn dispatch<R: RemoteExecution + ?Sized>(remote: &R, invocation: Invocation) -> Completion {
    let worker = invocation.worker_id.clone();
    let timeout = invocation.timeout;
    let run = remote.run(invocation);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Command on worker '{}' timed out after {:?}", worker, limit);
                return Completion::TimedOut;
            }
        },
        None => run.await,
    };

    match result {
        Ok(output) => {
            if !output.stderr.is_empty() {
                tracing::warn!("stderr from worker '{}': {}", worker, output.stderr);
            }
            if let Some(code) = output.exit_code.filter(|c| *c != 0) {
                tracing::info!("Command on worker '{}' exited with code {}", worker, code);
            }
            Completion::Finished(output)
        }
        Err(e) => {
            tracing::error!("Failed to run command on worker '{}': {}", worker, e);
            Completion::Finished(CapturedOutput::default())
        }
    }
}

fn fold(step: &Step, iteration: usize, result: NodeResult, outcome: &mut StepOutcome) {
    let output = match result.completion {
        Completion::TimedOut => {
            outcome.tally.timeouts += 1;
            return;
        }
        Completion::Finished(output) => output,
    };
    let node = result.node;

    if let Some(path) = &step.write_to_file {
        append_raw_output(path, &output.lines);
    }

    for declared in &step.outputs {
        let Some(line) = output.line(declared.line) else {
            tracing::warn!(
                "Not enough lines in output of node {} to read line {}, skipping",
                node,
                declared.line
            );
            continue;
        };
        match declared.target() {
            Some(OutputTarget::Scalar(name)) => {
                tracing::info!(
                    "Saving output from line {} to variable {}: {}",
                    declared.line,
                    name,
                    line
                );
                outcome.env.bind(name, line);
            }
            Some(OutputTarget::Array(name)) => {
                tracing::info!(
                    "Appending output from line {} to array {}: {}",
                    declared.line,
                    name,
                    line
                );
                outcome.env.append(name, line);
            }
            None => {}
        }
    }

    for assertion in &step.assertions {
        let Some(actual) = output.line(assertion.line) else {
            tracing::warn!(
                "Not enough lines in output of node {} to assert line {}, skipping",
                node,
                assertion.line
            );
            continue;
        };
        let expected = outcome
            .env
            .scalar(&assertion.should_be_equal_to)
            .unwrap_or(assertion.should_be_equal_to.as_str())
            .to_string();
        let passed = actual == expected;
        if passed {
            outcome.tally.successes += 1;
        } else {
            outcome.tally.failures += 1;
        }
        outcome.records.push(AssertionRecord {
            node,
            iteration,
            expected,
            actual: actual.to_string(),
            passed,
        });
    }
}

fn append_raw_output(path: &Path, lines: &[String]) {
    let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    let result = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| {
            let mut raw = lines.join("\n");
            raw.push('\n');
            f.write_all(raw.as_bytes())
        });
    if let Err(e) = result {
        tracing::error!("Failed to write output file: {}", e);
    }
}
