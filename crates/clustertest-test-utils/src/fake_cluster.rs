use async_trait::async_trait;
use clustertest_executor::{
    CapturedOutput, ClusterError, Inventory, Invocation, RemoteExecution, Scaling, Worker,
    WorkerPhase,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Handler = Box<dyn Fn(&Invocation) -> FakeResponse + Send + Sync>;

/// What a fake worker does with a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    Lines(Vec<String>),
    /// Finishes after the delay with the given lines.
    Delayed(Duration, Vec<String>),
    /// Never returns; only a timeout gets the slot back.
    Hang,
    /// The transport itself fails.
    Fail(String),
}

impl FakeResponse {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FakeResponse::Lines(lines.into_iter().map(Into::into).collect())
    }
}

/// Something a fake worker did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Dispatched { worker_id: String, command: String },
    Completed { worker_id: String, command: String },
}

/// In-memory cluster with scripted workers.
///
/// Workers are named `worker-1..worker-N`. Unless told otherwise, every
/// worker answers with no output.
pub struct FakeCluster {
    workers: Mutex<Vec<Worker>>,
    scripted: Mutex<HashMap<String, FakeResponse>>,
    handler: Mutex<Option<Handler>>,
    invocations: Mutex<Vec<Invocation>>,
    events: Mutex<Vec<FakeEvent>>,
    scale_requests: Mutex<Vec<usize>>,
    inventory_failure: Mutex<Option<String>>,
    start_on_scale: bool,
    list_calls: AtomicUsize,
    hung: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeCluster {
    pub fn with_running(n: usize) -> Self {
        Self::build(n, true)
    }

    /// A cluster that ignores scale requests, so capacity never arrives.
    pub fn stuck_at(n: usize) -> Self {
        Self::build(n, false)
    }

    fn build(n: usize, start_on_scale: bool) -> Self {
        Self {
            workers: Mutex::new(running_workers(n)),
            scripted: Mutex::new(HashMap::new()),
            handler: Mutex::new(None),
            invocations: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            scale_requests: Mutex::new(Vec::new()),
            inventory_failure: Mutex::new(None),
            start_on_scale,
            list_calls: AtomicUsize::new(0),
            hung: AtomicUsize::new(0),
        }
    }

    pub fn worker_id(node: usize) -> String {
        format!("worker-{}", node)
    }

    pub fn set_workers(&self, workers: Vec<Worker>) {
        *lock(&self.workers) = workers;
    }

    /// Scripts the response of one worker; takes precedence over the handler.
    pub fn respond(&self, worker_id: &str, response: FakeResponse) {
        lock(&self.scripted).insert(worker_id.to_string(), response);
    }

    pub fn respond_with<F>(&self, handler: F)
    where
        F: Fn(&Invocation) -> FakeResponse + Send + Sync + 'static,
    {
        *lock(&self.handler) = Some(Box::new(handler));
    }

    pub fn fail_inventory(&self, reason: &str) {
        *lock(&self.inventory_failure) = Some(reason.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        lock(&self.events).clone()
    }

    pub fn scale_requests(&self) -> Vec<usize> {
        lock(&self.scale_requests).clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn hung_commands(&self) -> usize {
        self.hung.load(Ordering::SeqCst)
    }

    fn response_for(&self, invocation: &Invocation) -> FakeResponse {
        if let Some(response) = lock(&self.scripted).get(&invocation.worker_id) {
            return response.clone();
        }
        match lock(&self.handler).as_ref() {
            Some(handler) => handler(invocation),
            None => FakeResponse::Lines(vec![]),
        }
    }
}

fn running_workers(n: usize) -> Vec<Worker> {
    (1..=n)
        .map(|i| Worker::new(FakeCluster::worker_id(i), WorkerPhase::Running))
        .collect()
}

#[async_trait]
impl Inventory for FakeCluster {
    async fn list_workers(&self, _selector: &str) -> Result<Vec<Worker>, ClusterError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&self.inventory_failure).clone() {
            return Err(ClusterError::Parse {
                what: "fake inventory".to_string(),
                reason,
            });
        }
        Ok(lock(&self.workers).clone())
    }
}

#[async_trait]
impl Scaling for FakeCluster {
    async fn scale_to(&self, _selector: &str, replicas: usize) -> Result<(), ClusterError> {
        lock(&self.scale_requests).push(replicas);
        if self.start_on_scale {
            *lock(&self.workers) = running_workers(replicas);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteExecution for FakeCluster {
    async fn run(&self, invocation: Invocation) -> Result<CapturedOutput, ClusterError> {
        let response = self.response_for(&invocation);
        let worker_id = invocation.worker_id.clone();
        let command = invocation.command.clone();
        lock(&self.events).push(FakeEvent::Dispatched {
            worker_id: worker_id.clone(),
            command: command.clone(),
        });
        lock(&self.invocations).push(invocation);

        let lines = match response {
            FakeResponse::Lines(lines) => lines,
            FakeResponse::Delayed(delay, lines) => {
                tokio::time::sleep(delay).await;
                lines
            }
            FakeResponse::Hang => {
                self.hung.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<()>().await;
                vec![]
            }
            FakeResponse::Fail(reason) => {
                return Err(ClusterError::CommandFailed {
                    command: "fake".to_string(),
                    source: std::io::Error::other(reason),
                })
            }
        };

        lock(&self.events).push(FakeEvent::Completed { worker_id, command });
        Ok(CapturedOutput {
            lines,
            stderr: String::new(),
            exit_code: Some(0),
        })
    }
}
