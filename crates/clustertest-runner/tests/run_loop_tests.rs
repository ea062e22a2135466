use clustertest_core::loader;
use clustertest_core::model::TestSpec;
use clustertest_core::summary::Outcome;
use clustertest_executor::{Cluster, ClusterError};
use clustertest_runner::error::CliError;
use clustertest_runner::run_loop::{plan, RunLoop, RunOptions};
use clustertest_test_utils::fake_cluster::{FakeCluster, FakeResponse};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

fn spec(doc: &str) -> TestSpec {
    loader::from_str(doc).unwrap()
}

fn options() -> RunOptions {
    RunOptions {
        poll_interval: Duration::from_millis(10),
        scale_timeout: Some(Duration::from_secs(5)),
        show_progress: false,
    }
}

fn run_loop(cluster: &Arc<FakeCluster>, spec: TestSpec, options: RunOptions) -> RunLoop {
    let cluster: Arc<dyn Cluster> = cluster.clone();
    RunLoop::new(cluster, spec, StdRng::seed_from_u64(7), options).unwrap()
}

fn invoked_workers(cluster: &FakeCluster) -> Vec<String> {
    let mut workers: Vec<String> = cluster
        .invocations()
        .into_iter()
        .map(|i| i.worker_id)
        .collect();
    workers.sort();
    workers
}

const ECHO_ON_THREE: &str = r#"
name: echo
config:
  nodes: 3
  expected:
    successes: 3
steps:
  - name: echo
    on_node: 1
    end_node: 3
    cmd: "echo ok"
    assertions:
      - line: 0
        should_be_equal_to: ok
"#;

#[tokio::test]
async fn test_scales_up_when_short_of_workers() {
    let cluster = Arc::new(FakeCluster::with_running(1));
    cluster.respond_with(|_| FakeResponse::lines(["ok"]));

    let summary = run_loop(&cluster, spec(ECHO_ON_THREE), options())
        .run()
        .await
        .unwrap();

    assert_eq!(cluster.scale_requests(), vec![3]);
    assert_eq!(summary.tally.successes, 3);
    assert_eq!(summary.tests_ran, 1);
    assert!(summary.end.is_some());
    assert_eq!(
        summary.evaluate(&spec(ECHO_ON_THREE).config.expected),
        Outcome::Met
    );
}

#[tokio::test]
async fn test_enough_workers_means_no_scaling() {
    let cluster = Arc::new(FakeCluster::with_running(5));
    cluster.respond_with(|_| FakeResponse::lines(["ok"]));

    run_loop(&cluster, spec(ECHO_ON_THREE), options())
        .run()
        .await
        .unwrap();

    assert!(cluster.scale_requests().is_empty());
    assert_eq!(
        invoked_workers(&cluster),
        vec!["worker-1", "worker-2", "worker-3"]
    );
}

#[tokio::test]
async fn test_scale_wait_gives_up_after_timeout() {
    let cluster = Arc::new(FakeCluster::stuck_at(1));
    let mut opts = options();
    opts.scale_timeout = Some(Duration::from_millis(50));

    let err = run_loop(&cluster, spec(ECHO_ON_THREE), opts)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CliError::Cluster(ClusterError::ScaleTimeout {
            required: 3,
            running: 1,
            ..
        })
    ));
    assert!(cluster.list_calls() > 2);
    assert!(cluster.invocations().is_empty());
}

#[tokio::test]
async fn test_inventory_failure_aborts_the_run() {
    let cluster = Arc::new(FakeCluster::with_running(3));
    cluster.fail_inventory("connection refused");

    let err = run_loop(&cluster, spec(ECHO_ON_THREE), options())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::Cluster(ClusterError::Parse { .. })));
    assert!(cluster.invocations().is_empty());
}

#[tokio::test]
async fn test_only_running_workers_back_nodes() {
    use clustertest_executor::{Worker, WorkerPhase};

    let cluster = Arc::new(FakeCluster::with_running(0));
    cluster.set_workers(vec![
        Worker::new("pending-0", WorkerPhase::Pending),
        Worker::new("worker-1", WorkerPhase::Running),
        Worker::new("failed-0", WorkerPhase::Failed),
        Worker::new("worker-2", WorkerPhase::Running),
        Worker::new("worker-3", WorkerPhase::Running),
    ]);

    run_loop(&cluster, spec(ECHO_ON_THREE), options())
        .run()
        .await
        .unwrap();

    assert!(cluster.scale_requests().is_empty());
    assert_eq!(
        invoked_workers(&cluster),
        vec!["worker-1", "worker-2", "worker-3"]
    );
}

#[tokio::test]
async fn test_subset_selection_runs_on_listed_partitions() {
    let doc = r#"
name: subsets
config:
  nodes: 5
  subset_partition:
    partition_type: EVEN
    order: SEQUENTIAL
    number_partitions: 5
steps:
  - name: add
    selection:
      subset: [1, 3, 5]
    cmd: "ipfs add"
"#;
    let cluster = Arc::new(FakeCluster::with_running(5));

    run_loop(&cluster, spec(doc), options()).run().await.unwrap();

    assert_eq!(
        invoked_workers(&cluster),
        vec!["worker-1", "worker-3", "worker-5"]
    );
}

#[tokio::test]
async fn test_hanging_node_counts_one_timeout() {
    let doc = r#"
name: timeout
config:
  nodes: 2
  expected:
    successes: 1
    timeouts: 1
steps:
  - name: maybe hang
    on_node: 1
    end_node: 2
    timeout: 1
    cmd: "sleep 1000"
    assertions:
      - line: 0
        should_be_equal_to: done
"#;
    let cluster = Arc::new(FakeCluster::with_running(2));
    cluster.respond(&FakeCluster::worker_id(1), FakeResponse::Hang);
    cluster.respond(&FakeCluster::worker_id(2), FakeResponse::lines(["done"]));

    let test = spec(doc);
    let expected = test.config.expected.clone();
    let summary = run_loop(&cluster, test, options()).run().await.unwrap();

    assert_eq!(summary.tally.timeouts, 1);
    assert_eq!(summary.tally.successes, 1);
    assert_eq!(summary.tally.failures, 0);
    assert_eq!(summary.evaluate(&expected).exit_code(), 0);
}

#[tokio::test]
async fn test_mismatched_expectation_exits_nonzero() {
    let cluster = Arc::new(FakeCluster::with_running(3));
    cluster.respond(&FakeCluster::worker_id(2), FakeResponse::lines(["nope"]));
    cluster.respond_with(|_| FakeResponse::lines(["ok"]));

    let test = spec(ECHO_ON_THREE);
    let expected = test.config.expected.clone();
    let summary = run_loop(&cluster, test, options()).run().await.unwrap();

    assert_eq!(summary.tally.successes, 2);
    assert_eq!(summary.tally.failures, 1);
    assert_eq!(summary.evaluate(&expected), Outcome::NotMet);
    assert_eq!(summary.evaluate(&expected).exit_code(), 1);
}

#[tokio::test]
async fn test_environment_resets_between_repetitions() {
    let doc = r#"
name: gossip
config:
  nodes: 2
  times: 2
steps:
  - name: publish
    on_node: 1
    end_node: 2
    cmd: "ipfs add -q"
    outputs:
      - line: 0
        append_to: HASHES
  - name: fetch
    on_node: 1
    for:
      array: HASHES
    cmd: "ipfs cat ${HASHES[%[2]d]}"
    inputs: [HASHES]
"#;
    let cluster = Arc::new(FakeCluster::with_running(2));
    cluster.respond_with(|inv| FakeResponse::lines([format!("Qm{}", inv.worker_id)]));

    let summary = run_loop(&cluster, spec(doc), options()).run().await.unwrap();

    assert_eq!(summary.tests_ran, 2);
    let fetches = cluster
        .invocations()
        .iter()
        .filter(|i| i.command.starts_with("ipfs cat"))
        .count();
    assert_eq!(fetches, 4);
}

#[test]
fn test_invalid_selection_is_rejected_before_cluster_access() {
    let doc = r#"
name: bad
config:
  nodes: 5
steps:
  - name: too many
    selection:
      range: { order: RANDOM, number: 6 }
    cmd: "true"
"#;
    let cluster = Arc::new(FakeCluster::with_running(5));
    let dyn_cluster: Arc<dyn Cluster> = cluster.clone();

    let err = RunLoop::new(dyn_cluster, spec(doc), StdRng::seed_from_u64(1), options())
        .err()
        .unwrap();

    match err {
        CliError::Validation(e) => {
            assert_eq!(e.step, 1);
            assert_eq!(e.name, "too many");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cluster.list_calls(), 0);
}

#[test]
fn test_same_seed_gives_same_partitions() {
    let doc = r#"
name: random partitions
config:
  nodes: 10
  subset_partition:
    partition_type: WEIGHTED
    order: RANDOM
    percents: [50, 30, 20]
steps: []
"#;
    let test = spec(doc);
    let first = plan(&test, &mut StdRng::seed_from_u64(42)).unwrap();
    let second = plan(&test, &mut StdRng::seed_from_u64(42)).unwrap();

    assert_eq!(first, second);
    let sizes: Vec<usize> = first.unwrap().iter().map(|(_, n)| n.len()).collect();
    assert_eq!(sizes, vec![5, 3, 2]);
}
