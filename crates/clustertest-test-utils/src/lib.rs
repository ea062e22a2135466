pub mod fake_cluster;
pub mod harness;
