pub mod placeholders {
    /// Replaced with the node index minus one, so node 1 renders as 0.
    pub const NODE_INDEX: &str = "%[1]d";
    /// Replaced with the zero-based iteration counter of a `for` step.
    pub const ITERATION_INDEX: &str = "%[2]d";
}

pub mod phases {
    pub const RUNNING: &str = "Running";
}

pub mod env_vars {
    pub const LOG_LEVEL: &str = "CLUSTERTEST_LOG_LEVEL";
    pub const WORKER: &str = "CLUSTERTEST_WORKER";
}

pub mod defaults {
    pub const DEPLOYMENT: &str = "go-ipfs-stress";
    pub const SCALE_POLL_INTERVAL_SECS: u64 = 3;
    pub const SHELL: &str = "bash";
}

pub mod targets {
    pub const KUBECTL: &str = "kubectl";
    pub const LOCAL: &str = "local";
}

