use clustertest_core::constants::placeholders;
use regex::Regex;
use std::sync::LazyLock;

static ARRAY_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\[%\[[12]\]d\]\}").unwrap()
});

/// Fills in the node and iteration placeholders of a command template.
pub fn render(template: &str, node_index: usize, iteration: usize) -> String {
    template
        .replace(placeholders::NODE_INDEX, &node_index.to_string())
        .replace(placeholders::ITERATION_INDEX, &iteration.to_string())
}

/// Array variables indexed by a placeholder, e.g. `${HASHES[%[2]d]}`, in
/// order of first use.
pub fn referenced_arrays(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in ARRAY_REF_RE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
