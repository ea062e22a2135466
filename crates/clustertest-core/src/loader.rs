use crate::errors::SpecError;
use crate::model::{Iteration, OutputTarget, Step, TestSpec};
use crate::params::{self, Params};
use std::path::Path;

/// Reads a test document, fills in its parameters and parses it.
pub fn load_from_path(path: &Path, params: &Params) -> Result<TestSpec, SpecError> {
    let source = render_path(path, params)?;
    let spec = from_str(&source)?;
    tracing::debug!(
        "Loaded test '{}' from '{}' ({} steps)",
        spec.name,
        path.display(),
        spec.steps.len()
    );
    Ok(spec)
}

/// The document at `path` with its `{{ NAME }}` parameters substituted.
pub fn render_path(path: &Path, params: &Params) -> Result<String, SpecError> {
    let template = fs_err::read_to_string(path).map_err(|e| SpecError::PathIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(params::replace_params(&template, params)?)
}

pub fn from_str(source: &str) -> Result<TestSpec, SpecError> {
    let spec: TestSpec = serde_yaml_ng::from_str(source)?;
    check_shape(&spec)?;
    Ok(spec)
}

fn check_shape(spec: &TestSpec) -> Result<(), SpecError> {
    let config = &spec.config;
    if config.nodes == 0 {
        return Err(SpecError::InvalidConfig(
            "'nodes' must be greater than zero".to_string(),
        ));
    }
    if config.times == 0 {
        return Err(SpecError::InvalidConfig(
            "'times' must be at least 1".to_string(),
        ));
    }
    if config.scale_poll_interval == Some(0) {
        return Err(SpecError::InvalidConfig(
            "'scale_poll_interval' must be greater than zero".to_string(),
        ));
    }

    for (i, step) in spec.steps.iter().enumerate() {
        check_step(step).map_err(|reason| SpecError::InvalidStep {
            step: i + 1,
            name: step.name.clone(),
            reason,
        })?;
    }
    Ok(())
}

fn check_step(step: &Step) -> Result<(), String> {
    for (i, output) in step.outputs.iter().enumerate() {
        let name = match output.target() {
            Some(OutputTarget::Scalar(name)) | Some(OutputTarget::Array(name)) => name,
            None => {
                return Err(format!(
                    "output {} must set exactly one of 'save_to' or 'append_to'",
                    i + 1
                ))
            }
        };
        check_identifier(name)?;
    }

    if let Some(iterate) = &step.iterate {
        match iterate.iteration() {
            Some(Iteration::OverArray(name)) => check_identifier(name)?,
            Some(Iteration::Bound(_)) => {}
            None => {
                return Err("'for' must set exactly one of 'bound' or 'array'".to_string());
            }
        }
    }

    for name in &step.inputs {
        check_identifier(name)?;
    }
    Ok(())
}

fn check_identifier(name: &str) -> Result<(), String> {
    if params::is_identifier(name) {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid variable name", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Order, PartitionType};
    use std::io::Write;

    const ADD_AND_GC: &str = r#"
name: add and gc
config:
  nodes: 5
  selector: app=ipfs
  times: 2
  grace_shutdown: 1
  expected:
    successes: 5
  subset_partition:
    partition_type: EVEN
    order: SEQUENTIAL
    number_partitions: 5
steps:
  - name: add
    selection:
      subset: [1, 3, 5]
    cmd: "echo hello-%[1]d | ipfs add -q"
    outputs:
      - line: 0
        append_to: HASHES
  - name: cat
    on_node: 1
    end_node: 5
    for:
      array: HASHES
    cmd: "ipfs cat ${HASHES[%[2]d]}"
    assertions:
      - line: 0
        should_be_equal_to: hello
"#;

    #[test]
    fn test_from_str_full_document() {
        let spec = from_str(ADD_AND_GC).unwrap();
        assert_eq!(spec.name, "add and gc");
        assert_eq!(spec.config.times, 2);
        assert_eq!(spec.config.expected.successes, 5);
        let partition = spec.config.subset_partition.as_ref().unwrap();
        assert_eq!(partition.partition_type, PartitionType::Even);
        assert_eq!(partition.order, Order::Sequential);
        assert_eq!(spec.steps.len(), 2);
        assert_eq!(spec.steps[1].iteration(), Some(Iteration::OverArray("HASHES")));
    }

    #[test]
    fn test_rejects_zero_nodes() {
        let err = from_str("name: t\nconfig:\n  nodes: 0\n").unwrap_err();
        assert!(matches!(err, SpecError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_output_with_both_targets() {
        let doc = r#"
name: t
config: { nodes: 1 }
steps:
  - name: ok
    on_node: 1
    cmd: "true"
  - name: bad
    on_node: 1
    cmd: "true"
    outputs:
      - { line: 0, save_to: A, append_to: B }
"#;
        match from_str(doc).unwrap_err() {
            SpecError::InvalidStep { step, name, .. } => {
                assert_eq!(step, 2);
                assert_eq!(name, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_for_with_both_forms() {
        let doc = "name: t\nconfig: { nodes: 1 }\nsteps:\n  - name: s\n    on_node: 1\n    cmd: 'true'\n    for: { bound: 2, array: X }\n";
        assert!(matches!(
            from_str(doc).unwrap_err(),
            SpecError::InvalidStep { .. }
        ));
    }

    #[test]
    fn test_rejects_bad_variable_name() {
        let doc = "name: t\nconfig: { nodes: 1 }\nsteps:\n  - name: s\n    on_node: 1\n    cmd: 'true'\n    outputs:\n      - { line: 0, save_to: 'my-var' }\n";
        let err = from_str(doc).unwrap_err();
        assert!(err.to_string().contains("'my-var' is not a valid variable name"));
    }

    #[test]
    fn test_rejects_unknown_order() {
        let doc = "name: t\nconfig:\n  nodes: 2\n  subset_partition: { partition_type: EVEN, order: BACKWARDS, number_partitions: 1 }\n";
        assert!(matches!(from_str(doc).unwrap_err(), SpecError::Yaml(_)));
    }

    #[test]
    fn test_load_from_path_applies_params() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "name: templated\nconfig:\n  nodes: {{{{ NODES }}}}\nsteps:\n  - name: s\n    on_node: {{{{ON_NODE}}}}\n    cmd: 'true'\n"
        )
        .unwrap();

        let params: Params = "NODES=4,ON_NODE=2".parse().unwrap();
        let spec = load_from_path(file.path(), &params).unwrap();
        assert_eq!(spec.config.nodes, 4);
        assert_eq!(spec.steps[0].on_node, 2);

        let err = load_from_path(file.path(), &Params::new()).unwrap_err();
        assert!(matches!(err, SpecError::Params(_)));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = load_from_path(Path::new("/nonexistent/test.yml"), &Params::new()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/test.yml"));
    }
}
