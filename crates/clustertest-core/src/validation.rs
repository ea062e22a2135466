use crate::errors::{SelectionIssue, ValidationError};
use crate::model::{Config, Step};
use crate::partition::PartitionMap;
use crate::selection::{NodeSelection, PercentRule, RangeRule};

/// Checks every step's node selection before anything touches the cluster.
///
/// The first offending step is reported, with its 1-based position.
pub fn validate(
    steps: &[Step],
    partitions: Option<&PartitionMap>,
    config: &Config,
) -> Result<(), ValidationError> {
    for (i, step) in steps.iter().enumerate() {
        check_step(step, partitions, config.nodes).map_err(|issue| ValidationError {
            step: i + 1,
            name: step.name.clone(),
            issue,
        })?;
    }
    Ok(())
}

fn check_step(
    step: &Step,
    partitions: Option<&PartitionMap>,
    nodes: usize,
) -> Result<(), SelectionIssue> {
    let selection = NodeSelection::from_step(step)?;

    if let NodeSelection::OnNodeRange { on_node, end_node } = selection {
        let in_bounds = on_node <= nodes && (end_node == 0 || (on_node..=nodes).contains(&end_node));
        if !in_bounds {
            return Err(SelectionIssue::InvalidLegacyRange {
                on_node,
                end_node,
                nodes,
            });
        }
        return Ok(());
    }

    let universes = universe_sizes(selection.subsets(), partitions, nodes)?;
    for universe in universes {
        match &selection {
            NodeSelection::Range { rule, .. } => check_range(*rule, universe)?,
            NodeSelection::Percent { rule, .. } => check_percent(*rule, universe)?,
            NodeSelection::OnNodeRange { .. } | NodeSelection::Subsets { .. } => {}
        }
    }
    Ok(())
}

fn universe_sizes(
    subsets: Option<&[usize]>,
    partitions: Option<&PartitionMap>,
    nodes: usize,
) -> Result<Vec<usize>, SelectionIssue> {
    let Some(ids) = subsets else {
        return Ok(vec![nodes]);
    };
    let partitions = partitions.ok_or(SelectionIssue::SubsetWithoutPartition)?;
    ids.iter()
        .map(|&id| {
            partitions
                .get(id)
                .map(<[usize]>::len)
                .ok_or(SelectionIssue::UnknownSubset {
                    id,
                    available: partitions.len(),
                })
        })
        .collect()
}

fn check_range(rule: RangeRule, universe: usize) -> Result<(), SelectionIssue> {
    match rule {
        RangeRule::Sequential { start, end } => {
            if start == 0 || end < start || end > universe {
                return Err(SelectionIssue::InvalidRange {
                    start,
                    end,
                    universe,
                });
            }
        }
        RangeRule::Random { number } => {
            if number > universe {
                return Err(SelectionIssue::TooManyRandomNodes { number, universe });
            }
        }
    }
    Ok(())
}

fn check_percent(rule: PercentRule, universe: usize) -> Result<(), SelectionIssue> {
    let percent = rule.percent();
    if !(0..=100).contains(&percent) {
        return Err(SelectionIssue::InvalidPercent(percent));
    }
    if let PercentRule::Sequential { start, .. } = rule {
        let count = rule.count(universe);
        if start == 0 || start - 1 > universe - count {
            return Err(SelectionIssue::InvalidStart {
                start,
                count,
                universe,
            });
        }
    }
    Ok(())
}
