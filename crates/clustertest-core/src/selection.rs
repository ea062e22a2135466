use crate::errors::SelectionIssue;
use crate::model::{Order, PercentSpec, RangeSpec, Step};
use crate::partition::{make_range, percent_of, PartitionMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRule {
    Sequential { start: usize, end: usize },
    Random { number: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentRule {
    Sequential { start: usize, percent: i32 },
    Random { percent: i32 },
}

impl PercentRule {
    pub fn percent(&self) -> i32 {
        match self {
            PercentRule::Sequential { percent, .. } | PercentRule::Random { percent } => *percent,
        }
    }

    /// Number of nodes this rule picks out of `universe`; percentages truncate.
    pub fn count(&self, universe: usize) -> usize {
        percent_of(self.percent().max(0) as usize, universe)
    }
}

impl From<&RangeSpec> for RangeRule {
    fn from(spec: &RangeSpec) -> Self {
        match spec.order {
            Order::Sequential => RangeRule::Sequential {
                start: spec.start,
                end: spec.end,
            },
            Order::Random => RangeRule::Random {
                number: spec.number,
            },
        }
    }
}

impl From<&PercentSpec> for PercentRule {
    fn from(spec: &PercentSpec) -> Self {
        match spec.order {
            Order::Sequential => PercentRule::Sequential {
                start: spec.start,
                percent: spec.percent,
            },
            Order::Random => PercentRule::Random {
                percent: spec.percent,
            },
        }
    }
}

/// The one way a step picks its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSelection {
    OnNodeRange {
        on_node: usize,
        end_node: usize,
    },
    Subsets {
        subsets: Vec<usize>,
    },
    Range {
        subsets: Option<Vec<usize>>,
        rule: RangeRule,
    },
    Percent {
        subsets: Option<Vec<usize>>,
        rule: PercentRule,
    },
}

impl NodeSelection {
    /// Resolves the mutually exclusive selection fields of a step.
    pub fn from_step(step: &Step) -> Result<Self, SelectionIssue> {
        let selection = match (step.on_node > 0, &step.selection) {
            (false, None) => return Err(SelectionIssue::NoSelectionMethod),
            (true, Some(_)) => return Err(SelectionIssue::TwoSelectionMethods),
            (true, None) => {
                return Ok(NodeSelection::OnNodeRange {
                    on_node: step.on_node,
                    end_node: step.end_node,
                })
            }
            (false, Some(selection)) => selection,
        };

        let subsets = selection.subset.clone();
        match (&selection.range, &selection.percent) {
            (Some(_), Some(_)) => Err(SelectionIssue::TwoSelectionFormats),
            (Some(range), None) => Ok(NodeSelection::Range {
                subsets,
                rule: range.into(),
            }),
            (None, Some(percent)) => Ok(NodeSelection::Percent {
                subsets,
                rule: percent.into(),
            }),
            (None, None) => match subsets {
                Some(subsets) => Ok(NodeSelection::Subsets { subsets }),
                None => Err(SelectionIssue::NoSelectionMethod),
            },
        }
    }

    pub fn subsets(&self) -> Option<&[usize]> {
        match self {
            NodeSelection::OnNodeRange { .. } => None,
            NodeSelection::Subsets { subsets } => Some(subsets),
            NodeSelection::Range { subsets, .. } | NodeSelection::Percent { subsets, .. } => {
                subsets.as_deref()
            }
        }
    }
}

/// Picks from `universe` by position, so the same rule works for the whole
/// node set and for a single partition.
fn select_from_range(universe: &[usize], rule: RangeRule, rng: &mut StdRng) -> Vec<usize> {
    match rule {
        RangeRule::Sequential { start, end } => positions(universe, start, end),
        RangeRule::Random { number } => random_prefix(universe, number, rng),
    }
}

fn select_from_percent(universe: &[usize], rule: PercentRule, rng: &mut StdRng) -> Vec<usize> {
    let count = rule.count(universe.len());
    match rule {
        PercentRule::Sequential { start, .. } => {
            positions(universe, start, (start + count).saturating_sub(1))
        }
        PercentRule::Random { .. } => random_prefix(universe, count, rng),
    }
}

fn positions(universe: &[usize], start: usize, end: usize) -> Vec<usize> {
    make_range(start.max(1), end.min(universe.len()))
        .into_iter()
        .map(|pos| universe[pos - 1])
        .collect()
}

fn random_prefix(universe: &[usize], count: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut shuffled = universe.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

fn across_universes(
    subsets: Option<&[usize]>,
    nodes: usize,
    partitions: Option<&PartitionMap>,
    rng: &mut StdRng,
    mut pick: impl FnMut(&[usize], &mut StdRng) -> Vec<usize>,
) -> Vec<usize> {
    match subsets {
        None => pick(&make_range(1, nodes), rng),
        Some(ids) => {
            let mut selected = Vec::new();
            for universe in ids.iter().filter_map(|id| partitions.and_then(|p| p.get(*id))) {
                selected.extend(pick(universe, rng));
            }
            selected
        }
    }
}

/// Resolves the ordered list of 1-based node indices a step runs on.
///
/// With subsets, the rule is applied to every listed partition on its own and
/// the per-partition results are concatenated in listed order. The selection
/// is expected to have passed validation.
pub fn select_nodes(
    selection: &NodeSelection,
    nodes: usize,
    partitions: Option<&PartitionMap>,
    rng: &mut StdRng,
) -> Vec<usize> {
    match selection {
        NodeSelection::OnNodeRange { on_node, end_node } => {
            if *end_node == 0 {
                vec![*on_node]
            } else {
                make_range(*on_node, *end_node)
            }
        }
        NodeSelection::Subsets { subsets } => {
            across_universes(Some(subsets), nodes, partitions, rng, |u, _| u.to_vec())
        }
        NodeSelection::Range { subsets, rule } => {
            across_universes(subsets.as_deref(), nodes, partitions, rng, |u, rng| {
                select_from_range(u, *rule, rng)
            })
        }
        NodeSelection::Percent { subsets, rule } => {
            across_universes(subsets.as_deref(), nodes, partitions, rng, |u, rng| {
                select_from_percent(u, *rule, rng)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PartitionType, Selection, SubsetPartitionSpec};
    use crate::partition;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn step(on_node: usize, end_node: usize, selection: Option<Selection>) -> Step {
        Step {
            name: "step".to_string(),
            on_node,
            end_node,
            selection,
            cmd: "true".to_string(),
            timeout: 0,
            outputs: vec![],
            assertions: vec![],
            inputs: vec![],
            write_to_file: None,
            iterate: None,
        }
    }

    fn range(order: Order, start: usize, end: usize, number: usize) -> Selection {
        Selection {
            subset: None,
            range: Some(RangeSpec {
                order,
                start,
                end,
                number,
            }),
            percent: None,
        }
    }

    fn percent(order: Order, start: usize, percent: i32) -> Selection {
        Selection {
            subset: None,
            range: None,
            percent: Some(PercentSpec {
                order,
                start,
                percent,
            }),
        }
    }

    fn even_sequential(nodes: usize, k: usize) -> PartitionMap {
        let spec = SubsetPartitionSpec {
            partition_type: PartitionType::Even,
            order: Order::Sequential,
            percents: vec![],
            number_partitions: k,
        };
        partition::build(nodes, Some(&spec), &mut rng())
            .unwrap()
            .unwrap()
    }

    fn resolve(step: &Step, nodes: usize, partitions: Option<&PartitionMap>) -> Vec<usize> {
        let selection = NodeSelection::from_step(step).unwrap();
        select_nodes(&selection, nodes, partitions, &mut rng())
    }

    #[test]
    fn test_legacy_single_node() {
        assert_eq!(resolve(&step(3, 0, None), 5, None), vec![3]);
    }

    #[test]
    fn test_legacy_range() {
        assert_eq!(resolve(&step(2, 4, None), 5, None), vec![2, 3, 4]);
    }

    #[test]
    fn test_sequential_range_is_stable() {
        let s = step(0, 0, Some(range(Order::Sequential, 2, 4, 0)));
        for _ in 0..10 {
            assert_eq!(resolve(&s, 5, None), vec![2, 3, 4]);
        }
    }

    #[test]
    fn test_random_range_distinct_and_in_bounds() {
        let s = step(0, 0, Some(range(Order::Random, 0, 0, 3)));
        let selection = NodeSelection::from_step(&s).unwrap();
        let mut rng = rng();
        for _ in 0..50 {
            let picked = select_nodes(&selection, 5, None, &mut rng);
            assert_eq!(picked.len(), 3);
            let unique: BTreeSet<_> = picked.iter().copied().collect();
            assert_eq!(unique.len(), 3);
            assert!(picked.iter().all(|n| (1..=5).contains(n)));
        }
    }

    #[test]
    fn test_percent_truncates() {
        let s = step(0, 0, Some(percent(Order::Sequential, 1, 50)));
        assert_eq!(resolve(&s, 5, None), vec![1, 2]);
        let r = step(0, 0, Some(percent(Order::Random, 0, 50)));
        assert_eq!(resolve(&r, 5, None).len(), 2);
    }

    #[test]
    fn test_percent_sequential_with_offset() {
        let s = step(0, 0, Some(percent(Order::Sequential, 3, 40)));
        assert_eq!(resolve(&s, 5, None), vec![3, 4]);
    }

    #[test]
    fn test_subset_only_concatenates_whole_partitions() {
        let partitions = even_sequential(5, 5);
        let s = step(
            0,
            0,
            Some(Selection {
                subset: Some(vec![1, 3, 5]),
                range: None,
                percent: None,
            }),
        );
        assert_eq!(resolve(&s, 5, Some(&partitions)), vec![1, 3, 5]);
    }

    #[test]
    fn test_range_applies_per_subset() {
        // partitions {1: [1, 2], 2: [3, 4], 3: [5]}
        let partitions = even_sequential(5, 3);
        let mut sel = range(Order::Sequential, 1, 1, 0);
        sel.subset = Some(vec![2, 1]);
        let s = step(0, 0, Some(sel));
        assert_eq!(resolve(&s, 5, Some(&partitions)), vec![3, 1]);

        let mut sel = range(Order::Sequential, 1, 2, 0);
        sel.subset = Some(vec![1, 2]);
        let s = step(0, 0, Some(sel));
        assert_eq!(resolve(&s, 5, Some(&partitions)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_random_percent_per_subset_sizes() {
        let partitions = even_sequential(10, 2);
        let mut sel = percent(Order::Random, 0, 40);
        sel.subset = Some(vec![1, 2]);
        let s = step(0, 0, Some(sel));
        let picked = resolve(&s, 10, Some(&partitions));
        assert_eq!(picked.len(), 4);
        assert!(picked[..2].iter().all(|n| (1..=5).contains(n)));
        assert!(picked[2..].iter().all(|n| (6..=10).contains(n)));
    }

    #[test]
    fn test_from_step_rejects_ambiguous_shapes() {
        assert_eq!(
            NodeSelection::from_step(&step(0, 0, None)),
            Err(SelectionIssue::NoSelectionMethod)
        );
        assert_eq!(
            NodeSelection::from_step(&step(1, 0, Some(range(Order::Sequential, 1, 1, 0)))),
            Err(SelectionIssue::TwoSelectionMethods)
        );
        let mut both = range(Order::Sequential, 1, 1, 0);
        both.percent = Some(PercentSpec {
            order: Order::Random,
            start: 0,
            percent: 10,
        });
        assert_eq!(
            NodeSelection::from_step(&step(0, 0, Some(both))),
            Err(SelectionIssue::TwoSelectionFormats)
        );
        assert_eq!(
            NodeSelection::from_step(&step(0, 0, Some(Selection::default()))),
            Err(SelectionIssue::NoSelectionMethod)
        );
    }
}
