use crate::errors::PartitionError;
use crate::model::{Order, PartitionType, SubsetPartitionSpec};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fmt;

/// Disjoint groups of node indices keyed by 1-based partition id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMap {
    subsets: BTreeMap<usize, Vec<usize>>,
}

impl PartitionMap {
    pub fn get(&self, id: usize) -> Option<&[usize]> {
        self.subsets.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: usize) -> bool {
        self.subsets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.subsets.iter().map(|(id, nodes)| (*id, nodes.as_slice()))
    }
}

impl FromIterator<(usize, Vec<usize>)> for PartitionMap {
    fn from_iter<I: IntoIterator<Item = (usize, Vec<usize>)>>(iter: I) -> Self {
        Self {
            subsets: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for PartitionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(id, nodes)| format!("{}: {:?}", id, nodes))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Inclusive `min..=max`; empty when `max < min`.
pub fn make_range(min: usize, max: usize) -> Vec<usize> {
    (min..=max).collect()
}

/// A uniformly random permutation of `1..=n`.
pub fn one_perm(n: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut nodes = make_range(1, n);
    nodes.shuffle(rng);
    nodes
}

/// `floor(percent / 100 * total)`, computed in integers.
pub fn percent_of(percent: usize, total: usize) -> usize {
    percent * total / 100
}

/// 1-based inclusive node bounds of subset `subset` out of `num_subsets`.
///
/// Remainder nodes are pushed towards the later boundaries; existing test
/// fixtures depend on this exact split.
pub fn subset_bounds(subset: usize, num_subsets: usize, num_nodes: usize) -> (usize, usize) {
    let lower = (subset - 1) * num_nodes;
    let offset1 = usize::from(lower % num_subsets > 0);
    let start_node = 1 + lower / num_subsets + offset1;

    let upper = subset * num_nodes;
    let offset2 = usize::from(upper % num_subsets > 0);
    let end_node = upper / num_subsets + offset2;

    (start_node, end_node)
}

/// Splits `1..=nodes` into the partitions described by `spec`.
///
/// Returns `Ok(None)` when no partitioning is configured, which callers must
/// keep distinct from an empty map.
pub fn build(
    nodes: usize,
    spec: Option<&SubsetPartitionSpec>,
    rng: &mut StdRng,
) -> Result<Option<PartitionMap>, PartitionError> {
    let Some(spec) = spec else {
        return Ok(None);
    };

    let map = match spec.partition_type {
        PartitionType::Even => even_partition(spec.number_partitions, nodes, spec.order, rng)?,
        PartitionType::Weighted => weighted_partition(&spec.percents, nodes, spec.order, rng)?,
    };

    tracing::debug!(
        "Built {} {} {} partition(s) over {} nodes: {}",
        map.len(),
        spec.order,
        spec.partition_type,
        nodes,
        map
    );
    Ok(Some(map))
}

fn sample(nodes: usize, order: Order, rng: &mut StdRng) -> Vec<usize> {
    match order {
        Order::Sequential => make_range(1, nodes),
        Order::Random => one_perm(nodes, rng),
    }
}

fn even_partition(
    num_subsets: usize,
    nodes: usize,
    order: Order,
    rng: &mut StdRng,
) -> Result<PartitionMap, PartitionError> {
    if num_subsets == 0 {
        return Err(PartitionError::NoPartitions);
    }
    if num_subsets > nodes {
        return Err(PartitionError::TooManyPartitions {
            partitions: num_subsets,
            nodes,
        });
    }

    let sample = sample(nodes, order, rng);
    Ok((1..=num_subsets)
        .map(|i| {
            let (start, end) = subset_bounds(i, num_subsets, nodes);
            (i, sample[start - 1..end].to_vec())
        })
        .collect())
}

fn weighted_partition(
    percents: &[u32],
    nodes: usize,
    order: Order,
    rng: &mut StdRng,
) -> Result<PartitionMap, PartitionError> {
    if percents.len() > nodes {
        return Err(PartitionError::TooManyPartitions {
            partitions: percents.len(),
            nodes,
        });
    }
    let percent_sum = percents
        .iter()
        .try_fold(0u64, |acc, p| acc.checked_add(u64::from(*p)))
        .unwrap_or(u64::MAX);
    if percent_sum != 100 {
        return Err(PartitionError::PercentSum(percent_sum));
    }

    let sizes: Vec<usize> = percents
        .iter()
        .map(|p| percent_of(*p as usize, nodes))
        .collect();
    let mut leftovers = nodes - sizes.iter().sum::<usize>();

    let sample = sample(nodes, order, rng);
    let mut acc = 0;
    let mut map = BTreeMap::new();
    for (i, size) in sizes.into_iter().enumerate() {
        let mut size = size;
        if leftovers > 0 {
            leftovers -= 1;
            size += 1;
        }
        map.insert(i + 1, sample[acc..acc + size].to_vec());
        acc += size;
    }

    Ok(PartitionMap { subsets: map })
}
