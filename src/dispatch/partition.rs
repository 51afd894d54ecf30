//! Size-balanced partitioning of artifacts into worker groups.
//!
//! Uses greedy longest-processing-time-first: artifacts are visited from
//! largest to smallest and each one goes to the currently lightest group.
//! The result is within 4/3 of the optimal makespan and costs
//! O(n log n + n * groups).

use super::registry::Artifact;

/// A set of artifacts assigned to one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    artifacts: Vec<Artifact>,
    total_size: u64,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, keeping the running total in sync.
    pub fn push(&mut self, artifact: Artifact) {
        self.total_size += artifact.size();
        self.artifacts.push(artifact);
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Exact sum of member artifact sizes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl FromIterator<Artifact> for Group {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let mut group = Group::new();
        for artifact in iter {
            group.push(artifact);
        }
        group
    }
}

/// Complete assignment of artifacts to groups.
pub type Partition = Vec<Group>;

/// Split artifacts into at most `max_groups` groups of roughly equal total size.
///
/// - No artifacts: no groups.
/// - Fewer artifacts than `max_groups`: one group holding everything, in input order.
/// - Otherwise exactly `max_groups` groups built by greedy LPT. Ties in size keep
///   input order; ties in group load go to the lowest group index.
///
/// `max_groups == 0` is treated as 1.
///
/// # Examples
///
/// ```
/// use genabc::dispatch::{Artifact, partition};
///
/// let artifacts: Vec<_> = [10, 9, 8, 7, 6, 5]
///     .iter()
///     .enumerate()
///     .map(|(i, size)| Artifact::new(format!("/out/{i}.temp.js"), *size))
///     .collect();
/// let groups = partition(&artifacts, 3);
/// assert!(groups.iter().all(|g| g.total_size() == 15));
/// ```
pub fn partition(artifacts: &[Artifact], max_groups: usize) -> Partition {
    let max_groups = max_groups.max(1);
    if artifacts.is_empty() {
        return Vec::new();
    }
    if artifacts.len() < max_groups {
        return vec![artifacts.iter().cloned().collect()];
    }

    let mut sorted: Vec<&Artifact> = artifacts.iter().collect();
    // sort_by is stable
    sorted.sort_by(|a, b| b.size().cmp(&a.size()));

    let mut groups: Partition = (0..max_groups).map(|_| Group::new()).collect();
    for artifact in sorted {
        let lightest = lightest_group(&groups);
        groups[lightest].push(artifact.clone());
    }
    groups
}

/// Index of the group with the smallest total, lowest index on ties.
fn lightest_group(groups: &[Group]) -> usize {
    groups
        .iter()
        .enumerate()
        .min_by_key(|(idx, group)| (group.total_size(), *idx))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn artifacts(sizes: &[u64]) -> Vec<Artifact> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| Artifact::new(format!("/out/f{}.temp.js", i), *size))
            .collect()
    }

    fn sizes(group: &Group) -> Vec<u64> {
        group.artifacts().iter().map(Artifact::size).collect()
    }

    #[test]
    fn test_perfectly_balanced_case() {
        let input = artifacts(&[10, 9, 8, 7, 6, 5]);
        let groups = partition(&input, 3);

        assert_eq!(groups.len(), 3);
        assert_eq!(sizes(&groups[0]), vec![10, 5]);
        assert_eq!(sizes(&groups[1]), vec![9, 6]);
        assert_eq!(sizes(&groups[2]), vec![8, 7]);
        for group in &groups {
            assert_eq!(group.total_size(), 15);
        }
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        assert!(partition(&[], 3).is_empty());
    }

    #[test]
    fn test_fewer_artifacts_than_groups_yields_single_group() {
        let input = artifacts(&[1, 100]);
        let groups = partition(&input, 3);
        assert_eq!(groups.len(), 1);
        // Input order is preserved in the single group
        assert_eq!(sizes(&groups[0]), vec![1, 100]);
        assert_eq!(groups[0].total_size(), 101);
    }

    #[test]
    fn test_group_count_equals_max_groups_when_enough_artifacts() {
        for n in 3..12 {
            let input = artifacts(&vec![1; n]);
            assert_eq!(partition(&input, 3).len(), 3, "n = {}", n);
        }
    }

    #[test]
    fn test_zero_max_groups_treated_as_one() {
        let input = artifacts(&[4, 2, 9]);
        let groups = partition(&input, 0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_size(), 15);
    }

    #[test]
    fn test_every_artifact_appears_exactly_once() {
        let input = artifacts(&[13, 1, 1, 7, 42, 0, 3, 3, 3, 19, 8, 2, 25]);
        for max_groups in 1..6 {
            let groups = partition(&input, max_groups);
            let mut seen = HashSet::new();
            let mut count = 0;
            for group in &groups {
                for artifact in group.artifacts() {
                    assert!(seen.insert(artifact.path().to_path_buf()));
                    count += 1;
                }
            }
            assert_eq!(count, input.len());
            let expected: HashSet<PathBuf> =
                input.iter().map(|a| a.path().to_path_buf()).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_total_size_matches_members() {
        let input = artifacts(&[13, 1, 1, 7, 42, 0, 3, 3, 3, 19, 8, 2, 25]);
        let groups = partition(&input, 4);
        for group in &groups {
            let sum: u64 = group.artifacts().iter().map(Artifact::size).sum();
            assert_eq!(group.total_size(), sum);
        }
        let total: u64 = groups.iter().map(Group::total_size).sum();
        assert_eq!(total, input.iter().map(Artifact::size).sum::<u64>());
    }

    #[test]
    fn test_equal_sizes_keep_input_order() {
        let input = artifacts(&[5, 5, 5, 5]);
        let groups = partition(&input, 2);
        let paths = |g: &Group| -> Vec<String> {
            g.artifacts()
                .iter()
                .map(|a| a.path().to_string_lossy().into_owned())
                .collect()
        };
        assert_eq!(paths(&groups[0]), vec!["/out/f0.temp.js", "/out/f2.temp.js"]);
        assert_eq!(paths(&groups[1]), vec!["/out/f1.temp.js", "/out/f3.temp.js"]);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let input = artifacts(&[31, 4, 15, 9, 26, 5, 35, 8, 9, 7, 9]);
        let first = partition(&input, 3);
        for _ in 0..10 {
            assert_eq!(partition(&input, 3), first);
        }
    }

    #[test]
    fn test_skew_is_bounded_by_largest_item() {
        let input = artifacts(&[31, 4, 15, 9, 26, 5, 35, 8, 9, 7, 9]);
        let groups = partition(&input, 3);
        let max = groups.iter().map(Group::total_size).max().unwrap();
        let min = groups.iter().map(Group::total_size).min().unwrap();
        let largest = input.iter().map(Artifact::size).max().unwrap();
        assert!(max - min <= largest);
    }
}
