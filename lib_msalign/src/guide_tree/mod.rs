use log::{debug, info};
use ndarray::Array2;
use noisy_float::types::{R64, r64};
use rand::Rng;

use crate::distance::DistanceMatrix;

/// A node of the guide tree, stored in the tree's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuideTreeNode {
    Leaf {
        sequence_index: usize,
    },
    Internal {
        left: usize,
        right: usize,
        /// UPGMA height: half the inter-cluster distance at merge time.
        height: R64,
    },
}

/// Binary clustering tree over the input sequences, built by average-linkage
/// (UPGMA) agglomeration.
///
/// Nodes live in an arena and reference each other by index; the first
/// `leaf_count` entries are the leaves, in sequence order, and the root is
/// always the last entry. Merge order is deterministic: among minimal-distance
/// cluster pairs, the lexicographically smallest pair of cluster ids wins.
/// This also resolves degenerate all-zero distance matrices (all-identical
/// sequences) without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuideTree {
    nodes: Vec<GuideTreeNode>,
    leaf_count: usize,
}

impl GuideTree {
    /// Builds the tree from a distance matrix by UPGMA.
    ///
    /// The new cluster's distance to every remaining cluster is the
    /// size-weighted average of the two merged clusters' distances.
    pub fn build(distances: &DistanceMatrix) -> Self {
        let n = distances.sequence_count();
        info!("Building guide tree over {n} sequences...");

        let total = 2 * n - 1;
        let mut nodes: Vec<GuideTreeNode> = (0..n)
            .map(|sequence_index| GuideTreeNode::Leaf { sequence_index })
            .collect();
        let mut sizes = vec![1usize; total];

        // Inter-cluster distances between all cluster ids ever created.
        let mut cluster_distances = Array2::from_elem((total, total), r64(0.0));
        for first in 0..n {
            for second in 0..n {
                cluster_distances[[first, second]] = distances.distance(first, second);
            }
        }

        // Ascending cluster ids; new ids are appended, so the order is
        // maintained and the first minimal pair found is the
        // lexicographically smallest.
        let mut active: Vec<usize> = (0..n).collect();

        while active.len() > 1 {
            let mut best: Option<(usize, usize, R64)> = None;
            for first_position in 0..active.len() {
                for second_position in first_position + 1..active.len() {
                    let first = active[first_position];
                    let second = active[second_position];
                    let distance = cluster_distances[[first, second]];
                    if best.is_none() || distance < best.unwrap().2 {
                        best = Some((first, second, distance));
                    }
                }
            }

            let (left, right, distance) = best.unwrap();
            let merged = nodes.len();
            debug!("Merging clusters {left} and {right} at distance {distance} into {merged}");
            nodes.push(GuideTreeNode::Internal {
                left,
                right,
                height: distance / r64(2.0),
            });
            sizes[merged] = sizes[left] + sizes[right];

            for &other in &active {
                if other == left || other == right {
                    continue;
                }
                let averaged = (r64(sizes[left] as f64) * cluster_distances[[left, other]]
                    + r64(sizes[right] as f64) * cluster_distances[[right, other]])
                    / r64(sizes[merged] as f64);
                cluster_distances[[merged, other]] = averaged;
                cluster_distances[[other, merged]] = averaged;
            }

            active.retain(|&cluster| cluster != left && cluster != right);
            active.push(merged);
        }

        Self {
            nodes,
            leaf_count: n,
        }
    }

    /// Builds the tree from a perturbed copy of the distance matrix; the
    /// ensemble strategy uses this to vary merge order between replicates.
    pub fn build_perturbed(
        distances: &DistanceMatrix,
        rng: &mut impl Rng,
        magnitude: f64,
    ) -> Self {
        Self::build(&distances.perturbed(rng, magnitude))
    }

    pub fn root(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node(&self, index: usize) -> &GuideTreeNode {
        &self.nodes[index]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Node indices in post-order: children always precede their parent.
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            stack.push((node, true));
            if let GuideTreeNode::Internal { left, right, .. } = self.nodes[node] {
                stack.push((right, false));
                stack.push((left, false));
            }
        }

        order
    }

    /// The sequence indices of all leaves below the given node, left to
    /// right.
    pub fn leaves_below(&self, node: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            match self.nodes[node] {
                GuideTreeNode::Leaf { sequence_index } => leaves.push(sequence_index),
                GuideTreeNode::Internal { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }

        leaves
    }

    /// The bipartitions induced by every non-root edge, as the leaf set on
    /// the far side of the edge, in arena index order. The complement of
    /// each group is never empty because the root is excluded.
    pub fn edge_bipartitions(&self) -> Vec<Vec<usize>> {
        (0..self.nodes.len())
            .filter(|&node| node != self.root())
            .map(|node| self.leaves_below(node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{GuideTree, GuideTreeNode};
    use crate::distance::kmer_distance_matrix;
    use crate::sequence::SequenceCollection;
    use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;

    fn scenario_matrix() -> crate::distance::DistanceMatrix {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"AAAGGG".as_slice()),
            ("second", b"AAATGG".as_slice()),
            ("third", b"TTTGGG".as_slice()),
        ])
        .unwrap();
        kmer_distance_matrix(&collection, 2, usize::MAX).unwrap()
    }

    #[test]
    fn closest_pair_merges_first() {
        let tree = GuideTree::build(&scenario_matrix());

        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.node_count(), 5);
        // The two most similar sequences join below the root.
        assert!(matches!(
            tree.node(3),
            GuideTreeNode::Internal {
                left: 0,
                right: 1,
                ..
            }
        ));
        assert!(matches!(
            tree.node(tree.root()),
            GuideTreeNode::Internal {
                left: 2,
                right: 3,
                ..
            }
        ));
    }

    #[test]
    fn construction_is_deterministic() {
        let matrix = scenario_matrix();
        assert_eq!(GuideTree::build(&matrix), GuideTree::build(&matrix));
    }

    #[test]
    fn all_identical_sequences_resolve_deterministically() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("a", b"ACGTACGT".as_slice()),
            ("b", b"ACGTACGT".as_slice()),
            ("c", b"ACGTACGT".as_slice()),
            ("d", b"ACGTACGT".as_slice()),
        ])
        .unwrap();
        let matrix = kmer_distance_matrix(&collection, 3, usize::MAX).unwrap();
        let tree = GuideTree::build(&matrix);

        // All distances are zero; the lexicographic tie-break pairs clusters
        // in insertion order.
        assert_eq!(
            tree.node(4),
            &GuideTreeNode::Internal {
                left: 0,
                right: 1,
                height: noisy_float::types::r64(0.0),
            }
        );
        assert_eq!(
            tree.node(5),
            &GuideTreeNode::Internal {
                left: 2,
                right: 3,
                height: noisy_float::types::r64(0.0),
            }
        );
        assert_eq!(
            tree.node(6),
            &GuideTreeNode::Internal {
                left: 4,
                right: 5,
                height: noisy_float::types::r64(0.0),
            }
        );
    }

    #[test]
    fn postorder_visits_children_before_parents() {
        let tree = GuideTree::build(&scenario_matrix());
        let order = tree.postorder();

        assert_eq!(order.len(), tree.node_count());
        let mut position = vec![0; tree.node_count()];
        for (index, &node) in order.iter().enumerate() {
            position[node] = index;
        }
        for node in 0..tree.node_count() {
            if let GuideTreeNode::Internal { left, right, .. } = *tree.node(node) {
                assert!(position[left] < position[node]);
                assert!(position[right] < position[node]);
            }
        }
    }

    #[test]
    fn edge_bipartitions_exclude_the_root() {
        let tree = GuideTree::build(&scenario_matrix());
        let bipartitions = tree.edge_bipartitions();

        assert_eq!(bipartitions.len(), tree.node_count() - 1);
        for group in &bipartitions {
            assert!(!group.is_empty());
            assert!(group.len() < tree.leaf_count());
        }
    }
}
