use compact_genome::interface::alphabet::Alphabet;
use compact_genome::interface::sequence::GenomeSequence;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::guide_tree::{GuideTree, GuideTreeNode};
use crate::profile::Profile;
use crate::profile_alignment::align_and_merge;
use crate::scores::substitution::SubstitutionScoreTable;
use crate::sequence::SequenceCollection;

/// Builds the initial multiple alignment by walking the guide tree
/// bottom-up.
///
/// Leaves become single-sequence profiles; every internal node aligns and
/// merges its two children's profiles, so each merge operates on
/// already-complete sub-alignments. Child profiles are taken out of their
/// arena slots by value and die when the parent consumes them; only the root
/// profile survives.
pub fn progressive_alignment<AlphabetType: Alphabet>(
    collection: &SequenceCollection<AlphabetType>,
    tree: &GuideTree,
    scores: &SubstitutionScoreTable<AlphabetType>,
) -> Result<Profile<AlphabetType>> {
    if tree.leaf_count() != collection.len() {
        return Err(Error::InternalInconsistency(format!(
            "the guide tree has {} leaves, but the collection contains {} sequences",
            tree.leaf_count(),
            collection.len()
        )));
    }

    info!(
        "Progressively aligning {} sequences along the guide tree...",
        collection.len()
    );

    let mut slots: Vec<Option<Profile<AlphabetType>>> = (0..tree.node_count()).map(|_| None).collect();
    for node in tree.postorder() {
        let profile = match *tree.node(node) {
            GuideTreeNode::Leaf { sequence_index } => Profile::from_sequence(
                sequence_index,
                collection
                    .get(sequence_index)
                    .sequence()
                    .as_genome_subsequence(),
            ),
            GuideTreeNode::Internal { left, right, .. } => {
                let left_profile = slots[left].take().ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "the post-order walk visited node {node} before its child {left}"
                    ))
                })?;
                let right_profile = slots[right].take().ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "the post-order walk visited node {node} before its child {right}"
                    ))
                })?;

                let (merged, pair_alignment) = align_and_merge(left_profile, right_profile, scores)?;
                debug!(
                    "Merged node {node}: width {} ({})",
                    merged.width(),
                    pair_alignment.mapping
                );
                merged
            }
        };
        slots[node] = Some(profile);
    }

    slots[tree.root()].take().ok_or_else(|| {
        Error::InternalInconsistency("the post-order walk did not produce a root profile".into())
    })
}
