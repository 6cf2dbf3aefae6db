use compact_genome::interface::alphabet::{Alphabet, AlphabetCharacter};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::Result;
use crate::guide_tree::GuideTree;
use crate::profile::Profile;
use crate::profile_alignment::align_and_merge;
use crate::scores::score::Score;
use crate::scores::substitution::SubstitutionScoreTable;

/// The alignment-quality objective: the sum over all row pairs of the
/// pairwise alignment score implied by the multiple alignment.
///
/// For each pair, columns where both rows carry a gap are projected away;
/// the remaining columns contribute substitution scores, and maximal
/// single-sided gap runs are charged with the affine open/extend penalties.
pub fn sum_of_pairs_score<AlphabetType: Alphabet + Sync>(
    profile: &Profile<AlphabetType>,
    scores: &SubstitutionScoreTable<AlphabetType>,
) -> Score
where
    AlphabetType::CharacterType: Send + Sync,
{
    let rows = profile.rows();
    let pairs: Vec<(usize, usize)> = (0..rows.len())
        .flat_map(|first| (first + 1..rows.len()).map(move |second| (first, second)))
        .collect();

    pairs
        .par_iter()
        .map(|&(first, second)| pair_score(rows[first].symbols(), rows[second].symbols(), scores))
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairGapState {
    None,
    InFirst,
    InSecond,
}

fn pair_score<AlphabetType: Alphabet>(
    first: &[Option<AlphabetType::CharacterType>],
    second: &[Option<AlphabetType::CharacterType>],
    scores: &SubstitutionScoreTable<AlphabetType>,
) -> Score {
    let mut total = 0.0;
    let mut state = PairGapState::None;
    for (first_symbol, second_symbol) in first.iter().zip(second) {
        match (first_symbol, second_symbol) {
            (Some(first_character), Some(second_character)) => {
                total += scores
                    .score_by_index(first_character.index(), second_character.index())
                    .as_f64();
                state = PairGapState::None;
            }
            (Some(_), None) => {
                total -= if state == PairGapState::InSecond {
                    scores.gap_extend_penalty().as_f64()
                } else {
                    scores.gap_open_penalty().as_f64()
                };
                state = PairGapState::InSecond;
            }
            (None, Some(_)) => {
                total -= if state == PairGapState::InFirst {
                    scores.gap_extend_penalty().as_f64()
                } else {
                    scores.gap_open_penalty().as_f64()
                };
                state = PairGapState::InFirst;
            }
            // Both rows gapped: the column is projected away and does not
            // interrupt a gap run.
            (None, None) => {}
        }
    }

    Score::new(total)
}

/// Iteratively improves an alignment by re-aligning tree bipartitions.
///
/// Each pass visits every non-root guide-tree edge, splits the alignment
/// into the two induced sub-profiles, drops their all-gap columns, re-aligns
/// the pair, and keeps the result only if the sum-of-pairs objective
/// strictly improves. Passes repeat until one yields no improvement or the
/// iteration budget is exhausted; finding no improvement is the normal
/// terminal state. The objective never decreases.
pub fn refine<AlphabetType: Alphabet + Sync>(
    profile: Profile<AlphabetType>,
    tree: &GuideTree,
    scores: &SubstitutionScoreTable<AlphabetType>,
    iteration_limit: usize,
) -> Result<(Profile<AlphabetType>, Score)>
where
    AlphabetType::CharacterType: Send + Sync,
{
    let mut current = profile;
    let mut current_score = sum_of_pairs_score(&current, scores);
    let bipartitions = tree.edge_bipartitions();
    let leaf_count = tree.leaf_count();

    for iteration in 0..iteration_limit {
        let mut improved = false;
        for group in &bipartitions {
            let mut mask = vec![false; leaf_count];
            for &sequence_index in group {
                mask[sequence_index] = true;
            }

            // Both sides are non-empty because the root edge is excluded.
            let (group_profile, rest_profile) = current.split_rows(&mask);
            let group_profile = group_profile.without_all_gap_columns();
            let rest_profile = rest_profile.without_all_gap_columns();

            let (candidate, _) = align_and_merge(group_profile, rest_profile, scores)?;
            let candidate_score = sum_of_pairs_score(&candidate, scores);
            if candidate_score > current_score {
                debug!(
                    "Refinement pass {iteration} accepted a bipartition of {} sequences: {current_score} -> {candidate_score}",
                    group.len()
                );
                current = candidate;
                current_score = candidate_score;
                improved = true;
            }
        }

        if !improved {
            info!("Refinement converged after {} passes", iteration + 1);
            break;
        }
    }

    Ok((current, current_score))
}

#[cfg(test)]
mod tests {
    use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;
    use compact_genome::interface::alphabet::Alphabet;

    use super::{pair_score, refine, sum_of_pairs_score};
    use crate::distance::kmer_distance_matrix;
    use crate::guide_tree::GuideTree;
    use crate::progressive::progressive_alignment;
    use crate::scores::score::Score;
    use crate::scores::substitution::SubstitutionScoreTable;
    use crate::sequence::SequenceCollection;

    fn character(ascii: u8) -> <DnaAlphabet as Alphabet>::CharacterType {
        DnaAlphabet::ascii_to_character(ascii).unwrap()
    }

    fn scores() -> SubstitutionScoreTable<DnaAlphabet> {
        SubstitutionScoreTable::new_match_mismatch(2.0, -1.0, 4.0, 1.0)
    }

    #[test]
    fn pair_score_charges_affine_gap_runs() {
        // AC--T against A-GGT: one deletion, one insertion run of two.
        let first = vec![
            Some(character(b'A')),
            Some(character(b'C')),
            None,
            None,
            Some(character(b'T')),
        ];
        let second = vec![
            Some(character(b'A')),
            None,
            Some(character(b'G')),
            Some(character(b'G')),
            Some(character(b'T')),
        ];

        // 2 (match) - 4 (open) - 4 (open) - 1 (extend) + 2 (match).
        assert_eq!(pair_score(&first, &second, &scores()), Score::new(-5.0));
    }

    #[test]
    fn pair_score_projects_shared_gap_columns() {
        // A--T against A--T: the all-gap columns vanish, leaving two
        // matches and no gap charges.
        let first = vec![
            Some(character(b'A')),
            None,
            None,
            Some(character(b'T')),
        ];
        assert_eq!(pair_score(&first, &first, &scores()), Score::new(4.0));
    }

    #[test]
    fn refinement_never_decreases_the_objective() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"AAAGGGTT".as_slice()),
            ("second", b"AAATGG".as_slice()),
            ("third", b"TTTGGGT".as_slice()),
            ("fourth", b"AAAGGT".as_slice()),
        ])
        .unwrap();
        let matrix = kmer_distance_matrix(&collection, 2, usize::MAX).unwrap();
        let tree = GuideTree::build(&matrix);
        let scores = scores();

        let initial = progressive_alignment(&collection, &tree, &scores).unwrap();
        let initial_score = sum_of_pairs_score(&initial, &scores);

        let (refined, refined_score) = refine(initial, &tree, &scores, 8).unwrap();
        assert!(refined_score >= initial_score);
        assert_eq!(refined_score, sum_of_pairs_score(&refined, &scores));
        assert_eq!(refined.row_count(), 4);
    }

    #[test]
    fn zero_iteration_budget_keeps_the_initial_alignment() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"AAAGGG".as_slice()),
            ("second", b"AAATGG".as_slice()),
            ("third", b"TTTGGG".as_slice()),
        ])
        .unwrap();
        let matrix = kmer_distance_matrix(&collection, 2, usize::MAX).unwrap();
        let tree = GuideTree::build(&matrix);
        let scores = scores();

        let initial = progressive_alignment(&collection, &tree, &scores).unwrap();
        let initial_width = initial.width();
        let initial_score = sum_of_pairs_score(&initial, &scores);

        let (kept, kept_score) = refine(initial, &tree, &scores, 0).unwrap();
        assert_eq!(kept.width(), initial_width);
        assert_eq!(kept_score, initial_score);
    }
}
