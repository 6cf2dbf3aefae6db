use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;
use compact_genome::implementation::vec_sequence::VectorGenome;
use compact_genome::interface::sequence::{GenomeSequence, OwnedGenomeSequence};

use super::{align_and_merge, align_profiles};
use crate::profile::Profile;
use crate::scores::score::Score;
use crate::scores::substitution::SubstitutionScoreTable;

fn leaf(sequence_index: usize, ascii: &[u8]) -> Profile<DnaAlphabet> {
    let sequence = VectorGenome::<DnaAlphabet>::from_iter_u8(ascii.iter().copied()).unwrap();
    Profile::from_sequence(sequence_index, sequence.as_genome_subsequence())
}

fn scores() -> SubstitutionScoreTable<DnaAlphabet> {
    SubstitutionScoreTable::new_match_mismatch(2.0, -1.0, 4.0, 1.0)
}

#[test]
fn identical_sequences_align_without_gaps() {
    let result = align_profiles(&leaf(0, b"ACGT"), &leaf(1, b"ACGT"), &scores()).unwrap();

    assert_eq!(result.mapping.cigar(), "4M");
    assert_eq!(result.score, Score::new(8.0));
}

#[test]
fn tie_breaking_produces_a_single_gap_run() {
    let result = align_profiles(&leaf(0, b"AAAA"), &leaf(1, b"AA"), &scores()).unwrap();

    // Two matches, one gap run of length two: 2 * 2 - (4 + 1).
    assert_eq!(result.score, Score::new(-1.0));
    assert_eq!(result.mapping.first_consumed(), 4);
    assert_eq!(result.mapping.second_consumed(), 2);
    assert_eq!(result.mapping.merged_width(), 4);
    assert_eq!(result.mapping.gap_run_count(), 1);
}

#[test]
fn empty_profile_aligns_to_all_gaps() {
    let result = align_profiles(&leaf(0, b""), &leaf(1, b"AA"), &scores()).unwrap();

    assert_eq!(result.mapping.cigar(), "2I");
    assert_eq!(result.score, Score::new(-5.0));
}

#[test]
fn merged_profile_has_mapping_width() {
    let (merged, result) = align_and_merge(leaf(0, b"ACGT"), leaf(1, b"AGT"), &scores()).unwrap();

    assert_eq!(merged.width(), result.mapping.merged_width());
    assert_eq!(merged.row_count(), 2);
    assert_eq!(result.mapping.first_consumed(), 4);
    assert_eq!(result.mapping.second_consumed(), 3);

    // The single unmatched reference column carries the one gap.
    let gap_columns: Vec<_> = (0..merged.width())
        .filter(|&column| merged.column(column).gap_count() > 0)
        .collect();
    assert_eq!(gap_columns.len(), 1);
}

#[test]
fn gap_placement_prefers_matching_flanks() {
    // ACGT against AGT: deleting the C keeps three matches.
    let result = align_profiles(&leaf(0, b"ACGT"), &leaf(1, b"AGT"), &scores()).unwrap();

    assert_eq!(result.mapping.cigar(), "1M1D2M");
    // Three matches minus one opened gap: 3 * 2 - 4.
    assert_eq!(result.score, Score::new(2.0));
}

#[test]
fn profile_against_profile_alignment_uses_column_frequencies() {
    // Build a two-row profile and align a third sequence against it.
    let (profile, _) = align_and_merge(leaf(0, b"ACGT"), leaf(1, b"ACGT"), &scores()).unwrap();
    let result = align_profiles(&profile, &leaf(2, b"ACGT"), &scores()).unwrap();

    assert_eq!(result.mapping.cigar(), "4M");
    assert_eq!(result.score, Score::new(8.0));
}
