use compact_genome::interface::alphabet::Alphabet;
use log::trace;
use ndarray::Array2;
use num_traits::{Bounded, Zero};

use crate::error::{Error, Result};
use crate::profile::{Profile, ProfileColumn};
use crate::scores::score::Score;
use crate::scores::substitution::SubstitutionScoreTable;

pub mod column_mapping;

use column_mapping::{ColumnMapping, MergeStep};

/// The three running states of the affine-gap recurrence at one cell.
///
/// `Diagonal` consumed a column from both profiles, `GapInSecond` consumed a
/// column from the first profile only (the second received a gap), and
/// `GapInFirst` the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DpState {
    Diagonal,
    GapInSecond,
    GapInFirst,
}

/// The state at the predecessor cell a transition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predecessor {
    Start,
    Diagonal,
    GapInSecond,
    GapInFirst,
}

impl Predecessor {
    fn into_state(self) -> Result<DpState> {
        match self {
            Predecessor::Start => Err(Error::InternalInconsistency(
                "the alignment backtrack reached an unreachable state".into(),
            )),
            Predecessor::Diagonal => Ok(DpState::Diagonal),
            Predecessor::GapInSecond => Ok(DpState::GapInSecond),
            Predecessor::GapInFirst => Ok(DpState::GapInFirst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellState {
    score: Score,
    predecessor: Predecessor,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            score: Score::min_value(),
            predecessor: Predecessor::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct ProfileMatrixEntry {
    diagonal: CellState,
    gap_in_second: CellState,
    gap_in_first: CellState,
}

impl ProfileMatrixEntry {
    fn state(&self, state: DpState) -> CellState {
        match state {
            DpState::Diagonal => self.diagonal,
            DpState::GapInSecond => self.gap_in_second,
            DpState::GapInFirst => self.gap_in_first,
        }
    }
}

/// The result of aligning two profiles: the column mapping that merges them
/// and the total alignment score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePairAlignment {
    pub mapping: ColumnMapping,
    pub score: Score,
}

/// The dynamic-programming matrix for aligning two profiles with affine gap
/// penalties.
///
/// Each cell holds the three running states of the recurrence explicitly.
/// Tie-breaking is by fixed candidate order with strict improvement
/// required: the candidate continuing the open state is listed first, so
/// equal-scoring paths prefer extending an open gap, which minimises the
/// total gap count. All comparisons are between finite floats with a total
/// order, so repeated runs produce identical paths.
#[derive(Debug, Clone)]
pub struct ProfileAlignmentMatrix {
    matrix: Array2<ProfileMatrixEntry>,
}

impl ProfileAlignmentMatrix {
    pub fn new(first_width: usize, second_width: usize) -> Self {
        Self {
            matrix: Array2::from_elem((first_width + 1, second_width + 1), Default::default()),
        }
    }

    pub fn align<AlphabetType: Alphabet>(
        &mut self,
        first: &Profile<AlphabetType>,
        second: &Profile<AlphabetType>,
        scores: &SubstitutionScoreTable<AlphabetType>,
    ) -> Result<ProfilePairAlignment> {
        self.initialise();
        self.fill(first, second, scores);
        self.backtrack(first.width(), second.width())
    }

    fn initialise(&mut self) {
        self.matrix[[0, 0]] = ProfileMatrixEntry::default();
        self.matrix[[0, 0]].diagonal = CellState {
            score: Score::zero(),
            predecessor: Predecessor::Start,
        };
    }

    fn fill<AlphabetType: Alphabet>(
        &mut self,
        first: &Profile<AlphabetType>,
        second: &Profile<AlphabetType>,
        scores: &SubstitutionScoreTable<AlphabetType>,
    ) {
        let (first_width, second_width) = (first.width(), second.width());

        for first_index in 0..=first_width {
            for second_index in 0..=second_width {
                if first_index == 0 && second_index == 0 {
                    continue;
                }

                let mut entry = ProfileMatrixEntry::default();

                if first_index > 0 && second_index > 0 {
                    let predecessor = self.matrix[[first_index - 1, second_index - 1]];
                    let substitution = column_score(
                        scores,
                        first.column(first_index - 1),
                        second.column(second_index - 1),
                    );
                    entry.diagonal = best_candidate([
                        (Predecessor::Diagonal, predecessor.diagonal.score + substitution),
                        (
                            Predecessor::GapInSecond,
                            predecessor.gap_in_second.score + substitution,
                        ),
                        (
                            Predecessor::GapInFirst,
                            predecessor.gap_in_first.score + substitution,
                        ),
                    ]);
                }

                if first_index > 0 {
                    let predecessor = self.matrix[[first_index - 1, second_index]];
                    let occupancy = first.column(first_index - 1).occupancy();
                    let open = scores.gap_open_penalty().scale(occupancy);
                    let extend = scores.gap_extend_penalty().scale(occupancy);
                    entry.gap_in_second = best_candidate([
                        (
                            Predecessor::GapInSecond,
                            predecessor.gap_in_second.score - extend,
                        ),
                        (Predecessor::Diagonal, predecessor.diagonal.score - open),
                        (Predecessor::GapInFirst, predecessor.gap_in_first.score - open),
                    ]);
                }

                if second_index > 0 {
                    let predecessor = self.matrix[[first_index, second_index - 1]];
                    let occupancy = second.column(second_index - 1).occupancy();
                    let open = scores.gap_open_penalty().scale(occupancy);
                    let extend = scores.gap_extend_penalty().scale(occupancy);
                    entry.gap_in_first = best_candidate([
                        (
                            Predecessor::GapInFirst,
                            predecessor.gap_in_first.score - extend,
                        ),
                        (Predecessor::Diagonal, predecessor.diagonal.score - open),
                        (
                            Predecessor::GapInSecond,
                            predecessor.gap_in_second.score - open,
                        ),
                    ]);
                }

                self.matrix[[first_index, second_index]] = entry;
            }
        }
    }

    fn backtrack(&self, first_width: usize, second_width: usize) -> Result<ProfilePairAlignment> {
        let target = self.matrix[[first_width, second_width]];
        let mut state = DpState::Diagonal;
        let mut best = target.diagonal;
        for candidate_state in [DpState::GapInSecond, DpState::GapInFirst] {
            let candidate = target.state(candidate_state);
            if candidate.score > best.score {
                best = candidate;
                state = candidate_state;
            }
        }

        if first_width == 0 && second_width == 0 {
            return Ok(ProfilePairAlignment {
                mapping: ColumnMapping::new(),
                score: Score::zero(),
            });
        }

        let score = best.score;
        let mut steps = Vec::with_capacity(first_width + second_width);
        let (mut first_index, mut second_index) = (first_width, second_width);
        while !(first_index == 0 && second_index == 0) {
            let cell_state = self.matrix[[first_index, second_index]].state(state);
            match state {
                DpState::Diagonal => {
                    steps.push(MergeStep::Both);
                    first_index -= 1;
                    second_index -= 1;
                }
                DpState::GapInSecond => {
                    steps.push(MergeStep::FirstOnly);
                    first_index -= 1;
                }
                DpState::GapInFirst => {
                    steps.push(MergeStep::SecondOnly);
                    second_index -= 1;
                }
            }

            if !(first_index == 0 && second_index == 0) {
                state = cell_state.predecessor.into_state()?;
            }
        }

        let mapping: ColumnMapping = steps.into_iter().rev().collect();
        trace!("Profile alignment backtrack complete: {mapping}");

        Ok(ProfilePairAlignment { mapping, score })
    }
}

fn best_candidate(candidates: [(Predecessor, Score); 3]) -> CellState {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }

    CellState {
        score: best.1,
        predecessor: best.0,
    }
}

/// The expected substitution score between two profile columns: the
/// frequency-weighted sum of the pairwise character scores.
fn column_score<AlphabetType: Alphabet>(
    scores: &SubstitutionScoreTable<AlphabetType>,
    first: &ProfileColumn,
    second: &ProfileColumn,
) -> Score {
    let mut total = 0.0;
    for first_character in 0..AlphabetType::SIZE {
        let first_count = first.character_count(first_character);
        if first_count == 0 {
            continue;
        }
        for second_character in 0..AlphabetType::SIZE {
            let second_count = second.character_count(second_character);
            if second_count == 0 {
                continue;
            }
            total += (first_count * second_count) as f64
                * scores.score_by_index(first_character, second_character).as_f64();
        }
    }

    Score::new(total / (first.row_count() * second.row_count()) as f64)
}

/// Aligns two profiles, returning the column mapping and the alignment
/// score.
pub fn align_profiles<AlphabetType: Alphabet>(
    first: &Profile<AlphabetType>,
    second: &Profile<AlphabetType>,
    scores: &SubstitutionScoreTable<AlphabetType>,
) -> Result<ProfilePairAlignment> {
    ProfileAlignmentMatrix::new(first.width(), second.width()).align(first, second, scores)
}

/// Aligns two profiles and merges them under the resulting column mapping.
pub fn align_and_merge<AlphabetType: Alphabet>(
    first: Profile<AlphabetType>,
    second: Profile<AlphabetType>,
    scores: &SubstitutionScoreTable<AlphabetType>,
) -> Result<(Profile<AlphabetType>, ProfilePairAlignment)> {
    let pair_alignment = align_profiles(&first, &second, scores)?;
    let merged = Profile::merge(first, second, &pair_alignment.mapping)?;

    Ok((merged, pair_alignment))
}

#[cfg(test)]
mod tests;
