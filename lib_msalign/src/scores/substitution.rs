use std::marker::PhantomData;

use compact_genome::interface::alphabet::{Alphabet, AlphabetCharacter};

use crate::error::{Error, Result};
use crate::scores::score::Score;

/// Substitution scores over an alphabet, plus affine gap penalties.
///
/// The substitution table is stored row-major over character indices, like a
/// classical scoring matrix. Gap penalties are stored as non-negative
/// magnitudes and subtracted during alignment; the position-specific scaling
/// by column occupancy happens in the profile aligner.
#[derive(Debug, Eq, PartialEq)]
pub struct SubstitutionScoreTable<AlphabetType> {
    substitution_scores: Vec<Score>,
    gap_open_penalty: Score,
    gap_extend_penalty: Score,
    phantom_data: PhantomData<AlphabetType>,
}

impl<AlphabetType: Alphabet> SubstitutionScoreTable<AlphabetType> {
    /// Creates the uniform scheme: one score for identical characters, one
    /// for all mismatches.
    pub fn new_match_mismatch(
        match_score: f64,
        mismatch_score: f64,
        gap_open_penalty: f64,
        gap_extend_penalty: f64,
    ) -> Self {
        let mut substitution_scores =
            vec![Score::new(mismatch_score); AlphabetType::SIZE * AlphabetType::SIZE];
        for index in 0..AlphabetType::SIZE {
            substitution_scores[index * AlphabetType::SIZE + index] = Score::new(match_score);
        }

        Self {
            substitution_scores,
            gap_open_penalty: Score::new(gap_open_penalty),
            gap_extend_penalty: Score::new(gap_extend_penalty),
            phantom_data: Default::default(),
        }
    }

    /// Creates a table from a full row-major substitution matrix, e.g. a
    /// collaborator-supplied BLOSUM or PAM matrix.
    pub fn from_table(
        substitution_scores: impl Into<Vec<Score>>,
        gap_open_penalty: Score,
        gap_extend_penalty: Score,
    ) -> Result<Self> {
        let substitution_scores = substitution_scores.into();
        let expected = AlphabetType::SIZE * AlphabetType::SIZE;
        if substitution_scores.len() != expected {
            return Err(Error::WrongSubstitutionTableSize {
                actual: substitution_scores.len(),
                expected,
            });
        }

        Ok(Self {
            substitution_scores,
            gap_open_penalty,
            gap_extend_penalty,
            phantom_data: Default::default(),
        })
    }

    pub fn score(
        &self,
        c1: impl Into<AlphabetType::CharacterType>,
        c2: impl Into<AlphabetType::CharacterType>,
    ) -> Score {
        self.score_by_index(c1.into().index(), c2.into().index())
    }

    pub fn score_by_index(&self, c1: usize, c2: usize) -> Score {
        self.substitution_scores[c1 * AlphabetType::SIZE + c2]
    }

    pub fn gap_open_penalty(&self) -> Score {
        self.gap_open_penalty
    }

    pub fn gap_extend_penalty(&self) -> Score {
        self.gap_extend_penalty
    }

    pub fn max_substitution_score(&self) -> Score {
        self.substitution_scores.iter().max().copied().unwrap()
    }

    pub fn min_substitution_score(&self) -> Score {
        self.substitution_scores.iter().min().copied().unwrap()
    }
}

impl<AlphabetType: Alphabet> Default for SubstitutionScoreTable<AlphabetType> {
    fn default() -> Self {
        Self::new_match_mismatch(2.0, -1.0, 4.0, 1.0)
    }
}

impl<AlphabetType> Clone for SubstitutionScoreTable<AlphabetType> {
    fn clone(&self) -> Self {
        Self {
            substitution_scores: self.substitution_scores.clone(),
            gap_open_penalty: self.gap_open_penalty,
            gap_extend_penalty: self.gap_extend_penalty,
            phantom_data: self.phantom_data,
        }
    }
}
