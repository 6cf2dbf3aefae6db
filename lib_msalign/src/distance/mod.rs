use compact_genome::interface::alphabet::{Alphabet, AlphabetCharacter};
use compact_genome::interface::sequence::GenomeSequence;
use deterministic_default_hasher::DeterministicHashMap;
use log::{debug, info};
use ndarray::Array2;
use noisy_float::types::{R64, r64};
use rand::Rng;
use rayon::prelude::*;
use traitsequence::interface::Sequence;

use crate::error::{Error, Result};
use crate::sequence::SequenceCollection;

/// Symmetric pairwise dissimilarities in `[0, 1]` with a zero diagonal.
///
/// Derived once per run from the sequence collection and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceMatrix {
    matrix: Array2<R64>,
}

impl DistanceMatrix {
    pub fn sequence_count(&self) -> usize {
        self.matrix.dim().0
    }

    pub fn distance(&self, first: usize, second: usize) -> R64 {
        self.matrix[[first, second]]
    }

    /// Returns a copy with every off-diagonal entry multiplied by an
    /// independent factor in `[1 - magnitude, 1 + magnitude]`, clamped to be
    /// non-negative. Symmetry and the zero diagonal are preserved.
    ///
    /// The caller owns the generator, so concurrent perturbed copies cannot
    /// interfere with each other.
    pub fn perturbed(&self, rng: &mut impl Rng, magnitude: f64) -> Self {
        if magnitude == 0.0 {
            return self.clone();
        }

        let n = self.sequence_count();
        let mut matrix = self.matrix.clone();
        for first in 0..n {
            for second in first + 1..n {
                let factor = 1.0 + rng.gen_range(-magnitude..=magnitude);
                let value = r64((self.matrix[[first, second]].raw() * factor).max(0.0));
                matrix[[first, second]] = value;
                matrix[[second, first]] = value;
            }
        }

        Self { matrix }
    }
}

/// Returns whether k-mers of the given length over the given alphabet fit
/// the packed `u64` representation.
pub(crate) fn packed_kmer_fits(alphabet_size: usize, kmer_length: usize) -> bool {
    let mut capacity = 1u128;
    for _ in 0..kmer_length {
        capacity = capacity.saturating_mul(alphabet_size as u128);
        if capacity > u64::MAX as u128 + 1 {
            return false;
        }
    }

    true
}

type KmerTally = DeterministicHashMap<u64, usize>;

/// Estimates pairwise dissimilarities from shared k-mer statistics.
///
/// For a pair of sequences the dissimilarity is `1 - F` where `F` is the
/// fraction of shared k-mers,
/// `F = Σ_τ min(count_a(τ), count_b(τ)) / (min(len_a, len_b) - k + 1)`.
/// Identical sequences are zero by construction; any pair involving a
/// sequence shorter than `k` degenerates to the maximal distance of one.
pub fn kmer_distance_matrix<AlphabetType: Alphabet + Sync>(
    collection: &SequenceCollection<AlphabetType>,
    kmer_length: usize,
    entry_budget: usize,
) -> Result<DistanceMatrix>
where
    AlphabetType::CharacterType: Send + Sync,
{
    collection.ensure_alignable()?;
    if kmer_length == 0 {
        return Err(Error::KmerLengthZero);
    }
    if !packed_kmer_fits(AlphabetType::SIZE, kmer_length) {
        return Err(Error::KmerLengthTooLarge {
            kmer_length,
            alphabet_size: AlphabetType::SIZE,
        });
    }

    let n = collection.len();
    let entries = n.checked_mul(n).ok_or(Error::ResourceExhausted {
        sequences: n,
        budget: entry_budget,
    })?;
    if entries > entry_budget {
        return Err(Error::ResourceExhausted {
            sequences: n,
            budget: entry_budget,
        });
    }

    info!("Estimating pairwise distances for {n} sequences with {kmer_length}-mers...");

    let tallies: Vec<KmerTally> = (0..n)
        .into_par_iter()
        .map(|index| {
            kmer_tally(
                collection.get(index).sequence().as_genome_subsequence(),
                kmer_length,
            )
        })
        .collect();

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|first| (first + 1..n).map(move |second| (first, second)))
        .collect();
    let distances = pairs
        .par_iter()
        .map(|&(first, second)| {
            pair_distance(collection, &tallies, first, second, kmer_length)
                .map(|distance| (first, second, distance))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut matrix = Array2::from_elem((n, n), r64(0.0));
    for (first, second, distance) in distances {
        matrix[[first, second]] = distance;
        matrix[[second, first]] = distance;
    }

    debug!("Distance matrix over {n} sequences complete");
    Ok(DistanceMatrix { matrix })
}

fn kmer_tally<
    AlphabetType: Alphabet,
    SubsequenceType: GenomeSequence<AlphabetType, SubsequenceType> + ?Sized,
>(
    sequence: &SubsequenceType,
    kmer_length: usize,
) -> KmerTally {
    let mut tally = KmerTally::default();
    if sequence.len() < kmer_length {
        return tally;
    }

    for offset in 0..=sequence.len() - kmer_length {
        let mut key = 0u64;
        for position in offset..offset + kmer_length {
            key = key * AlphabetType::SIZE as u64 + sequence[position].index() as u64;
        }
        *tally.entry(key).or_insert(0) += 1;
    }

    tally
}

fn pair_distance<AlphabetType: Alphabet>(
    collection: &SequenceCollection<AlphabetType>,
    tallies: &[KmerTally],
    first: usize,
    second: usize,
    kmer_length: usize,
) -> Result<R64> {
    let sequence_a = collection.get(first).sequence().as_genome_subsequence();
    let sequence_b = collection.get(second).sequence().as_genome_subsequence();

    if sequences_identical(sequence_a, sequence_b) {
        return Ok(r64(0.0));
    }

    let min_len = sequence_a.len().min(sequence_b.len());
    if min_len < kmer_length {
        return Ok(r64(1.0));
    }

    let (smaller, larger) = if tallies[first].len() <= tallies[second].len() {
        (&tallies[first], &tallies[second])
    } else {
        (&tallies[second], &tallies[first])
    };
    let shared: usize = smaller
        .iter()
        .map(|(kmer, count)| (*count).min(larger.get(kmer).copied().unwrap_or(0)))
        .sum();

    let fraction = shared as f64 / (min_len - kmer_length + 1) as f64;
    let distance = (1.0 - fraction).clamp(0.0, 1.0);
    if !distance.is_finite() {
        return Err(Error::NumericalInstability { first, second });
    }

    Ok(r64(distance))
}

fn sequences_identical<
    AlphabetType: Alphabet,
    SubsequenceType: GenomeSequence<AlphabetType, SubsequenceType> + ?Sized,
>(
    sequence_a: &SubsequenceType,
    sequence_b: &SubsequenceType,
) -> bool {
    sequence_a.len() == sequence_b.len()
        && (0..sequence_a.len()).all(|index| sequence_a[index] == sequence_b[index])
}
