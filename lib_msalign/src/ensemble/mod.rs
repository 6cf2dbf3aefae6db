use compact_genome::interface::alphabet::Alphabet;
use deterministic_default_hasher::DeterministicHashMap;
use log::{debug, info};
use noisy_float::types::{R64, r64};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

use crate::config::MsaConfig;
use crate::distance::kmer_distance_matrix;
use crate::error::{Error, Result};
use crate::guide_tree::GuideTree;
use crate::msa::Msa;
use crate::profile::Profile;
use crate::progressive::progressive_alignment;
use crate::refinement::refine;
use crate::scores::score::Score;
use crate::sequence::SequenceCollection;

/// Configuration of the ensemble strategy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnsembleConfig {
    /// The number of independently perturbed alignments to generate.
    pub replicates: usize,
    /// The master seed; replicate `r` derives its own generator from
    /// `random_seed + r`.
    pub random_seed: u64,
    /// The relative magnitude of the multiplicative distance perturbation.
    /// The first replicate always runs unperturbed.
    pub perturbation_magnitude: f64,
}

impl EnsembleConfig {
    pub fn verify(&self) -> Result<()> {
        if self.replicates == 0 {
            return Err(Error::NoReplicates);
        }
        if !self.perturbation_magnitude.is_finite() || self.perturbation_magnitude < 0.0 {
            return Err(Error::InvalidPerturbationMagnitude {
                magnitude: self.perturbation_magnitude,
            });
        }

        Ok(())
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            replicates: 4,
            random_seed: 0,
            perturbation_magnitude: 0.1,
        }
    }
}

struct Replicate<AlphabetType: Alphabet> {
    profile: Profile<AlphabetType>,
    objective: Score,
}

/// A column identity that is stable across replicates: for every sequence,
/// the ordinal of the residue it contributes to the column, or `None` for a
/// gap. Two replicates agree on a column iff the fingerprints are equal.
type ColumnFingerprint = Vec<Option<usize>>;

fn column_fingerprints<AlphabetType: Alphabet>(
    profile: &Profile<AlphabetType>,
    sequence_count: usize,
) -> Vec<ColumnFingerprint> {
    let mut fingerprints = vec![vec![None; sequence_count]; profile.width()];
    for row in profile.rows() {
        let mut ordinal = 0;
        for (column, symbol) in row.symbols().iter().enumerate() {
            if symbol.is_some() {
                fingerprints[column][row.sequence_index()] = Some(ordinal);
                ordinal += 1;
            }
        }
    }

    fingerprints
}

/// Per-replicate, per-column agreement: the fraction of replicates that
/// contain an identical column.
pub(crate) fn replicate_confidences<AlphabetType: Alphabet>(
    profiles: &[Profile<AlphabetType>],
    sequence_count: usize,
) -> Vec<Vec<R64>> {
    let replicate_count = profiles.len();
    let fingerprints: Vec<Vec<ColumnFingerprint>> = profiles
        .iter()
        .map(|profile| column_fingerprints(profile, sequence_count))
        .collect();

    let mut votes: DeterministicHashMap<&ColumnFingerprint, usize> = DeterministicHashMap::default();
    for replicate in &fingerprints {
        for fingerprint in replicate {
            *votes.entry(fingerprint).or_insert(0) += 1;
        }
    }

    fingerprints
        .iter()
        .map(|replicate| {
            replicate
                .iter()
                .map(|fingerprint| r64(votes[fingerprint] as f64 / replicate_count as f64))
                .collect()
        })
        .collect()
}

/// Runs the full pipeline under independently perturbed guide trees and
/// derives a consensus alignment with per-column confidence.
///
/// The consensus is the replicate whose columns agree most with the rest of
/// the ensemble (anchor agreement); its per-column agreement fractions
/// become the confidence array. If no replicate agrees with any other on any
/// column, the highest-objective replicate is returned instead; total
/// disagreement is not an error.
pub fn ensemble_alignment<AlphabetType: Alphabet + Sync>(
    collection: &SequenceCollection<AlphabetType>,
    config: &MsaConfig<AlphabetType>,
    ensemble: &EnsembleConfig,
) -> Result<Msa<AlphabetType>>
where
    AlphabetType::CharacterType: Send + Sync,
{
    ensemble.verify()?;
    collection.ensure_alignable()?;

    let distances = kmer_distance_matrix(collection, config.kmer_length, config.distance_entry_budget)?;

    info!(
        "Generating an ensemble of {} alignment replicates...",
        ensemble.replicates
    );
    let replicates: Vec<Replicate<AlphabetType>> = (0..ensemble.replicates)
        .into_par_iter()
        .map(|replicate_index| {
            let mut rng = Xoshiro256StarStar::seed_from_u64(
                ensemble.random_seed.wrapping_add(replicate_index as u64),
            );
            let magnitude = if replicate_index == 0 {
                0.0
            } else {
                ensemble.perturbation_magnitude
            };
            let tree = GuideTree::build_perturbed(&distances, &mut rng, magnitude);
            let initial = progressive_alignment(collection, &tree, &config.scores)?;
            let (profile, objective) = refine(
                initial,
                &tree,
                &config.scores,
                config.refinement_iteration_limit,
            )?;
            debug!("Replicate {replicate_index} finished with objective {objective}");

            Ok(Replicate { profile, objective })
        })
        .collect::<Result<Vec<_>>>()?;

    let profiles: Vec<_> = replicates
        .iter()
        .map(|replicate| replicate.profile.clone())
        .collect();
    let confidences = replicate_confidences(&profiles, collection.len());

    let mean_confidences: Vec<R64> = confidences
        .iter()
        .map(|confidence| {
            if confidence.is_empty() {
                r64(1.0)
            } else {
                confidence
                    .iter()
                    .fold(r64(0.0), |total, column| total + *column)
                    / r64(confidence.len() as f64)
            }
        })
        .collect();

    let mut anchor = 0;
    for replicate_index in 1..replicates.len() {
        if mean_confidences[replicate_index] > mean_confidences[anchor] {
            anchor = replicate_index;
        }
    }

    // With more than one replicate, a mean agreement of 1/replicates means
    // every column agrees only with itself; no stable consensus exists and
    // the highest-objective replicate wins instead.
    let self_agreement = r64(1.0 / ensemble.replicates as f64);
    let chosen = if ensemble.replicates > 1 && mean_confidences[anchor] <= self_agreement {
        let mut best = 0;
        for replicate_index in 1..replicates.len() {
            if replicates[replicate_index].objective > replicates[best].objective {
                best = replicate_index;
            }
        }
        info!("No stable consensus; falling back to the highest-objective replicate {best}");
        best
    } else {
        debug!(
            "Consensus anchor is replicate {anchor} with mean agreement {}",
            mean_confidences[anchor]
        );
        anchor
    };

    let mut msa = Msa::from_profile(&replicates[chosen].profile, collection)?;
    msa.set_column_confidence(confidences[chosen].clone());

    Ok(msa)
}
