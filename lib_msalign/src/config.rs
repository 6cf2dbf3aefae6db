use compact_genome::interface::alphabet::Alphabet;

use crate::distance::packed_kmer_fits;
use crate::ensemble::EnsembleConfig;
use crate::error::{Error, Result};
use crate::scores::substitution::SubstitutionScoreTable;

/// The configuration of one alignment run.
///
/// The configuration is an immutable value threaded explicitly through every
/// component call; there is no process-wide state, so concurrent runs with
/// different parameters cannot interfere.
#[derive(Debug, Clone)]
pub struct MsaConfig<AlphabetType> {
    /// The k-mer length used for distance estimation.
    pub kmer_length: usize,
    /// Substitution scores and affine gap penalties.
    pub scores: SubstitutionScoreTable<AlphabetType>,
    /// The maximum number of refinement passes over the guide-tree edges.
    pub refinement_iteration_limit: usize,
    /// The maximum number of distance-matrix entries; collections whose
    /// squared size exceeds this are rejected instead of exhausting memory.
    pub distance_entry_budget: usize,
    /// When set, the ensemble strategy replaces the single-pipeline run.
    pub ensemble: Option<EnsembleConfig>,
}

impl<AlphabetType: Alphabet> MsaConfig<AlphabetType> {
    /// Returns an error if any parameter is malformed.
    pub fn verify(&self) -> Result<()> {
        if self.kmer_length == 0 {
            return Err(Error::KmerLengthZero);
        }
        if !packed_kmer_fits(AlphabetType::SIZE, self.kmer_length) {
            return Err(Error::KmerLengthTooLarge {
                kmer_length: self.kmer_length,
                alphabet_size: AlphabetType::SIZE,
            });
        }
        if let Some(ensemble) = &self.ensemble {
            ensemble.verify()?;
        }

        Ok(())
    }
}

impl<AlphabetType: Alphabet> Default for MsaConfig<AlphabetType> {
    fn default() -> Self {
        Self {
            kmer_length: 6,
            scores: Default::default(),
            refinement_iteration_limit: 8,
            distance_entry_budget: 100_000_000,
            ensemble: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;

    use super::MsaConfig;
    use crate::ensemble::EnsembleConfig;
    use crate::error::Error;

    #[test]
    fn default_configuration_verifies() {
        MsaConfig::<DnaAlphabet>::default().verify().unwrap();
    }

    #[test]
    fn degenerate_kmer_lengths_are_rejected() {
        let config = MsaConfig::<DnaAlphabet> {
            kmer_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.verify(), Err(Error::KmerLengthZero)));

        let config = MsaConfig::<DnaAlphabet> {
            kmer_length: 33,
            ..Default::default()
        };
        assert!(matches!(
            config.verify(),
            Err(Error::KmerLengthTooLarge {
                kmer_length: 33,
                alphabet_size: 4
            })
        ));
    }

    #[test]
    fn ensemble_configuration_is_verified_transitively() {
        let config = MsaConfig::<DnaAlphabet> {
            ensemble: Some(EnsembleConfig {
                replicates: 0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(config.verify(), Err(Error::NoReplicates)));
    }
}
