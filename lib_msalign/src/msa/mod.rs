use std::fmt::Display;

use compact_genome::interface::alphabet::Alphabet;
use compact_genome::interface::sequence::GenomeSequence;
use noisy_float::types::R64;
use traitsequence::interface::Sequence;

use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::sequence::SequenceCollection;

/// One row of the final alignment: a sequence identity with its gapped
/// symbols.
#[derive(Debug)]
pub struct MsaRow<AlphabetType: Alphabet> {
    name: String,
    symbols: Vec<Option<AlphabetType::CharacterType>>,
}

impl<AlphabetType: Alphabet> Clone for MsaRow<AlphabetType> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            symbols: self.symbols.clone(),
        }
    }
}

impl<AlphabetType: Alphabet> MsaRow<AlphabetType> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[Option<AlphabetType::CharacterType>] {
        &self.symbols
    }

    /// The row as a string, with gaps rendered as `-`.
    pub fn gapped_string(&self) -> String {
        self.symbols
            .iter()
            .map(|symbol| {
                symbol
                    .clone()
                    .map(Into::<char>::into)
                    .unwrap_or('-')
            })
            .collect()
    }

    /// The row with all gaps removed; equals the original input sequence.
    pub fn ungapped_string(&self) -> String {
        self.symbols
            .iter()
            .filter_map(|symbol| symbol.clone().map(Into::<char>::into))
            .collect()
    }
}

/// The terminal artifact of an alignment run.
///
/// All rows have identical length, appear in input order, and removing the
/// gaps from any row reproduces exactly the corresponding input sequence.
/// In ensemble mode a per-column confidence in `[0, 1]` is attached; it
/// annotates the alignment without affecting its content.
#[derive(Debug)]
pub struct Msa<AlphabetType: Alphabet> {
    rows: Vec<MsaRow<AlphabetType>>,
    width: usize,
    column_confidence: Option<Vec<R64>>,
}

impl<AlphabetType: Alphabet> Clone for Msa<AlphabetType> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            width: self.width,
            column_confidence: self.column_confidence.clone(),
        }
    }
}

impl<AlphabetType: Alphabet> Msa<AlphabetType> {
    /// Decodes the root profile into the final alignment, restoring input
    /// order and re-checking the round-trip invariant.
    pub fn from_profile(
        profile: &Profile<AlphabetType>,
        collection: &SequenceCollection<AlphabetType>,
    ) -> Result<Self> {
        let width = profile.width();
        let mut rows: Vec<Option<MsaRow<AlphabetType>>> = (0..collection.len()).map(|_| None).collect();

        for profile_row in profile.rows() {
            let sequence_index = profile_row.sequence_index();
            let slot = rows.get_mut(sequence_index).ok_or_else(|| {
                Error::InternalInconsistency(format!(
                    "the alignment contains the unknown sequence index {sequence_index}"
                ))
            })?;
            if slot.is_some() {
                return Err(Error::InternalInconsistency(format!(
                    "the alignment contains sequence index {sequence_index} twice"
                )));
            }
            if profile_row.symbols().len() != width {
                return Err(Error::InternalInconsistency(format!(
                    "row {sequence_index} has width {}, but the alignment has width {width}",
                    profile_row.symbols().len()
                )));
            }

            *slot = Some(MsaRow {
                name: collection.get(sequence_index).name().to_owned(),
                symbols: profile_row.symbols().to_vec(),
            });
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(sequence_index, row)| {
                row.ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "the alignment is missing sequence index {sequence_index}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let result = Self {
            rows,
            width,
            column_confidence: None,
        };
        result.check_round_trip(collection)?;

        Ok(result)
    }

    fn check_round_trip(&self, collection: &SequenceCollection<AlphabetType>) -> Result<()> {
        for (sequence_index, row) in self.rows.iter().enumerate() {
            let sequence = collection
                .get(sequence_index)
                .sequence()
                .as_genome_subsequence();
            let residues: Vec<_> = row
                .symbols
                .iter()
                .filter_map(|symbol| symbol.clone())
                .collect();
            let matches = residues.len() == sequence.len()
                && (0..sequence.len()).all(|position| residues[position] == sequence[position]);
            if !matches {
                return Err(Error::InternalInconsistency(format!(
                    "removing the gaps from row {sequence_index} does not reproduce its input sequence"
                )));
            }
        }

        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[MsaRow<AlphabetType>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &MsaRow<AlphabetType> {
        &self.rows[index]
    }

    /// Per-column agreement across ensemble replicates; `None` outside
    /// ensemble mode.
    pub fn column_confidence(&self) -> Option<&[R64]> {
        self.column_confidence.as_deref()
    }

    pub(crate) fn set_column_confidence(&mut self, confidence: Vec<R64>) {
        debug_assert_eq!(confidence.len(), self.width);
        self.column_confidence = Some(confidence);
    }
}

impl<AlphabetType: Alphabet> Display for Msa<AlphabetType> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0);
        for row in &self.rows {
            writeln!(f, "{: <name_width$}  {}", row.name, row.gapped_string())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;
    use compact_genome::implementation::vec_sequence::VectorGenome;
    use compact_genome::interface::sequence::{GenomeSequence, OwnedGenomeSequence};

    use super::Msa;
    use crate::profile::Profile;
    use crate::profile_alignment::align_and_merge;
    use crate::scores::substitution::SubstitutionScoreTable;
    use crate::sequence::SequenceCollection;

    fn leaf(sequence_index: usize, ascii: &[u8]) -> Profile<DnaAlphabet> {
        let sequence = VectorGenome::<DnaAlphabet>::from_iter_u8(ascii.iter().copied()).unwrap();
        Profile::from_sequence(sequence_index, sequence.as_genome_subsequence())
    }

    #[test]
    fn decoded_rows_are_in_input_order_and_round_trip() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"ACGT".as_slice()),
            ("second", b"AGT".as_slice()),
        ])
        .unwrap();

        // Merge in reverse row order to check that decoding restores input
        // order.
        let (merged, _) = align_and_merge(
            leaf(1, b"AGT"),
            leaf(0, b"ACGT"),
            &SubstitutionScoreTable::default(),
        )
        .unwrap();

        let msa = Msa::from_profile(&merged, &collection).unwrap();
        assert_eq!(msa.row_count(), 2);
        assert_eq!(msa.row(0).name(), "first");
        assert_eq!(msa.row(1).name(), "second");
        assert_eq!(msa.row(0).ungapped_string(), "ACGT");
        assert_eq!(msa.row(1).ungapped_string(), "AGT");
        assert_eq!(msa.row(0).gapped_string().len(), msa.width());
        assert_eq!(msa.row(1).gapped_string().len(), msa.width());
        assert!(msa.column_confidence().is_none());
    }

    #[test]
    fn mismatched_collections_are_an_internal_error() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"ACGT".as_slice()),
            ("second", b"AGT".as_slice()),
        ])
        .unwrap();
        let other_collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"ACGT".as_slice()),
            ("second", b"AAA".as_slice()),
        ])
        .unwrap();

        let (merged, _) = align_and_merge(
            leaf(0, b"ACGT"),
            leaf(1, b"AGT"),
            &SubstitutionScoreTable::default(),
        )
        .unwrap();

        assert!(Msa::from_profile(&merged, &collection).is_ok());
        assert!(Msa::from_profile(&merged, &other_collection).is_err());
    }
}
