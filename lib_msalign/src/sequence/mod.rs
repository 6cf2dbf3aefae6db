use compact_genome::implementation::vec_sequence::VectorGenome;
use compact_genome::interface::alphabet::Alphabet;
use compact_genome::interface::sequence::OwnedGenomeSequence;
use traitsequence::interface::Sequence;

use crate::error::{Error, Result};

/// One named input sequence. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SequenceEntry<AlphabetType: Alphabet> {
    name: String,
    sequence: VectorGenome<AlphabetType>,
}

impl<AlphabetType: Alphabet> SequenceEntry<AlphabetType> {
    pub fn new(name: impl Into<String>, sequence: VectorGenome<AlphabetType>) -> Self {
        Self {
            name: name.into(),
            sequence,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &VectorGenome<AlphabetType> {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// The ordered set of input sequences for one alignment run.
///
/// Insertion order is stable and defines the default ordering used for
/// tie-breaks throughout the pipeline. Unique names are recommended but not
/// required.
#[derive(Debug, Clone)]
pub struct SequenceCollection<AlphabetType: Alphabet> {
    entries: Vec<SequenceEntry<AlphabetType>>,
}

impl<AlphabetType: Alphabet> Default for SequenceCollection<AlphabetType> {
    fn default() -> Self {
        Self::new()
    }
}

impl<AlphabetType: Alphabet> SequenceCollection<AlphabetType> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: SequenceEntry<AlphabetType>) {
        self.entries.push(entry);
    }

    pub fn from_named_sequences(
        sequences: impl IntoIterator<Item = (String, VectorGenome<AlphabetType>)>,
    ) -> Self {
        Self {
            entries: sequences
                .into_iter()
                .map(|(name, sequence)| SequenceEntry::new(name, sequence))
                .collect(),
        }
    }

    /// Convenience constructor from ASCII symbol strings.
    ///
    /// Symbol validation is the alphabet's concern; characters outside the
    /// alphabet surface as [`Error::InvalidSymbol`].
    pub fn from_ascii<'item>(
        sequences: impl IntoIterator<Item = (&'item str, &'item [u8])>,
    ) -> Result<Self> {
        let mut result = Self::new();
        for (name, ascii) in sequences {
            let sequence =
                VectorGenome::from_iter_u8(ascii.iter().copied()).map_err(|_| {
                    Error::InvalidSymbol {
                        name: name.to_owned(),
                    }
                })?;
            result.push(SequenceEntry::new(name, sequence));
        }

        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> &SequenceEntry<AlphabetType> {
        &self.entries[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceEntry<AlphabetType>> {
        self.entries.iter()
    }

    /// Eager input validation: alignment is undefined for fewer than two
    /// sequences, and this is rejected before any matrix is allocated.
    pub fn ensure_alignable(&self) -> Result<()> {
        match self.entries.len() {
            0 => Err(Error::EmptyCollection),
            1 => Err(Error::NotEnoughSequences { actual: 1 }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use compact_genome::implementation::alphabets::dna_alphabet::DnaAlphabet;

    use super::SequenceCollection;
    use crate::error::Error;

    #[test]
    fn collection_construction_and_validation() {
        let collection = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("first", b"ACGT".as_slice()),
            ("second", b"ACG".as_slice()),
        ])
        .unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(0).name(), "first");
        assert_eq!(collection.get(0).len(), 4);
        assert_eq!(collection.get(1).len(), 3);
        collection.ensure_alignable().unwrap();
    }

    #[test]
    fn too_small_collections_are_rejected() {
        let empty = SequenceCollection::<DnaAlphabet>::new();
        assert!(matches!(
            empty.ensure_alignable(),
            Err(Error::EmptyCollection)
        ));

        let single =
            SequenceCollection::<DnaAlphabet>::from_ascii([("only", b"ACGT".as_slice())]).unwrap();
        assert!(matches!(
            single.ensure_alignable(),
            Err(Error::NotEnoughSequences { actual: 1 })
        ));
    }

    #[test]
    fn invalid_symbols_are_rejected() {
        let result = SequenceCollection::<DnaAlphabet>::from_ascii([
            ("valid", b"ACGT".as_slice()),
            ("invalid", b"ACXT".as_slice()),
        ]);
        assert!(matches!(result, Err(Error::InvalidSymbol { name }) if name == "invalid"));
    }
}
