use compact_genome::interface::alphabet::{Alphabet, AlphabetCharacter};
use compact_genome::interface::sequence::GenomeSequence;
use noisy_float::types::{R64, r64};
use traitsequence::interface::Sequence;

use crate::error::{Error, Result};
use crate::profile_alignment::column_mapping::ColumnMapping;

/// Per-column summary of an aligned sequence group: residue counts per
/// character index plus the gap count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileColumn {
    character_counts: Vec<usize>,
    gap_count: usize,
}

impl ProfileColumn {
    fn empty(alphabet_size: usize) -> Self {
        Self {
            character_counts: vec![0; alphabet_size],
            gap_count: 0,
        }
    }

    pub fn character_count(&self, character_index: usize) -> usize {
        self.character_counts[character_index]
    }

    pub fn gap_count(&self) -> usize {
        self.gap_count
    }

    pub fn row_count(&self) -> usize {
        self.character_counts.iter().sum::<usize>() + self.gap_count
    }

    /// The empirical frequency of the character among all rows, gaps
    /// included in the denominator.
    pub fn character_frequency(&self, character_index: usize) -> R64 {
        r64(self.character_counts[character_index] as f64 / self.row_count() as f64)
    }

    /// The fraction of rows carrying a residue in this column.
    pub fn occupancy(&self) -> R64 {
        let rows = self.row_count();
        r64((rows - self.gap_count) as f64 / rows as f64)
    }

    pub fn is_all_gaps(&self) -> bool {
        self.gap_count == self.row_count()
    }
}

/// One row of a profile: a source sequence with its gapped symbols.
#[derive(Debug)]
pub struct ProfileRow<AlphabetType: Alphabet> {
    sequence_index: usize,
    symbols: Vec<Option<AlphabetType::CharacterType>>,
}

impl<AlphabetType: Alphabet> Clone for ProfileRow<AlphabetType> {
    fn clone(&self) -> Self {
        Self {
            sequence_index: self.sequence_index,
            symbols: self.symbols.clone(),
        }
    }
}

impl<AlphabetType: Alphabet> ProfileRow<AlphabetType> {
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    pub fn symbols(&self) -> &[Option<AlphabetType::CharacterType>] {
        &self.symbols
    }
}

/// A fully gapped, internally consistent alignment of a subset of the input
/// sequences, summarised per column.
///
/// Profiles are transient: each one is created either from a single sequence
/// or by merging two child profiles, and is consumed by the merge that uses
/// it. Removing the gaps from any row reproduces the underlying input
/// sequence.
#[derive(Debug)]
pub struct Profile<AlphabetType: Alphabet> {
    rows: Vec<ProfileRow<AlphabetType>>,
    columns: Vec<ProfileColumn>,
}

impl<AlphabetType: Alphabet> Clone for Profile<AlphabetType> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            columns: self.columns.clone(),
        }
    }
}

impl<AlphabetType: Alphabet> Profile<AlphabetType> {
    /// The width-`len` profile of a single ungapped sequence.
    pub fn from_sequence<
        SubsequenceType: GenomeSequence<AlphabetType, SubsequenceType> + ?Sized,
    >(
        sequence_index: usize,
        sequence: &SubsequenceType,
    ) -> Self {
        let symbols: Vec<_> = (0..sequence.len())
            .map(|position| Some(sequence[position].clone()))
            .collect();
        let rows = vec![ProfileRow {
            sequence_index,
            symbols,
        }];
        let columns = Self::recompute_columns(&rows, sequence.len());

        Self { rows, columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[ProfileRow<AlphabetType>] {
        &self.rows
    }

    pub fn column(&self, index: usize) -> &ProfileColumn {
        &self.columns[index]
    }

    /// Merges two profiles under a column mapping produced by aligning them.
    ///
    /// A mapping step that does not consume a side inserts a gap into all of
    /// that side's rows. The mapping must consume both profiles exactly;
    /// anything else is an internal invariant violation.
    pub fn merge(first: Self, second: Self, mapping: &ColumnMapping) -> Result<Self> {
        if mapping.first_consumed() != first.width() || mapping.second_consumed() != second.width()
        {
            return Err(Error::InternalInconsistency(format!(
                "column mapping consumes ({}, {}) columns, but the profiles have widths ({}, {})",
                mapping.first_consumed(),
                mapping.second_consumed(),
                first.width(),
                second.width()
            )));
        }

        let width = mapping.merged_width();
        let mut rows = Vec::with_capacity(first.rows.len() + second.rows.len());
        for row in &first.rows {
            rows.push(ProfileRow {
                sequence_index: row.sequence_index,
                symbols: Self::remap_symbols(&row.symbols, mapping, true, width),
            });
        }
        for row in &second.rows {
            rows.push(ProfileRow {
                sequence_index: row.sequence_index,
                symbols: Self::remap_symbols(&row.symbols, mapping, false, width),
            });
        }

        let columns = Self::recompute_columns(&rows, width);
        Ok(Self { rows, columns })
    }

    fn remap_symbols(
        symbols: &[Option<AlphabetType::CharacterType>],
        mapping: &ColumnMapping,
        is_first: bool,
        width: usize,
    ) -> Vec<Option<AlphabetType::CharacterType>> {
        let mut result = Vec::with_capacity(width);
        let mut source = 0;
        for step in mapping.iter_flat() {
            let consumes = if is_first {
                step.consumes_first()
            } else {
                step.consumes_second()
            };
            if consumes {
                result.push(symbols[source].clone());
                source += 1;
            } else {
                result.push(None);
            }
        }

        result
    }

    /// The sub-profile of the rows selected by the mask (indexed by sequence
    /// index), and the sub-profile of the remaining rows.
    pub fn split_rows(&self, mask: &[bool]) -> (Self, Self) {
        let (selected, remaining): (Vec<_>, Vec<_>) = self
            .rows
            .iter()
            .cloned()
            .partition(|row| mask[row.sequence_index]);

        let width = self.width();
        let selected_columns = Self::recompute_columns(&selected, width);
        let remaining_columns = Self::recompute_columns(&remaining, width);

        (
            Self {
                rows: selected,
                columns: selected_columns,
            },
            Self {
                rows: remaining,
                columns: remaining_columns,
            },
        )
    }

    /// Drops every column in which all rows carry a gap.
    pub fn without_all_gap_columns(&self) -> Self {
        let keep: Vec<bool> = self.columns.iter().map(|column| !column.is_all_gaps()).collect();
        let rows: Vec<_> = self
            .rows
            .iter()
            .map(|row| ProfileRow {
                sequence_index: row.sequence_index,
                symbols: row
                    .symbols
                    .iter()
                    .zip(&keep)
                    .filter(|(_, keep)| **keep)
                    .map(|(symbol, _)| symbol.clone())
                    .collect(),
            })
            .collect();
        let width = keep.iter().filter(|keep| **keep).count();
        let columns = Self::recompute_columns(&rows, width);

        Self { rows, columns }
    }

    fn recompute_columns(
        rows: &[ProfileRow<AlphabetType>],
        width: usize,
    ) -> Vec<ProfileColumn> {
        let mut columns = vec![ProfileColumn::empty(AlphabetType::SIZE); width];
        for row in rows {
            for (column, symbol) in columns.iter_mut().zip(&row.symbols) {
                match symbol {
                    Some(character) => column.character_counts[character.index()] += 1,
                    None => column.gap_count += 1,
                }
            }
        }

        columns
    }
}
