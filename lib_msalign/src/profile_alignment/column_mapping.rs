use std::fmt::Display;

/// One step of a column mapping between two profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeStep {
    /// Consume one column from each profile.
    Both,
    /// Consume a column from the first profile; the second receives gaps.
    FirstOnly,
    /// Consume a column from the second profile; the first receives gaps.
    SecondOnly,
}

impl MergeStep {
    pub fn consumes_first(&self) -> bool {
        matches!(self, MergeStep::Both | MergeStep::FirstOnly)
    }

    pub fn consumes_second(&self) -> bool {
        matches!(self, MergeStep::Both | MergeStep::SecondOnly)
    }
}

impl Display for MergeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStep::Both => write!(f, "M"),
            MergeStep::FirstOnly => write!(f, "D"),
            MergeStep::SecondOnly => write!(f, "I"),
        }
    }
}

/// The column mapping produced by a profile-profile alignment, stored
/// run-length encoded.
///
/// Walking the mapping front to back merges the two profiles column by
/// column: both source-column indices strictly increase along `Both` steps,
/// and gap steps consume exactly one side.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnMapping {
    steps: Vec<(usize, MergeStep)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a step, coalescing it with the last run if it repeats.
    pub fn push(&mut self, step: MergeStep) {
        if let Some((multiplicity, last_step)) = self.steps.last_mut() {
            if *last_step == step {
                *multiplicity += 1;
                return;
            }
        }
        self.steps.push((1, step));
    }

    pub fn iter_compact(&self) -> impl Iterator<Item = (usize, MergeStep)> + '_ {
        self.steps.iter().copied()
    }

    pub fn iter_flat(&self) -> impl Iterator<Item = MergeStep> + '_ {
        self.steps
            .iter()
            .flat_map(|&(multiplicity, step)| std::iter::repeat(step).take(multiplicity))
    }

    /// The number of merged columns, i.e. the width of the merged profile.
    pub fn merged_width(&self) -> usize {
        self.steps.iter().map(|(multiplicity, _)| multiplicity).sum()
    }

    /// The number of columns consumed from the first profile.
    pub fn first_consumed(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, step)| step.consumes_first())
            .map(|(multiplicity, _)| multiplicity)
            .sum()
    }

    /// The number of columns consumed from the second profile.
    pub fn second_consumed(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, step)| step.consumes_second())
            .map(|(multiplicity, _)| multiplicity)
            .sum()
    }

    /// The number of maximal gap runs, over both sides.
    pub fn gap_run_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, step)| *step != MergeStep::Both)
            .count()
    }

    pub fn cigar(&self) -> String {
        let mut result = String::new();
        self.write_cigar(&mut result).unwrap();
        result
    }

    pub fn write_cigar(&self, writer: &mut impl std::fmt::Write) -> std::fmt::Result {
        for (multiplicity, step) in &self.steps {
            write!(writer, "{multiplicity}{step}")?;
        }

        Ok(())
    }
}

impl From<Vec<(usize, MergeStep)>> for ColumnMapping {
    fn from(steps: Vec<(usize, MergeStep)>) -> Self {
        Self { steps }
    }
}

impl FromIterator<MergeStep> for ColumnMapping {
    fn from_iter<IteratorType: IntoIterator<Item = MergeStep>>(steps: IteratorType) -> Self {
        let mut result = Self::new();
        for step in steps {
            result.push(step);
        }
        result
    }
}

impl Display for ColumnMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_cigar(f)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnMapping, MergeStep};

    #[test]
    fn push_coalesces_repeated_steps() {
        let mut mapping = ColumnMapping::new();
        mapping.push(MergeStep::Both);
        mapping.push(MergeStep::Both);
        mapping.push(MergeStep::FirstOnly);
        mapping.push(MergeStep::Both);

        assert_eq!(mapping.cigar(), "2M1D1M");
        assert_eq!(mapping.merged_width(), 4);
        assert_eq!(mapping.first_consumed(), 4);
        assert_eq!(mapping.second_consumed(), 3);
        assert_eq!(mapping.gap_run_count(), 1);
    }

    #[test]
    fn flat_iteration_expands_runs() {
        let mapping: ColumnMapping = [
            MergeStep::Both,
            MergeStep::SecondOnly,
            MergeStep::SecondOnly,
            MergeStep::Both,
        ]
        .into_iter()
        .collect();

        assert_eq!(mapping.cigar(), "1M2I1M");
        assert_eq!(mapping.iter_flat().count(), 4);
        assert_eq!(
            mapping.iter_flat().filter(|step| *step == MergeStep::SecondOnly).count(),
            2
        );
    }
}
