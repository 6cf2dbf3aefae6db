use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The sequence collection is empty.")]
    EmptyCollection,

    #[error("An alignment requires at least two sequences, but the collection contains {actual}.")]
    NotEnoughSequences { actual: usize },

    #[error("The sequence '{name}' contains a symbol outside the configured alphabet.")]
    InvalidSymbol { name: String },

    #[error("The k-mer length must be at least one.")]
    KmerLengthZero,

    #[error(
        "K-mers of length {kmer_length} over an alphabet of size {alphabet_size} do not fit the packed representation."
    )]
    KmerLengthTooLarge {
        kmer_length: usize,
        alphabet_size: usize,
    },

    #[error(
        "The substitution score table has {actual} entries, but the alphabet requires {expected}."
    )]
    WrongSubstitutionTableSize { actual: usize, expected: usize },

    #[error("An ensemble requires at least one replicate.")]
    NoReplicates,

    #[error("The perturbation magnitude {magnitude} is not a finite non-negative number.")]
    InvalidPerturbationMagnitude { magnitude: f64 },

    #[error(
        "A distance matrix over {sequences} sequences exceeds the configured entry budget of {budget}."
    )]
    ResourceExhausted { sequences: usize, budget: usize },

    #[error("The distance estimate for the sequence pair ({first}, {second}) is not finite.")]
    NumericalInstability { first: usize, second: usize },

    #[error("Internal inconsistency: {0}.")]
    InternalInconsistency(String),
}
