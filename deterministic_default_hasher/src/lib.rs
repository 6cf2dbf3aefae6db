use std::collections::HashMap;
use std::hash::{BuildHasher, DefaultHasher};

/// A [`BuildHasher`] that builds the standard libraries default hasher with a deterministic seed.
///
/// Maps keyed through this hasher behave identically across processes,
/// keeping hash-based tallies independent of the process-level hash
/// randomisation of the default `RandomState`.
///
/// See also [`DefaultHasher::new`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicDefaultHasher;

impl BuildHasher for DeterministicDefaultHasher {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> Self::Hasher {
        DefaultHasher::new()
    }
}

/// A [`HashMap`] using the deterministic default hasher.
pub type DeterministicHashMap<Key, Value> = HashMap<Key, Value, DeterministicDefaultHasher>;
