use core::fmt::{Display, Formatter, Result as FmtResult};

/// In-memory representation of a persistent collection.
///
/// Persistent collections store their elements in a structurally shared Merkle
/// tree with cached subtree roots, making cloning cheap and hashing
/// incremental. The transient mode flattens the elements into contiguous
/// memory so bulk updates (epoch processing rewrites nearly every balance) are
/// cheap, at the cost of hashing from scratch and deep cloning.
///
/// The mode is a contract, not a hint. State transition code checks it at API
/// boundaries: states enter the transition function persistent, are switched
/// to transient for the duration of processing and are switched back before
/// being returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StorageMode {
    Transient,
    Persistent,
}

impl Display for StorageMode {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        match self {
            Self::Transient => formatter.write_str("transient"),
            Self::Persistent => formatter.write_str("persistent"),
        }
    }
}

impl StorageMode {
    #[inline]
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        matches!(self, Self::Persistent)
    }
}
