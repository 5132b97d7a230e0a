use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    ops::{Deref, DerefMut},
};

use ethereum_types::H256;
use once_cell::race::OnceBox;
use serde::{Deserialize, Serialize};
use triomphe::Arc;

use crate::{
    error::{ReadError, WriteError},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// A "Hash Cell". Or a "Hash Cache", if you prefer.
///
/// Wraps a value together with a lazily computed copy of its
/// [`hash_tree_root`](SszHash::hash_tree_root). The cached root is invalidated
/// whenever the value is borrowed mutably.
#[derive(Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Hc<T> {
    value: T,
    // `OnceBox<H256>` fits in one word, unlike `OnceCell<H256>`.
    // The price is that concurrent hashing may be done redundantly.
    #[serde(skip)]
    cached_root: OnceBox<H256>,
}

impl<T: PartialEq> PartialEq for Hc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Hc<T> {}

impl<T: Debug> Debug for Hc<T> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter
            .debug_struct("Hc")
            .field("value", &self.value)
            .field("cached_root", &self.cached_root.get())
            .finish()
    }
}

// `OnceBox<T>` does not implement `Clone`.
impl<T: Clone> Clone for Hc<T> {
    fn clone(&self) -> Self {
        let value = self.value.clone();

        match self.cached_root.get().copied() {
            Some(root) => Self::with_root(value, root),
            None => Self::from(value),
        }
    }
}

impl<T> Deref for Hc<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for Hc<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut()
    }
}

impl<T> AsRef<T> for Hc<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T> AsMut<T> for Hc<T> {
    fn as_mut(&mut self) -> &mut T {
        // Invalidate `cached_root` whenever `value` could potentially be modified.
        // This may be insufficient if `value` is internally mutable.
        self.cached_root = OnceBox::new();
        &mut self.value
    }
}

impl<T> From<T> for Hc<T> {
    fn from(value: T) -> Self {
        Self {
            value,
            cached_root: OnceBox::new(),
        }
    }
}

impl<T: SszSize> SszSize for Hc<T> {
    const SIZE: Size = T::SIZE;
}

impl<C, T: SszRead<C>> SszRead<C> for Hc<T> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_ssz_unchecked(context, bytes).map(Self::from)
    }
}

impl<T: SszWrite> SszWrite for Hc<T> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.value.write_fixed(bytes);
    }

    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        self.value.write_variable(bytes)
    }
}

impl<T: SszHash> SszHash for Hc<T> {
    type PackingFactor = T::PackingFactor;

    fn hash_tree_root(&self) -> H256 {
        *self
            .cached_root
            .get_or_init(|| Box::new(self.value.hash_tree_root()))
    }
}

impl<T> Hc<T> {
    /// Primes the root cache with an externally known root.
    ///
    /// Panics if a root is already cached. The two could only legitimately be
    /// equal, and setting a root twice indicates a bug in the caller.
    pub fn set_cached_root(&self, root: H256) {
        if let Err(old_root) = self.cached_root.set(Box::new(root)) {
            panic!("cached_root already set (old_root: {old_root:?}, root: {root:?})");
        }
    }

    pub(crate) fn arc(value: T) -> Arc<Self> {
        Arc::new(Self::from(value))
    }

    fn with_root(value: T, root: H256) -> Self {
        let cell = OnceBox::new();

        cell.set(Box::new(root))
            .expect("cell is empty because OnceBox::new returns an empty cell");

        Self {
            value,
            cached_root: cell,
        }
    }
}
