use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    iter::{Flatten, FusedIterator},
    marker::PhantomData,
};

use arithmetic::U64Ext as _;
use derivative::Derivative;
use ethereum_types::H256;
use itertools::Either;
use serde::{
    de::{Error as _, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std_ext::ArcExt as _;
use triomphe::Arc;
use try_from_iterator::TryFromIterator;
use typenum::{NonZero, Unsigned, U1};

use crate::{
    error::{ReadError, WriteError},
    hc::Hc,
    iter::ExactSize,
    merkle,
    persistent_list::{self, build_tree, Leaves, Node},
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
    storage_mode::StorageMode,
};

/// An SSZ vector of exactly `N` elements with two in-memory representations.
///
/// The ring buffers in `BeaconState` (roots, randao mixes, slashings) are
/// vectors of this type. `N` must be a power of two no smaller than `BUNDLE`.
/// See [`PersistentList`](crate::PersistentList) for the storage mode
/// semantics; vectors additionally support full structural sharing when
/// constructed from a repeated element, which makes genesis states and reset
/// ring buffers nearly free.
#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
pub struct PersistentVector<T, N, const BUNDLE: usize = 1> {
    repr: Repr<T, BUNDLE>,
    phantom: PhantomData<N>,
}

#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
enum Repr<T, const BUNDLE: usize> {
    Shared(Arc<Hc<Node<T, BUNDLE>>>),
    Flat(Vec<T>),
}

impl<T: Clone + Default, N: Unsigned + NonZero, const BUNDLE: usize> Default
    for PersistentVector<T, N, BUNDLE>
{
    fn default() -> Self {
        Self::repeat_element(T::default())
    }
}

impl<T: PartialEq, N: Unsigned, const BUNDLE: usize> PartialEq for PersistentVector<T, N, BUNDLE> {
    fn eq(&self, other: &Self) -> bool {
        // Element-wise comparison makes equality independent of storage mode.
        itertools::equal(self, other)
    }
}

impl<T: Eq, N: Unsigned, const BUNDLE: usize> Eq for PersistentVector<T, N, BUNDLE> {}

impl<T: Debug, N: Unsigned, const BUNDLE: usize> Debug for PersistentVector<T, N, BUNDLE> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.debug_list().entries(self).finish()
    }
}

impl<T, N: Unsigned, const BUNDLE: usize> TryFromIterator<T> for PersistentVector<T, N, BUNDLE> {
    type Error = ReadError;

    fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let (root, length) = build_tree(elements);

        let expected = N::USIZE;

        if length != expected {
            return Err(ReadError::VectorSizeMismatch {
                expected,
                actual: length,
            });
        }

        let root = root.expect("vectors are never empty");

        Ok(Self {
            repr: Repr::Shared(root),
            phantom: PhantomData,
        })
    }
}

impl<'vector, T, N: Unsigned, const BUNDLE: usize> IntoIterator
    for &'vector PersistentVector<T, N, BUNDLE>
{
    type Item = &'vector T;
    type IntoIter =
        ExactSize<Either<core::slice::Iter<'vector, T>, Flatten<Leaves<'vector, T, BUNDLE>>>>;

    fn into_iter(self) -> Self::IntoIter {
        match &self.repr {
            Repr::Shared(root) => {
                let leaves = Leaves::from_root(root.as_ref().as_ref());
                ExactSize::new(Either::Right(leaves.flatten()), N::USIZE)
            }
            Repr::Flat(elements) => ExactSize::new(Either::Left(elements.iter()), elements.len()),
        }
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned, const BUNDLE: usize> Deserialize<'de>
    for PersistentVector<T, N, BUNDLE>
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VectorVisitor<T, N, const BUNDLE: usize>(PhantomData<(T, N)>);

        impl<'de, T: Deserialize<'de>, N: Unsigned, const BUNDLE: usize> Visitor<'de>
            for VectorVisitor<T, N, BUNDLE>
        {
            type Value = PersistentVector<T, N, BUNDLE>;

            fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
                write!(formatter, "a vector of length {}", N::USIZE)
            }

            fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
                itertools::process_results(
                    core::iter::from_fn(|| seq.next_element().transpose()),
                    |elements| PersistentVector::try_from_iter(elements).map_err(S::Error::custom),
                )?
            }
        }

        deserializer.deserialize_tuple(N::USIZE, VectorVisitor(PhantomData))
    }
}

impl<T: Serialize, N: Unsigned, const BUNDLE: usize> Serialize for PersistentVector<T, N, BUNDLE> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self)
    }
}

impl<T: SszSize, N: Unsigned, const BUNDLE: usize> SszSize for PersistentVector<T, N, BUNDLE> {
    const SIZE: Size = T::SIZE.mul(N::USIZE);
}

impl<C, T: SszRead<C>, N: Unsigned, const BUNDLE: usize> SszRead<C>
    for PersistentVector<T, N, BUNDLE>
{
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let results = shared::read_vector::<_, _, N>(context, bytes)?;
        itertools::process_results(results, |elements| Self::try_from_iter(elements))?
    }
}

impl<T: SszWrite, N: Unsigned, const BUNDLE: usize> SszWrite for PersistentVector<T, N, BUNDLE> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        shared::write_fixed_vector(bytes, self);
    }
}

impl<T: SszHash + SszWrite, N: Unsigned, const BUNDLE: usize> SszHash
    for PersistentVector<T, N, BUNDLE>
{
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match &self.repr {
            // The tree is always full, so the root needs no adjustment.
            Repr::Shared(root) => root.hash_tree_root(),
            Repr::Flat(elements) => {
                let depth = merkle::chunk_depth_for_elements::<T>(N::U64);

                if T::PackingFactor::USIZE == 1 {
                    merkle::merkleize_chunks(elements.iter().map(SszHash::hash_tree_root), depth)
                } else {
                    merkle::merkleize_packed(elements, depth)
                }
            }
        }
    }
}

impl<T, N: Unsigned, const BUNDLE: usize> PersistentVector<T, N, BUNDLE> {
    /// A vector filled with copies of `element`, sharing all subtrees.
    #[must_use]
    pub fn repeat_element(element: T) -> Self
    where
        T: Clone,
        N: NonZero,
    {
        let mut node = Node::leaf(vec![element; BUNDLE.min(N::USIZE)]);

        for height in 0..Self::depth() {
            let arc = Hc::arc(node);

            node = Node::Internal {
                left: arc.clone_arc(),
                right: arc,
                left_height: height,
                right_height: height,
            };
        }

        Self {
            repr: Repr::Shared(Hc::arc(node)),
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub const fn storage_mode(&self) -> StorageMode {
        match self.repr {
            Repr::Shared(_) => StorageMode::Persistent,
            Repr::Flat(_) => StorageMode::Transient,
        }
    }

    /// Flattens the vector into contiguous memory.
    pub fn make_transient(&mut self)
    where
        T: Clone,
    {
        if let StorageMode::Persistent = self.storage_mode() {
            let elements = self.into_iter().cloned().collect();
            self.repr = Repr::Flat(elements);
        }
    }

    /// Rebuilds the structurally shared tree from the flat representation.
    pub fn make_persistent(&mut self) {
        if let Repr::Flat(elements) = &mut self.repr {
            let (root, length) = build_tree(core::mem::take(elements));

            assert_eq!(length, N::USIZE);

            self.repr = Repr::Shared(root.expect("vectors are never empty"));
        }
    }

    /// Returns the element at `index % N`.
    ///
    /// All ring buffer accesses in the consensus specification are of this
    /// form, so out-of-bounds indices do not need to be representable.
    #[must_use]
    pub fn mod_index(&self, index: u64) -> &T
    where
        N: NonZero,
    {
        let index = usize::try_from(index.mod_typenum::<N>())
            .expect("index taken modulo N fits in usize");

        match &self.repr {
            Repr::Shared(root) => {
                let mut height = Self::depth();
                let mut node: &Node<T, BUNDLE> = root;

                let bundle = loop {
                    match node {
                        Node::Internal { left, right, .. } => {
                            height -= 1;

                            if navigate_right::<BUNDLE>(index, height + 1) {
                                node = right;
                            } else {
                                node = left;
                            }
                        }
                        Node::Leaf { bundle } => break bundle,
                    }
                };

                &bundle[index & (BUNDLE - 1)]
            }
            Repr::Flat(elements) => &elements[index],
        }
    }

    /// Returns a mutable reference to the element at `index % N`.
    pub fn mod_index_mut(&mut self, index: u64) -> &mut T
    where
        T: Clone,
        N: NonZero,
    {
        let index = usize::try_from(index.mod_typenum::<N>())
            .expect("index taken modulo N fits in usize");

        match &mut self.repr {
            Repr::Shared(root) => {
                let mut height = Self::depth();
                let mut node = root.make_mut().as_mut();

                let bundle = loop {
                    match node {
                        Node::Internal { left, right, .. } => {
                            height -= 1;

                            if navigate_right::<BUNDLE>(index, height + 1) {
                                node = right.make_mut().as_mut();
                            } else {
                                node = left.make_mut().as_mut();
                            }
                        }
                        Node::Leaf { bundle } => break bundle,
                    }
                };

                &mut bundle[index & (BUNDLE - 1)]
            }
            Repr::Flat(elements) => &mut elements[index],
        }
    }

    /// Applies `updater` to every element.
    ///
    /// In persistent mode the visited elements are cloned and compared to
    /// avoid rebuilding subtrees that were not modified.
    pub fn update(&mut self, mut updater: impl FnMut(&mut T))
    where
        T: Clone + PartialEq,
    {
        match &mut self.repr {
            Repr::Shared(root) => {
                if let Some(new_root) = root.update(&mut updater) {
                    *root = new_root;
                }
            }
            Repr::Flat(elements) => elements.iter_mut().for_each(updater),
        }
    }

    fn depth() -> u8 {
        assert!(N::U64.is_power_of_two());

        N::U64
            .ilog2_ceil()
            .saturating_sub(persistent_list::bundle_ilog2::<BUNDLE>())
    }
}

fn navigate_right<const BUNDLE: usize>(index: usize, height: u8) -> bool {
    use bit_field::BitField as _;

    index.get_bit(usize::from(
        height + persistent_list::bundle_ilog2::<BUNDLE>() - 1,
    ))
}

#[cfg(test)]
mod tests {
    use typenum::U64;

    use super::*;

    type Roots = PersistentVector<H256, U64, 2>;
    type Balanceish = PersistentVector<u64, U64, 8>;

    #[test]
    fn repeated_element_matches_explicit_construction() -> Result<(), ReadError> {
        let repeated = Roots::repeat_element(H256::repeat_byte(3));
        let built = Roots::try_from_iter((0..64).map(|_| H256::repeat_byte(3)))?;

        assert_eq!(repeated, built);
        assert_eq!(repeated.hash_tree_root(), built.hash_tree_root());

        Ok(())
    }

    #[test]
    fn mod_index_wraps_around() -> Result<(), ReadError> {
        let vector = Balanceish::try_from_iter(0..64)?;

        assert_eq!(*vector.mod_index(5), 5);
        assert_eq!(*vector.mod_index(64 + 5), 5);
        assert_eq!(*vector.mod_index(64 * 1000 + 63), 63);

        Ok(())
    }

    #[test]
    fn mutation_through_mod_index_only_affects_one_element() -> Result<(), ReadError> {
        let mut vector = Balanceish::try_from_iter(0..64)?;
        let original = vector.clone();

        *vector.mod_index_mut(64 + 1) = 1000;

        assert_eq!(*vector.mod_index(1), 1000);
        assert_eq!(*original.mod_index(1), 1);

        itertools::assert_equal(
            vector.into_iter().copied().filter(|element| *element != 1000),
            (0..64).filter(|element| *element != 1),
        );

        Ok(())
    }

    #[test]
    fn transient_and_persistent_roots_are_identical() -> Result<(), ReadError> {
        let mut vector = Roots::try_from_iter((0..64).map(H256::from_low_u64_be))?;
        let persistent_root = vector.hash_tree_root();

        vector.make_transient();

        assert_eq!(vector.storage_mode(), StorageMode::Transient);
        assert_eq!(vector.hash_tree_root(), persistent_root);

        vector.make_persistent();

        assert_eq!(vector.storage_mode(), StorageMode::Persistent);
        assert_eq!(vector.hash_tree_root(), persistent_root);

        Ok(())
    }
}
