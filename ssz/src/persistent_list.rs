use core::{
    cmp::Ordering,
    fmt::{Debug, Formatter, Result as FmtResult},
    iter::{Flatten, FusedIterator},
    marker::PhantomData,
};

use arithmetic::{NonZeroExt as _, UsizeExt as _, U64Ext as _};
use bit_field::BitField as _;
use derivative::Derivative;
use ethereum_types::H256;
use hashing::ZERO_HASHES;
use itertools::{Either, Itertools as _};
use serde::{
    de::{Error as _, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std_ext::ArcExt as _;
use triomphe::Arc;
use try_from_iterator::TryFromIterator;
use typenum::{Unsigned, U1};

use crate::{
    error::{IndexError, PushError, ReadError, WriteError},
    hc::Hc,
    iter::ExactSize,
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
    storage_mode::StorageMode,
    type_level::FitsInU64,
};

/// An SSZ list with a maximum length of `N` and two in-memory representations.
///
/// In [persistent mode](StorageMode::Persistent) elements are stored in a
/// binary Merkle tree of reference-counted nodes with cached subtree roots.
/// Cloning is O(1), point updates copy only the path from the root, and
/// consecutive states share all unchanged subtrees. Leaves hold `BUNDLE`
/// elements in contiguous memory; `BUNDLE` must be a power of two at least as
/// big as the element type's packing factor, and types whose chunks are not
/// produced by hashing should use bundles that fill at least two chunks to
/// avoid storing redundant hashes.
///
/// In [transient mode](StorageMode::Transient) elements live in a flat `Vec`.
/// Mutation is direct and bulk updates touch no pointers, but cloning is deep
/// and hashing starts from scratch. Epoch processing rewrites most balances,
/// which is why state transitions switch states to transient mode for their
/// duration.
///
/// Both representations hash to identical roots.
#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
pub struct PersistentList<T, N, const BUNDLE: usize = 1> {
    repr: Repr<T, BUNDLE>,
    phantom: PhantomData<N>,
}

#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
enum Repr<T, const BUNDLE: usize> {
    Shared {
        root: Option<Arc<Hc<Node<T, BUNDLE>>>>,
        length: usize,
    },
    Flat(Vec<T>),
}

impl<T, N, const BUNDLE: usize> Default for PersistentList<T, N, BUNDLE> {
    fn default() -> Self {
        Self {
            repr: Repr::Shared {
                root: None,
                length: 0,
            },
            phantom: PhantomData,
        }
    }
}

impl<T: PartialEq, N, const BUNDLE: usize> PartialEq for PersistentList<T, N, BUNDLE> {
    fn eq(&self, other: &Self) -> bool {
        // Element-wise comparison makes equality independent of storage mode.
        self.len_usize() == other.len_usize() && itertools::equal(self, other)
    }
}

impl<T: Eq, N, const BUNDLE: usize> Eq for PersistentList<T, N, BUNDLE> {}

impl<T: Debug, N, const BUNDLE: usize> Debug for PersistentList<T, N, BUNDLE> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.debug_list().entries(self).finish()
    }
}

// This could be a `From` impl if feature `generic_const_exprs` were stable.
impl<T, N: Unsigned, const BUNDLE: usize, const SIZE: usize> TryFrom<[T; SIZE]>
    for PersistentList<T, N, BUNDLE>
{
    type Error = ReadError;

    fn try_from(array: [T; SIZE]) -> Result<Self, Self::Error> {
        Self::try_from_iter(array)
    }
}

impl<T, N: Unsigned, const BUNDLE: usize> TryFromIterator<T> for PersistentList<T, N, BUNDLE> {
    type Error = ReadError;

    fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let (root, length) = build_tree(elements);

        Self::validate_length(length)?;

        Ok(Self {
            repr: Repr::Shared { root, length },
            phantom: PhantomData,
        })
    }
}

impl<'list, T, N, const BUNDLE: usize> IntoIterator for &'list PersistentList<T, N, BUNDLE> {
    type Item = &'list T;
    type IntoIter = ExactSize<Either<core::slice::Iter<'list, T>, Flatten<Leaves<'list, T, BUNDLE>>>>;

    fn into_iter(self) -> Self::IntoIter {
        match &self.repr {
            Repr::Shared { root, length } => {
                let leaves = match root.as_ref() {
                    Some(node) => Leaves::from_root(node.as_ref().as_ref()),
                    None => Leaves::empty(),
                };

                ExactSize::new(Either::Right(leaves.flatten()), *length)
            }
            Repr::Flat(elements) => {
                ExactSize::new(Either::Left(elements.iter()), elements.len())
            }
        }
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned, const BUNDLE: usize> Deserialize<'de>
    for PersistentList<T, N, BUNDLE>
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListVisitor<T, N, const BUNDLE: usize>(PhantomData<(T, N)>);

        impl<'de, T: Deserialize<'de>, N: Unsigned, const BUNDLE: usize> Visitor<'de>
            for ListVisitor<T, N, BUNDLE>
        {
            type Value = PersistentList<T, N, BUNDLE>;

            fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
                write!(formatter, "a list of length up to {}", N::USIZE)
            }

            fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
                itertools::process_results(
                    core::iter::from_fn(|| seq.next_element().transpose()),
                    |elements| PersistentList::try_from_iter(elements).map_err(S::Error::custom),
                )?
            }
        }

        deserializer.deserialize_seq(ListVisitor(PhantomData))
    }
}

impl<T: Serialize, N, const BUNDLE: usize> Serialize for PersistentList<T, N, BUNDLE> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self)
    }
}

impl<T: SszSize, N, const BUNDLE: usize> SszSize for PersistentList<T, N, BUNDLE> {
    const SIZE: Size = Size::Variable { minimum_size: 0 };
}

impl<C, T: SszRead<C>, N: Unsigned, const BUNDLE: usize> SszRead<C>
    for PersistentList<T, N, BUNDLE>
{
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let results = shared::read_list(context, bytes)?;
        itertools::process_results(results, |elements| Self::try_from_iter(elements))?
    }
}

impl<T: SszWrite, N, const BUNDLE: usize> SszWrite for PersistentList<T, N, BUNDLE> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        shared::write_list(bytes, self)
    }
}

impl<T: SszHash + SszWrite, N: Unsigned, const BUNDLE: usize> SszHash
    for PersistentList<T, N, BUNDLE>
{
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match &self.repr {
            Repr::Shared { root, length } => {
                let depth = Self::depth_of_length(*length);

                let subtree_root = match root.as_ref() {
                    Some(node) => (depth..Self::max_depth())
                        .map(zero_hash::<T, BUNDLE>)
                        .fold(node.hash_tree_root(), hashing::hash_256_256),
                    None => zero_hash::<T, BUNDLE>(Self::max_depth()),
                };

                merkle::mix_in_length(subtree_root, *length)
            }
            Repr::Flat(elements) => {
                let depth = merkle::chunk_depth_for_elements::<T>(N::U64);

                let subtree_root = if T::PackingFactor::USIZE == 1 {
                    merkle::merkleize_chunks(elements.iter().map(SszHash::hash_tree_root), depth)
                } else {
                    merkle::merkleize_packed(elements, depth)
                };

                merkle::mix_in_length(subtree_root, elements.len())
            }
        }
    }
}

impl<T, N, const BUNDLE: usize> PersistentList<T, N, BUNDLE> {
    /// A list of `other.len_usize()` default values.
    ///
    /// Participation rollover and the Altair upgrade fill per-validator lists
    /// with zeros; going through the tree builder keeps the result persistent.
    #[must_use]
    pub fn repeat_default_with_length_of<U, const B2: usize>(
        other: &PersistentList<U, N, B2>,
    ) -> Self
    where
        T: Default,
        N: Unsigned,
    {
        Self::try_from_iter((0..other.len_usize()).map(|_| T::default()))
            .expect("lists have the same maximum length")
    }

    #[must_use]
    pub fn len_usize(&self) -> usize {
        match &self.repr {
            Repr::Shared { length, .. } => *length,
            Repr::Flat(elements) => elements.len(),
        }
    }

    #[must_use]
    pub fn len_u64(&self) -> u64
    where
        N: FitsInU64,
    {
        self.len_usize()
            .try_into()
            .expect("the bound on N ensures that the length fits in u64")
    }

    #[must_use]
    pub const fn storage_mode(&self) -> StorageMode {
        match self.repr {
            Repr::Shared { .. } => StorageMode::Persistent,
            Repr::Flat(_) => StorageMode::Transient,
        }
    }

    /// Flattens the list into contiguous memory.
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
            self.repr = Repr::Shared { root, length };
        }
    }

    pub fn get(&self, index: u64) -> Result<&T, IndexError> {
        let valid_index = shared::validate_index(self.len_usize(), index)?;

        match &self.repr {
            Repr::Shared { root, length } => {
                let mut height = Self::depth_of_length(*length);

                let mut node = root
                    .as_deref()
                    .expect("the length check in validate_index ensures that the root exists")
                    .as_ref();

                let bundle = loop {
                    match node {
                        Node::Internal {
                            left,
                            right,
                            left_height,
                            right_height,
                        } => {
                            debug_assert_eq!(height, left_height + 1);

                            if Self::navigate_right(valid_index, height) {
                                height = *right_height;
                                node = right;
                            } else {
                                height = *left_height;
                                node = left;
                            }
                        }
                        Node::Leaf { bundle } => {
                            debug_assert_eq!(height, 0);
                            break bundle;
                        }
                    }
                };

                Ok(&bundle[index_in_bundle::<BUNDLE>(valid_index)])
            }
            Repr::Flat(elements) => Ok(&elements[valid_index]),
        }
    }

    pub fn get_mut(&mut self, index: u64) -> Result<&mut T, IndexError>
    where
        T: Clone,
    {
        let valid_index = shared::validate_index(self.len_usize(), index)?;

        match &mut self.repr {
            Repr::Shared { root, length } => {
                let mut height = Self::depth_of_length(*length);

                let mut node = root
                    .as_mut()
                    .expect("the length check in validate_index ensures that the root exists")
                    .make_mut()
                    .as_mut();

                let bundle = loop {
                    match node {
                        Node::Internal {
                            left,
                            right,
                            left_height,
                            right_height,
                        } => {
                            debug_assert_eq!(height, *left_height + 1);

                            if Self::navigate_right(valid_index, height) {
                                height = *right_height;
                                node = right.make_mut().as_mut();
                            } else {
                                height = *left_height;
                                node = left.make_mut().as_mut();
                            }
                        }
                        Node::Leaf { bundle } => {
                            debug_assert_eq!(height, 0);
                            break bundle;
                        }
                    }
                };

                Ok(&mut bundle[index_in_bundle::<BUNDLE>(valid_index)])
            }
            Repr::Flat(elements) => Ok(&mut elements[valid_index]),
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
            Repr::Shared { root, .. } => {
                if let Some(node) = root.as_mut() {
                    if let Some(new_node) = node.update(&mut updater) {
                        *node = new_node;
                    }
                }
            }
            Repr::Flat(elements) => elements.iter_mut().for_each(updater),
        }
    }

    pub fn push(&mut self, element: T) -> Result<(), PushError>
    where
        T: Clone,
        N: Unsigned,
    {
        match self.len_usize().cmp(&shared_maximum::<N>()) {
            Ordering::Less => {}
            Ordering::Equal => return Err(PushError::ListFull),
            Ordering::Greater => unreachable!("the check above prevents overfilling the list"),
        }

        match &mut self.repr {
            Repr::Shared { root, length } => {
                match root.as_mut() {
                    Some(node) => node.make_mut().push(element, *length),
                    None => *root = Some(Node::arc_single(element)),
                }

                *length += 1;
            }
            Repr::Flat(elements) => elements.push(element),
        }

        Ok(())
    }

    fn navigate_right(index: usize, height: u8) -> bool {
        index.get_bit(usize::from(height + bundle_ilog2::<BUNDLE>() - 1))
    }

    fn depth_of_length(length: usize) -> u8 {
        length.ilog2_ceil().saturating_sub(bundle_ilog2::<BUNDLE>())
    }

    fn max_depth() -> u8
    where
        N: Unsigned,
    {
        N::U64.ilog2_ceil().saturating_sub(bundle_ilog2::<BUNDLE>())
    }

    fn validate_length(actual: usize) -> Result<(), ReadError>
    where
        N: Unsigned,
    {
        let maximum = shared_maximum::<N>();

        if actual > maximum {
            return Err(ReadError::ListTooLong { maximum, actual });
        }

        Ok(())
    }
}

#[derive(Derivative)]
#[derivative(Clone(bound = "T: Clone"))]
pub(crate) enum Node<T, const BUNDLE: usize> {
    Internal {
        left: Arc<Hc<Self>>,
        right: Arc<Hc<Self>>,
        left_height: u8,
        right_height: u8,
    },
    Leaf {
        // Boxing the bundle makes `Node` smaller.
        bundle: Box<[T]>,
    },
}

impl<T: SszHash + SszWrite, const BUNDLE: usize> SszHash for Node<T, BUNDLE> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Internal {
                left,
                right,
                left_height,
                right_height,
            } => {
                let right_hash = (*right_height..*left_height)
                    .map(zero_hash::<T, BUNDLE>)
                    .fold(right.hash_tree_root(), hashing::hash_256_256);

                hashing::hash_256_256(left.hash_tree_root(), right_hash)
            }
            Self::Leaf { bundle } => {
                let depth = leaf_chunk_depth::<T, BUNDLE>();

                if T::PackingFactor::USIZE == 1 {
                    merkle::merkleize_chunks(bundle.iter().map(SszHash::hash_tree_root), depth)
                } else {
                    merkle::merkleize_packed(bundle, depth)
                }
            }
        }
    }
}

impl<T, const BUNDLE: usize> Node<T, BUNDLE> {
    pub(crate) fn arc_single(element: T) -> Arc<Hc<Self>> {
        Hc::arc(Self::leaf([element]))
    }

    pub(crate) fn leaf(bundle: impl Into<Box<[T]>>) -> Self {
        let bundle = bundle.into();

        assert!(bundle.len() <= BUNDLE);

        Self::Leaf { bundle }
    }

    fn push(&mut self, element: T, current_length_and_new_index: usize)
    where
        T: Clone,
    {
        // Leaves are normally never empty. An empty leaf is only created if
        // the closure below panics.
        replace_with::replace_with(
            self,
            || Self::leaf([]),
            |node| match node {
                Self::Internal {
                    left,
                    mut right,
                    left_height,
                    mut right_height,
                } => {
                    if pushing_increases_height::<BUNDLE>(current_length_and_new_index) {
                        assert_eq!(left_height, right_height);

                        Self::Internal {
                            left: Hc::arc(Self::Internal {
                                left,
                                right,
                                left_height,
                                right_height,
                            }),
                            right: Self::arc_single(element),
                            left_height: left_height + 1,
                            right_height: 0,
                        }
                    } else {
                        let left_length = BUNDLE << left_height;
                        assert!(left_length < current_length_and_new_index);

                        let right_length = current_length_and_new_index - left_length;
                        assert!(right_length < left_length);

                        right.make_mut().push(element, right_length);

                        if pushing_increases_height::<BUNDLE>(right_length) {
                            right_height += 1;
                        }

                        assert!(right_height <= left_height);

                        Self::Internal {
                            left,
                            right,
                            left_height,
                            right_height,
                        }
                    }
                }
                Self::Leaf { bundle } => {
                    if bundle.len() == BUNDLE {
                        Self::Internal {
                            left: Hc::arc(Self::leaf(bundle)),
                            right: Self::arc_single(element),
                            left_height: 0,
                            right_height: 0,
                        }
                    } else {
                        let mut elements = Vec::from(bundle);
                        elements.reserve_exact(1);
                        elements.push(element);
                        Self::leaf(elements)
                    }
                }
            },
        );
    }

    // Mutably borrowing an `FnMut` closure inside a recursive function causes
    // infinite recursion during monomorphization. Borrowing it outside and
    // passing the reference prevents that.
    pub(crate) fn update(&self, updater: &mut impl FnMut(&mut T)) -> Option<Arc<Hc<Self>>>
    where
        T: Clone + PartialEq,
    {
        match self {
            Self::Internal {
                left,
                right,
                left_height,
                right_height,
            } => {
                let (left, right) = match (left.update(updater), right.update(updater)) {
                    (Some(new_left), Some(new_right)) => (new_left, new_right),
                    (Some(new_left), None) => (new_left, right.clone_arc()),
                    (None, Some(new_right)) => (left.clone_arc(), new_right),
                    (None, None) => return None,
                };

                Some(Hc::arc(Self::Internal {
                    left,
                    right,
                    left_height: *left_height,
                    right_height: *right_height,
                }))
            }
            Self::Leaf { bundle } => {
                let mut clone = bundle.clone();
                clone.iter_mut().for_each(updater);
                (bundle != &clone).then(|| Hc::arc(Self::leaf(clone)))
            }
        }
    }
}

pub struct Leaves<'list, T, const BUNDLE: usize> {
    stack: Vec<&'list Node<T, BUNDLE>>,
}

impl<'list, T, const BUNDLE: usize> Leaves<'list, T, BUNDLE> {
    pub(crate) fn from_root(root: &'list Node<T, BUNDLE>) -> Self {
        Self { stack: vec![root] }
    }

    pub(crate) fn empty() -> Self {
        Self { stack: vec![] }
    }
}

impl<'list, T, const BUNDLE: usize> Iterator for Leaves<'list, T, BUNDLE> {
    type Item = &'list [T];

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|mut node| loop {
            match node {
                Node::Internal { left, right, .. } => {
                    self.stack.push(right);
                    node = left;
                }
                Node::Leaf { bundle } => break bundle.as_ref(),
            }
        })
    }
}

impl<T, const BUNDLE: usize> FusedIterator for Leaves<'_, T, BUNDLE> {}

pub(crate) fn build_tree<T, const BUNDLE: usize>(
    elements: impl IntoIterator<Item = T>,
) -> (Option<Arc<Hc<Node<T, BUNDLE>>>>, usize) {
    let mut length: usize = 0;

    let mut nodes_with_heights = elements
        .into_iter()
        .inspect(|_| length += 1)
        .chunks(BUNDLE)
        .into_iter()
        .map(Box::from_iter)
        .map(Node::leaf)
        .map(Hc::arc)
        .map(|node| (node, 0))
        .collect_vec();

    if length == 0 {
        return (None, 0);
    }

    let depth = length
        .ilog2_ceil()
        .saturating_sub(bundle_ilog2::<BUNDLE>());

    for _ in 0..depth {
        nodes_with_heights = nodes_with_heights
            .into_iter()
            .chunks(2)
            .into_iter()
            .map(|mut chunk| match (chunk.next(), chunk.next()) {
                (Some((left, left_height)), Some((right, right_height))) => (
                    Hc::arc(Node::Internal {
                        left,
                        right,
                        left_height,
                        right_height,
                    }),
                    left_height + 1,
                ),
                (Some(left_over), None) => left_over,
                _ => unreachable!("Itertools::chunks never yields empty chunks"),
            })
            .collect();
    }

    let (node, root_height) = nodes_with_heights
        .into_iter()
        .exactly_one()
        .ok()
        .expect("only the root should be left");

    assert_eq!(root_height, depth);

    (Some(node), length)
}

pub(crate) const fn bundle_ilog2<const BUNDLE: usize>() -> u8 {
    assert!(BUNDLE.is_power_of_two());
    BUNDLE.trailing_zeros() as u8
}

pub(crate) fn leaf_chunk_depth<T: SszHash, const BUNDLE: usize>() -> u8 {
    bundle_ilog2::<BUNDLE>() - T::PackingFactor::ilog2()
}

pub(crate) fn zero_hash<T: SszHash, const BUNDLE: usize>(height: u8) -> H256 {
    let chunk_height = height + bundle_ilog2::<BUNDLE>() - T::PackingFactor::ilog2();
    ZERO_HASHES[usize::from(chunk_height)]
}

fn pushing_increases_height<const BUNDLE: usize>(current_length_and_new_index: usize) -> bool {
    let bundle_index = current_length_and_new_index >> bundle_ilog2::<BUNDLE>();
    let index_in_bundle = index_in_bundle::<BUNDLE>(current_length_and_new_index);

    bundle_index.is_power_of_two() && index_in_bundle == 0
}

const fn index_in_bundle<const BUNDLE: usize>(index: usize) -> usize {
    index & (BUNDLE - 1)
}

fn shared_maximum<N: Unsigned>() -> usize {
    usize::try_from(N::U64).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use typenum::{U1024, U8};

    use super::*;

    type ContainerishList = PersistentList<H256, U1024, 2>;
    type PackedList = PersistentList<u64, U1024, 8>;

    #[test]
    fn transient_and_persistent_roots_are_identical() -> Result<(), ReadError> {
        let mut list = PackedList::try_from_iter(0..100)?;
        let persistent_root = list.hash_tree_root();

        list.make_transient();

        assert_eq!(list.storage_mode(), StorageMode::Transient);
        assert_eq!(list.hash_tree_root(), persistent_root);

        list.make_persistent();

        assert_eq!(list.storage_mode(), StorageMode::Persistent);
        assert_eq!(list.hash_tree_root(), persistent_root);

        Ok(())
    }

    #[test]
    fn pushing_matches_building_from_an_iterator() -> Result<(), ReadError> {
        for length in 0..50_u64 {
            let built = PackedList::try_from_iter(0..length)?;

            let mut pushed = PackedList::default();

            for element in 0..length {
                pushed.push(element).expect("list is not full");
            }

            assert_eq!(pushed, built);
            assert_eq!(pushed.hash_tree_root(), built.hash_tree_root());
            assert_eq!(pushed.len_u64(), length);
        }

        Ok(())
    }

    #[test]
    fn updates_preserve_unmodified_subtrees() -> Result<(), ReadError> {
        let original = ContainerishList::try_from_iter((0..32).map(H256::from_low_u64_be))?;
        let mut updated = original.clone();

        updated.update(|hash| {
            if *hash == H256::from_low_u64_be(5) {
                *hash = H256::repeat_byte(0xff);
            }
        });

        assert_ne!(updated, original);
        assert_eq!(*updated.get(5).expect("index 5 is in bounds"), H256::repeat_byte(0xff));
        assert_eq!(*original.get(5).expect("index 5 is in bounds"), H256::from_low_u64_be(5));
    }

    #[test]
    fn empty_list_hashes_to_mixed_in_zero() {
        let list = PersistentList::<u64, U8, 8>::default();

        assert_eq!(
            list.hash_tree_root(),
            merkle::mix_in_length(ZERO_HASHES[1], 0),
        );
    }

    #[test]
    fn get_mut_does_not_affect_clones() -> Result<(), ReadError> {
        let original = PackedList::try_from_iter(0..64)?;
        let mut copy = original.clone();

        *copy.get_mut(10).expect("index 10 is in bounds") = 1000;

        assert_eq!(*original.get(10).expect("index 10 is in bounds"), 10);
        assert_eq!(*copy.get(10).expect("index 10 is in bounds"), 1000);

        Ok(())
    }
}
