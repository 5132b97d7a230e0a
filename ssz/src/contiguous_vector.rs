use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
};

use derivative::Derivative;
use derive_more::{AsRef, Deref, DerefMut};
use ethereum_types::H256;
use generic_array::{ArrayLength, GenericArray};
use serde::{
    de::{Error as _, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use try_from_iterator::TryFromIterator;
use typenum::{Unsigned as _, U1};

use crate::{
    error::{ReadError, WriteError},
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    shared,
    size::Size,
};

/// A flat SSZ vector of exactly `N` elements.
#[derive(Deref, DerefMut, AsRef, Derivative, Serialize)]
#[as_ref(forward)]
#[derivative(
    Clone(bound = "T: Clone"),
    PartialEq(bound = "T: PartialEq"),
    Eq(bound = "T: Eq"),
    Default(bound = "T: Default"),
    Debug(bound = "T: Debug", transparent = "true")
)]
#[serde(bound(serialize = "T: Serialize"), transparent)]
pub struct ContiguousVector<T, N: ArrayLength<T>> {
    elements: GenericArray<T, N>,
}

impl<T: Copy, N: ArrayLength<T, ArrayType: Copy>> Copy for ContiguousVector<T, N> {}

impl<T, N: ArrayLength<T>, A: Into<GenericArray<T, N>>> From<A> for ContiguousVector<T, N> {
    fn from(array: A) -> Self {
        Self {
            elements: array.into(),
        }
    }
}

impl<T, N: ArrayLength<T>> IntoIterator for ContiguousVector<T, N> {
    type Item = T;
    type IntoIter = <GenericArray<T, N> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'vector, T, N: ArrayLength<T>> IntoIterator for &'vector ContiguousVector<T, N> {
    type Item = &'vector T;
    type IntoIter = <&'vector [T] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, N: ArrayLength<T>> TryFromIterator<T> for ContiguousVector<T, N> {
    type Error = ReadError;

    fn try_from_iter(elements: impl IntoIterator<Item = T>) -> Result<Self, Self::Error> {
        let expected = N::USIZE;

        let mut actual = 0;
        let mut counting_iterator = elements.into_iter().inspect(|_| actual += 1);

        let Some(elements) = GenericArray::from_exact_iter(counting_iterator.by_ref()) else {
            counting_iterator.count();
            return Err(ReadError::VectorSizeMismatch { expected, actual });
        };

        Ok(Self { elements })
    }
}

// The `Deserialize` impl for `GenericArray` requires `T: Default` even though
// it's completely avoidable.
impl<'de, T: Deserialize<'de>, N: ArrayLength<T>> Deserialize<'de> for ContiguousVector<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ContiguousVectorVisitor<T, N>(PhantomData<(T, N)>);

        impl<'de, T: Deserialize<'de>, N: ArrayLength<T>> Visitor<'de> for ContiguousVectorVisitor<T, N> {
            type Value = ContiguousVector<T, N>;

            fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
                write!(formatter, "a vector of length {}", N::USIZE)
            }

            fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
                itertools::process_results(
                    core::iter::from_fn(|| seq.next_element().transpose()),
                    |elements| ContiguousVector::try_from_iter(elements).map_err(S::Error::custom),
                )?
            }
        }

        deserializer.deserialize_tuple(N::USIZE, ContiguousVectorVisitor(PhantomData))
    }
}

impl<T: SszSize, N: ArrayLength<T>> SszSize for ContiguousVector<T, N> {
    const SIZE: Size = T::SIZE.mul(N::USIZE);
}

impl<C, T: SszRead<C>, N: ArrayLength<T>> SszRead<C> for ContiguousVector<T, N> {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let results = shared::read_vector::<_, _, N>(context, bytes)?;
        itertools::process_results(results, |elements| Self::try_from_iter(elements))?
    }
}

impl<T: SszWrite, N: ArrayLength<T>> SszWrite for ContiguousVector<T, N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        shared::write_fixed_vector(bytes, self);
    }
}

impl<T: SszHash + SszWrite, N: ArrayLength<T>> SszHash for ContiguousVector<T, N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let depth = merkle::chunk_depth_for_elements::<T>(N::U64);

        if T::PackingFactor::USIZE == 1 {
            merkle::merkleize_chunks(self.iter().map(SszHash::hash_tree_root), depth)
        } else {
            merkle::merkleize_packed(self, depth)
        }
    }
}

impl<T, N: ArrayLength<T>> ContiguousVector<T, N> {
    #[must_use]
    pub fn repeat_element(element: T) -> Self
    where
        T: Clone,
    {
        Self::try_from_iter(core::iter::repeat_n(element, N::USIZE))
            .expect("length of iterator matches type parameter")
    }
}
