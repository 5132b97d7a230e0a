use core::fmt::Debug;

use derivative::Derivative;
use ethereum_types::H256;
use generic_array::{ArrayLength, GenericArray};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned as _, U1};

use crate::{
    consts::BYTES_PER_CHUNK,
    error::ReadError,
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// An SSZ `ByteVector` of exactly `N` bytes (`logs_bloom` and the like).
#[derive(Derivative)]
#[derivative(
    Clone(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Default(bound = ""),
    Debug(bound = "")
)]
pub struct ByteVector<N: ArrayLength<u8>> {
    bytes: GenericArray<u8, N>,
}

impl<N: ArrayLength<u8>> AsRef<[u8]> for ByteVector<N> {
    fn as_ref(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

impl<N: ArrayLength<u8>> Serialize for ByteVector<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex_or_bytes_slice::serialize(self.bytes.as_slice(), serializer)
    }
}

impl<'de, N: ArrayLength<u8>> Deserialize<'de> for ByteVector<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_utils::prefixed_hex_or_bytes_generic_array::deserialize(deserializer)?;
        Ok(Self { bytes })
    }
}

impl<N: ArrayLength<u8>> SszSize for ByteVector<N> {
    const SIZE: Size = Size::Fixed { size: N::USIZE };
}

impl<C, N: ArrayLength<u8>> SszRead<C> for ByteVector<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self {
            bytes: GenericArray::clone_from_slice(bytes),
        })
    }
}

impl<N: ArrayLength<u8>> SszWrite for ByteVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.bytes.as_slice());
    }
}

impl<N: ArrayLength<u8>> SszHash for ByteVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle::merkleize_bytes(self.bytes.as_slice(), chunk_depth(N::U64))
    }
}

pub(crate) fn chunk_depth(max_bytes: u64) -> u8 {
    use arithmetic::U64Ext as _;

    max_bytes.div_ceil(BYTES_PER_CHUNK as u64).ilog2_ceil()
}
