// Impls for types that correspond to the `BytesN` types from the SSZ
// specification and for the 256-bit unsigned integer used by the execution
// layer. `BytesN` values are not basic types, so they are not packed.

use ethereum_types::{H160, H256, H32, U256};
use typenum::U1;

use crate::{
    error::ReadError,
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

macro_rules! impl_ssz_for_fixed_hash {
    ($ty:ty) => {
        impl SszSize for $ty {
            const SIZE: Size = Size::Fixed {
                size: Self::len_bytes(),
            };
        }

        impl<C> SszRead<C> for $ty {
            #[inline]
            fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
                Ok(Self::from_slice(bytes))
            }
        }

        impl SszWrite for $ty {
            #[inline]
            fn write_fixed(&self, bytes: &mut [u8]) {
                bytes.copy_from_slice(self.as_bytes());
            }
        }
    };
}

impl_ssz_for_fixed_hash!(H32);
impl_ssz_for_fixed_hash!(H160);
impl_ssz_for_fixed_hash!(H256);

impl SszHash for H32 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        hash
    }
}

impl SszHash for H160 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        hash[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        hash
    }
}

impl SszHash for H256 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszSize for U256 {
    const SIZE: Size = Size::Fixed { size: 32 };
}

impl<C> SszRead<C> for U256 {
    #[inline]
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Self::from_little_endian(bytes))
    }
}

impl SszWrite for U256 {
    #[inline]
    fn write_fixed(&self, bytes: &mut [u8]) {
        self.to_little_endian(bytes);
    }
}

impl SszHash for U256 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut hash = H256::zero();
        self.to_little_endian(hash.as_bytes_mut());
        hash
    }
}

// `ethereum-types` does not define the 384 and 768 bit arrays used for
// compressed public keys and signatures; those come from `primitive-types`.

impl_ssz_for_fixed_hash!(primitive_types::H384);
impl_ssz_for_fixed_hash!(primitive_types::H768);

impl SszHash for primitive_types::H384 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        merkle::merkleize_bytes(self, 1)
    }
}

impl SszHash for primitive_types::H768 {
    type PackingFactor = U1;

    #[inline]
    fn hash_tree_root(&self) -> H256 {
        merkle::merkleize_bytes(self, 2)
    }
}
