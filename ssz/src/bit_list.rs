use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
    ops::BitOrAssign,
};

use bit_field::BitArray as _;
use bitvec::{boxed::BitBox, vec::BitVec};
use derivative::Derivative;
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;
use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned, U1};

use crate::{
    consts::{BITS_PER_BYTE, BYTES_PER_CHUNK},
    error::{ReadError, WriteError},
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
};

/// An SSZ bit list with a maximum length of `N` bits.
///
/// We rely on `bitvec::order::Lsb0` being the default bit ordering to
/// implement SSZ correctly. `BitBox` is used instead of `Box<[u8]>` because
/// the latter would need the length in bits stored in a separate field.
#[derive(Deref, DerefMut, Derivative)]
#[derivative(
    Clone(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    PartialOrd(bound = ""),
    Ord(bound = ""),
    Default(bound = "")
)]
pub struct BitList<N> {
    #[deref]
    #[deref_mut]
    bits: BitBox<u8>,
    #[derivative(PartialEq = "ignore", PartialOrd = "ignore", Ord = "ignore")]
    phantom: PhantomData<N>,
}

impl<N: Unsigned> TryFrom<Vec<u8>> for BitList<N> {
    type Error = ReadError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let length = Self::measure_length(bytes.as_slice())?;
        Ok(Self::from_vec_with_length(bytes, length))
    }
}

// This could be a `From` impl if feature `generic_const_exprs` were stable.
impl<N: Unsigned, const SIZE: usize> TryFrom<[bool; SIZE]> for BitList<N> {
    type Error = ReadError;

    fn try_from(bits: [bool; SIZE]) -> Result<Self, Self::Error> {
        let maximum = N::USIZE;

        if SIZE > maximum {
            return Err(ReadError::BitListTooLong {
                maximum,
                actual: SIZE,
            });
        }

        let mut bit_list = Self::with_length(SIZE);

        for (index, bit) in bits.into_iter().enumerate() {
            bit_list.bits.set(index, bit);
        }

        Ok(bit_list)
    }
}

impl<N> BitOrAssign<&Self> for BitList<N> {
    fn bitor_assign(&mut self, other: &Self) {
        assert_eq!(self.len(), other.len());

        self.bits |= &other.bits;
    }
}

impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

// `BitBox` (de)serializes itself as a struct with multiple fields.
impl<'de, N: Unsigned> Deserialize<'de> for BitList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_utils::prefixed_hex_or_bytes_cow::deserialize(deserializer)?
            .into_owned()
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<N> Serialize for BitList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut ssz_bytes = vec![];
        self.write_variable(&mut ssz_bytes)
            .map_err(S::Error::custom)?;
        serde_utils::prefixed_hex_or_bytes_slice::serialize(ssz_bytes, serializer)
    }
}

impl<N> SszSize for BitList<N> {
    const SIZE: Size = Size::Variable { minimum_size: 1 };
}

impl<C, N: Unsigned> SszRead<C> for BitList<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        let length = Self::measure_length(bytes)?;
        let bytes = bytes[..bytes_without_delimiting_bit(length)].to_vec();
        Ok(Self::from_vec_with_length(bytes, length))
    }
}

impl<N> SszWrite for BitList<N> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        let length_before = bytes.len();
        let length_after = length_before + bytes_with_delimiting_bit(self.len());

        bytes.resize(length_after, 0);

        let new_bytes = &mut bytes[length_before..];

        new_bytes[..bytes_without_delimiting_bit(self.len())].copy_from_slice(self.as_raw_slice());
        new_bytes.set_bit(self.len(), true);

        Ok(())
    }
}

impl<N: Unsigned> SszHash for BitList<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        let root = merkle::merkleize_bytes(self.as_raw_slice(), Self::merkle_depth());
        merkle::mix_in_length(root, self.len())
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn with_length(length: usize) -> Self
    where
        N: Unsigned,
    {
        Self::new(false, length)
    }

    #[must_use]
    pub fn new(value: bool, length: usize) -> Self
    where
        N: Unsigned,
    {
        assert!(length <= N::USIZE);

        let mut bits = BitVec::<u8>::new();
        bits.resize(length, value);

        Self::from_bit_box(bits.into_boxed_bitslice())
    }

    fn merkle_depth() -> u8
    where
        N: Unsigned,
    {
        use arithmetic::U64Ext as _;

        let max_bytes =
            u64::try_from(N::USIZE.div_ceil(BITS_PER_BYTE)).expect("bit counts fit in u64");

        max_bytes
            .div_ceil(BYTES_PER_CHUNK as u64)
            .ilog2_ceil()
    }

    fn measure_length(bytes: &[u8]) -> Result<usize, ReadError>
    where
        N: Unsigned,
    {
        let leading_zeros_in_last_byte = bytes
            .last()
            .ok_or(ReadError::BitListEmptySlice)?
            .leading_zeros()
            .try_into()
            .expect("number of bits in a byte should fit in usize");

        let data_bits_in_last_byte = (BITS_PER_BYTE - 1)
            .checked_sub(leading_zeros_in_last_byte)
            .ok_or(ReadError::BitListNoDelimitingBit)?;

        let maximum = N::USIZE;
        let actual = (bytes.len() - 1) * BITS_PER_BYTE + data_bits_in_last_byte;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(actual)
    }

    fn from_vec_with_length(bytes: Vec<u8>, length: usize) -> Self {
        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(length);
        Self::from_bit_box(bits.into_boxed_bitslice())
    }

    fn from_bit_box(mut bits: BitBox<u8>) -> Self {
        bits.fill_uninitialized(false);

        Self {
            bits,
            phantom: PhantomData,
        }
    }
}

const fn bytes_without_delimiting_bit(bit_count: usize) -> usize {
    bit_count.div_ceil(BITS_PER_BYTE)
}

const fn bytes_with_delimiting_bit(bit_count: usize) -> usize {
    bit_count / BITS_PER_BYTE + 1
}

#[cfg(test)]
mod tests {
    use typenum::U16;

    use crate::porcelain::SszReadDefault as _;

    use super::*;

    #[test]
    fn serialization_round_trips_through_the_delimiting_bit() -> Result<(), ReadError> {
        let bit_list = BitList::<U16>::try_from([true, false, true, false, false, true])?;
        let bytes = bit_list.to_ssz().expect("bit list fits in memory");

        assert_eq!(bytes, vec![0b0110_0101]);
        assert_eq!(BitList::<U16>::from_ssz_default(bytes)?, bit_list);

        Ok(())
    }

    #[test]
    fn length_is_measured_from_the_delimiting_bit() {
        assert_eq!(BitList::<U16>::measure_length(&[0b0000_0001]), Ok(0));
        assert_eq!(BitList::<U16>::measure_length(&[0b0000_0010]), Ok(1));
        assert_eq!(BitList::<U16>::measure_length(&[0b1000_0000]), Ok(7));
        assert_eq!(BitList::<U16>::measure_length(&[0, 0b0000_0001]), Ok(8));

        assert_eq!(
            BitList::<U16>::measure_length(&[0b0000_0000]),
            Err(ReadError::BitListNoDelimitingBit),
        );
    }
}
