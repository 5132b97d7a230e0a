use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    iter::FusedIterator,
    ops::{Index, Range},
};

use bit_field::BitArray as _;
use derivative::Derivative;
use ethereum_types::H256;
use generic_array::GenericArray;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use typenum::{Unsigned as _, U1};

use crate::{
    consts::{BITS_PER_BYTE, BYTES_PER_CHUNK},
    error::ReadError,
    merkle,
    porcelain::{SszHash, SszRead, SszSize, SszWrite},
    size::Size,
    type_level::BitVectorBits,
};

/// An SSZ bit vector of exactly `N` bits.
#[derive(Derivative)]
#[derivative(
    Clone(bound = ""),
    Copy(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = ""),
    Default(bound = "")
)]
pub struct BitVector<N: BitVectorBits> {
    bytes: GenericArray<u8, N::Bytes>,
}

// Indexing with a range tests whether all bits in the range are set.
// This is what the justification bit checks in epoch processing need.
impl<N: BitVectorBits> Index<usize> for BitVector<N> {
    type Output = bool;

    fn index(&self, index: usize) -> &Self::Output {
        let bit = self.get(index).unwrap_or_else(|| {
            panic!("index out of bounds (length: {}, index: {index})", N::USIZE)
        });

        if bit {
            &true
        } else {
            &false
        }
    }
}

impl<N: BitVectorBits> Index<Range<usize>> for BitVector<N> {
    type Output = bool;

    fn index(&self, mut range: Range<usize>) -> &Self::Output {
        if range.all(|index| self[index]) {
            &true
        } else {
            &false
        }
    }
}

impl<N: BitVectorBits> IntoIterator for BitVector<N> {
    type Item = bool;
    type IntoIter = Bits<N>;

    fn into_iter(self) -> Self::IntoIter {
        Bits {
            bit_vector: self,
            index: 0,
        }
    }
}

impl<N: BitVectorBits> Debug for BitVector<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in *self {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<N: BitVectorBits> Serialize for BitVector<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_utils::prefixed_hex_or_bytes_slice::serialize(self.bytes.as_slice(), serializer)
    }
}

impl<'de, N: BitVectorBits> Deserialize<'de> for BitVector<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_utils::prefixed_hex_or_bytes_generic_array::deserialize(deserializer)?;
        Self::validate_length(bytes.as_slice()).map_err(D::Error::custom)?;
        Ok(Self { bytes })
    }
}

impl<N: BitVectorBits> SszSize for BitVector<N> {
    const SIZE: Size = Size::Fixed {
        size: <N::Bytes as typenum::Unsigned>::USIZE,
    };
}

impl<C, N: BitVectorBits> SszRead<C> for BitVector<N> {
    fn from_ssz_unchecked(_context: &C, bytes: &[u8]) -> Result<Self, ReadError> {
        Self::validate_length(bytes)?;
        let bytes = GenericArray::clone_from_slice(bytes);
        Ok(Self { bytes })
    }
}

impl<N: BitVectorBits> SszWrite for BitVector<N> {
    fn write_fixed(&self, bytes: &mut [u8]) {
        bytes.copy_from_slice(self.bytes.as_slice());
    }
}

impl<N: BitVectorBits> SszHash for BitVector<N> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        merkle::merkleize_bytes(self.bytes.as_slice(), Self::merkle_depth())
    }
}

impl<N: BitVectorBits> BitVector<N> {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        (index < N::USIZE).then(|| self.bytes.as_slice().get_bit(index))
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bytes
            .iter()
            .map(|byte| usize::try_from(byte.count_ones()).expect("count of bits fits in usize"))
            .sum()
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < N::USIZE);

        self.bytes.as_mut_slice().set_bit(index, value);
    }

    // This is all `consensus-specs` needs.
    // Shifting by more than 8 bits is harder to implement correctly.
    pub fn shift_up_by_1(&mut self) {
        let last_byte_index = self.bytes.len() - 1;
        let last_byte_mask = !0 >> (BITS_PER_BYTE - 1 - (N::USIZE - 1) % BITS_PER_BYTE);

        let mut carry = 0;

        for index in 0..=last_byte_index {
            let old = self.bytes[index];
            self.bytes[index] = (old << 1) | carry;
            carry = old >> (BITS_PER_BYTE - 1);
        }

        self.bytes[last_byte_index] &= last_byte_mask;
    }

    fn merkle_depth() -> u8 {
        use arithmetic::U64Ext as _;

        let max_bytes = u64::try_from(N::USIZE.div_ceil(BITS_PER_BYTE))
            .expect("bit vector lengths fit in u64");

        max_bytes
            .div_ceil(BYTES_PER_CHUNK as u64)
            .ilog2_ceil()
    }

    fn validate_length(bytes: &[u8]) -> Result<(), ReadError> {
        let leading_zeros_in_last_byte: usize = bytes
            .last()
            .expect("BitVector::validate_length is only called with nonempty slices")
            .leading_zeros()
            .try_into()
            .expect("number of bits in a byte should fit in usize");

        let bits_in_last_byte_lower_bound = BITS_PER_BYTE - leading_zeros_in_last_byte;
        let expected = N::USIZE;
        let actual = (bytes.len() - 1) * BITS_PER_BYTE + bits_in_last_byte_lower_bound;

        if actual > expected {
            return Err(ReadError::BitVectorTooLong { expected, actual });
        }

        Ok(())
    }
}

pub struct Bits<N: BitVectorBits> {
    bit_vector: BitVector<N>,
    index: usize,
}

impl<N: BitVectorBits> Iterator for Bits<N> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        (self.index < N::USIZE).then(|| {
            let bit = self.bit_vector.bytes.as_slice().get_bit(self.index);
            self.index += 1;
            bit
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let length = N::USIZE - self.index;
        (length, Some(length))
    }
}

impl<N: BitVectorBits> ExactSizeIterator for Bits<N> {}

impl<N: BitVectorBits> FusedIterator for Bits<N> {}

#[cfg(test)]
mod tests {
    use typenum::U4;

    use super::*;

    #[test]
    fn shifting_justification_bits_discards_the_oldest() {
        let mut bits = BitVector::<U4>::default();
        bits.set(0, true);
        bits.set(3, true);

        bits.shift_up_by_1();

        assert!(!bits[0]);
        assert!(bits[1]);
        assert!(!bits[2]);
        assert!(!bits[3]);
    }

    #[test]
    fn range_indexing_tests_all_bits_in_range() {
        let mut bits = BitVector::<U4>::default();
        bits.set(1, true);
        bits.set(2, true);

        assert!(bits[1..3]);
        assert!(!bits[0..3]);
        assert!(!bits[1..4]);
    }
}
