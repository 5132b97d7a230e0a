//! The swap-or-not shuffle.
//!
//! See the following for an explanation of the algorithm:
//! - <https://github.com/protolambda/eth2-docs/tree/de65f38857f1e27ffb6f25107d61e795cf1a5ad7#shuffling>
//! - <https://link.springer.com/chapter/10.1007/978-3-642-32009-5_1>

use core::{num::NonZeroU64, ops::Rem as _};

use anyhow::Result;
use bit_field::BitArray as _;
use types::{phase0::primitives::H256, preset::Preset};

const BITS_PER_HASH: u64 = H256::len_bytes() as u64 * 8;

/// [`compute_shuffled_index`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#compute_shuffled_index)
#[must_use]
pub fn shuffle_single<P: Preset>(mut index: u64, index_count: NonZeroU64, seed: H256) -> u64 {
    assert!(index < index_count.get());

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);
        let source = compute_source(seed, round, position / BITS_PER_HASH);
        let bit_index = position.to_le_bytes()[0].into();
        let bit = source.as_bytes().get_bit(bit_index);

        if bit {
            index = flip;
        }
    }

    index
}

/// Shuffles `slice` so that `shuffled[index] == original[shuffle_single(index)]`.
///
/// This is the direct form of the shuffle: every index is mapped through
/// [`shuffle_single`]. Batched implementations that process whole hashes of
/// swap bits per round exist and are several times faster, but committee
/// shufflings are computed once per epoch and cached, so the simple form is
/// fast enough.
pub fn shuffle_slice<P: Preset, T: Copy>(slice: &mut [T], seed: H256) -> Result<()> {
    let Some(length) = NonZeroU64::new(slice.len().try_into()?) else {
        return Ok(());
    };

    let original = slice.to_vec();

    for (index, element) in slice.iter_mut().enumerate() {
        let source_index = shuffle_single::<P>(index.try_into()?, length, seed);

        *element = original[usize::try_from(source_index)?];
    }

    Ok(())
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    hashing::hash_256_8(seed, round)
        .as_bytes()
        .get(..size_of::<u64>())
        .map(|bytes| bytes.try_into().map(u64::from_le_bytes))
        .expect("hash is longer than u64")
        .expect("slice has the same size as u64")
        .rem(index_count)
}

fn compute_source(seed: H256, round: u8, position_window: u64) -> H256 {
    // Truncate to match the behavior of `compute_shuffled_index` in `consensus-specs`.
    #[allow(clippy::cast_possible_truncation)]
    hashing::hash_256_8_32(seed, round, position_window as u32)
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn shuffled_slice_is_a_permutation() -> Result<()> {
        let seed = H256::repeat_byte(0x2a);
        let mut indices = (0_u64..25).collect_vec();

        shuffle_slice::<Minimal, _>(&mut indices, seed)?;

        assert_ne!(indices, (0..25).collect_vec());

        let mut sorted = indices.clone();
        sorted.sort_unstable();

        assert_eq!(sorted, (0..25).collect_vec());

        Ok(())
    }

    #[test]
    fn slice_shuffling_matches_single_index_shuffling() -> Result<()> {
        let seed = H256::repeat_byte(0x13);
        let length = NonZeroU64::new(21).expect("21 is nonzero");

        let original = (100_u64..121).collect_vec();
        let mut shuffled = original.clone();

        shuffle_slice::<Minimal, _>(&mut shuffled, seed)?;

        for index in 0..length.get() {
            let source = shuffle_single::<Minimal>(index, length, seed);
            assert_eq!(shuffled[usize::try_from(index)?], original[usize::try_from(source)?]);
        }

        Ok(())
    }

    #[test]
    fn single_index_shuffling_stays_in_range() {
        let index_count = NonZeroU64::new(25).expect("25 is nonzero");

        for index in 0..index_count.get() {
            assert!(shuffle_single::<Minimal>(index, index_count, H256::zero()) < index_count.get());
        }
    }
}
