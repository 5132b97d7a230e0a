//! SSZ Merkleization with depths supplied at runtime.
//!
//! The depth of every Merkle tree in the consensus types is determined by the
//! maximum length of the collection being hashed, not by how full it is.
//! Subtrees past the last chunk are always all zeros, so their roots come from
//! [`ZERO_HASHES`] instead of being computed.

use ethereum_types::H256;
use hashing::ZERO_HASHES;
use typenum::Unsigned as _;

use crate::{
    consts::BYTES_PER_CHUNK,
    porcelain::{SszHash, SszWrite},
};

#[inline]
#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let length = u64::try_from(length).expect("collection lengths fit in u64");
    let mut length_chunk = H256::zero();
    length_chunk[..size_of::<u64>()].copy_from_slice(&length.to_le_bytes());
    hashing::hash_256_256(root, length_chunk)
}

/// Merkleizes `chunks` into the root of a tree of height `depth`.
///
/// Panics if `chunks` does not fit in the tree.
#[must_use]
pub fn merkleize_chunks(chunks: impl IntoIterator<Item = H256>, depth: u8) -> H256 {
    let mut nodes = chunks.into_iter().collect::<Vec<_>>();

    if nodes.is_empty() {
        return ZERO_HASHES[usize::from(depth)];
    }

    assert!(nodes.len() <= checked_capacity(depth));

    for height in 0..usize::from(depth) {
        nodes = nodes
            .chunks(2)
            .map(|pair| match *pair {
                [left, right] => hashing::hash_256_256(left, right),
                [left] => hashing::hash_256_256(left, ZERO_HASHES[height]),
                _ => unreachable!("chunks never yields empty or oversized slices"),
            })
            .collect();
    }

    nodes
        .into_iter()
        .next()
        .expect("reducing a nonempty list of nodes depth times leaves exactly one node")
}

#[must_use]
pub fn merkleize_bytes(bytes: impl AsRef<[u8]>, depth: u8) -> H256 {
    let chunks = bytes.as_ref().chunks(BYTES_PER_CHUNK).map(|partial_chunk| {
        let mut chunk = H256::zero();
        chunk[..partial_chunk.len()].copy_from_slice(partial_chunk);
        chunk
    });

    merkleize_chunks(chunks, depth)
}

/// Merkleizes values of a packed basic type.
#[must_use]
pub fn merkleize_packed<T: SszHash + SszWrite>(values: &[T], depth: u8) -> H256 {
    let size = T::SIZE.fixed_part();

    let chunks = values.chunks(T::PackingFactor::USIZE).map(|pack| {
        let mut chunk = H256::zero();

        chunk
            .as_bytes_mut()
            .chunks_exact_mut(size)
            .zip(pack)
            .for_each(|(destination, element)| element.write_fixed(destination));

        chunk
    });

    merkleize_chunks(chunks, depth)
}

/// Depth in chunks of the Merkle tree for a collection of up to
/// `max_elements` values of type `T`, taking packing into account.
pub(crate) fn chunk_depth_for_elements<T: SszHash>(max_elements: u64) -> u8 {
    use arithmetic::U64Ext as _;

    max_elements
        .div_ceil(T::PackingFactor::U64)
        .ilog2_ceil()
}

fn checked_capacity(depth: u8) -> usize {
    1_usize
        .checked_shl(depth.into())
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_chunks_merkleize_to_zero_hashes() {
        assert_eq!(merkleize_chunks(core::iter::empty(), 0), ZERO_HASHES[0]);
        assert_eq!(merkleize_chunks(core::iter::empty(), 3), ZERO_HASHES[3]);
    }

    #[test]
    fn single_chunk_at_zero_depth_is_the_root() {
        let chunk = H256::repeat_byte(1);

        assert_eq!(merkleize_chunks([chunk], 0), chunk);
    }

    #[test]
    fn partial_trees_are_padded_with_zero_subtrees() {
        let chunk = H256::repeat_byte(1);

        let expected = hashing::hash_256_256(
            hashing::hash_256_256(chunk, ZERO_HASHES[0]),
            ZERO_HASHES[1],
        );

        assert_eq!(merkleize_chunks([chunk], 2), expected);
    }

    #[test]
    fn packing_matches_manual_chunking() {
        let values: [u64; 5] = [1, 2, 3, 4, 5];

        let mut first = H256::zero();
        first[..8].copy_from_slice(&1_u64.to_le_bytes());
        first[8..16].copy_from_slice(&2_u64.to_le_bytes());
        first[16..24].copy_from_slice(&3_u64.to_le_bytes());
        first[24..].copy_from_slice(&4_u64.to_le_bytes());

        let mut second = H256::zero();
        second[..8].copy_from_slice(&5_u64.to_le_bytes());

        assert_eq!(
            merkleize_packed(values.as_slice(), 1),
            hashing::hash_256_256(first, second),
        );
    }
}
