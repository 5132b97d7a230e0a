// These are re-exported primarily to make `ssz_derive` work without additional dependencies.
pub use ethereum_types::H256;
pub use hashing;
pub use ssz_derive::Ssz;
pub use typenum::U1;

pub use crate::{
    bit_list::BitList,
    bit_vector::BitVector,
    byte_list::ByteList,
    byte_vector::ByteVector,
    consts::{Endianness, Offset, BITS_PER_BYTE, BYTES_PER_CHUNK, BYTES_PER_LENGTH_OFFSET},
    contiguous_list::ContiguousList,
    contiguous_vector::ContiguousVector,
    error::{IndexError, PushError, ReadError, WriteError},
    hc::Hc,
    merkle::{merkleize_bytes, merkleize_chunks, merkleize_packed, mix_in_length},
    persistent_list::PersistentList,
    persistent_vector::PersistentVector,
    porcelain::{SszHash, SszRead, SszReadDefault, SszSize, SszWrite},
    shared::{read_offset_unchecked, subslice, write_offset},
    size::Size,
    storage_mode::StorageMode,
    type_level::{BitVectorBits, FitsInU64},
};

mod arrays;
mod basic;
mod bit_list;
mod bit_vector;
mod byte_list;
mod byte_vector;
mod consts;
mod contiguous_list;
mod contiguous_vector;
mod error;
mod hc;
mod iter;
mod merkle;
mod persistent_list;
mod persistent_vector;
mod pointers;
mod porcelain;
mod shared;
mod size;
mod storage_mode;
mod type_level;
