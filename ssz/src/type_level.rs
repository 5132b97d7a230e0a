use core::ops::{Add, Shr};

use generic_array::ArrayLength;
use typenum::{op, IsLess, Shleft, Sum, True, Unsigned, U1, U3, U64, U7};

/// Marker for [type-level numbers] whose values fit in `u64`.
///
/// [type-level numbers]: typenum
pub trait FitsInU64: Unsigned {}

impl<N: Unsigned + IsLess<Shleft<U1, U64>, Output = True>> FitsInU64 for N {}

/// Trait for [type-level numbers] usable as bit vector lengths.
///
/// [type-level numbers]: typenum
pub trait BitVectorBits: Unsigned {
    type Bytes: ArrayLength<u8, ArrayType: Copy>;
}

impl<N> BitVectorBits for N
where
    Self: Add<U7> + Unsigned,
    Sum<Self, U7>: Shr<U3>,
    BitsToBytes<Self>: ArrayLength<u8, ArrayType: Copy>,
{
    type Bytes = BitsToBytes<Self>;
}

type BitsToBytes<N> = op!((N + U7) >> U3);
