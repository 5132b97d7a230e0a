use core::num::{NonZeroU64, NonZeroUsize};

use easy_ext::ext;
use typenum::{NonZero, Unsigned};

#[ext(NonZeroExt)]
pub impl<N: Unsigned + NonZero> N {
    #[inline]
    #[must_use]
    fn non_zero() -> NonZeroU64 {
        NonZeroU64::new(Self::U64).expect("the bound on N ensures that it is nonzero")
    }

    #[inline]
    #[must_use]
    fn ilog2() -> u8 {
        Self::non_zero()
            .ilog2()
            .try_into()
            .expect("binary logarithm of u64 should fit in u8")
    }
}

#[ext(UsizeExt)]
pub impl usize {
    #[inline]
    #[must_use]
    fn is_multiple_of_nonzero(self, factor: NonZeroUsize) -> bool {
        self % factor == 0
    }

    #[inline]
    #[must_use]
    fn div_typenum<N: Unsigned + NonZero>(self) -> Self {
        self / N::USIZE
    }

    /// Ceiling of the binary logarithm, with `ilog2_ceil(0) == 0`.
    #[inline]
    #[must_use]
    fn ilog2_ceil(self) -> u8 {
        self.checked_next_power_of_two()
            .map_or(Self::BITS, Self::trailing_zeros)
            .try_into()
            .expect("number of bits in usize should fit in u8")
    }
}

#[ext(U64Ext)]
pub impl u64 {
    #[inline]
    #[must_use]
    fn is_multiple_of_nonzero(self, factor: NonZeroU64) -> bool {
        self % factor == 0
    }

    #[inline]
    #[must_use]
    fn prev_multiple_of(self, factor: NonZeroU64) -> Self {
        self - self % factor
    }

    #[inline]
    #[must_use]
    fn div_typenum<N: Unsigned + NonZero>(self) -> Self {
        self / N::U64
    }

    #[inline]
    #[must_use]
    fn mod_typenum<N: Unsigned + NonZero>(self) -> Self {
        self % N::U64
    }

    /// Ceiling of the binary logarithm, with `ilog2_ceil(0) == 0`.
    #[inline]
    #[must_use]
    fn ilog2_ceil(self) -> u8 {
        self.checked_next_power_of_two()
            .map_or(Self::BITS, Self::trailing_zeros)
            .try_into()
            .expect("number of bits in u64 should fit in u8")
    }
}

#[cfg(test)]
mod tests {
    use typenum::U8;

    use super::*;

    #[test]
    fn ilog2_ceil_rounds_up() {
        assert_eq!(0_usize.ilog2_ceil(), 0);
        assert_eq!(1_usize.ilog2_ceil(), 0);
        assert_eq!(2_usize.ilog2_ceil(), 1);
        assert_eq!(3_usize.ilog2_ceil(), 2);
        assert_eq!(8_usize.ilog2_ceil(), 3);
        assert_eq!(9_usize.ilog2_ceil(), 4);
    }

    #[test]
    fn prev_multiple_of_rounds_down() {
        let factor = NonZeroU64::new(32).expect("32 is nonzero");

        assert_eq!(0.prev_multiple_of(factor), 0);
        assert_eq!(31.prev_multiple_of(factor), 0);
        assert_eq!(32.prev_multiple_of(factor), 32);
        assert_eq!(33.prev_multiple_of(factor), 32);
    }

    #[test]
    fn typenum_divisions_match_plain_ones() {
        assert_eq!(20_u64.div_typenum::<U8>(), 2);
        assert_eq!(20_u64.mod_typenum::<U8>(), 4);
        assert_eq!(20_usize.div_typenum::<U8>(), 2);
    }
}
