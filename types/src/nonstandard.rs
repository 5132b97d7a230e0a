use bit_field::BitField as _;
use enum_iterator::Sequence;
use enum_map::Enum;
use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use smallvec::SmallVec;
use static_assertions::assert_eq_size;
use strum::{AsRefStr, Display, EnumString};

use crate::{
    altair::{
        consts::{TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX},
        primitives::ParticipationFlags,
    },
    phase0::primitives::H256,
};

pub use smallvec::smallvec;

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Sequence,
    AsRefStr,
    Display,
    EnumString,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
}

/// Like [`Option`], but with [`None`](Self::None) greater than any [`Some`](Self::Some).
///
/// Fork slots compare this way: a fork that is not scheduled is later than
/// any that is.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Toption<T> {
    // The order of variants affects the derived `PartialOrd` and `Ord` impls.
    Some(T),
    None,
}

impl<T> Toption<T> {
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Some(value) => Some(value),
            Self::None => None,
        }
    }

    pub fn expect(self, message: &str) -> T {
        self.into_option().expect(message)
    }
}

#[derive(Clone, Copy, Debug, Enum)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

impl From<AttestationEpoch> for RelativeEpoch {
    fn from(attestation_epoch: AttestationEpoch) -> Self {
        match attestation_epoch {
            AttestationEpoch::Previous => Self::Previous,
            AttestationEpoch::Current => Self::Current,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AttestationEpoch {
    Previous,
    Current,
}

#[derive(Clone, Copy, Debug, Enum)]
pub enum SlashingKind {
    Proposer,
    Attester,
}

type U64Vec = SmallVec<[u64; 2 * size_of::<usize>() / size_of::<u64>()]>;

assert_eq_size!(U64Vec, Vec<u64>);

pub type GweiVec = U64Vec;

pub trait Outcome: Copy {
    fn compare(actual: H256, expected: H256) -> Self;
}

impl Outcome for bool {
    #[inline]
    fn compare(actual: H256, expected: H256) -> Self {
        actual == expected
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum AttestationOutcome {
    Match { root: H256 },
    Mismatch { expected: H256, actual: H256 },
}

impl Outcome for AttestationOutcome {
    #[inline]
    fn compare(actual: H256, expected: H256) -> Self {
        if actual == expected {
            Self::Match { root: expected }
        } else {
            Self::Mismatch { expected, actual }
        }
    }
}

impl AttestationOutcome {
    #[inline]
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Participation flags of one validator in both relevant epochs.
#[derive(Clone, Copy)]
pub struct Participation {
    pub previous: ParticipationFlags,
    pub current: ParticipationFlags,
}

impl Participation {
    #[inline]
    #[must_use]
    pub fn previous_epoch_matching_source(self) -> bool {
        self.previous.get_bit(TIMELY_SOURCE_FLAG_INDEX)
    }

    #[inline]
    #[must_use]
    pub fn previous_epoch_matching_target(self) -> bool {
        self.previous.get_bit(TIMELY_TARGET_FLAG_INDEX)
    }

    #[inline]
    #[must_use]
    pub fn previous_epoch_matching_head(self) -> bool {
        self.previous.get_bit(TIMELY_HEAD_FLAG_INDEX)
    }

    #[inline]
    #[must_use]
    pub fn current_epoch_matching_target(self) -> bool {
        self.current.get_bit(TIMELY_TARGET_FLAG_INDEX)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;

    use super::*;

    #[test]
    fn phase_order() {
        let expected_order = [Phase::Phase0, Phase::Altair, Phase::Bellatrix];

        assert_eq!(expected_order.len(), Phase::CARDINALITY);

        assert!(expected_order
            .into_iter()
            .tuple_windows()
            .all(|(earlier, later)| earlier < later));
    }

    #[test]
    fn phase_parses_in_both_cases() {
        assert_eq!("phase0".parse(), Ok(Phase::Phase0));
        assert_eq!("BELLATRIX".parse(), Ok(Phase::Bellatrix));
        assert_eq!(Phase::Altair.to_string(), "altair");
    }

    #[test]
    fn toption_comparisons() {
        assert!(Toption::None > Toption::Some(u64::MAX));
        assert!(Toption::Some(u64::MIN) < Toption::Some(u64::MAX));
        assert_eq!(Toption::<u64>::None, Toption::<u64>::None);
    }
}
