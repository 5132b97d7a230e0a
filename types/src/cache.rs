use std::sync::Arc;

use bls::PublicKeyBytes;
use enum_map::EnumMap;
use im::HashMap;
use once_cell::sync::OnceCell;

use crate::{
    altair::primitives::NonZeroGwei,
    nonstandard::RelativeEpoch,
    phase0::primitives::ValidatorIndex,
};

/// Lists of active validator indices shared between clones of a state.
///
/// These can grow to millions of entries, so they are behind an `Arc` to make
/// rotating and cloning them cheap.
pub type ValidatorIndices = Arc<[ValidatorIndex]>;

/// Values derived from a `BeaconState`, computed lazily and invalidated by
/// slot and epoch transitions.
///
/// This is not part of the consensus state: it is skipped when hashing,
/// serializing and comparing states. The fields are ordered from short-lived
/// to long-lived.
#[derive(Clone, Default, Debug)]
pub struct Cache {
    // The proposer index is only used in functions that either own the state
    // or have a mutable reference to it, so this could be an
    // `Option<ValidatorIndex>`, but an initialized `OnceCell` is faster to
    // access with `get_or_try_init`.
    pub proposer_index: OnceCell<ValidatorIndex>,
    pub active_validator_indices_ordered: EnumMap<RelativeEpoch, OnceCell<ValidatorIndices>>,
    pub active_validator_indices_shuffled: EnumMap<RelativeEpoch, OnceCell<ValidatorIndices>>,
    pub total_active_balance: EnumMap<RelativeEpoch, OnceCell<NonZeroGwei>>,
    pub validator_indices: OnceCell<HashMap<PublicKeyBytes, ValidatorIndex>>,
}

impl Cache {
    pub fn advance_slot(&mut self) {
        self.proposer_index.take();
    }

    pub fn advance_epoch(&mut self) {
        let ordered = &mut self.active_validator_indices_ordered;
        let shuffled = &mut self.active_validator_indices_shuffled;
        let balance = &mut self.total_active_balance;

        ordered[RelativeEpoch::Previous] = core::mem::take(&mut ordered[RelativeEpoch::Current]);
        shuffled[RelativeEpoch::Previous] = core::mem::take(&mut shuffled[RelativeEpoch::Current]);
        balance[RelativeEpoch::Previous] = core::mem::take(&mut balance[RelativeEpoch::Current]);

        ordered[RelativeEpoch::Current] = core::mem::take(&mut ordered[RelativeEpoch::Next]);
        shuffled[RelativeEpoch::Current] = core::mem::take(&mut shuffled[RelativeEpoch::Next]);
        balance[RelativeEpoch::Current] = core::mem::take(&mut balance[RelativeEpoch::Next]);
    }
}
