use anyhow::Result;
use helper_functions::misc;
use ssz::{Hc, SszHash as _};
use types::{phase0::primitives::Slot, preset::Preset, traits::BeaconState};

/// Advances `state` to `slot` one slot at a time.
///
/// The loop is identical in every fork; only the epoch transition differs,
/// so the per-fork modules pass theirs in as a closure. Keeping the loop in
/// one place also keeps the consensus-critical ordering in one place: the
/// epoch transition runs after the roots of the last slot of the epoch are
/// cached but before the slot number changes.
pub(crate) fn process_slots_with<P: Preset, S: BeaconState<P>>(
    state: &mut Hc<S>,
    slot: Slot,
    mut process_epoch: impl FnMut(&mut S) -> Result<()>,
) -> Result<()> {
    while state.slot() < slot {
        process_slot(state);

        if misc::is_epoch_start::<P>(state.slot() + 1) {
            process_epoch(state.as_mut())?;
        }

        *state.slot_mut() += 1;
    }

    Ok(())
}

/// [`process_slot`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#beacon-chain-state-transition-function)
///
/// Finishes the slot `state` is currently in, before the slot number is
/// incremented.
pub fn process_slot<P: Preset>(state: &mut impl BeaconState<P>) {
    let slot = state.slot();

    // > Cache state root
    //
    // In transient mode this hashes the state from scratch. In persistent
    // mode it reuses every cached subtree root, which is what makes empty
    // slot processing cheap for states at rest.
    let previous_state_root = state.hash_tree_root();

    *state.state_roots_mut().mod_index_mut(slot) = previous_state_root;

    // > Cache latest block header state root
    //
    // The header of the previous block commits to the state root it produced,
    // which only becomes known now. Completing the header locally means its
    // root is computed from a value that is already final.
    let mut header = state.latest_block_header();

    if header.state_root.is_zero() {
        header.state_root = previous_state_root;
        *state.latest_block_header_mut() = header;
    }

    // > Cache block root
    *state.block_roots_mut().mod_index_mut(slot) = header.hash_tree_root();

    state.cache_mut().advance_slot();
}
