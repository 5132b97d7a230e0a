use anyhow::{ensure, Result};
use ssz::SszHash as _;
use types::{
    preset::Preset,
    traits::{BeaconBlock, BeaconState},
};

use crate::unphased::Error;

/// What to do about the state root a block claims.
///
/// Verifying the root hashes the whole post-state, which is the single most
/// expensive step of a transition. Blocks that have already been fully
/// verified (own blocks being replayed, anchor states from checkpoint sync)
/// can skip the comparison. The driver then primes the state's root cache
/// with the block's claim instead, but only once the state is back in
/// persistent mode; priming earlier would be wasted because leaving the
/// transient mode invalidates the cache.
#[derive(Clone, Copy)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    pub(crate) fn verify<P: Preset>(
        self,
        state: &impl BeaconState<P>,
        block: &impl BeaconBlock<P>,
    ) -> Result<()> {
        if let Self::Verify = self {
            let computed = state.hash_tree_root();
            let in_block = block.state_root();

            ensure!(
                computed == in_block,
                Error::<P>::StateRootMismatch { computed, in_block },
            );
        }

        Ok(())
    }

    pub(crate) const fn is_trusted(self) -> bool {
        matches!(self, Self::Trust)
    }
}
