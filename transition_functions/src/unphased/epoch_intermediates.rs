use types::phase0::{containers::Validator, primitives::{Epoch, Gwei}};

/// Per-validator flags captured at the start of an epoch transition.
///
/// Epoch processing must not observe its own mutations, so everything it
/// needs about a validator is snapshotted into one of these in a single pass
/// before any sub-transition runs.
pub trait ValidatorSummary: Copy {
    fn effective_balance(self) -> Gwei;
    fn slashed(self) -> bool;
    fn withdrawable_epoch(self) -> Epoch;

    /// Refreshes the fields that later sub-transitions are allowed to see.
    ///
    /// `process_slashings` depends on `Validator.withdrawable_epoch`, which
    /// may be modified by the ejections in `process_registry_updates`.
    fn update_from(&mut self, validator: &Validator);
}

/// Combined rewards and penalties of one validator for one epoch.
pub trait EpochDeltas: Copy {
    fn combined_reward(self) -> Gwei;
    fn combined_penalty(self) -> Gwei;
}
