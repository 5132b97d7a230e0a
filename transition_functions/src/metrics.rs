//! The metrics sink of the state transition function.
//!
//! The transition function itself is pure: it never reads a clock and never
//! touches global state. Anything it is supposed to measure is reported
//! through a sink passed in by the caller. The sink contract mirrors that:
//! none of the methods may fail, and they may not influence the transition in
//! any way.
//!
//! [`NullTransitionMetrics`] keeps the hot path branch-free when no metrics
//! are wanted. A Prometheus-backed implementation lives in the
//! `prometheus_metrics` crate.

use types::phase0::primitives::{Epoch, Gwei};

use crate::unphased::ValidatorSummary;

pub trait TransitionMetrics: Send + Sync {
    /// `true` for sinks that discard everything.
    ///
    /// Used to skip argument preparation that would itself cost time.
    const IS_NULL: bool;

    /// A timer guard. Observes the elapsed time when dropped.
    type Timer;

    fn block_transition_timer(&self) -> Self::Timer;

    fn epoch_transition_timer(&self) -> Self::Timer;

    fn slot_processing_timer(&self) -> Self::Timer;

    /// Time from the start of the block's slot until it was fully processed.
    ///
    /// The delay is computed by the caller. The transition function never
    /// reads a wall clock.
    fn observe_block_post_delay(&self, delay_seconds: f64);

    /// Per-validator statuses and balances at the end of an epoch transition.
    fn register_validator_statuses(
        &self,
        epoch: Epoch,
        summaries: &[impl ValidatorSummary],
        balances: impl Iterator<Item = Gwei>,
    );
}

pub struct NullTransitionMetrics;

impl TransitionMetrics for NullTransitionMetrics {
    const IS_NULL: bool = true;

    type Timer = ();

    #[inline]
    fn block_transition_timer(&self) -> Self::Timer {}

    #[inline]
    fn epoch_transition_timer(&self) -> Self::Timer {}

    #[inline]
    fn slot_processing_timer(&self) -> Self::Timer {}

    #[inline]
    fn observe_block_post_delay(&self, _delay_seconds: f64) {}

    #[inline]
    fn register_validator_statuses(
        &self,
        _epoch: Epoch,
        _summaries: &[impl ValidatorSummary],
        _balances: impl Iterator<Item = Gwei>,
    ) {
    }
}
