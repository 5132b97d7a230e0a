use anyhow::Result;
use helper_functions::accessors::get_current_epoch;
use types::{config::Config, phase0::beacon_state::BeaconState, preset::Preset};

use super::epoch_intermediates::{self, Statistics};
use crate::{metrics::TransitionMetrics, unphased};

pub fn process_epoch<P: Preset, M: TransitionMetrics>(
    config: &Config,
    state: &mut BeaconState<P>,
    metrics: &M,
) -> Result<()> {
    let _timer = metrics.epoch_transition_timer();

    unphased::validate_storage_mode(state)?;

    let (statistics, mut summaries, performance) = epoch_intermediates::statistics(state)?;

    process_justification_and_finalization(state, statistics);

    // Epoch deltas must be computed after `process_justification_and_finalization`
    // because they depend on the updated value of `BeaconState.finalized_checkpoint`.
    let deltas = epoch_intermediates::epoch_deltas(
        state,
        statistics,
        summaries.iter().copied(),
        performance,
    )?;

    unphased::process_rewards_and_penalties(state, deltas);
    unphased::process_registry_updates(config, state, summaries.as_mut_slice())?;

    unphased::process_slashings(
        state,
        summaries.iter().copied(),
        P::PROPORTIONAL_SLASHING_MULTIPLIER,
    );

    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state);
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;
    process_participation_record_updates(state);

    if !M::IS_NULL {
        metrics.register_validator_statuses(
            get_current_epoch(state),
            summaries.as_slice(),
            state.balances.into_iter().copied(),
        );
    }

    state.cache.advance_epoch();

    Ok(())
}

pub fn process_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    statistics: Statistics,
) {
    if !unphased::should_process_justification_and_finalization(state) {
        return;
    }

    unphased::weigh_justification_and_finalization(
        state,
        statistics.current_epoch_active_balance,
        statistics.previous_epoch_target_attesting_balance,
        statistics.current_epoch_target_attesting_balance,
    );
}

fn process_participation_record_updates<P: Preset>(state: &mut BeaconState<P>) {
    // > Rotate current/previous epoch attestations
    state.previous_epoch_attestations =
        core::mem::take(&mut state.current_epoch_attestations);
}
