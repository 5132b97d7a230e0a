use anyhow::Result;
use helper_functions::accessors::get_current_epoch;
use types::{
    bellatrix::beacon_state::BeaconState as BellatrixBeaconState, config::Config, preset::Preset,
};

use crate::{altair, metrics::TransitionMetrics, unphased};

pub fn process_epoch<P: Preset, M: TransitionMetrics>(
    config: &Config,
    state: &mut BellatrixBeaconState<P>,
    metrics: &M,
) -> Result<()> {
    let _timer = metrics.epoch_transition_timer();

    unphased::validate_storage_mode(state)?;

    let (statistics, mut summaries, participation) = altair::statistics(state);

    altair::process_justification_and_finalization(state, statistics);

    altair::process_inactivity_updates(
        config,
        state,
        summaries.iter().copied(),
        participation.iter().copied(),
    );

    // Epoch deltas must be computed after `process_justification_and_finalization`
    // and `process_inactivity_updates` because they depend on updated values of
    // `BeaconState.finalized_checkpoint` and `BeaconState.inactivity_scores`.
    let deltas = altair::epoch_deltas(
        config,
        state,
        statistics,
        summaries.iter().copied(),
        participation,
        P::INACTIVITY_PENALTY_QUOTIENT_BELLATRIX.get(),
    );

    unphased::process_rewards_and_penalties(state, deltas);
    unphased::process_registry_updates(config, state, summaries.as_mut_slice())?;

    unphased::process_slashings(
        state,
        summaries.iter().copied(),
        P::PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX,
    );

    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state);
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;
    altair::process_participation_flag_updates(state);
    altair::process_sync_committee_updates(state)?;

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
