use anyhow::Result;
use arithmetic::U64Ext as _;
use helper_functions::{
    accessors::{get_current_epoch, get_next_sync_committee, total_active_balance},
    predicates::is_in_inactivity_leak,
};
use ssz::PersistentList;
use types::{
    altair::beacon_state::BeaconState as AltairBeaconState,
    config::Config,
    nonstandard::Participation,
    phase0::consts::GENESIS_EPOCH,
    preset::Preset,
    traits::{BeaconState, PostAltairBeaconState},
};

use super::epoch_intermediates::{self, AltairValidatorSummary, Statistics};
use crate::{metrics::TransitionMetrics, unphased};

pub fn process_epoch<P: Preset, M: TransitionMetrics>(
    config: &Config,
    state: &mut AltairBeaconState<P>,
    metrics: &M,
) -> Result<()> {
    let _timer = metrics.epoch_transition_timer();

    unphased::validate_storage_mode(state)?;

    let (statistics, mut summaries, participation) = epoch_intermediates::statistics(state);

    process_justification_and_finalization(state, statistics);

    process_inactivity_updates(
        config,
        state,
        summaries.iter().copied(),
        participation.iter().copied(),
    );

    // Epoch deltas must be computed after `process_justification_and_finalization`
    // and `process_inactivity_updates` because they depend on updated values of
    // `BeaconState.finalized_checkpoint` and `BeaconState.inactivity_scores`.
    let deltas = epoch_intermediates::epoch_deltas(
        config,
        state,
        statistics,
        summaries.iter().copied(),
        participation,
        P::INACTIVITY_PENALTY_QUOTIENT_ALTAIR.get(),
    );

    unphased::process_rewards_and_penalties(state, deltas);
    unphased::process_registry_updates(config, state, summaries.as_mut_slice())?;

    unphased::process_slashings(
        state,
        summaries.iter().copied(),
        P::PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR,
    );

    unphased::process_eth1_data_reset(state);
    unphased::process_effective_balance_updates(state);
    unphased::process_slashings_reset(state);
    unphased::process_randao_mixes_reset(state);
    unphased::process_historical_roots_update(state)?;
    process_participation_flag_updates(state);
    process_sync_committee_updates(state)?;

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
    state: &mut impl PostAltairBeaconState<P>,
    statistics: Statistics,
) {
    if !unphased::should_process_justification_and_finalization(state) {
        return;
    }

    unphased::weigh_justification_and_finalization(
        state,
        total_active_balance(state),
        statistics.previous_epoch_target_participating_balance,
        statistics.current_epoch_target_participating_balance,
    );
}

pub fn process_inactivity_updates<P: Preset>(
    config: &Config,
    state: &mut impl PostAltairBeaconState<P>,
    summaries: impl IntoIterator<Item = AltairValidatorSummary>,
    participation: impl IntoIterator<Item = Participation>,
) {
    if !should_process_inactivity_updates(state) {
        return;
    }

    let in_inactivity_leak = is_in_inactivity_leak(state);

    let mut summaries = summaries.into_iter();
    let mut participation = participation.into_iter();

    state.inactivity_scores_mut().update(|inactivity_score| {
        let summary = summaries
            .next()
            .expect("summaries should have as many elements as there are validators");

        let participation = participation
            .next()
            .expect("participations should have as many elements as there are validators");

        if !summary.eligible_for_penalties {
            return;
        }

        let unslashed_and_participating = !summary.slashed
            && summary.active_in_previous_epoch
            && participation.previous_epoch_matching_target();

        // > Increase the inactivity score of inactive validators
        if unslashed_and_participating {
            *inactivity_score = inactivity_score.saturating_sub(1);
        } else {
            *inactivity_score += config.inactivity_score_bias.get();
        }

        // > Decrease the inactivity score of all eligible validators during a leak-free epoch
        if !in_inactivity_leak {
            *inactivity_score =
                inactivity_score.saturating_sub(config.inactivity_score_recovery_rate);
        }
    });
}

pub fn process_participation_flag_updates<P: Preset>(state: &mut impl PostAltairBeaconState<P>) {
    // > Rotate current/previous epoch participation
    let zero_participation = PersistentList::repeat_default_with_length_of(state.validators());

    *state.previous_epoch_participation_mut() =
        core::mem::replace(state.current_epoch_participation_mut(), zero_participation);
}

pub fn process_sync_committee_updates<P: Preset>(
    state: &mut impl PostAltairBeaconState<P>,
) -> Result<()> {
    let next_epoch = get_current_epoch(state) + 1;

    if next_epoch.is_multiple_of_nonzero(P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD) {
        let committee = get_next_sync_committee(state)?;
        *state.current_sync_committee_mut() =
            core::mem::replace(state.next_sync_committee_mut(), committee);
    }

    Ok(())
}

fn should_process_inactivity_updates<P: Preset>(state: &impl BeaconState<P>) -> bool {
    // > Skip the genesis epoch as score updates are based on the previous epoch participation
    GENESIS_EPOCH < get_current_epoch(state)
}
