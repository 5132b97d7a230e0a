use helper_functions::{
    accessors::{
        combined_participation, compute_base_reward, get_base_reward_per_increment,
        get_current_epoch, get_previous_epoch, total_active_balance,
    },
    mutators::clamp_balance,
    predicates::{is_active_validator, is_eligible_for_penalties, is_in_inactivity_leak},
};
use itertools::{izip, Itertools as _};
use static_assertions::assert_eq_size;
use types::{
    altair::consts::{
        TIMELY_HEAD_WEIGHT, TIMELY_SOURCE_WEIGHT, TIMELY_TARGET_WEIGHT, WEIGHT_DENOMINATOR,
    },
    config::Config,
    nonstandard::Participation,
    phase0::{
        containers::Validator,
        primitives::{Epoch, Gwei},
    },
    preset::Preset,
    traits::PostAltairBeaconState,
};

use crate::unphased::{EpochDeltas, ValidatorSummary};

#[derive(Clone, Copy, Debug)]
#[cfg_attr(test, derive(Default))]
pub struct AltairValidatorSummary {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub withdrawable_epoch: Epoch,
    pub active_in_previous_epoch: bool,
    pub eligible_for_penalties: bool,
}

assert_eq_size!(AltairValidatorSummary, [u64; 3]);

impl ValidatorSummary for AltairValidatorSummary {
    fn effective_balance(self) -> Gwei {
        self.effective_balance
    }

    fn slashed(self) -> bool {
        self.slashed
    }

    fn withdrawable_epoch(self) -> Epoch {
        self.withdrawable_epoch
    }

    // This does not update derived fields because `process_slashings` does not use them.
    fn update_from(&mut self, validator: &Validator) {
        self.effective_balance = validator.effective_balance;
        self.slashed = validator.slashed;
        self.withdrawable_epoch = validator.withdrawable_epoch;
    }
}

// This has no field for the active balance in the current epoch because
// during most epoch transitions it is already cached in
// `Cache.total_active_balance`.
#[allow(clippy::struct_field_names)]
#[derive(Clone, Copy, Default, Debug)]
pub struct Statistics {
    pub previous_epoch_source_participating_balance: Gwei,
    pub previous_epoch_target_participating_balance: Gwei,
    pub previous_epoch_head_participating_balance: Gwei,
    pub current_epoch_target_participating_balance: Gwei,
}

impl Statistics {
    fn clamp_balances<P: Preset>(&mut self) {
        clamp_balance::<P>(&mut self.previous_epoch_source_participating_balance);
        clamp_balance::<P>(&mut self.previous_epoch_target_participating_balance);
        clamp_balance::<P>(&mut self.previous_epoch_head_participating_balance);
        clamp_balance::<P>(&mut self.current_epoch_target_participating_balance);
    }
}

#[derive(Clone, Copy, Default)]
pub struct EpochDeltasForTransition {
    reward: Gwei,
    penalty: Gwei,
}

impl EpochDeltas for EpochDeltasForTransition {
    fn combined_reward(self) -> Gwei {
        self.reward
    }

    fn combined_penalty(self) -> Gwei {
        self.penalty
    }
}

pub fn statistics<P: Preset, S: PostAltairBeaconState<P>>(
    state: &S,
) -> (Statistics, Vec<AltairValidatorSummary>, Vec<Participation>) {
    let current_epoch = get_current_epoch(state);
    let previous_epoch = get_previous_epoch(state);
    let participation = combined_participation(state);

    let mut statistics = Statistics::default();

    let summaries = state
        .validators()
        .into_iter()
        .zip(participation.iter().copied())
        .map(|(validator, participation)| {
            let Validator {
                effective_balance,
                slashed,
                withdrawable_epoch,
                ..
            } = *validator;

            let active_in_previous_epoch = is_active_validator(validator, previous_epoch);
            let active_in_current_epoch = is_active_validator(validator, current_epoch);
            let eligible_for_penalties = is_eligible_for_penalties(validator, previous_epoch);

            if !slashed {
                // Unlike `get_unslashed_attesting_indices` in Phase 0,
                // `get_unslashed_participating_indices` in Altair checks if
                // validators were active.

                if active_in_previous_epoch {
                    if participation.previous_epoch_matching_source() {
                        statistics.previous_epoch_source_participating_balance += effective_balance;
                    }

                    if participation.previous_epoch_matching_target() {
                        statistics.previous_epoch_target_participating_balance += effective_balance;
                    }

                    if participation.previous_epoch_matching_head() {
                        statistics.previous_epoch_head_participating_balance += effective_balance;
                    }
                }

                if active_in_current_epoch && participation.current_epoch_matching_target() {
                    statistics.current_epoch_target_participating_balance += effective_balance;
                }
            }

            AltairValidatorSummary {
                effective_balance,
                slashed,
                withdrawable_epoch,
                active_in_previous_epoch,
                eligible_for_penalties,
            }
        })
        .collect_vec();

    statistics.clamp_balances::<P>();

    (statistics, summaries, participation)
}

/// Computes the per-validator deltas of one epoch transition.
///
/// Bellatrix only changes the inactivity penalty quotient, so it shares this
/// implementation and passes its own quotient.
pub fn epoch_deltas<P: Preset>(
    config: &Config,
    state: &impl PostAltairBeaconState<P>,
    statistics: Statistics,
    summaries: impl IntoIterator<Item = AltairValidatorSummary>,
    participation: impl IntoIterator<Item = Participation>,
    inactivity_penalty_quotient: u64,
) -> Vec<EpochDeltasForTransition> {
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let base_reward_per_increment = get_base_reward_per_increment(state);

    let increment = P::EFFECTIVE_BALANCE_INCREMENT;
    let source_increments = statistics.previous_epoch_source_participating_balance / increment;
    let target_increments = statistics.previous_epoch_target_participating_balance / increment;
    let head_increments = statistics.previous_epoch_head_participating_balance / increment;
    let active_increments = total_active_balance(state) / increment;

    izip!(summaries, participation, state.inactivity_scores())
        .map(|(summary, participation, inactivity_score)| {
            let mut deltas = EpochDeltasForTransition::default();

            let AltairValidatorSummary {
                effective_balance,
                slashed,
                eligible_for_penalties,
                ..
            } = summary;

            if !eligible_for_penalties {
                return deltas;
            }

            let base_reward = compute_base_reward::<P>(effective_balance, base_reward_per_increment);

            let participation_component_reward = |weight, unslashed_participating_increments| {
                let reward_numerator = base_reward * weight * unslashed_participating_increments;
                let reward_denominator = active_increments * WEIGHT_DENOMINATOR.get();
                reward_numerator / reward_denominator
            };

            let participation_component_penalty =
                |weight| base_reward * weight / WEIGHT_DENOMINATOR;

            if !slashed && participation.previous_epoch_matching_source() {
                if !in_inactivity_leak {
                    deltas.reward +=
                        participation_component_reward(TIMELY_SOURCE_WEIGHT, source_increments);
                }
            } else {
                deltas.penalty += participation_component_penalty(TIMELY_SOURCE_WEIGHT);
            }

            if !slashed && participation.previous_epoch_matching_target() {
                if !in_inactivity_leak {
                    deltas.reward +=
                        participation_component_reward(TIMELY_TARGET_WEIGHT, target_increments);
                }
            } else {
                deltas.penalty += participation_component_penalty(TIMELY_TARGET_WEIGHT);

                let penalty_numerator = effective_balance * inactivity_score;
                let penalty_denominator =
                    config.inactivity_score_bias.get() * inactivity_penalty_quotient;

                deltas.penalty += penalty_numerator / penalty_denominator;
            }

            if !slashed && participation.previous_epoch_matching_head() && !in_inactivity_leak {
                deltas.reward +=
                    participation_component_reward(TIMELY_HEAD_WEIGHT, head_increments);
            }

            deltas
        })
        .collect()
}
