use core::num::NonZeroU64;

use anyhow::Result;
use helper_functions::{
    accessors::{
        get_block_root, get_block_root_at_slot, get_current_epoch, get_finality_delay,
        get_previous_epoch,
    },
    misc::vec_of_default,
    mutators::clamp_balance,
    phase0::get_attesting_indices,
    predicates::{is_active_validator, is_eligible_for_penalties, is_in_inactivity_leak},
};
use itertools::{izip, Itertools as _};
use static_assertions::assert_eq_size;
use types::{
    nonstandard::AttestationEpoch,
    phase0::{
        beacon_state::BeaconState,
        consts::BASE_REWARDS_PER_EPOCH,
        containers::{PendingAttestation, Validator},
        primitives::{Epoch, Gwei, ValidatorIndex},
    },
    preset::Preset,
};

use crate::unphased::{EpochDeltas, ValidatorSummary};

/// Participating balances accumulated in a single pass over the registry and
/// the pending attestations.
#[allow(clippy::struct_field_names)]
#[derive(Clone, Copy, Default, Debug)]
pub struct Statistics {
    pub previous_epoch_source_attesting_balance: Gwei,
    pub previous_epoch_target_attesting_balance: Gwei,
    pub previous_epoch_head_attesting_balance: Gwei,
    pub current_epoch_active_balance: Gwei,
    pub current_epoch_target_attesting_balance: Gwei,
}

impl Statistics {
    fn clamp_balances<P: Preset>(&mut self) {
        clamp_balance::<P>(&mut self.previous_epoch_source_attesting_balance);
        clamp_balance::<P>(&mut self.previous_epoch_target_attesting_balance);
        clamp_balance::<P>(&mut self.previous_epoch_head_attesting_balance);
        clamp_balance::<P>(&mut self.current_epoch_active_balance);
        clamp_balance::<P>(&mut self.current_epoch_target_attesting_balance);
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(test, derive(Default))]
pub struct Phase0ValidatorSummary {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub withdrawable_epoch: Epoch,
    pub eligible_for_penalties: bool,
}

assert_eq_size!(Phase0ValidatorSummary, [u64; 3]);

impl ValidatorSummary for Phase0ValidatorSummary {
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

/// How well a single validator attested in the epochs covered by the state.
///
/// The ordering of [`Match`] makes a single field enough: a head-matching
/// attestation also matches the target and source.
#[derive(Clone, Copy, Default)]
pub struct Performance {
    previous_epoch_match: Match,
    previous_epoch_fastest_inclusion: Option<Inclusion>,
    current_epoch_matching_target: bool,
}

impl Performance {
    #[inline]
    pub(crate) fn previous_epoch_matching_source(self) -> bool {
        Match::Source <= self.previous_epoch_match
    }

    #[inline]
    pub(crate) fn previous_epoch_matching_target(self) -> bool {
        Match::Target <= self.previous_epoch_match
    }

    #[inline]
    pub(crate) fn previous_epoch_matching_head(self) -> bool {
        Match::Head <= self.previous_epoch_match
    }

    pub(crate) fn previous_epoch_fastest_inclusion(self) -> Option<Inclusion> {
        self.previous_epoch_fastest_inclusion
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
enum Match {
    #[default]
    None,
    Source,
    Target,
    Head,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Inclusion {
    pub delay: NonZeroU64,
    pub proposer_index: ValidatorIndex,
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

pub fn statistics<P: Preset>(
    state: &BeaconState<P>,
) -> Result<(Statistics, Vec<Phase0ValidatorSummary>, Vec<Performance>)> {
    let current_epoch = get_current_epoch(state);
    let previous_epoch = get_previous_epoch(state);

    let mut statistics = Statistics::default();

    let summaries = state
        .validators
        .into_iter()
        .map(|validator| {
            let Validator {
                effective_balance,
                slashed,
                withdrawable_epoch,
                ..
            } = *validator;

            if is_active_validator(validator, current_epoch) {
                statistics.current_epoch_active_balance += effective_balance;
            }

            let eligible_for_penalties = is_eligible_for_penalties(validator, previous_epoch);

            Phase0ValidatorSummary {
                effective_balance,
                slashed,
                withdrawable_epoch,
                eligible_for_penalties,
            }
        })
        .collect_vec();

    let mut performance: Vec<Performance> = vec_of_default(state);

    // `get_block_root` can fail during the first slot of an epoch,
    // in which case the state has no attestations to account for.
    if let Ok(previous_epoch_target_block_root) = get_block_root(state, AttestationEpoch::Previous)
    {
        for attestation in &state.previous_epoch_attestations {
            let expected_head = get_block_root_at_slot(state, attestation.data.slot)
                .expect("attestations are only added to beacon state when they are valid");

            let matching_target = attestation.data.target.root == previous_epoch_target_block_root;
            let matching_head = attestation.data.beacon_block_root == expected_head;

            for validator_index in
                get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)
                    .expect("attestations are only added to beacon state when they are valid")
            {
                let index = usize::try_from(validator_index)?;
                let summary = summaries[index];

                if summary.slashed {
                    continue;
                }

                accumulate_previous_epoch_attestation(
                    &mut statistics,
                    &mut performance[index],
                    attestation,
                    matching_target,
                    matching_head,
                    summary.effective_balance,
                );
            }
        }
    }

    if let Ok(current_epoch_target_block_root) = get_block_root(state, AttestationEpoch::Current) {
        for attestation in &state.current_epoch_attestations {
            if attestation.data.target.root != current_epoch_target_block_root {
                continue;
            }

            for validator_index in
                get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)
                    .expect("attestations are only added to beacon state when they are valid")
            {
                let index = usize::try_from(validator_index)?;
                let summary = summaries[index];

                if summary.slashed {
                    continue;
                }

                let performance = &mut performance[index];

                if !performance.current_epoch_matching_target {
                    statistics.current_epoch_target_attesting_balance +=
                        summary.effective_balance;
                    performance.current_epoch_matching_target = true;
                }
            }
        }
    }

    statistics.clamp_balances::<P>();

    Ok((statistics, summaries, performance))
}

// Explicitly inlining this speeds up epoch processing by a few percent.
#[inline]
fn accumulate_previous_epoch_attestation<P: Preset>(
    statistics: &mut Statistics,
    performance: &mut Performance,
    attestation: &PendingAttestation<P>,
    matching_target: bool,
    matching_head: bool,
    effective_balance: Gwei,
) {
    if !performance.previous_epoch_matching_source() {
        statistics.previous_epoch_source_attesting_balance += effective_balance;
        performance.previous_epoch_match = Match::Source;
    }

    if !performance.previous_epoch_matching_target() && matching_target {
        statistics.previous_epoch_target_attesting_balance += effective_balance;
        performance.previous_epoch_match = Match::Target;
    }

    if !performance.previous_epoch_matching_head() && matching_target && matching_head {
        statistics.previous_epoch_head_attesting_balance += effective_balance;
        performance.previous_epoch_match = Match::Head;
    }

    let PendingAttestation {
        inclusion_delay,
        proposer_index,
        ..
    } = *attestation;

    let delay = inclusion_delay
        .try_into()
        .expect("MIN_ATTESTATION_INCLUSION_DELAY is at least 1 in all presets");

    let inclusion = Inclusion {
        delay,
        proposer_index,
    };

    let current = performance
        .previous_epoch_fastest_inclusion
        .get_or_insert(inclusion);

    // States can contain multiple attestations by the same validator with
    // different inclusion delays, in any order.
    if inclusion_delay < current.delay.get() {
        *current = inclusion;
    }
}

pub(crate) fn epoch_deltas<P: Preset>(
    state: &BeaconState<P>,
    statistics: Statistics,
    summaries: impl IntoIterator<Item = Phase0ValidatorSummary>,
    performance: impl IntoIterator<Item = Performance>,
) -> Result<Vec<EpochDeltasForTransition>> {
    let finality_delay = get_finality_delay(state);
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let total_active_balance_sqrt = {
        use num_integer::Roots as _;
        statistics.current_epoch_active_balance.sqrt()
    };

    let mut deltas: Vec<EpochDeltasForTransition> = vec_of_default(state);

    for (index, summary, performance) in izip!(0.., summaries, performance) {
        let Phase0ValidatorSummary {
            effective_balance,
            eligible_for_penalties,
            ..
        } = summary;

        let base_reward = effective_balance * P::BASE_REWARD_FACTOR
            / total_active_balance_sqrt
            / BASE_REWARDS_PER_EPOCH;

        let attestation_component_reward = |attesting_balance| {
            // > Factored out from balance totals to avoid uint64 overflow
            let increment = P::EFFECTIVE_BALANCE_INCREMENT;

            if in_inactivity_leak {
                // > Since full base reward will be canceled out by inactivity penalty deltas,
                // > optimal participation receives full base reward compensation here.
                base_reward
            } else {
                let reward_numerator = base_reward * (attesting_balance / increment);
                let reward_denominator = statistics.current_epoch_active_balance / increment;
                reward_numerator / reward_denominator
            }
        };

        let proposer_reward = base_reward / P::PROPOSER_REWARD_QUOTIENT;

        if eligible_for_penalties {
            let deltas = &mut deltas[index];

            // The conditionals here do not check if the validator is slashed
            // because `Performance` already accounts for that.

            if performance.previous_epoch_matching_source() {
                deltas.reward += attestation_component_reward(
                    statistics.previous_epoch_source_attesting_balance,
                );
            } else {
                deltas.penalty += base_reward;
            }

            if performance.previous_epoch_matching_target() {
                deltas.reward += attestation_component_reward(
                    statistics.previous_epoch_target_attesting_balance,
                );
            } else {
                deltas.penalty += base_reward;
            }

            if performance.previous_epoch_matching_head() {
                deltas.reward += attestation_component_reward(
                    statistics.previous_epoch_head_attesting_balance,
                );
            } else {
                deltas.penalty += base_reward;
            }

            if in_inactivity_leak {
                // > If validator is performing optimally this cancels all
                // > rewards for a neutral balance
                deltas.penalty += BASE_REWARDS_PER_EPOCH.get() * base_reward - proposer_reward;

                if !performance.previous_epoch_matching_target() {
                    deltas.penalty +=
                        effective_balance * finality_delay / P::INACTIVITY_PENALTY_QUOTIENT;
                }

                // > No rewards associated with inactivity penalties
            }
        }

        if let Some(inclusion) = performance.previous_epoch_fastest_inclusion() {
            let Inclusion {
                delay,
                proposer_index,
            } = inclusion;

            let proposer_index = usize::try_from(proposer_index)?;
            let max_attester_reward = base_reward - proposer_reward;

            deltas[proposer_index].reward += proposer_reward;
            deltas[index].reward += max_attester_reward / delay;

            // > No penalties associated with inclusion delay
        }
    }

    Ok(deltas)
}
