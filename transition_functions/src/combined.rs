use anyhow::{bail, ensure, Result};
use enum_iterator::Sequence as _;
use helper_functions::{
    fork,
    verifier::{MultiVerifier, NullVerifier, Verifier, VerifierOption},
};
use static_assertions::const_assert_eq;
use thiserror::Error;
use types::{
    combined::{BeaconBlock, BeaconState, SignedBeaconBlock},
    config::Config,
    nonstandard::{Phase, Toption},
    phase0::{
        consts::GENESIS_SLOT,
        containers::DepositData,
        primitives::{Slot, UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
};

use crate::{
    altair, bellatrix,
    metrics::{NullTransitionMetrics, TransitionMetrics},
    phase0,
    unphased::{Error, StateRootPolicy},
};

/// Applies `signed_block` to `state` with full verification.
///
/// `state` must be the caller's own clone in persistent mode; cloning a
/// persistent state only copies pointers. On failure the state is left in an
/// unspecified (but memory-safe) condition and must be discarded — the
/// original the clone was made from is untouched.
pub fn untrusted_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
) -> Result<()> {
    custom_state_transition(
        config,
        state,
        signed_block,
        StateRootPolicy::Verify,
        MultiVerifier::default(),
        &NullTransitionMetrics,
        None,
    )
}

/// Applies `signed_block` to `state` without verifying any signatures or the
/// state root. For blocks that have already been fully verified.
pub fn trusted_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
) -> Result<()> {
    custom_state_transition(
        config,
        state,
        signed_block,
        StateRootPolicy::Trust,
        NullVerifier,
        &NullTransitionMetrics,
        None,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn custom_state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    state_root_policy: StateRootPolicy,
    verifier: impl Verifier + Send,
    metrics: &impl TransitionMetrics,
    processed_at: Option<UnixSeconds>,
) -> Result<()> {
    validate_persistent(state)?;

    state.make_transient();

    // > Process slots (including those with no blocks) since block
    process_slots_internal(config, state, block.slot(), metrics)?;

    match (&mut *state, block) {
        (BeaconState::Phase0(state), SignedBeaconBlock::Phase0(block)) => phase0::state_transition(
            config,
            state,
            block,
            state_root_policy,
            verifier,
            metrics,
        ),
        (BeaconState::Altair(state), SignedBeaconBlock::Altair(block)) => altair::state_transition(
            config,
            state,
            block,
            state_root_policy,
            verifier,
            metrics,
        ),
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            bellatrix::state_transition(
                config,
                state,
                block,
                state_root_policy,
                verifier,
                metrics,
            )
        }
        _ => {
            // This match arm will silently match any new phases.
            // Cause a compilation error if a new phase is added.
            const_assert_eq!(Phase::CARDINALITY, 3);

            unreachable!("successful slot processing ensures that phases match")
        }
    }?;

    state.make_persistent();

    // Leaving the transient mode rebuilds the trees backing the state, so
    // the root claimed by a trusted block can only be cached now.
    if state_root_policy.is_trusted() {
        state.set_cached_root(block.state_root());
    }

    if let Some(processed_at) = processed_at {
        let slot_start = slot_start_time::<P>(config, state, block.slot());
        let delay_seconds = processed_at.saturating_sub(slot_start);

        // Converting u64 seconds to f64 is lossy past 2^53, which is
        // comfortably past the heat death of the sun.
        #[allow(clippy::cast_precision_loss)]
        metrics.observe_block_post_delay(delay_seconds as f64);
    }

    Ok(())
}

pub fn verify_signatures<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    verifier: impl Verifier,
) -> Result<()> {
    match (state, block) {
        (BeaconState::Phase0(state), SignedBeaconBlock::Phase0(block)) => {
            phase0::verify_signatures(config, state, block, verifier)
        }
        (BeaconState::Altair(state), SignedBeaconBlock::Altair(block)) => {
            altair::verify_signatures(config, state, block, verifier)
        }
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            bellatrix::verify_signatures(config, state, block, verifier)
        }
        _ => {
            // This match arm will silently match any new phases.
            // Cause a compilation error if a new phase is added.
            const_assert_eq!(Phase::CARDINALITY, 3);

            bail!(PhaseError {
                state_phase: state.phase(),
                block_phase: block.phase(),
            });
        }
    }
}

/// Advances `state` to `slot`, running epoch transitions and fork upgrades
/// along the way.
///
/// Fails with [`Error::SlotNotLater`] if `slot` is not later than the
/// state's slot. The state ends up in the same storage mode it started in.
pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slot: Slot,
) -> Result<()> {
    let started_persistent = state.storage_mode().is_persistent();

    state.make_transient();

    let result = process_slots_internal(config, state, slot, &NullTransitionMetrics);

    if started_persistent {
        state.make_persistent();
    }

    result
}

fn process_slots_internal<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slot: Slot,
    metrics: &impl TransitionMetrics,
) -> Result<()> {
    // `process_block_header` already prevents multiple blocks from being
    // applied in the same slot. However, without this validation
    // `process_slots` becomes idempotent, and transitions with preprocessed
    // states would succeed even when they should not.
    ensure!(
        state.slot() < slot,
        Error::<P>::SlotNotLater {
            current: state.slot(),
            target: slot,
        },
    );

    let _timer = metrics.slot_processing_timer();

    // If multiple phases have the same fork slots,
    // the state may need to be upgraded multiple times in the same slot.
    let final_phase = config.phase_at_slot::<P>(slot);

    while state.slot() < slot || state.phase() < final_phase {
        let mut made_progress = false;

        // The cloning below could be avoided using `replace_with`,
        // but the added complexity is probably not worth it.
        match state {
            BeaconState::Phase0(phase0_state) => {
                let altair_fork_slot = config.fork_slot::<P>(Phase::Altair);

                let last_slot_in_phase = Toption::Some(slot)
                    .min(altair_fork_slot)
                    .expect("result of min should always be Some because slot is always Some");

                if phase0_state.slot < last_slot_in_phase {
                    phase0::process_slots(config, phase0_state, last_slot_in_phase, metrics)?;

                    made_progress = true;
                }

                if Toption::Some(last_slot_in_phase) == altair_fork_slot {
                    *state = fork::upgrade_to_altair(config, phase0_state.as_ref().clone())?.into();

                    made_progress = true;
                }
            }
            BeaconState::Altair(altair_state) => {
                let bellatrix_fork_slot = config.fork_slot::<P>(Phase::Bellatrix);

                let last_slot_in_phase = Toption::Some(slot)
                    .min(bellatrix_fork_slot)
                    .expect("result of min should always be Some because slot is always Some");

                if altair_state.slot < last_slot_in_phase {
                    altair::process_slots(config, altair_state, last_slot_in_phase, metrics)?;

                    made_progress = true;
                }

                if Toption::Some(last_slot_in_phase) == bellatrix_fork_slot {
                    *state =
                        fork::upgrade_to_bellatrix(config, altair_state.as_ref().clone()).into();

                    made_progress = true;
                }
            }
            BeaconState::Bellatrix(bellatrix_state) => {
                bellatrix::process_slots(config, bellatrix_state, slot, metrics)?;

                made_progress = true;
            }
        }

        assert!(made_progress);
    }

    Ok(())
}

/// Runs a single epoch transition on `state`.
///
/// This is exposed for the fork choice rule, which needs unrealized
/// justification. The state ends up in the same storage mode it started in.
pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<()> {
    let started_persistent = state.storage_mode().is_persistent();

    state.make_transient();

    let result = match state {
        BeaconState::Phase0(state) => {
            phase0::process_epoch(config, state.as_mut(), &NullTransitionMetrics)
        }
        BeaconState::Altair(state) => {
            altair::process_epoch(config, state.as_mut(), &NullTransitionMetrics)
        }
        BeaconState::Bellatrix(state) => {
            bellatrix::process_epoch(config, state.as_mut(), &NullTransitionMetrics)
        }
    };

    if started_persistent {
        state.make_persistent();
    }

    result
}

pub fn process_untrusted_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    skip_randao_verification: bool,
) -> Result<()> {
    let verifier = if skip_randao_verification {
        MultiVerifier::new([VerifierOption::SkipRandaoVerification])
    } else {
        MultiVerifier::default()
    };

    process_block(config, state, block, verifier)
}

pub fn process_trusted_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
) -> Result<()> {
    process_block(config, state, block, NullVerifier)
}

fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    verifier: impl Verifier,
) -> Result<()> {
    match (state, block) {
        (BeaconState::Phase0(state), BeaconBlock::Phase0(block)) => {
            phase0::process_block(config, state.as_mut(), block, verifier)
        }
        (BeaconState::Altair(state), BeaconBlock::Altair(block)) => {
            altair::process_block(config, state.as_mut(), block, verifier)
        }
        (BeaconState::Bellatrix(state), BeaconBlock::Bellatrix(block)) => {
            bellatrix::process_block(config, state.as_mut(), block, verifier)
        }
        (state, _) => {
            // This match arm will silently match any new phases.
            // Cause a compilation error if a new phase is added.
            const_assert_eq!(Phase::CARDINALITY, 3);

            bail!(PhaseError {
                state_phase: state.phase(),
                block_phase: block.phase(),
            });
        }
    }
}

pub fn process_block_for_gossip<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    block: &SignedBeaconBlock<P>,
) -> Result<()> {
    match (state, block) {
        (BeaconState::Phase0(state), SignedBeaconBlock::Phase0(block)) => {
            phase0::process_block_for_gossip(config, state, block)
        }
        (BeaconState::Altair(state), SignedBeaconBlock::Altair(block)) => {
            altair::process_block_for_gossip(config, state, block)
        }
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            bellatrix::process_block_for_gossip(config, state, block)
        }
        _ => {
            // This match arm will silently match any new phases.
            // Cause a compilation error if a new phase is added.
            const_assert_eq!(Phase::CARDINALITY, 3);

            bail!(PhaseError {
                state_phase: state.phase(),
                block_phase: block.phase(),
            });
        }
    }
}

// This is used to compute the genesis state.
pub fn process_deposit_data<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    deposit_data: DepositData,
) -> Result<Option<ValidatorIndex>> {
    match state {
        BeaconState::Phase0(state) => {
            phase0::process_deposit_data(config, state.as_mut(), deposit_data)
        }
        BeaconState::Altair(state) => {
            altair::process_deposit_data(config, state.as_mut(), deposit_data)
        }
        BeaconState::Bellatrix(state) => {
            altair::process_deposit_data(config, state.as_mut(), deposit_data)
        }
    }
}

fn validate_persistent<P: Preset>(state: &BeaconState<P>) -> Result<()> {
    let actual = state.storage_mode();

    ensure!(
        actual.is_persistent(),
        Error::<P>::StateMode {
            expected: ssz::StorageMode::Persistent,
            actual,
        },
    );

    Ok(())
}

fn slot_start_time<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    slot: Slot,
) -> UnixSeconds {
    let genesis_time = match state {
        BeaconState::Phase0(state) => state.genesis_time,
        BeaconState::Altair(state) => state.genesis_time,
        BeaconState::Bellatrix(state) => state.genesis_time,
    };

    genesis_time + (slot - GENESIS_SLOT) * config.seconds_per_slot.get()
}

// Slots would provide more information, but they're not the direct cause of
// this error. The purpose of this error is to reveal bugs, so phases are more
// appropriate.
#[derive(Debug, Error)]
#[error("state and block phases do not match (state: {state_phase}, block: {block_phase})")]
pub struct PhaseError {
    state_phase: Phase,
    block_phase: Phase,
}

#[cfg(test)]
mod tests {
    use core::num::NonZeroU64;

    use helper_functions::{
        accessors,
        signing::{RandaoEpoch, SignForSingleFork as _},
    };
    use ssz::{BitList, Hc, SszHash as _};
    use types::{
        phase0::{
            beacon_state::BeaconState as Phase0BeaconState,
            consts::GENESIS_EPOCH,
            containers::{
                Attestation, AttestationData, BeaconBlock as Phase0BeaconBlock,
                BeaconBlockBody as Phase0BeaconBlockBody, Checkpoint,
                SignedBeaconBlock as Phase0SignedBeaconBlock,
            },
            primitives::H256,
        },
        preset::{Mainnet, Minimal},
    };

    use crate::metrics::NullTransitionMetrics;

    use super::*;

    // The standard quick-start genesis time from the interop mocked start document.
    const GENESIS_TIME: UnixSeconds = 1_578_787_200;

    const VALIDATOR_COUNT: NonZeroU64 = match NonZeroU64::new(8) {
        Some(count) => count,
        None => unreachable!(),
    };

    #[test]
    fn empty_slot_advance_crosses_an_epoch_boundary() -> Result<()> {
        let config = Config::mainnet();
        let mut state = quick_start_state::<Mainnet>(&config);

        process_slots(&config, &mut state, 32)?;

        assert_eq!(state.slot(), 32);
        assert_eq!(state.validators().len_u64(), VALIDATOR_COUNT.get());
        assert!(state.storage_mode().is_persistent());

        // Justification bit updates are skipped during the first two epochs,
        // so the bits are still all zero after the first epoch transition.
        let state = phase0_hc(&state);

        assert_eq!(state.justification_bits.count_ones(), 0);
        assert_eq!(state.finalized_checkpoint, Checkpoint::default());

        Ok(())
    }

    #[test]
    fn single_block_with_one_attestation_is_applied() -> Result<()> {
        let config = Config::minimal();
        let pre = quick_start_state::<Minimal>(&config);
        let block = block_with_attestation(&config, &pre);

        let pristine_root = pre.hash_tree_root();

        let mut post = pre.clone();
        untrusted_state_transition(&config, &mut post, &block.clone().into())?;

        assert_eq!(post.slot(), 1);
        assert_eq!(post.hash_tree_root(), block.message.state_root);

        let post_hc = phase0_hc(&post);

        assert_eq!(post_hc.latest_block_header.slot, 1);
        assert_eq!(
            post_hc.latest_block_header.parent_root,
            block.message.parent_root,
        );
        // The header's state root stays zero until the next `process_slot`.
        assert_eq!(post_hc.latest_block_header.state_root, H256::zero());
        assert_eq!(post_hc.current_epoch_attestations.len_usize(), 1);

        // The original state is untouched.
        assert_eq!(pre.hash_tree_root(), pristine_root);

        // Validator bookkeeping invariants hold after the transition.
        assert_eq!(
            post_hc.validators.len_usize(),
            post_hc.balances.len_usize(),
        );

        for validator in &post_hc.validators {
            assert_eq!(
                validator.effective_balance % Minimal::EFFECTIVE_BALANCE_INCREMENT,
                0,
            );
            assert!(validator.effective_balance <= Minimal::MAX_EFFECTIVE_BALANCE);
        }

        for (index, validator) in (0..).zip(&post_hc.validators) {
            assert_eq!(
                accessors::index_of_public_key(post_hc.as_ref(), validator.pubkey.to_bytes()),
                Some(index),
            );
        }

        Ok(())
    }

    #[test]
    fn transitions_are_pure_and_deterministic() -> Result<()> {
        let config = Config::minimal();
        let pre = quick_start_state::<Minimal>(&config);
        let block = block_with_attestation(&config, &pre);

        let mut verified = pre.clone();
        untrusted_state_transition(&config, &mut verified, &block.clone().into())?;

        let mut repeated = pre.clone();
        untrusted_state_transition(&config, &mut repeated, &block.clone().into())?;

        // A trusted transition skips signature verification and with it all
        // parallelism, so this also covers determinism across the two paths.
        let mut trusted = pre.clone();
        trusted_state_transition(&config, &mut trusted, &block.into())?;

        assert_eq!(verified.hash_tree_root(), repeated.hash_tree_root());
        assert_eq!(verified.hash_tree_root(), trusted.hash_tree_root());

        Ok(())
    }

    #[test]
    fn invalid_proposer_signature_is_rejected_without_mutating_the_input() {
        let config = Config::minimal();
        let pre = quick_start_state::<Minimal>(&config);
        let mut block = block_with_attestation(&config, &pre);

        // Flip one bit of the proposer signature.
        block.signature.as_bytes_mut()[95] ^= 1;

        let pristine_root = pre.hash_tree_root();

        let mut post = pre.clone();
        let result = untrusted_state_transition(&config, &mut post, &block.into());

        result.expect_err("a block with a corrupted proposer signature should be rejected");

        assert_eq!(pre.hash_tree_root(), pristine_root);
    }

    #[test]
    fn altair_fork_upgrade_reshapes_the_state_and_preserves_fields() -> Result<()> {
        let upgrading_config = Config::mainnet().upgrade_once(Phase::Altair, 1);
        let phase0_config = Config::mainnet();

        let mut upgraded = quick_start_state::<Mainnet>(&upgrading_config);
        let mut plain = quick_start_state::<Mainnet>(&phase0_config);

        assert_eq!(upgraded.hash_tree_root(), plain.hash_tree_root());

        process_slots(&upgrading_config, &mut upgraded, 32)?;
        process_slots(&phase0_config, &mut plain, 32)?;

        assert_eq!(upgraded.phase(), Phase::Altair);

        let BeaconState::Altair(upgraded) = &upgraded else {
            unreachable!("the assertion above ensures that the state is Altair");
        };

        let plain = phase0_hc(&plain);

        // New fields are initialized to their spec-defined defaults.
        assert_eq!(
            upgraded.inactivity_scores.len_u64(),
            VALIDATOR_COUNT.get(),
        );
        assert!(upgraded.inactivity_scores.into_iter().all(|score| *score == 0));
        assert_eq!(upgraded.current_sync_committee, upgraded.next_sync_committee);
        assert!(upgraded
            .current_sync_committee
            .pubkeys
            .iter()
            .all(|pubkey| *pubkey.as_bytes() != [0; 48]));

        // Common fields are carried over unchanged.
        assert_eq!(upgraded.slot, plain.slot);
        assert_eq!(upgraded.genesis_validators_root, plain.genesis_validators_root);
        assert_eq!(upgraded.validators, plain.validators);
        assert_eq!(upgraded.balances, plain.balances);
        assert_eq!(upgraded.randao_mixes, plain.randao_mixes);
        assert_eq!(upgraded.finalized_checkpoint, plain.finalized_checkpoint);

        assert_eq!(upgraded.fork.previous_version, plain.fork.current_version);
        assert_eq!(
            upgraded.fork.current_version,
            upgrading_config.altair_fork_version,
        );

        Ok(())
    }

    #[test]
    fn incorrect_state_root_is_reported_with_both_roots() {
        let config = Config::minimal();
        let pre = quick_start_state::<Minimal>(&config);
        let mut block = block_with_attestation(&config, &pre);

        let claimed = block.message.state_root;
        block.message.state_root.0[0] ^= 1;
        let corrupted = block.message.state_root;

        let mut post = pre.clone();

        // Signatures are skipped so that the failure is unambiguously about
        // the state root. Corrupting the state root also invalidates the
        // proposer signature, which would otherwise be reported first.
        let error = custom_state_transition(
            &config,
            &mut post,
            &block.into(),
            StateRootPolicy::Verify,
            NullVerifier,
            &NullTransitionMetrics,
            None,
        )
        .expect_err("a block with an incorrect state root should be rejected");

        match error.downcast_ref::<Error<Minimal>>() {
            Some(Error::StateRootMismatch { computed, in_block }) => {
                assert_eq!(*in_block, corrupted);
                assert_eq!(*computed, claimed);
            }
            _ => panic!("unexpected error: {error:?}"),
        }
    }

    #[test]
    fn slots_cannot_be_processed_backwards() -> Result<()> {
        let config = Config::minimal();
        let mut state = quick_start_state::<Minimal>(&config);

        process_slots(&config, &mut state, 2)?;

        let error = process_slots(&config, &mut state, 1)
            .expect_err("processing slots into the past should fail");

        match error.downcast_ref::<Error<Minimal>>() {
            Some(Error::SlotNotLater { current, target }) => {
                assert_eq!(*current, 2);
                assert_eq!(*target, 1);
            }
            _ => panic!("unexpected error: {error:?}"),
        }

        Ok(())
    }

    #[test]
    fn ring_buffers_overwrite_the_oldest_entries() -> Result<()> {
        let config = Config::minimal();
        let mut state = quick_start_state::<Minimal>(&config);

        process_slots(&config, &mut state, 6)?;

        let early = *phase0_hc(&state).state_roots.mod_index(5);

        // 70 slots is more than `SlotsPerHistoricalRoot` in the minimal preset.
        process_slots(&config, &mut state, 70)?;

        let state = phase0_hc(&state);

        // Slot 69 occupies the same ring buffer cell as slot 5.
        assert_ne!(*state.state_roots.mod_index(69), early);

        // Only the roots of the most recent `SlotsPerHistoricalRoot` slots
        // are reachable.
        assert!(accessors::get_block_root_at_slot(state.as_ref(), 6).is_ok());
        assert!(accessors::get_block_root_at_slot(state.as_ref(), 5).is_err());

        Ok(())
    }

    #[test]
    fn epoch_processing_requires_the_transient_mode() {
        let config = Config::minimal();
        let state = quick_start_state::<Minimal>(&config);

        let BeaconState::Phase0(mut state) = state else {
            unreachable!("quick-start states begin in Phase 0");
        };

        let error =
            crate::phase0::process_epoch(&config, state.as_mut(), &NullTransitionMetrics)
                .expect_err("bulk epoch mutations in persistent mode are a contract violation");

        match error.downcast_ref::<Error<Minimal>>() {
            Some(Error::StateMode { expected, actual }) => {
                assert_eq!(*expected, ssz::StorageMode::Transient);
                assert_eq!(*actual, ssz::StorageMode::Persistent);
            }
            _ => panic!("unexpected error: {error:?}"),
        }
    }

    #[test]
    fn state_transitions_require_the_persistent_mode() {
        let config = Config::minimal();
        let pre = quick_start_state::<Minimal>(&config);
        let block = block_with_attestation(&config, &pre);

        let mut post = pre.clone();
        post.make_transient();

        let error = untrusted_state_transition(&config, &mut post, &block.into())
            .expect_err("the input state must be persistent");

        match error.downcast_ref::<Error<Minimal>>() {
            Some(Error::StateMode { expected, actual }) => {
                assert_eq!(*expected, ssz::StorageMode::Persistent);
                assert_eq!(*actual, ssz::StorageMode::Transient);
            }
            _ => panic!("unexpected error: {error:?}"),
        }
    }

    fn quick_start_state<P: Preset>(config: &Config) -> BeaconState<P> {
        interop::quick_start_beacon_state(config, GENESIS_TIME, VALIDATOR_COUNT)
            .expect("quick-start genesis should succeed")
    }

    fn phase0_hc<P: Preset>(state: &BeaconState<P>) -> &Hc<Phase0BeaconState<P>> {
        match state {
            BeaconState::Phase0(state) => state,
            _ => panic!("state is not in Phase 0"),
        }
    }

    /// Builds a valid Phase 0 block at slot 1 containing one attestation by
    /// the genesis committee of slot 0.
    fn block_with_attestation(
        config: &Config,
        pre: &BeaconState<Minimal>,
    ) -> Phase0SignedBeaconBlock<Minimal> {
        let slot = 1;

        let mut advanced = pre.clone();
        process_slots(config, &mut advanced, slot).expect("advancing one slot should succeed");

        let advanced_hc = phase0_hc(&advanced);

        let proposer_index = accessors::get_beacon_proposer_index(advanced_hc.as_ref())
            .expect("the genesis state has active validators");

        let parent_root = accessors::latest_block_root(advanced_hc.as_ref());

        let genesis_block_root = accessors::get_block_root_at_slot(advanced_hc.as_ref(), 0)
            .expect("the genesis block root is in range");

        let data = AttestationData {
            slot: 0,
            index: 0,
            beacon_block_root: genesis_block_root,
            source: advanced_hc.current_justified_checkpoint,
            target: Checkpoint {
                epoch: GENESIS_EPOCH,
                root: genesis_block_root,
            },
        };

        let committee = accessors::beacon_committee(advanced_hc.as_ref(), 0, 0)
            .expect("the genesis committee for slot 0 exists")
            .to_vec();

        assert!(!committee.is_empty());

        let signing_root = data.signing_root(config, advanced_hc.as_ref());

        let signature = committee
            .iter()
            .map(|validator_index| interop::secret_key(*validator_index).sign(signing_root))
            .reduce(|mut aggregate, signature| {
                aggregate.aggregate_in_place(signature);
                aggregate
            })
            .expect("the committee is not empty");

        let attestation = Attestation {
            aggregation_bits: BitList::new(true, committee.len()),
            data,
            signature: signature.into(),
        };

        let randao_reveal = RandaoEpoch::from(GENESIS_EPOCH)
            .sign(config, advanced_hc.as_ref(), &interop::secret_key(proposer_index))
            .into();

        let body = Phase0BeaconBlockBody {
            randao_reveal,
            eth1_data: advanced.eth1_data(),
            attestations: [attestation]
                .try_into()
                .expect("a single attestation is under the maximum"),
            ..Phase0BeaconBlockBody::default()
        };

        let mut message = Phase0BeaconBlock {
            slot,
            proposer_index,
            parent_root,
            state_root: H256::zero(),
            body,
        };

        // The state root can only be known by running the transition.
        let mut scratch = advanced.clone();
        process_trusted_block(config, &mut scratch, &message.clone().into())
            .expect("applying the block to a scratch state should succeed");
        message.state_root = scratch.hash_tree_root();

        let signature = message
            .sign(config, advanced_hc.as_ref(), &interop::secret_key(proposer_index))
            .into();

        Phase0SignedBeaconBlock { message, signature }
    }
}
