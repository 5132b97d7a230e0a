use anyhow::{ensure, Error as AnyhowError, Result};
use bit_field::BitField as _;
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, H256},
    },
    preset::Preset,
    traits::{BeaconState, PostBellatrixBeaconState},
};

use crate::{
    accessors,
    error::{Error, SignatureKind},
    signing::SignForSingleFork as _,
    verifier::Verifier,
};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is eligible to be placed into the activation queue.
#[must_use]
pub const fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

// > Check if ``validator`` is eligible for activation.
#[must_use]
pub fn is_eligible_for_activation<P: Preset>(
    state: &impl BeaconState<P>,
    validator: &Validator,
) -> bool {
    // > Placement in queue is finalized
    validator.activation_eligibility_epoch <= state.finalized_checkpoint().epoch
        // > Has not yet been activated
        && validator.activation_epoch == FAR_FUTURE_EPOCH
}

#[inline]
#[must_use]
pub const fn is_eligible_for_penalties(validator: &Validator, previous_epoch: Epoch) -> bool {
    is_active_validator(validator, previous_epoch)
        || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch)
}

// > Check if ``validator`` is slashable.
#[inline]
#[must_use]
pub const fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && epoch < validator.withdrawable_epoch
        && validator.activation_epoch <= epoch
}

// > Check if ``data_1`` and ``data_2`` are slashable according to Casper FFG rules.
#[inline]
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch)
        || (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

// This doesn't verify the signature when called directly with `MultiVerifier`.
// When calling directly, use `SingleVerifier` or call `finish` manually.
pub fn validate_constructed_indexed_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    indexed_attestation: &IndexedAttestation<P>,
    verifier: impl Verifier,
) -> Result<()> {
    validate_indexed_attestation(config, state, indexed_attestation, verifier, false)
}

pub fn validate_received_indexed_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    indexed_attestation: &IndexedAttestation<P>,
    verifier: impl Verifier,
) -> Result<()> {
    validate_indexed_attestation(config, state, indexed_attestation, verifier, true)
}

fn validate_indexed_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    indexed_attestation: &IndexedAttestation<P>,
    mut verifier: impl Verifier,
    validate_indices_sorted_and_unique: bool,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    if validate_indices_sorted_and_unique {
        // > Verify indices are sorted and unique
        ensure!(
            indices.iter().tuple_windows().all(|(a, b)| a < b),
            Error::AttestingIndicesNotSortedAndUnique,
        );
    }

    // > Verify aggregate signature
    itertools::process_results(
        indices.iter().copied().map(|validator_index| {
            accessors::public_key(state, validator_index)?
                .decompress()
                .map_err(AnyhowError::new)
        }),
        |public_keys| {
            verifier.verify_aggregate(
                indexed_attestation.data.signing_root(config, state),
                indexed_attestation.signature,
                public_keys,
                SignatureKind::Attestation,
            )
        },
    )?
}

/// [`is_valid_merkle_branch`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#is_valid_merkle_branch)
#[must_use]
pub fn is_valid_merkle_branch(
    leaf: H256,
    branch: impl IntoIterator<Item = H256>,
    index: u64,
    root: H256,
) -> bool {
    let mut hash = leaf;

    for (height, node) in branch.into_iter().enumerate() {
        if index.get_bit(height) {
            hash = hashing::hash_256_256(node, hash);
        } else {
            hash = hashing::hash_256_256(hash, node);
        }
    }

    hash == root
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#helpers>
#[must_use]
pub fn is_in_inactivity_leak<P: Preset>(state: &impl BeaconState<P>) -> bool {
    accessors::get_finality_delay(state) > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/beacon-chain.md#is_merge_transition_complete>
#[must_use]
pub fn is_merge_transition_complete<P: Preset>(
    state: &(impl PostBellatrixBeaconState<P> + ?Sized),
) -> bool {
    !state.latest_execution_payload_header().is_default_payload()
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/beacon-chain.md#is_execution_enabled>
///
/// The [`is_merge_transition_complete`] call is needed to reject default
/// payloads after the Merge.
#[must_use]
pub fn is_execution_enabled<P: Preset>(
    state: &(impl PostBellatrixBeaconState<P> + ?Sized),
    body: &types::bellatrix::containers::BeaconBlockBody<P>,
) -> bool {
    is_merge_transition_complete(state) || !body.execution_payload.is_default_payload()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::phase0::containers::Checkpoint;

    use super::*;

    #[test_case(0, 0, false; "not yet active")]
    #[test_case(4, 4, true; "activation epoch reached")]
    #[test_case(4, 6, false; "exited")]
    fn test_is_active_validator(activation_epoch: Epoch, epoch: Epoch, expected: bool) {
        let validator = Validator {
            activation_epoch,
            exit_epoch: 6,
            ..Validator::default()
        };

        assert_eq!(is_active_validator(&validator, epoch), expected);
    }

    #[test]
    fn test_double_vote_is_slashable() {
        let data_1 = AttestationData {
            beacon_block_root: H256::repeat_byte(1),
            ..AttestationData::default()
        };

        let data_2 = AttestationData::default();

        assert!(is_slashable_attestation_data(data_1, data_2));
    }

    #[test]
    fn test_surround_vote_is_slashable() {
        let data_1 = AttestationData {
            source: Checkpoint {
                epoch: 1,
                ..Checkpoint::default()
            },
            target: Checkpoint {
                epoch: 4,
                ..Checkpoint::default()
            },
            ..AttestationData::default()
        };

        let data_2 = AttestationData {
            source: Checkpoint {
                epoch: 2,
                ..Checkpoint::default()
            },
            target: Checkpoint {
                epoch: 3,
                ..Checkpoint::default()
            },
            ..AttestationData::default()
        };

        assert!(is_slashable_attestation_data(data_1, data_2));
        assert!(!is_slashable_attestation_data(data_2, data_1));
    }

    #[test]
    fn test_merkle_branch_of_single_leaf() {
        let leaf = H256::repeat_byte(1);
        let sibling = H256::repeat_byte(2);
        let root = hashing::hash_256_256(sibling, leaf);

        assert!(is_valid_merkle_branch(leaf, [sibling], 1, root));
        assert!(!is_valid_merkle_branch(leaf, [sibling], 0, root));
    }
}
