use anyhow::{ensure, Result};
use bls::CachedPublicKey;
use helper_functions::{
    accessors::{
        attestation_epoch, get_beacon_proposer_index, get_current_epoch, get_randao_mix,
        index_of_public_key, public_key, slashable_indices,
    },
    error::SignatureKind,
    misc::compute_epoch_at_slot,
    mutators::initiate_validator_exit,
    phase0::get_indexed_attestation,
    predicates::{
        is_active_validator, is_slashable_attestation_data, is_slashable_validator,
        is_valid_merkle_branch, validate_constructed_indexed_attestation,
        validate_received_indexed_attestation,
    },
    signing::{RandaoEpoch, SignForAllForks, SignForSingleFork as _},
    verifier::{MultiVerifier, SingleVerifier, Triple, Verifier, VerifierOption},
};
use itertools::Itertools as _;
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};
use ssz::SszHash as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    nonstandard::{AttestationEpoch, GweiVec},
    phase0::{
        consts::FAR_FUTURE_EPOCH,
        containers::{
            Attestation, AttestationData, AttesterSlashing, BeaconBlockHeader, Deposit,
            DepositData, DepositMessage, ProposerSlashing, SignedVoluntaryExit,
        },
        primitives::{DepositIndex, ValidatorIndex, H256},
    },
    preset::{Preset, SlotsPerEth1VotingPeriod},
    traits::{BeaconBlock, BeaconBlockBody, BeaconState},
};

use crate::unphased::Error;

/// Deposits for the same public key batched together.
///
/// Grouping deposits by public key lets proof-of-possession signatures be
/// verified once per key and balance increases be applied in one go.
pub enum CombinedDeposit {
    NewValidator {
        pubkey: CachedPublicKey,
        withdrawal_credentials: H256,
        amounts: GweiVec,
    },
    TopUp {
        validator_index: ValidatorIndex,
        amounts: GweiVec,
    },
}

/// A deposit paired with its position in the block, which doubles as its
/// offset from `state.eth1_deposit_index`.
type NumberedDeposit = (u64, Deposit);

/// All deposits of one block sharing a public key, in block order.
struct DepositGroup {
    existing_validator_index: Option<ValidatorIndex>,
    pubkey: CachedPublicKey,
    deposits: Vec<NumberedDeposit>,
}

pub fn process_block_header_for_gossip<P: Preset>(
    state: &impl BeaconState<P>,
    block: &impl BeaconBlock<P>,
) -> Result<()> {
    let state_slot = state.slot();
    let block_slot = block.slot();
    let header = state.latest_block_header();

    // > Verify that the slots match
    ensure!(
        block_slot == state_slot,
        Error::<P>::SlotMismatch {
            state_slot,
            block_slot,
        },
    );

    // > Verify that the block is newer than latest block header
    ensure!(
        block_slot > header.slot,
        Error::<P>::BlockNotNewerThanLatestBlockHeader {
            block_slot,
            block_header_slot: header.slot,
        },
    );

    // > Verify that proposer index is the correct index
    let computed = get_beacon_proposer_index(state)?;
    let in_block = block.proposer_index();

    ensure!(
        computed == in_block,
        Error::<P>::ProposerIndexMismatch { computed, in_block },
    );

    // > Verify that the parent matches
    let computed = header.hash_tree_root();
    let in_block = block.parent_root();

    ensure!(
        computed == in_block,
        Error::<P>::ParentRootMismatch { computed, in_block },
    );

    Ok(())
}

pub fn process_block_header<P: Preset>(
    state: &mut impl BeaconState<P>,
    block: &impl BeaconBlock<P>,
) -> Result<()> {
    process_block_header_for_gossip(state, block)?;

    // > Verify proposer is not slashed
    let index = block.proposer_index();

    ensure!(
        !state.validators().get(index)?.slashed,
        Error::<P>::ProposerSlashed { index },
    );

    // > Cache current block as the new latest block
    //
    // The state root stays zero until the next `process_slot` call fills it
    // in with the root this block results in.
    *state.latest_block_header_mut() = BeaconBlockHeader {
        slot: block.slot(),
        proposer_index: index,
        parent_root: block.parent_root(),
        state_root: H256::zero(),
        body_root: block.body().hash_tree_root(),
    };

    Ok(())
}

pub fn process_randao<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    body: &impl BeaconBlockBody<P>,
    mut verifier: impl Verifier,
) -> Result<()> {
    let epoch = get_current_epoch(state);
    let randao_reveal = body.randao_reveal();

    // > Verify RANDAO reveal
    if !verifier.has_option(VerifierOption::SkipRandaoVerification) {
        let proposer_index = get_beacon_proposer_index(state)?;

        verifier.verify_singular(
            RandaoEpoch::from(epoch).signing_root(config, state),
            randao_reveal,
            public_key(state, proposer_index)?,
            SignatureKind::Randao,
        )?;
    }

    // > Mix in RANDAO reveal
    let mix = get_randao_mix(state, epoch) ^ hashing::hash_768(randao_reveal);
    *state.randao_mixes_mut().mod_index_mut(epoch) = mix;

    Ok(())
}

pub fn process_eth1_data<P: Preset>(
    state: &mut impl BeaconState<P>,
    body: &impl BeaconBlockBody<P>,
) -> Result<()> {
    let vote = body.eth1_data();

    state.eth1_data_votes_mut().push(vote)?;

    // > If ``state.eth1_data_votes`` has a strict majority, set ``state.eth1_data``
    let vote_count = state
        .eth1_data_votes()
        .into_iter()
        .filter(|counted| **counted == vote)
        .count();

    let majority_threshold = SlotsPerEth1VotingPeriod::<P>::USIZE / 2;

    if vote_count > majority_threshold {
        *state.eth1_data_mut() = vote;
    }

    Ok(())
}

pub fn validate_proposer_slashing<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    proposer_slashing: ProposerSlashing,
) -> Result<()> {
    validate_proposer_slashing_with_verifier(config, state, proposer_slashing, SingleVerifier)
}

pub fn validate_proposer_slashing_with_verifier<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    proposer_slashing: ProposerSlashing,
    mut verifier: impl Verifier,
) -> Result<()> {
    let ProposerSlashing {
        signed_header_1,
        signed_header_2,
    } = proposer_slashing;

    let header_1 = signed_header_1.message;
    let header_2 = signed_header_2.message;

    // > Verify header slots match
    ensure!(
        header_1.slot == header_2.slot,
        Error::<P>::ProposerSlashingSlotMismatch {
            slot_1: header_1.slot,
            slot_2: header_2.slot,
        },
    );

    // > Verify header proposer indices match
    ensure!(
        header_1.proposer_index == header_2.proposer_index,
        Error::<P>::ProposerSlashingProposerMismatch {
            proposer_index_1: header_1.proposer_index,
            proposer_index_2: header_2.proposer_index,
        },
    );

    // > Verify the headers are different
    ensure!(
        header_1 != header_2,
        Error::<P>::ProposerSlashingHeadersIdentical { header: header_1 },
    );

    // > Verify the proposer is slashable
    let index = header_1.proposer_index;
    let proposer = state.validators().get(index)?;

    ensure!(
        is_slashable_validator(proposer, get_current_epoch(state)),
        Error::<P>::ProposerNotSlashable {
            index,
            proposer: proposer.clone(),
        },
    );

    // > Verify signatures
    for signed_header in [signed_header_1, signed_header_2] {
        verifier.verify_singular(
            signed_header.message.signing_root(config, state),
            signed_header.signature,
            &proposer.pubkey,
            SignatureKind::Block,
        )?;
    }

    Ok(())
}

pub fn validate_attester_slashing<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    attester_slashing: &AttesterSlashing<P>,
) -> Result<Vec<ValidatorIndex>> {
    validate_attester_slashing_with_verifier(config, state, attester_slashing, SingleVerifier)
}

pub fn validate_attester_slashing_with_verifier<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    attester_slashing: &AttesterSlashing<P>,
    mut verifier: impl Verifier,
) -> Result<Vec<ValidatorIndex>> {
    let data_1 = attester_slashing.attestation_1.data;
    let data_2 = attester_slashing.attestation_2.data;

    ensure!(
        is_slashable_attestation_data(data_1, data_2),
        Error::<P>::AttestationDataNotSlashable { data_1, data_2 },
    );

    for attestation in [
        &attester_slashing.attestation_1,
        &attester_slashing.attestation_2,
    ] {
        validate_received_indexed_attestation(config, state, attestation, &mut verifier)?;
    }

    let current_epoch = get_current_epoch(state);

    let slashable_indices = slashable_indices(attester_slashing)
        .filter(|attester_index| {
            let attester = state
                .validators()
                .get(*attester_index)
                .expect("attester indices are validated in validate_received_indexed_attestation");

            is_slashable_validator(attester, current_epoch)
        })
        .collect_vec();

    ensure!(!slashable_indices.is_empty(), Error::<P>::NoAttestersSlashed);

    Ok(slashable_indices)
}

pub fn validate_attestation<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<()> {
    validate_attestation_with_verifier(config, state, attestation, SingleVerifier)
}

pub fn validate_attestation_with_verifier<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    attestation: &Attestation<P>,
    verifier: impl Verifier,
) -> Result<()> {
    let AttestationData {
        slot: attestation_slot,
        source,
        target,
        ..
    } = attestation.data;

    // Cause a compilation error if a new variant is added to `AttestationEpoch`.
    // Blocks cannot contain attestations from the future or epochs before the previous one.
    let attestation_epoch = match attestation_epoch(state, target.epoch)? {
        epoch @ (AttestationEpoch::Previous | AttestationEpoch::Current) => epoch,
    };

    ensure!(
        target.epoch == compute_epoch_at_slot::<P>(attestation_slot),
        Error::AttestationTargetsWrongEpoch {
            attestation: attestation.clone(),
        },
    );

    let inclusion_range = attestation_slot + P::MIN_ATTESTATION_INCLUSION_DELAY.get()
        ..=attestation_slot + P::SlotsPerEpoch::U64;

    ensure!(
        inclusion_range.contains(&state.slot()),
        Error::<P>::AttestationOutsideInclusionRange {
            state_slot: state.slot(),
            attestation_slot,
        },
    );

    // Don't check the length of `attestation.aggregation_bits`.
    // It's already done in `get_attesting_indices`,
    // which is called by `get_indexed_attestation`.

    let in_state = match attestation_epoch {
        AttestationEpoch::Previous => state.previous_justified_checkpoint(),
        AttestationEpoch::Current => state.current_justified_checkpoint(),
    };
    let in_block = source;

    ensure!(
        in_state == in_block,
        Error::<P>::AttestationSourceMismatch { in_state, in_block },
    );

    let indexed_attestation = get_indexed_attestation(state, attestation)?;

    // > Verify signature
    validate_constructed_indexed_attestation(config, state, &indexed_attestation, verifier)
}

pub fn validate_deposits<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    deposits: impl IntoIterator<Item = Deposit>,
) -> Result<impl Iterator<Item = CombinedDeposit>> {
    let groups = group_deposits_by_public_key(state, deposits);

    // Optimistically verify the proofs of possession with a single
    // `multi_verify`. If that fails, each group falls back to finding its
    // first valid deposit one signature at a time.
    let required_signatures_valid = proofs_of_possession_valid(config, &groups);

    let mut combined_deposits = groups
        .into_par_iter()
        .map(|group| combine_group(config, state, group, required_signatures_valid))
        .filter_map(Result::transpose)
        .collect::<Result<Vec<_>>>()?;

    combined_deposits.sort_unstable_by_key(|(position, _)| *position);

    Ok(combined_deposits
        .into_iter()
        .map(|(_, combined_deposit)| combined_deposit))
}

fn group_deposits_by_public_key<P: Preset>(
    state: &impl BeaconState<P>,
    deposits: impl IntoIterator<Item = Deposit>,
) -> Vec<DepositGroup> {
    (0..)
        .zip(deposits)
        .into_group_map_by(|(_, deposit)| deposit.data.pubkey)
        .into_iter()
        .map(|(public_key_bytes, deposits)| DepositGroup {
            existing_validator_index: index_of_public_key(state, public_key_bytes),
            pubkey: CachedPublicKey::from(public_key_bytes),
            deposits,
        })
        .collect()
}

fn proofs_of_possession_valid(config: &Config, groups: &[DepositGroup]) -> bool {
    groups
        .iter()
        .filter(|group| group.existing_validator_index.is_none())
        .map(|group| {
            let (_, first_deposit) = group.deposits[0];

            let public_key = *group.pubkey.decompress()?;

            // > Verify the deposit signature (proof of possession)
            // > which is not checked by the deposit contract
            let deposit_message = DepositMessage::from(first_deposit.data);

            // > Fork-agnostic domain since deposits are valid across forks
            let signing_root = deposit_message.signing_root(config);

            Ok(Triple::new(
                signing_root,
                first_deposit.data.signature,
                public_key,
            ))
        })
        .collect::<Result<Vec<_>>>()
        .and_then(|triples| MultiVerifier::from(triples).finish())
        .is_ok()
}

fn combine_group<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    group: DepositGroup,
    required_signatures_valid: bool,
) -> Result<Option<(u64, CombinedDeposit)>> {
    let DepositGroup {
        existing_validator_index,
        pubkey,
        deposits,
    } = group;

    for (position, deposit) in deposits.iter().copied() {
        // > Verify the Merkle branch
        verify_deposit_merkle_branch(state, state.eth1_deposit_index() + position, deposit)?;
    }

    let (first_position, _) = deposits[0];

    // > Increase balance by deposit amount
    if let Some(validator_index) = existing_validator_index {
        let amounts = deposits
            .into_iter()
            .map(|(_, deposit)| deposit.data.amount)
            .collect();

        let combined_deposit = CombinedDeposit::TopUp {
            validator_index,
            amounts,
        };

        return Ok(Some((first_position, combined_deposit)));
    }

    // > Add validator and balance entries
    //
    // Only the first deposit with a valid proof of possession creates the
    // validator; its withdrawal credentials win and later deposits in the
    // group merely top the balance up.
    let mut deposits = deposits.into_iter();

    let first_valid = if required_signatures_valid {
        deposits.next()
    } else {
        deposits.find(|(_, deposit)| {
            let deposit_message = DepositMessage::from(deposit.data);

            deposit_message
                .verify(config, deposit.data.signature, &pubkey)
                .is_ok()
        })
    };

    Ok(first_valid.map(|(position, deposit)| {
        let DepositData {
            withdrawal_credentials,
            amount: first_amount,
            ..
        } = deposit.data;

        let amounts = core::iter::once(first_amount)
            .chain(deposits.map(|(_, deposit)| deposit.data.amount))
            .collect();

        let combined_deposit = CombinedDeposit::NewValidator {
            pubkey,
            withdrawal_credentials,
            amounts,
        };

        (position, combined_deposit)
    }))
}

pub fn verify_deposit_merkle_branch<P: Preset>(
    state: &impl BeaconState<P>,
    eth1_deposit_index: DepositIndex,
    deposit: Deposit,
) -> Result<()> {
    ensure!(
        is_valid_merkle_branch(
            deposit.data.hash_tree_root(),
            deposit.proof,
            eth1_deposit_index,
            state.eth1_data().deposit_root,
        ),
        Error::<P>::DepositProofInvalid {
            deposit: Box::new(deposit),
        },
    );

    Ok(())
}

pub fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut impl BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(config, state, signed_voluntary_exit, verifier)?;

    // > Initiate exit
    initiate_validator_exit(config, state, signed_voluntary_exit.message.validator_index)
}

pub fn validate_voluntary_exit<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
) -> Result<()> {
    validate_voluntary_exit_with_verifier(config, state, signed_voluntary_exit, SingleVerifier)
}

fn validate_voluntary_exit_with_verifier<P: Preset>(
    config: &Config,
    state: &impl BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    mut verifier: impl Verifier,
) -> Result<()> {
    let SignedVoluntaryExit { message, signature } = signed_voluntary_exit;

    let index = message.validator_index;
    let validator = state.validators().get(index)?;
    let current_epoch = get_current_epoch(state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(validator, current_epoch),
        Error::<P>::ValidatorNotActive {
            index,
            validator: validator.clone(),
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::<P>::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        message.epoch <= current_epoch,
        Error::<P>::VoluntaryExitIsExpired {
            current_epoch,
            epoch: message.epoch,
        },
    );

    // > Verify the validator has been active long enough
    ensure!(
        validator.activation_epoch + config.shard_committee_period <= current_epoch,
        Error::<P>::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    verifier.verify_singular(
        message.signing_root(config, state),
        signature,
        &validator.pubkey,
        SignatureKind::VoluntaryExit,
    )?;

    Ok(())
}
