//! Traits over the per-fork `BeaconState` and `BeaconBlock` types.
//!
//! Most helper functions only touch fields that exist in every fork, so they
//! are written against these traits and monomorphized per fork. Fields added
//! by later forks live in the `Post*` subtraits.

use std::sync::Arc;

use bls::SignatureBytes;
use ssz::{BitVector, ContiguousList, Hc, SszHash, StorageMode, U1};

use duplicate::duplicate_item;

use crate::{
    altair::{
        beacon_state::BeaconState as AltairBeaconState,
        containers::{
            BeaconBlock as AltairBeaconBlock, BeaconBlockBody as AltairBeaconBlockBody,
            SyncCommittee,
        },
    },
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::{
            BeaconBlock as BellatrixBeaconBlock, BeaconBlockBody as BellatrixBeaconBlockBody,
            ExecutionPayloadHeader,
        },
    },
    cache::Cache,
    collections::{
        Balances, EpochParticipation, Eth1DataVotes, HistoricalRoots, InactivityScores,
        RandaoMixes, RecentRoots, Slashings, Validators,
    },
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        consts::JustificationBitsLength,
        containers::{
            Attestation, AttesterSlashing, BeaconBlock as Phase0BeaconBlock,
            BeaconBlockBody as Phase0BeaconBlockBody, BeaconBlockHeader, Checkpoint, Deposit,
            Eth1Data, Fork, ProposerSlashing, SignedVoluntaryExit,
        },
        primitives::{DepositIndex, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

pub trait BeaconState<P: Preset>: SszHash<PackingFactor = U1> + Send + Sync {
    fn genesis_time(&self) -> UnixSeconds;
    fn genesis_validators_root(&self) -> H256;
    fn slot(&self) -> Slot;
    fn fork(&self) -> Fork;
    fn latest_block_header(&self) -> BeaconBlockHeader;
    fn block_roots(&self) -> &RecentRoots<P>;
    fn state_roots(&self) -> &RecentRoots<P>;
    fn historical_roots(&self) -> &HistoricalRoots<P>;
    fn eth1_data(&self) -> Eth1Data;
    fn eth1_data_votes(&self) -> &Eth1DataVotes<P>;
    fn eth1_deposit_index(&self) -> DepositIndex;
    fn validators(&self) -> &Validators<P>;
    fn balances(&self) -> &Balances<P>;
    fn randao_mixes(&self) -> &RandaoMixes<P>;
    fn slashings(&self) -> &Slashings<P>;
    fn justification_bits(&self) -> BitVector<JustificationBitsLength>;
    fn previous_justified_checkpoint(&self) -> Checkpoint;
    fn current_justified_checkpoint(&self) -> Checkpoint;
    fn finalized_checkpoint(&self) -> Checkpoint;
    fn cache(&self) -> &Cache;

    fn genesis_time_mut(&mut self) -> &mut UnixSeconds;
    fn genesis_validators_root_mut(&mut self) -> &mut H256;
    fn slot_mut(&mut self) -> &mut Slot;
    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader;
    fn block_roots_mut(&mut self) -> &mut RecentRoots<P>;
    fn state_roots_mut(&mut self) -> &mut RecentRoots<P>;
    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots<P>;
    fn eth1_data_mut(&mut self) -> &mut Eth1Data;
    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes<P>;
    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex;
    fn validators_mut(&mut self) -> &mut Validators<P>;
    fn balances_mut(&mut self) -> &mut Balances<P>;
    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P>;
    fn slashings_mut(&mut self) -> &mut Slashings<P>;
    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength>;
    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint;
    fn cache_mut(&mut self) -> &mut Cache;

    // Effective balance updates mutate validators while reading balances and
    // proportional slashings mutate balances while reading slashings.
    // The borrow checker cannot see through two method calls.
    fn validators_mut_with_balances(&mut self) -> (&mut Validators<P>, &Balances<P>);
    fn balances_mut_with_slashings(&mut self) -> (&mut Balances<P>, &Slashings<P>);

    fn storage_mode(&self) -> StorageMode;
    fn make_transient(&mut self);
    fn make_persistent(&mut self);
}

#[duplicate_item(
    implementor;
    [Phase0BeaconState];
    [AltairBeaconState];
    [BellatrixBeaconState];
)]
impl<P: Preset> BeaconState<P> for implementor<P> {
    fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    fn genesis_validators_root(&self) -> H256 {
        self.genesis_validators_root
    }

    fn slot(&self) -> Slot {
        self.slot
    }

    fn fork(&self) -> Fork {
        self.fork
    }

    fn latest_block_header(&self) -> BeaconBlockHeader {
        self.latest_block_header
    }

    fn block_roots(&self) -> &RecentRoots<P> {
        &self.block_roots
    }

    fn state_roots(&self) -> &RecentRoots<P> {
        &self.state_roots
    }

    fn historical_roots(&self) -> &HistoricalRoots<P> {
        &self.historical_roots
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn eth1_data_votes(&self) -> &Eth1DataVotes<P> {
        &self.eth1_data_votes
    }

    fn eth1_deposit_index(&self) -> DepositIndex {
        self.eth1_deposit_index
    }

    fn validators(&self) -> &Validators<P> {
        &self.validators
    }

    fn balances(&self) -> &Balances<P> {
        &self.balances
    }

    fn randao_mixes(&self) -> &RandaoMixes<P> {
        &self.randao_mixes
    }

    fn slashings(&self) -> &Slashings<P> {
        &self.slashings
    }

    fn justification_bits(&self) -> BitVector<JustificationBitsLength> {
        self.justification_bits
    }

    fn previous_justified_checkpoint(&self) -> Checkpoint {
        self.previous_justified_checkpoint
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        self.current_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn cache(&self) -> &Cache {
        &self.cache
    }

    fn genesis_time_mut(&mut self) -> &mut UnixSeconds {
        &mut self.genesis_time
    }

    fn genesis_validators_root_mut(&mut self) -> &mut H256 {
        &mut self.genesis_validators_root
    }

    fn slot_mut(&mut self) -> &mut Slot {
        &mut self.slot
    }

    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
        &mut self.latest_block_header
    }

    fn block_roots_mut(&mut self) -> &mut RecentRoots<P> {
        &mut self.block_roots
    }

    fn state_roots_mut(&mut self) -> &mut RecentRoots<P> {
        &mut self.state_roots
    }

    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots<P> {
        &mut self.historical_roots
    }

    fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        &mut self.eth1_data
    }

    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes<P> {
        &mut self.eth1_data_votes
    }

    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex {
        &mut self.eth1_deposit_index
    }

    fn validators_mut(&mut self) -> &mut Validators<P> {
        &mut self.validators
    }

    fn balances_mut(&mut self) -> &mut Balances<P> {
        &mut self.balances
    }

    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P> {
        &mut self.randao_mixes
    }

    fn slashings_mut(&mut self) -> &mut Slashings<P> {
        &mut self.slashings
    }

    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength> {
        &mut self.justification_bits
    }

    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.previous_justified_checkpoint
    }

    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.current_justified_checkpoint
    }

    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.finalized_checkpoint
    }

    fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    fn validators_mut_with_balances(&mut self) -> (&mut Validators<P>, &Balances<P>) {
        (&mut self.validators, &self.balances)
    }

    fn balances_mut_with_slashings(&mut self) -> (&mut Balances<P>, &Slashings<P>) {
        (&mut self.balances, &self.slashings)
    }

    fn storage_mode(&self) -> StorageMode {
        self.storage_mode()
    }

    fn make_transient(&mut self) {
        self.make_transient();
    }

    fn make_persistent(&mut self) {
        self.make_persistent();
    }
}

impl<P: Preset, S: BeaconState<P>> BeaconState<P> for Hc<S> {
    fn genesis_time(&self) -> UnixSeconds {
        self.as_ref().genesis_time()
    }

    fn genesis_validators_root(&self) -> H256 {
        self.as_ref().genesis_validators_root()
    }

    fn slot(&self) -> Slot {
        self.as_ref().slot()
    }

    fn fork(&self) -> Fork {
        self.as_ref().fork()
    }

    fn latest_block_header(&self) -> BeaconBlockHeader {
        self.as_ref().latest_block_header()
    }

    fn block_roots(&self) -> &RecentRoots<P> {
        self.as_ref().block_roots()
    }

    fn state_roots(&self) -> &RecentRoots<P> {
        self.as_ref().state_roots()
    }

    fn historical_roots(&self) -> &HistoricalRoots<P> {
        self.as_ref().historical_roots()
    }

    fn eth1_data(&self) -> Eth1Data {
        self.as_ref().eth1_data()
    }

    fn eth1_data_votes(&self) -> &Eth1DataVotes<P> {
        self.as_ref().eth1_data_votes()
    }

    fn eth1_deposit_index(&self) -> DepositIndex {
        self.as_ref().eth1_deposit_index()
    }

    fn validators(&self) -> &Validators<P> {
        self.as_ref().validators()
    }

    fn balances(&self) -> &Balances<P> {
        self.as_ref().balances()
    }

    fn randao_mixes(&self) -> &RandaoMixes<P> {
        self.as_ref().randao_mixes()
    }

    fn slashings(&self) -> &Slashings<P> {
        self.as_ref().slashings()
    }

    fn justification_bits(&self) -> BitVector<JustificationBitsLength> {
        self.as_ref().justification_bits()
    }

    fn previous_justified_checkpoint(&self) -> Checkpoint {
        self.as_ref().previous_justified_checkpoint()
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        self.as_ref().current_justified_checkpoint()
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.as_ref().finalized_checkpoint()
    }

    fn cache(&self) -> &Cache {
        self.as_ref().cache()
    }

    fn genesis_time_mut(&mut self) -> &mut UnixSeconds {
        self.as_mut().genesis_time_mut()
    }

    fn genesis_validators_root_mut(&mut self) -> &mut H256 {
        self.as_mut().genesis_validators_root_mut()
    }

    fn slot_mut(&mut self) -> &mut Slot {
        self.as_mut().slot_mut()
    }

    fn latest_block_header_mut(&mut self) -> &mut BeaconBlockHeader {
        self.as_mut().latest_block_header_mut()
    }

    fn block_roots_mut(&mut self) -> &mut RecentRoots<P> {
        self.as_mut().block_roots_mut()
    }

    fn state_roots_mut(&mut self) -> &mut RecentRoots<P> {
        self.as_mut().state_roots_mut()
    }

    fn historical_roots_mut(&mut self) -> &mut HistoricalRoots<P> {
        self.as_mut().historical_roots_mut()
    }

    fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        self.as_mut().eth1_data_mut()
    }

    fn eth1_data_votes_mut(&mut self) -> &mut Eth1DataVotes<P> {
        self.as_mut().eth1_data_votes_mut()
    }

    fn eth1_deposit_index_mut(&mut self) -> &mut DepositIndex {
        self.as_mut().eth1_deposit_index_mut()
    }

    fn validators_mut(&mut self) -> &mut Validators<P> {
        self.as_mut().validators_mut()
    }

    fn balances_mut(&mut self) -> &mut Balances<P> {
        self.as_mut().balances_mut()
    }

    fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P> {
        self.as_mut().randao_mixes_mut()
    }

    fn slashings_mut(&mut self) -> &mut Slashings<P> {
        self.as_mut().slashings_mut()
    }

    fn justification_bits_mut(&mut self) -> &mut BitVector<JustificationBitsLength> {
        self.as_mut().justification_bits_mut()
    }

    fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        self.as_mut().previous_justified_checkpoint_mut()
    }

    fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        self.as_mut().current_justified_checkpoint_mut()
    }

    fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        self.as_mut().finalized_checkpoint_mut()
    }

    fn cache_mut(&mut self) -> &mut Cache {
        self.as_mut().cache_mut()
    }

    fn validators_mut_with_balances(&mut self) -> (&mut Validators<P>, &Balances<P>) {
        self.as_mut().validators_mut_with_balances()
    }

    fn balances_mut_with_slashings(&mut self) -> (&mut Balances<P>, &Slashings<P>) {
        self.as_mut().balances_mut_with_slashings()
    }

    fn storage_mode(&self) -> StorageMode {
        self.as_ref().storage_mode()
    }

    fn make_transient(&mut self) {
        self.as_mut().make_transient();
    }

    fn make_persistent(&mut self) {
        self.as_mut().make_persistent();
    }
}

pub trait PostAltairBeaconState<P: Preset>: BeaconState<P> {
    fn previous_epoch_participation(&self) -> &EpochParticipation<P>;
    fn current_epoch_participation(&self) -> &EpochParticipation<P>;
    fn inactivity_scores(&self) -> &InactivityScores<P>;
    fn current_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>>;
    fn next_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>>;

    fn previous_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P>;
    fn current_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P>;
    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores<P>;
    fn current_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>>;
    fn next_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>>;
}

#[duplicate_item(
    implementor;
    [AltairBeaconState];
    [BellatrixBeaconState];
)]
impl<P: Preset> PostAltairBeaconState<P> for implementor<P> {
    fn previous_epoch_participation(&self) -> &EpochParticipation<P> {
        &self.previous_epoch_participation
    }

    fn current_epoch_participation(&self) -> &EpochParticipation<P> {
        &self.current_epoch_participation
    }

    fn inactivity_scores(&self) -> &InactivityScores<P> {
        &self.inactivity_scores
    }

    fn current_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        &self.current_sync_committee
    }

    fn next_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        &self.next_sync_committee
    }

    fn previous_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        &mut self.previous_epoch_participation
    }

    fn current_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        &mut self.current_epoch_participation
    }

    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores<P> {
        &mut self.inactivity_scores
    }

    fn current_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        &mut self.current_sync_committee
    }

    fn next_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        &mut self.next_sync_committee
    }
}

impl<P: Preset, S: PostAltairBeaconState<P>> PostAltairBeaconState<P> for Hc<S> {
    fn previous_epoch_participation(&self) -> &EpochParticipation<P> {
        self.as_ref().previous_epoch_participation()
    }

    fn current_epoch_participation(&self) -> &EpochParticipation<P> {
        self.as_ref().current_epoch_participation()
    }

    fn inactivity_scores(&self) -> &InactivityScores<P> {
        self.as_ref().inactivity_scores()
    }

    fn current_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        self.as_ref().current_sync_committee()
    }

    fn next_sync_committee(&self) -> &Arc<Hc<SyncCommittee<P>>> {
        self.as_ref().next_sync_committee()
    }

    fn previous_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        self.as_mut().previous_epoch_participation_mut()
    }

    fn current_epoch_participation_mut(&mut self) -> &mut EpochParticipation<P> {
        self.as_mut().current_epoch_participation_mut()
    }

    fn inactivity_scores_mut(&mut self) -> &mut InactivityScores<P> {
        self.as_mut().inactivity_scores_mut()
    }

    fn current_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        self.as_mut().current_sync_committee_mut()
    }

    fn next_sync_committee_mut(&mut self) -> &mut Arc<Hc<SyncCommittee<P>>> {
        self.as_mut().next_sync_committee_mut()
    }
}

pub trait PostBellatrixBeaconState<P: Preset>: PostAltairBeaconState<P> {
    fn latest_execution_payload_header(&self) -> &ExecutionPayloadHeader<P>;
    fn latest_execution_payload_header_mut(&mut self) -> &mut ExecutionPayloadHeader<P>;
}

impl<P: Preset> PostBellatrixBeaconState<P> for BellatrixBeaconState<P> {
    fn latest_execution_payload_header(&self) -> &ExecutionPayloadHeader<P> {
        &self.latest_execution_payload_header
    }

    fn latest_execution_payload_header_mut(&mut self) -> &mut ExecutionPayloadHeader<P> {
        &mut self.latest_execution_payload_header
    }
}

impl<P: Preset, S: PostBellatrixBeaconState<P>> PostBellatrixBeaconState<P> for Hc<S> {
    fn latest_execution_payload_header(&self) -> &ExecutionPayloadHeader<P> {
        self.as_ref().latest_execution_payload_header()
    }

    fn latest_execution_payload_header_mut(&mut self) -> &mut ExecutionPayloadHeader<P> {
        self.as_mut().latest_execution_payload_header_mut()
    }
}

pub trait BeaconBlock<P: Preset>: SszHash<PackingFactor = U1> + Send + Sync {
    fn slot(&self) -> Slot;
    fn proposer_index(&self) -> ValidatorIndex;
    fn parent_root(&self) -> H256;
    fn state_root(&self) -> H256;
    fn body(&self) -> &dyn BeaconBlockBody<P>;
}

#[duplicate_item(
    implementor;
    [Phase0BeaconBlock];
    [AltairBeaconBlock];
    [BellatrixBeaconBlock];
)]
impl<P: Preset> BeaconBlock<P> for implementor<P> {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn proposer_index(&self) -> ValidatorIndex {
        self.proposer_index
    }

    fn parent_root(&self) -> H256 {
        self.parent_root
    }

    fn state_root(&self) -> H256 {
        self.state_root
    }

    fn body(&self) -> &dyn BeaconBlockBody<P> {
        &self.body
    }
}

pub trait BeaconBlockBody<P: Preset>: SszHash<PackingFactor = U1> + Send + Sync {
    fn randao_reveal(&self) -> SignatureBytes;
    fn eth1_data(&self) -> Eth1Data;
    fn graffiti(&self) -> H256;
    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings>;
    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>;
    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations>;
    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits>;
    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>;
}

#[duplicate_item(
    implementor;
    [Phase0BeaconBlockBody];
    [AltairBeaconBlockBody];
    [BellatrixBeaconBlockBody];
)]
impl<P: Preset> BeaconBlockBody<P> for implementor<P> {
    fn randao_reveal(&self) -> SignatureBytes {
        self.randao_reveal
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn graffiti(&self) -> H256 {
        self.graffiti
    }

    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings> {
        &self.proposer_slashings
    }

    fn attester_slashings(&self) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings> {
        &self.attester_slashings
    }

    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations> {
        &self.attestations
    }

    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits> {
        &self.deposits
    }

    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits> {
        &self.voluntary_exits
    }
}
