//! Collections used in `BeaconState`.
//!
//! These are persistent SSZ collections, optimized for fast state transitions
//! and low memory usage when multiple consecutive states exist. The bundle
//! sizes are chosen so that element types whose chunks are not produced by
//! hashing fill at least two chunks per leaf, which avoids storing redundant
//! intermediate hashes.

use ssz::{PersistentList, PersistentVector};

use crate::{
    altair::primitives::ParticipationFlags,
    phase0::{
        containers::{Eth1Data, PendingAttestation, Validator},
        primitives::{Gwei, H256},
    },
    preset::{MaxAttestationsPerEpoch, Preset, SlotsPerEth1VotingPeriod, SlotsPerHistoricalRoot},
};

pub type RecentRoots<P> = PersistentVector<H256, SlotsPerHistoricalRoot<P>, 2>;

pub type HistoricalRoots<P> = PersistentList<H256, <P as Preset>::HistoricalRootsLimit, 2>;

pub type Eth1DataVotes<P> = PersistentList<Eth1Data, SlotsPerEth1VotingPeriod<P>>;

pub type Validators<P> = PersistentList<Validator, <P as Preset>::ValidatorRegistryLimit>;

pub type Balances<P> = PersistentList<Gwei, <P as Preset>::ValidatorRegistryLimit, 8>;

pub type RandaoMixes<P> = PersistentVector<H256, <P as Preset>::EpochsPerHistoricalVector, 2>;

pub type Slashings<P> = PersistentVector<Gwei, <P as Preset>::EpochsPerSlashingsVector, 8>;

pub type Attestations<P> = PersistentList<PendingAttestation<P>, MaxAttestationsPerEpoch<P>>;

pub type EpochParticipation<P> =
    PersistentList<ParticipationFlags, <P as Preset>::ValidatorRegistryLimit, 64>;

pub type InactivityScores<P> = PersistentList<u64, <P as Preset>::ValidatorRegistryLimit, 8>;
