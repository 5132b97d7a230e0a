use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use bls::CachedPublicKey;
use generic_array::ArrayLength;
use nonzero_ext::nonzero;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use ssz::{BitVectorBits, FitsInU64};
use strum::{Display, EnumString};
use typenum::{
    NonZero, Prod, Unsigned, U1048576, U1073741824, U1099511627776, U128, U16, U16777216, U2,
    U2048, U256, U32, U512, U64, U65536, U8, U8192,
};

use crate::{
    config::Config,
    phase0::primitives::{Gwei, ValidatorIndex},
};

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/v1.3.0/presets).
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    // Phase 0
    type EpochsPerEth1VotingPeriod: Unsigned + NonZero;
    type EpochsPerHistoricalRoot: Unsigned + NonZero;
    type EpochsPerHistoricalVector: Unsigned + NonZero + Eq + Debug + Send + Sync;
    type EpochsPerSlashingsVector: Unsigned + NonZero + Eq + Debug + Send + Sync;
    type HistoricalRootsLimit: Unsigned + Eq + Debug + Send + Sync;
    type MaxAttestations: Unsigned + Eq + Debug + Send + Sync;
    type MaxAttesterSlashings: Unsigned + Eq + Debug + Send + Sync;
    type MaxDeposits: Unsigned + Eq + Debug + Send + Sync;
    type MaxProposerSlashings: Unsigned + Eq + Debug + Send + Sync;
    type MaxValidatorsPerCommittee: Unsigned + NonZero + Eq + Ord + Debug + Send + Sync;
    type MaxVoluntaryExits: Unsigned + Eq + Debug + Send + Sync;
    type SlotsPerEpoch: Unsigned + NonZero;
    type ValidatorRegistryLimit: FitsInU64 + NonZero + Eq + Debug + Send + Sync;

    // Altair
    type SyncCommitteeSize: ArrayLength<CachedPublicKey>
        + ArrayLength<ValidatorIndex>
        + BitVectorBits
        + NonZero
        + Eq
        + Debug
        + Send
        + Sync;

    // Bellatrix
    type BytesPerLogsBloom: ArrayLength<u8> + Eq + Debug + Send + Sync;
    type MaxBytesPerTransaction: Unsigned + Eq + Debug + Send + Sync;
    type MaxExtraDataBytes: Unsigned + Eq + Debug + Send + Sync;
    type MaxTransactionsPerPayload: Unsigned + Eq + Debug + Send + Sync;

    // Derived type-level variables
    type MaxAttestationsPerEpoch: Unsigned + Eq + Debug + Send + Sync;
    type SlotsPerEth1VotingPeriod: Unsigned + NonZero + Eq + Debug + Send + Sync;
    type SlotsPerHistoricalRoot: Unsigned + NonZero + Eq + Debug + Send + Sync;

    // Meta
    const NAME: PresetName;

    // Phase 0
    const BASE_REWARD_FACTOR: u64 = 64;
    const EFFECTIVE_BALANCE_INCREMENT: NonZeroU64 = nonzero!(1_000_000_000_u64);
    const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
    const HYSTERESIS_QUOTIENT: NonZeroU64 = nonzero!(4_u64);
    const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;
    const INACTIVITY_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(1_u64 << 26);
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(64_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_ATTESTATION_INCLUSION_DELAY: NonZeroU64 = NonZeroU64::MIN;
    const MIN_DEPOSIT_AMOUNT: Gwei = 1_000_000_000;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64 = 4;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(128_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 1;
    const PROPOSER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(8_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(128_u64);
    const WHISTLEBLOWER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(512_u64);

    // Altair
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: NonZeroU64 = nonzero!(256_u64);
    const INACTIVITY_PENALTY_QUOTIENT_ALTAIR: NonZeroU64 = nonzero!(3_u64 << 24);
    const MIN_SLASHING_PENALTY_QUOTIENT_ALTAIR: NonZeroU64 = nonzero!(64_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER_ALTAIR: u64 = 2;

    // Bellatrix
    const INACTIVITY_PENALTY_QUOTIENT_BELLATRIX: NonZeroU64 = nonzero!(1_u64 << 24);
    const MIN_SLASHING_PENALTY_QUOTIENT_BELLATRIX: NonZeroU64 = nonzero!(32_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER_BELLATRIX: u64 = 3;

    /// Returns the default configuration associated with a preset.
    ///
    /// This should only be used in tests and benchmarks.
    #[must_use]
    fn default_config() -> Config {
        Self::NAME.default_config()
    }
}

pub type SlotsPerEth1VotingPeriod<P> = <P as Preset>::SlotsPerEth1VotingPeriod;
pub type SlotsPerHistoricalRoot<P> = <P as Preset>::SlotsPerHistoricalRoot;
pub type MaxAttestationsPerEpoch<P> = <P as Preset>::MaxAttestationsPerEpoch;

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/v1.3.0/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    // Phase 0
    type EpochsPerEth1VotingPeriod = U64;
    type EpochsPerHistoricalRoot = U256;
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type HistoricalRootsLimit = U16777216;
    type MaxAttestations = U128;
    type MaxAttesterSlashings = U2;
    type MaxDeposits = U16;
    type MaxProposerSlashings = U16;
    type MaxValidatorsPerCommittee = U2048;
    type MaxVoluntaryExits = U16;
    type SlotsPerEpoch = U32;
    type ValidatorRegistryLimit = U1099511627776;

    // Altair
    type SyncCommitteeSize = U512;

    // Bellatrix
    type BytesPerLogsBloom = U256;
    type MaxBytesPerTransaction = U1073741824;
    type MaxExtraDataBytes = U32;
    type MaxTransactionsPerPayload = U1048576;

    // Derived type-level variables
    type MaxAttestationsPerEpoch = Prod<Self::MaxAttestations, Self::SlotsPerEpoch>;
    type SlotsPerEth1VotingPeriod = Prod<Self::EpochsPerEth1VotingPeriod, Self::SlotsPerEpoch>;
    type SlotsPerHistoricalRoot = Prod<Self::EpochsPerHistoricalRoot, Self::SlotsPerEpoch>;

    // Meta
    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/v1.3.0/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    // Phase 0
    type EpochsPerEth1VotingPeriod = typenum::U4;
    type EpochsPerHistoricalRoot = U8;
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type HistoricalRootsLimit = <Mainnet as Preset>::HistoricalRootsLimit;
    type MaxAttestations = <Mainnet as Preset>::MaxAttestations;
    type MaxAttesterSlashings = <Mainnet as Preset>::MaxAttesterSlashings;
    type MaxDeposits = <Mainnet as Preset>::MaxDeposits;
    type MaxProposerSlashings = <Mainnet as Preset>::MaxProposerSlashings;
    type MaxValidatorsPerCommittee = <Mainnet as Preset>::MaxValidatorsPerCommittee;
    type MaxVoluntaryExits = <Mainnet as Preset>::MaxVoluntaryExits;
    type SlotsPerEpoch = U8;
    type ValidatorRegistryLimit = <Mainnet as Preset>::ValidatorRegistryLimit;

    // Altair
    type SyncCommitteeSize = U32;

    // Bellatrix
    type BytesPerLogsBloom = <Mainnet as Preset>::BytesPerLogsBloom;
    type MaxBytesPerTransaction = <Mainnet as Preset>::MaxBytesPerTransaction;
    type MaxExtraDataBytes = <Mainnet as Preset>::MaxExtraDataBytes;
    type MaxTransactionsPerPayload = <Mainnet as Preset>::MaxTransactionsPerPayload;

    // Derived type-level variables
    type MaxAttestationsPerEpoch = Prod<Self::MaxAttestations, Self::SlotsPerEpoch>;
    type SlotsPerEth1VotingPeriod = Prod<Self::EpochsPerEth1VotingPeriod, Self::SlotsPerEpoch>;
    type SlotsPerHistoricalRoot = Prod<Self::EpochsPerHistoricalRoot, Self::SlotsPerEpoch>;

    // Meta
    const NAME: PresetName = PresetName::Minimal;

    // Phase 0
    const INACTIVITY_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(1_u64 << 25);
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(4_u64);
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(64_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 2;
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(4_u64);

    // Altair
    const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: NonZeroU64 = nonzero!(8_u64);
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, DeserializeFromStr, SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
pub enum PresetName {
    Mainnet,
    Minimal,
}

impl PresetName {
    pub(crate) fn default_config(self) -> Config {
        match self {
            Self::Mainnet => Config::mainnet(),
            Self::Minimal => Config::minimal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use typenum::Unsigned as _;

    use super::*;

    #[test]
    fn derived_variables_match_their_factors() {
        assert_eq!(SlotsPerHistoricalRoot::<Mainnet>::U64, 8192);
        assert_eq!(SlotsPerHistoricalRoot::<Minimal>::U64, 64);
        assert_eq!(SlotsPerEth1VotingPeriod::<Mainnet>::U64, 2048);
        assert_eq!(SlotsPerEth1VotingPeriod::<Minimal>::U64, 32);
        assert_eq!(MaxAttestationsPerEpoch::<Mainnet>::U64, 4096);
    }

    #[test]
    fn preset_bases_are_consistent_with_default_configs() {
        assert_eq!(Mainnet::default_config().preset_base, PresetName::Mainnet);
        assert_eq!(Minimal::default_config().preset_base, PresetName::Minimal);
    }
}
