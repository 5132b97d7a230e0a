use derive_more::From;
use enum_iterator::Sequence as _;
use serde::Serialize;
use ssz::{
    Hc, ReadError, Size, SszHash, SszRead, SszReadDefault, SszSize, SszWrite, StorageMode,
    WriteError, H256, U1,
};
use static_assertions::const_assert_eq;
use typenum::Unsigned as _;

use crate::{
    altair::{
        beacon_state::BeaconState as AltairBeaconState,
        containers::{
            BeaconBlock as AltairBeaconBlock, SignedBeaconBlock as AltairSignedBeaconBlock,
        },
    },
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::{
            BeaconBlock as BellatrixBeaconBlock, SignedBeaconBlock as BellatrixSignedBeaconBlock,
        },
    },
    collections::{Balances, RandaoMixes, Validators},
    config::Config,
    nonstandard::Phase,
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        containers::{
            BeaconBlock as Phase0BeaconBlock, BeaconBlockHeader, Eth1Data,
            SignedBeaconBlock as Phase0SignedBeaconBlock,
        },
        primitives::{Slot, UnixSeconds, H256 as Root},
    },
    preset::Preset,
    traits::{BeaconState as _, PostAltairBeaconState, PostBellatrixBeaconState},
};

use bls::SignatureBytes;

#[derive(Clone, PartialEq, Eq, Debug, From, Serialize)]
#[serde(bound = "", untagged)]
pub enum BeaconState<P: Preset> {
    Phase0(Hc<Phase0BeaconState<P>>),
    Altair(Hc<AltairBeaconState<P>>),
    Bellatrix(Hc<BellatrixBeaconState<P>>),
}

impl<P: Preset> From<Phase0BeaconState<P>> for BeaconState<P> {
    fn from(state: Phase0BeaconState<P>) -> Self {
        Hc::from(state).into()
    }
}

impl<P: Preset> From<AltairBeaconState<P>> for BeaconState<P> {
    fn from(state: AltairBeaconState<P>) -> Self {
        Hc::from(state).into()
    }
}

impl<P: Preset> From<BellatrixBeaconState<P>> for BeaconState<P> {
    fn from(state: BellatrixBeaconState<P>) -> Self {
        Hc::from(state).into()
    }
}

impl<P: Preset> SszSize for BeaconState<P> {
    // The const parameter should be `Self::VARIANT_COUNT`, but `Self` refers
    // to a generic type. Type parameters cannot be used in `const` contexts
    // until `generic_const_exprs` is stable.
    const SIZE: Size = Size::for_untagged_union::<{ Phase::CARDINALITY }>([
        Phase0BeaconState::<P>::SIZE,
        AltairBeaconState::<P>::SIZE,
        BellatrixBeaconState::<P>::SIZE,
    ]);
}

impl<P: Preset> SszRead<Config> for BeaconState<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        // There are 2 fixed parts before `state.slot`:
        // - The contents of `state.genesis_time`.
        // - The contents of `state.genesis_validators_root`.
        let slot_start = UnixSeconds::SIZE.get() + Root::SIZE.get();
        let slot_end = slot_start + Slot::SIZE.get();
        let slot_bytes = ssz::subslice(bytes, slot_start..slot_end)?;
        let slot = Slot::from_ssz_default(slot_bytes)?;
        let phase = config.phase_at_slot::<P>(slot);

        let state = match phase {
            Phase::Phase0 => Self::Phase0(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Altair => Self::Altair(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Bellatrix => Self::Bellatrix(SszReadDefault::from_ssz_default(bytes)?),
        };

        assert_eq!(slot, state.slot());

        Ok(state)
    }
}

impl<P: Preset> SszWrite for BeaconState<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(state) => state.write_variable(bytes),
            Self::Altair(state) => state.write_variable(bytes),
            Self::Bellatrix(state) => state.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for BeaconState<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(state) => state.hash_tree_root(),
            Self::Altair(state) => state.hash_tree_root(),
            Self::Bellatrix(state) => state.hash_tree_root(),
        }
    }
}

impl<P: Preset> BeaconState<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(state) => state.slot,
            Self::Altair(state) => state.slot,
            Self::Bellatrix(state) => state.slot,
        }
    }

    pub fn slot_mut(&mut self) -> &mut Slot {
        match self {
            Self::Phase0(state) => state.slot_mut(),
            Self::Altair(state) => state.slot_mut(),
            Self::Bellatrix(state) => state.slot_mut(),
        }
    }

    #[must_use]
    pub fn latest_block_header(&self) -> BeaconBlockHeader {
        match self {
            Self::Phase0(state) => state.latest_block_header,
            Self::Altair(state) => state.latest_block_header,
            Self::Bellatrix(state) => state.latest_block_header,
        }
    }

    pub fn genesis_time_mut(&mut self) -> &mut UnixSeconds {
        match self {
            Self::Phase0(state) => state.genesis_time_mut(),
            Self::Altair(state) => state.genesis_time_mut(),
            Self::Bellatrix(state) => state.genesis_time_mut(),
        }
    }

    pub fn genesis_validators_root_mut(&mut self) -> &mut H256 {
        match self {
            Self::Phase0(state) => state.genesis_validators_root_mut(),
            Self::Altair(state) => state.genesis_validators_root_mut(),
            Self::Bellatrix(state) => state.genesis_validators_root_mut(),
        }
    }

    #[must_use]
    pub fn eth1_data(&self) -> Eth1Data {
        match self {
            Self::Phase0(state) => state.eth1_data,
            Self::Altair(state) => state.eth1_data,
            Self::Bellatrix(state) => state.eth1_data,
        }
    }

    pub fn eth1_data_mut(&mut self) -> &mut Eth1Data {
        match self {
            Self::Phase0(state) => state.eth1_data_mut(),
            Self::Altair(state) => state.eth1_data_mut(),
            Self::Bellatrix(state) => state.eth1_data_mut(),
        }
    }

    #[must_use]
    pub fn validators(&self) -> &Validators<P> {
        match self {
            Self::Phase0(state) => &state.validators,
            Self::Altair(state) => &state.validators,
            Self::Bellatrix(state) => &state.validators,
        }
    }

    pub fn validators_mut(&mut self) -> &mut Validators<P> {
        match self {
            Self::Phase0(state) => state.validators_mut(),
            Self::Altair(state) => state.validators_mut(),
            Self::Bellatrix(state) => state.validators_mut(),
        }
    }

    #[must_use]
    pub fn balances(&self) -> &Balances<P> {
        match self {
            Self::Phase0(state) => &state.balances,
            Self::Altair(state) => &state.balances,
            Self::Bellatrix(state) => &state.balances,
        }
    }

    pub fn balances_mut(&mut self) -> &mut Balances<P> {
        match self {
            Self::Phase0(state) => state.balances_mut(),
            Self::Altair(state) => state.balances_mut(),
            Self::Bellatrix(state) => state.balances_mut(),
        }
    }

    pub fn randao_mixes_mut(&mut self) -> &mut RandaoMixes<P> {
        match self {
            Self::Phase0(state) => state.randao_mixes_mut(),
            Self::Altair(state) => state.randao_mixes_mut(),
            Self::Bellatrix(state) => state.randao_mixes_mut(),
        }
    }

    #[must_use]
    pub const fn post_altair(&self) -> Option<&dyn PostAltairBeaconState<P>> {
        match self {
            Self::Phase0(_) => None,
            Self::Altair(state) => Some(state),
            Self::Bellatrix(state) => Some(state),
        }
    }

    pub fn post_altair_mut(&mut self) -> Option<&mut dyn PostAltairBeaconState<P>> {
        match self {
            Self::Phase0(_) => None,
            Self::Altair(state) => Some(state),
            Self::Bellatrix(state) => Some(state),
        }
    }

    #[must_use]
    pub const fn post_bellatrix(&self) -> Option<&dyn PostBellatrixBeaconState<P>> {
        match self {
            Self::Phase0(_) | Self::Altair(_) => None,
            Self::Bellatrix(state) => Some(state),
        }
    }

    /// Primes the state root cache with an externally known root.
    pub fn set_cached_root(&self, root: H256) {
        match self {
            Self::Phase0(state) => state.set_cached_root(root),
            Self::Altair(state) => state.set_cached_root(root),
            Self::Bellatrix(state) => state.set_cached_root(root),
        }
    }

    #[must_use]
    pub fn storage_mode(&self) -> StorageMode {
        match self {
            Self::Phase0(state) => state.as_ref().storage_mode(),
            Self::Altair(state) => state.as_ref().storage_mode(),
            Self::Bellatrix(state) => state.as_ref().storage_mode(),
        }
    }

    pub fn make_transient(&mut self) {
        match self {
            Self::Phase0(state) => state.as_mut().make_transient(),
            Self::Altair(state) => state.as_mut().make_transient(),
            Self::Bellatrix(state) => state.as_mut().make_transient(),
        }
    }

    pub fn make_persistent(&mut self) {
        match self {
            Self::Phase0(state) => state.as_mut().make_persistent(),
            Self::Altair(state) => state.as_mut().make_persistent(),
            Self::Bellatrix(state) => state.as_mut().make_persistent(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, From, Serialize)]
#[serde(bound = "", untagged)]
pub enum SignedBeaconBlock<P: Preset> {
    Phase0(Phase0SignedBeaconBlock<P>),
    Altair(AltairSignedBeaconBlock<P>),
    Bellatrix(BellatrixSignedBeaconBlock<P>),
}

impl<P: Preset> SszSize for SignedBeaconBlock<P> {
    const SIZE: Size = Size::for_untagged_union::<{ Phase::CARDINALITY }>([
        Phase0SignedBeaconBlock::<P>::SIZE,
        AltairSignedBeaconBlock::<P>::SIZE,
        BellatrixSignedBeaconBlock::<P>::SIZE,
    ]);
}

impl<P: Preset> SszRead<Config> for SignedBeaconBlock<P> {
    fn from_ssz_unchecked(config: &Config, bytes: &[u8]) -> Result<Self, ReadError> {
        // The fixed parts before `block.message.slot` are the offset of
        // `block.message` and the contents of `block.signature`.
        let message_offset_bytes = ssz::subslice(bytes, 0..ssz::BYTES_PER_LENGTH_OFFSET)?;
        let message_offset = ssz::read_offset_unchecked(message_offset_bytes)?;
        let slot_start = message_offset;
        let slot_end = slot_start + Slot::SIZE.get();
        let slot_bytes = ssz::subslice(bytes, slot_start..slot_end)?;
        let slot = Slot::from_ssz_default(slot_bytes)?;
        let phase = config.phase_at_slot::<P>(slot);

        let block = match phase {
            Phase::Phase0 => Self::Phase0(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Altair => Self::Altair(SszReadDefault::from_ssz_default(bytes)?),
            Phase::Bellatrix => Self::Bellatrix(SszReadDefault::from_ssz_default(bytes)?),
        };

        assert_eq!(slot, block.slot());

        Ok(block)
    }
}

impl<P: Preset> SszWrite for SignedBeaconBlock<P> {
    fn write_variable(&self, bytes: &mut Vec<u8>) -> Result<(), WriteError> {
        match self {
            Self::Phase0(block) => block.write_variable(bytes),
            Self::Altair(block) => block.write_variable(bytes),
            Self::Bellatrix(block) => block.write_variable(bytes),
        }
    }
}

impl<P: Preset> SszHash for SignedBeaconBlock<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.hash_tree_root(),
            Self::Altair(block) => block.hash_tree_root(),
            Self::Bellatrix(block) => block.hash_tree_root(),
        }
    }
}

impl<P: Preset> SignedBeaconBlock<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(block) => block.message.slot,
            Self::Altair(block) => block.message.slot,
            Self::Bellatrix(block) => block.message.slot,
        }
    }

    #[must_use]
    pub fn state_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.message.state_root,
            Self::Altair(block) => block.message.state_root,
            Self::Bellatrix(block) => block.message.state_root,
        }
    }

    #[must_use]
    pub fn signature(&self) -> SignatureBytes {
        match self {
            Self::Phase0(block) => block.signature,
            Self::Altair(block) => block.signature,
            Self::Bellatrix(block) => block.signature,
        }
    }

    #[must_use]
    pub fn split(self) -> (BeaconBlock<P>, SignatureBytes) {
        match self {
            Self::Phase0(block) => (block.message.into(), block.signature),
            Self::Altair(block) => (block.message.into(), block.signature),
            Self::Bellatrix(block) => (block.message.into(), block.signature),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, From, Serialize)]
#[serde(bound = "", untagged)]
pub enum BeaconBlock<P: Preset> {
    Phase0(Phase0BeaconBlock<P>),
    Altair(AltairBeaconBlock<P>),
    Bellatrix(BellatrixBeaconBlock<P>),
}

impl<P: Preset> SszHash for BeaconBlock<P> {
    type PackingFactor = U1;

    fn hash_tree_root(&self) -> H256 {
        match self {
            Self::Phase0(block) => block.hash_tree_root(),
            Self::Altair(block) => block.hash_tree_root(),
            Self::Bellatrix(block) => block.hash_tree_root(),
        }
    }
}

impl<P: Preset> BeaconBlock<P> {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
        }
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        match self {
            Self::Phase0(block) => block.slot,
            Self::Altair(block) => block.slot,
            Self::Bellatrix(block) => block.slot,
        }
    }

    #[must_use]
    pub fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlock<P> {
        match self {
            Self::Phase0(message) => Phase0SignedBeaconBlock { message, signature }.into(),
            Self::Altair(message) => AltairSignedBeaconBlock { message, signature }.into(),
            Self::Bellatrix(message) => BellatrixSignedBeaconBlock { message, signature }.into(),
        }
    }

    #[must_use]
    pub fn with_state_root(mut self, state_root: H256) -> Self {
        match &mut self {
            Self::Phase0(block) => block.state_root = state_root,
            Self::Altair(block) => block.state_root = state_root,
            Self::Bellatrix(block) => block.state_root = state_root,
        }

        self
    }
}

// These assertions will become incorrect if later phases do not modify the
// relevant containers.
const_assert_eq!(Phase::CARDINALITY, 3);
