//! Deterministic genesis states per the [interop mocked start standard].
//!
//! [interop mocked start standard]: https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start

use core::num::NonZeroU64;

use anyhow::Result;
use bls::{SecretKey, SecretKeyBytes};
use hashing::ZERO_HASHES;
use helper_functions::{accessors, misc, signing::SignForAllForks as _};
use hex_literal::hex;
use num_bigint::BigUint;
use ssz::{PersistentVector, SszHash as _};
use std_ext::ArcExt as _;
use types::{
    altair::{
        beacon_state::BeaconState as AltairBeaconState,
        containers::BeaconBlockBody as AltairBeaconBlockBody,
    },
    bellatrix::{
        beacon_state::BeaconState as BellatrixBeaconState,
        containers::BeaconBlockBody as BellatrixBeaconBlockBody,
    },
    combined::BeaconState,
    config::Config,
    nonstandard::Phase,
    phase0::{
        beacon_state::BeaconState as Phase0BeaconState,
        consts::{DepositContractTreeDepth, GENESIS_EPOCH, GENESIS_SLOT},
        containers::{
            BeaconBlockBody as Phase0BeaconBlockBody, BeaconBlockHeader, DepositData,
            DepositMessage, Fork,
        },
        primitives::{DepositIndex, ExecutionBlockHash, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use arithmetic::U64Ext as _;
use transition_functions::combined;
use typenum::Unsigned as _;

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#create-genesis-state>
const QUICK_START_ETH1_BLOCK_HASH: ExecutionBlockHash = H256([0x42; 32]);

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#create-genesis-state>
///
/// This is defined in the standard but effectively never used because the
/// genesis time derived from it is replaced by the one passed as a parameter.
const QUICK_START_ETH1_BLOCK_TIMESTAMP: UnixSeconds = 1 << 40;

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
///
/// Encoded in binary to avoid parsing a decimal string at runtime.
const CURVE_ORDER: &[u8] =
    &hex!("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001");

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#quick-start-genesis>
pub fn quick_start_beacon_state<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    validator_count: NonZeroU64,
) -> Result<BeaconState<P>> {
    let mut incremental = Incremental::new(config);

    incremental.set_eth1_timestamp(QUICK_START_ETH1_BLOCK_TIMESTAMP);

    for index in 0..validator_count.get() {
        let deposit_data = quick_start_deposit_data::<P>(config, &secret_key(index));
        incremental.add_deposit_data(deposit_data, index)?;
    }

    // > Clients must not run is_valid_genesis_state as this state is already considered valid.
    // > Specifically, we do not check nor care about MIN_GENESIS_TIME in these coordinated starts.

    let mut genesis_state = incremental.finish(QUICK_START_ETH1_BLOCK_HASH)?;

    *genesis_state.genesis_time_mut() = genesis_time;

    Ok(genesis_state)
}

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let index_hash = hashing::hash_256(validator_index.hash_tree_root());
    let curve_order = BigUint::from_bytes_be(CURVE_ORDER);
    let secret_key_uint = BigUint::from_bytes_le(index_hash.as_bytes()) % &curve_order;
    let unpadded = secret_key_uint.to_bytes_be();
    let mut padded = SecretKeyBytes::default();
    padded.as_mut()[SecretKeyBytes::SIZE - unpadded.len()..].copy_from_slice(unpadded.as_slice());
    padded
        .try_into()
        .expect("the algorithm given in the standard should produce valid secret keys")
}

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#generate-deposits>
#[must_use]
pub fn quick_start_deposit_data<P: Preset>(config: &Config, secret_key: &SecretKey) -> DepositData {
    let public_key = secret_key.to_public_key();
    let pubkey = public_key.into();
    let withdrawal_credentials = misc::bls_withdrawal_credentials(pubkey);
    let amount = P::MAX_EFFECTIVE_BALANCE;

    let deposit_message = DepositMessage {
        pubkey,
        withdrawal_credentials,
        amount,
    };

    let signature = deposit_message.sign(config, secret_key).into();

    DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature,
    }
}

/// Builds a genesis state one deposit at a time.
///
/// See [`initialize_beacon_state_from_eth1`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/beacon-chain.md#genesis).
pub struct Incremental<'config, P: Preset> {
    config: &'config Config,
    beacon_state: BeaconState<P>,
    deposit_tree: DepositTree,
}

impl<'config, P: Preset> Incremental<'config, P> {
    #[must_use]
    pub fn new(config: &'config Config) -> Self {
        let slot = GENESIS_SLOT;
        let phase = config.phase_at_slot::<P>(slot);
        let version = config.version(phase);

        let fork = Fork {
            previous_version: version,
            current_version: version,
            epoch: GENESIS_EPOCH,
        };

        let body_root = match phase {
            Phase::Phase0 => Phase0BeaconBlockBody::<P>::default().hash_tree_root(),
            Phase::Altair => AltairBeaconBlockBody::<P>::default().hash_tree_root(),
            Phase::Bellatrix => BellatrixBeaconBlockBody::<P>::default().hash_tree_root(),
        };

        let latest_block_header = BeaconBlockHeader {
            slot,
            body_root,
            ..BeaconBlockHeader::default()
        };

        let beacon_state = match phase {
            Phase::Phase0 => Phase0BeaconState {
                slot,
                fork,
                latest_block_header,
                ..Phase0BeaconState::default()
            }
            .into(),
            Phase::Altair => AltairBeaconState {
                slot,
                fork,
                latest_block_header,
                ..AltairBeaconState::default()
            }
            .into(),
            Phase::Bellatrix => BellatrixBeaconState {
                slot,
                fork,
                latest_block_header,
                ..BellatrixBeaconState::default()
            }
            .into(),
        };

        Self {
            config,
            beacon_state,
            deposit_tree: DepositTree::default(),
        }
    }

    pub fn set_eth1_timestamp(&mut self, eth1_timestamp: UnixSeconds) {
        *self.beacon_state.genesis_time_mut() = eth1_timestamp + self.config.genesis_delay;
    }

    pub fn add_deposit_data(
        &mut self,
        data: DepositData,
        deposit_index: DepositIndex,
    ) -> Result<()> {
        let eth1_data = self.beacon_state.eth1_data_mut();

        eth1_data.deposit_root = self.deposit_tree.push_and_compute_root(deposit_index, data);
        eth1_data.deposit_count = self.deposit_tree.deposit_count;

        if let Some(validator_index) =
            combined::process_deposit_data(self.config, &mut self.beacon_state, data)?
        {
            let balance = *self.beacon_state.balances().get(validator_index)?;

            let validator = self
                .beacon_state
                .validators_mut()
                .get_mut(validator_index)?;

            validator.effective_balance = balance
                .prev_multiple_of(P::EFFECTIVE_BALANCE_INCREMENT)
                .min(P::MAX_EFFECTIVE_BALANCE);

            if validator.effective_balance == P::MAX_EFFECTIVE_BALANCE {
                validator.activation_eligibility_epoch = GENESIS_EPOCH;
                validator.activation_epoch = GENESIS_EPOCH;
            }
        }

        Ok(())
    }

    pub fn finish(self, eth1_block_hash: ExecutionBlockHash) -> Result<BeaconState<P>> {
        let Self {
            mut beacon_state, ..
        } = self;

        beacon_state.eth1_data_mut().block_hash = eth1_block_hash;

        // > Seed RANDAO with Eth1 entropy
        *beacon_state.randao_mixes_mut() = PersistentVector::repeat_element(eth1_block_hash);

        // > Set genesis validators root for domain separation and chain versioning
        *beacon_state.genesis_validators_root_mut() = beacon_state.validators().hash_tree_root();

        // > [New in Altair] Fill in sync committees
        // > Note: A duplicate committee is assigned for the current and next committee at genesis
        if let BeaconState::Altair(_) | BeaconState::Bellatrix(_) = beacon_state {
            let state = beacon_state
                .post_altair_mut()
                .expect("the match above covers exactly the post-Altair phases");

            let sync_committee = accessors::get_next_sync_committee(state)?;
            *state.current_sync_committee_mut() = sync_committee.clone_arc();
            *state.next_sync_committee_mut() = sync_committee;
        }

        Ok(beacon_state)
    }
}

/// The incremental Merkle tree of the deposit contract.
///
/// Only the rightmost branch is retained; that is enough to compute roots as
/// long as deposits are only appended.
#[derive(Default)]
struct DepositTree {
    branch: [H256; DepositContractTreeDepth::USIZE],
    deposit_count: u64,
}

impl DepositTree {
    fn push_and_compute_root(&mut self, deposit_index: DepositIndex, data: DepositData) -> H256 {
        assert_eq!(deposit_index, self.deposit_count);

        let mut node = data.hash_tree_root();
        let mut size = self.deposit_count + 1;

        for height in 0..DepositContractTreeDepth::USIZE {
            if size % 2 == 1 {
                self.branch[height] = node;
                break;
            }

            node = hashing::hash_256_256(self.branch[height], node);
            size /= 2;
        }

        self.deposit_count += 1;

        self.root()
    }

    fn root(&self) -> H256 {
        let mut node = H256::zero();
        let mut size = self.deposit_count;

        for height in 0..DepositContractTreeDepth::USIZE {
            if size % 2 == 1 {
                node = hashing::hash_256_256(self.branch[height], node);
            } else {
                node = hashing::hash_256_256(node, ZERO_HASHES[height]);
            }

            size /= 2;
        }

        let mut length_chunk = H256::zero();
        length_chunk[..8].copy_from_slice(&self.deposit_count.to_le_bytes());
        hashing::hash_256_256(node, length_chunk)
    }
}

#[cfg(test)]
mod tests {
    use bls::PublicKeyBytes;
    use hex_literal::hex;

    use super::*;

    #[test]
    fn curve_order_matches_standard() {
        assert_eq!(
            BigUint::from_bytes_be(CURVE_ORDER).to_string(),
            "52435875175126190479447740508185965837690552500527637822603658699938581184513",
        );
    }

    // See the following:
    // - <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#test-vectors>
    // - <https://github.com/ethereum/eth2.0-pm/blob/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start/keygen_10_validators.yaml>
    #[test]
    fn keypairs_match_standard() {
        let expected_keypairs = [
            (
                hex!("25295f0d1d592a90b333e26e85149708208e9f8e8bc18f6c77bd62f8ad7a6866"),
                hex!("a99a76ed7796f7be22d5b7e85deeb7c5677e88e511e0b337618f8c4eb61349b4bf2d153f649f7b53359fe8b94a38e44c"),
            ),
            (
                hex!("51d0b65185db6989ab0b560d6deed19c7ead0e24b9b6372cbecb1f26bdfad000"),
                hex!("b89bebc699769726a318c8e9971bd3171297c61aea4a6578a7a4f94b547dcba5bac16a89108b6b6a1fe3695d1a874a0b"),
            ),
            (
                hex!("315ed405fafe339603932eebe8dbfd650ce5dafa561f6928664c75db85f97857"),
                hex!("a3a32b0f8b4ddb83f1a0a853d81dd725dfe577d4f4c3db8ece52ce2b026eca84815c1a7e8e92a4de3d755733bf7e4a9b"),
            ),
            (
                hex!("25b1166a43c109cb330af8945d364722757c65ed2bfed5444b5a2f057f82d391"),
                hex!("88c141df77cd9d8d7a71a75c826c41a9c9f03c6ee1b180f3e7852f6a280099ded351b58d66e653af8e42816a4d8f532e"),
            ),
        ];

        for ((sk_bytes, pk_bytes), validator_index) in expected_keypairs.into_iter().zip(0..) {
            let expected_secret_key: SecretKey = SecretKeyBytes::from(sk_bytes)
                .try_into()
                .expect("every secret key given in the standard should be valid");

            let actual_secret_key = secret_key(validator_index);

            assert_eq!(actual_secret_key, expected_secret_key);
            assert_eq!(
                actual_secret_key.to_public_key().to_bytes(),
                PublicKeyBytes::from(pk_bytes),
            );
        }
    }
}
