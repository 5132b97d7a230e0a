pub mod combined;
pub mod metrics;

pub mod unphased {
    pub use block_processing::{
        validate_attestation, validate_attester_slashing, validate_attester_slashing_with_verifier,
        validate_proposer_slashing, validate_proposer_slashing_with_verifier,
        validate_voluntary_exit,
    };
    pub use epoch_intermediates::{EpochDeltas, ValidatorSummary};
    pub use slot_processing::process_slot;
    pub use state_transition::StateRootPolicy;

    pub(crate) use block_processing::{
        process_block_header, process_block_header_for_gossip, process_eth1_data, process_randao,
        process_voluntary_exit, validate_attestation_with_verifier, validate_deposits,
        CombinedDeposit,
    };
    pub(crate) use slot_processing::process_slots_with;
    pub(crate) use epoch_processing::{
        process_effective_balance_updates, process_eth1_data_reset,
        process_historical_roots_update, process_randao_mixes_reset, process_registry_updates,
        process_rewards_and_penalties, process_slashings, process_slashings_reset,
        should_process_justification_and_finalization, validate_storage_mode,
        weigh_justification_and_finalization,
    };
    pub(crate) use error::Error;

    mod block_processing;
    mod epoch_intermediates;
    mod epoch_processing;
    mod error;
    mod slot_processing;
    mod state_transition;
}

pub mod phase0 {
    pub use epoch_intermediates::{
        statistics, Performance, Phase0ValidatorSummary as ValidatorSummary, Statistics,
    };

    pub(crate) use block_processing::{
        count_required_signatures, process_block, process_block_for_gossip, process_deposit_data,
    };
    pub(crate) use epoch_processing::process_epoch;
    pub(crate) use slot_processing::process_slots;
    pub(crate) use state_transition::{state_transition, verify_signatures};

    mod block_processing;
    mod epoch_intermediates;
    mod epoch_processing;
    mod slot_processing;
    mod state_transition;
}

pub mod altair {
    pub use epoch_intermediates::{
        statistics, AltairValidatorSummary as ValidatorSummary, Statistics,
    };

    pub(crate) use block_processing::{
        apply_attestation, apply_deposits, count_required_signatures, process_block,
        process_block_for_gossip, process_deposit_data, process_sync_aggregate,
        verify_sync_aggregate_signature,
    };
    pub(crate) use epoch_intermediates::epoch_deltas;
    pub(crate) use epoch_processing::{
        process_epoch, process_inactivity_updates, process_justification_and_finalization,
        process_participation_flag_updates, process_sync_committee_updates,
    };
    pub(crate) use slot_processing::process_slots;
    pub(crate) use state_transition::{state_transition, verify_signatures};

    mod block_processing;
    mod epoch_intermediates;
    mod epoch_processing;
    mod slot_processing;
    mod state_transition;
}

pub(crate) mod bellatrix {
    pub use block_processing::{process_block, process_block_for_gossip};
    pub use epoch_processing::process_epoch;
    pub use slot_processing::process_slots;
    pub use state_transition::{state_transition, verify_signatures};

    mod block_processing;
    mod epoch_processing;
    mod slot_processing;
    mod state_transition;
}
