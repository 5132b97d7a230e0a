use ssz::SszHash as _;
use std_ext::DefaultExt as _;

use crate::{
    bellatrix::containers::{ExecutionPayload, ExecutionPayloadHeader},
    preset::Preset,
};

impl<P: Preset> From<&ExecutionPayload<P>> for ExecutionPayloadHeader<P> {
    fn from(payload: &ExecutionPayload<P>) -> Self {
        let ExecutionPayload {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            ref logs_bloom,
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            ref extra_data,
            base_fee_per_gas,
            block_hash,
            ref transactions,
        } = *payload;

        let transactions_root = transactions.hash_tree_root();

        Self {
            parent_hash,
            fee_recipient,
            state_root,
            receipts_root,
            logs_bloom: logs_bloom.clone(),
            prev_randao,
            block_number,
            gas_limit,
            gas_used,
            timestamp,
            extra_data: extra_data.clone(),
            base_fee_per_gas,
            block_hash,
            transactions_root,
        }
    }
}

impl<P: Preset> ExecutionPayload<P> {
    /// `is_merge_transition_complete` and `is_execution_enabled` compare
    /// payloads against the default value.
    #[must_use]
    pub fn is_default_payload(&self) -> bool {
        self.is_default()
    }
}

impl<P: Preset> ExecutionPayloadHeader<P> {
    #[must_use]
    pub fn is_default_payload(&self) -> bool {
        self.is_default()
    }
}
