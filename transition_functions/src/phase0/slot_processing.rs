use anyhow::Result;
use ssz::Hc;
use types::{
    config::Config,
    phase0::{beacon_state::BeaconState, primitives::Slot},
    preset::Preset,
};

use super::epoch_processing;
use crate::{metrics::TransitionMetrics, unphased};

pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut Hc<BeaconState<P>>,
    slot: Slot,
    metrics: &impl TransitionMetrics,
) -> Result<()> {
    unphased::process_slots_with(state, slot, |state| {
        epoch_processing::process_epoch(config, state, metrics)
    })
}
