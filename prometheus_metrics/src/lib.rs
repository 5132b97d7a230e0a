//! A Prometheus implementation of the state transition metrics sink.
//!
//! Serving the metrics over HTTP is the application's business; this crate
//! only defines and registers the collectors.

use anyhow::Result;
use prometheus::{histogram_opts, opts, Histogram, HistogramTimer, IntGauge, Registry};
use transition_functions::{metrics::TransitionMetrics, unphased::ValidatorSummary};
use types::phase0::primitives::{Epoch, Gwei};

pub struct Metrics {
    pub stfn_process_block_seconds: Histogram,
    pub stfn_epoch_transition_seconds: Histogram,
    pub stfn_process_slots_seconds: Histogram,
    pub stfn_elapsed_time_till_processed: Histogram,

    validator_count: IntGauge,
    slashed_validator_count: IntGauge,
    total_balance_gwei: IntGauge,
    total_effective_balance_gwei: IntGauge,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            stfn_process_block_seconds: Histogram::with_opts(histogram_opts!(
                "stfn_process_block_seconds",
                "Time spent processing a single block",
            ))?,
            stfn_epoch_transition_seconds: Histogram::with_opts(histogram_opts!(
                "stfn_epoch_transition_seconds",
                "Time spent running a single epoch transition",
            ))?,
            stfn_process_slots_seconds: Histogram::with_opts(histogram_opts!(
                "stfn_process_slots_seconds",
                "Time spent advancing a state to the slot of a block",
            ))?,
            stfn_elapsed_time_till_processed: Histogram::with_opts(histogram_opts!(
                "stfn_elapsed_time_till_processed",
                "Time from the start of a block's slot until the block was fully processed",
            ))?,
            validator_count: IntGauge::with_opts(opts!(
                "validator_count",
                "Number of validators in the registry",
            ))?,
            slashed_validator_count: IntGauge::with_opts(opts!(
                "slashed_validator_count",
                "Number of slashed validators in the registry",
            ))?,
            total_balance_gwei: IntGauge::with_opts(opts!(
                "total_balance_gwei",
                "Sum of all validator balances in Gwei",
            ))?,
            total_effective_balance_gwei: IntGauge::with_opts(opts!(
                "total_effective_balance_gwei",
                "Sum of all validator effective balances in Gwei",
            ))?,
        };

        registry.register(Box::new(metrics.stfn_process_block_seconds.clone()))?;
        registry.register(Box::new(metrics.stfn_epoch_transition_seconds.clone()))?;
        registry.register(Box::new(metrics.stfn_process_slots_seconds.clone()))?;
        registry.register(Box::new(metrics.stfn_elapsed_time_till_processed.clone()))?;
        registry.register(Box::new(metrics.validator_count.clone()))?;
        registry.register(Box::new(metrics.slashed_validator_count.clone()))?;
        registry.register(Box::new(metrics.total_balance_gwei.clone()))?;
        registry.register(Box::new(metrics.total_effective_balance_gwei.clone()))?;

        Ok(metrics)
    }
}

impl TransitionMetrics for Metrics {
    const IS_NULL: bool = false;

    type Timer = HistogramTimer;

    fn block_transition_timer(&self) -> Self::Timer {
        self.stfn_process_block_seconds.start_timer()
    }

    fn epoch_transition_timer(&self) -> Self::Timer {
        self.stfn_epoch_transition_seconds.start_timer()
    }

    fn slot_processing_timer(&self) -> Self::Timer {
        self.stfn_process_slots_seconds.start_timer()
    }

    fn observe_block_post_delay(&self, delay_seconds: f64) {
        self.stfn_elapsed_time_till_processed.observe(delay_seconds);
    }

    fn register_validator_statuses(
        &self,
        _epoch: Epoch,
        summaries: &[impl ValidatorSummary],
        balances: impl Iterator<Item = Gwei>,
    ) {
        let slashed = summaries
            .iter()
            .filter(|summary| summary.slashed())
            .count();

        let total_effective_balance = summaries
            .iter()
            .map(|summary| summary.effective_balance())
            .sum::<Gwei>();

        self.validator_count
            .set(saturating_gauge(summaries.len() as u64));
        self.slashed_validator_count
            .set(saturating_gauge(slashed as u64));
        self.total_balance_gwei
            .set(saturating_gauge(balances.sum::<Gwei>()));
        self.total_effective_balance_gwei
            .set(saturating_gauge(total_effective_balance));
    }
}

// `IntGauge` values are `i64`. Balances can theoretically exceed `i64::MAX`.
const fn saturating_gauge(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}
