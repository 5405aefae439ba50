//! Per-processor Prometheus collectors.


use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounter;
use prometheus::IntGauge;
use prometheus::Registry;
use prometheus::TextEncoder;

use crate::constants::CONCLUDE_DROPPED;
use crate::constants::CONCLUDE_OUT;
use crate::constants::CONCLUDE_PROCESSING_ERRORS;
use crate::constants::CURRENT_GROUP_COUNT;
use crate::constants::HANDLE_DROPPED;
use crate::constants::HANDLE_OUT;
use crate::constants::HANDLE_PROCESSING_ERRORS;
use crate::constants::RECORDS_IN;
use crate::constants::RECORDS_OUT;
use crate::constants::TIME_ELAPSED;
use crate::Error;
use crate::Result;

/// Collectors of one aggregate processor. Cloning shares the underlying series.
#[derive(Debug, Clone)]
pub struct AggregateMetrics {
    /// Events emitted by `handle_event`
    pub handle_out: IntCounter,
    /// Events `handle_event` dropped, gated-out events included
    pub handle_dropped: IntCounter,
    /// Events emitted by `conclude_group`
    pub conclude_out: IntCounter,
    /// Concluded groups that emitted nothing
    pub conclude_dropped: IntCounter,
    pub handle_processing_errors: IntCounter,
    pub conclude_processing_errors: IntCounter,
    /// Live groups in the registry
    pub current_group_count: IntGauge,
    pub records_in: IntCounter,
    pub records_out: IntCounter,
    /// Wall time spent per batch
    pub time_elapsed: Histogram,
}

impl AggregateMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            handle_out: IntCounter::new(HANDLE_OUT, "Events emitted while handling")?,
            handle_dropped: IntCounter::new(HANDLE_DROPPED, "Events dropped while handling")?,
            conclude_out: IntCounter::new(CONCLUDE_OUT, "Events emitted by concluded groups")?,
            conclude_dropped: IntCounter::new(CONCLUDE_DROPPED, "Concluded groups without output")?,
            handle_processing_errors: IntCounter::new(
                HANDLE_PROCESSING_ERRORS,
                "Action failures while handling an event",
            )?,
            conclude_processing_errors: IntCounter::new(
                CONCLUDE_PROCESSING_ERRORS,
                "Action failures while concluding a group",
            )?,
            current_group_count: IntGauge::new(CURRENT_GROUP_COUNT, "Groups currently held")?,
            records_in: IntCounter::new(RECORDS_IN, "Records received")?,
            records_out: IntCounter::new(RECORDS_OUT, "Records emitted")?,
            time_elapsed: Histogram::with_opts(
                HistogramOpts::new(TIME_ELAPSED, "Time spent executing a batch")
                    .buckets(exponential_buckets(0.0001, 2.0, 16)?),
            )?,
        })
    }

    /// Registers every collector into `registry`.
    pub fn register_custom_metrics(
        &self,
        registry: &Registry,
    ) -> Result<()> {
        registry.register(Box::new(self.handle_out.clone()))?;
        registry.register(Box::new(self.handle_dropped.clone()))?;
        registry.register(Box::new(self.conclude_out.clone()))?;
        registry.register(Box::new(self.conclude_dropped.clone()))?;
        registry.register(Box::new(self.handle_processing_errors.clone()))?;
        registry.register(Box::new(self.conclude_processing_errors.clone()))?;
        registry.register(Box::new(self.current_group_count.clone()))?;
        registry.register(Box::new(self.records_in.clone()))?;
        registry.register(Box::new(self.records_out.clone()))?;
        registry.register(Box::new(self.time_elapsed.clone()))?;
        Ok(())
    }
}

/// Renders the registry in the Prometheus text exposition format.
pub fn encode_metrics(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Fatal(format!("metrics are not valid utf-8: {e}")))
}
