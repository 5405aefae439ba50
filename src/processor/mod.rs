//! Engine entry point.
//!
//! Each call to [`AggregateProcessor::execute`] first sweeps the groups
//! whose window has elapsed, then routes every input event into its group.
//! Any number of pipeline threads may call `execute` at the same time.

mod builder;
pub use builder::*;


use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::Registry;
use tracing::debug;
use tracing::info;

use crate::AggregateAction;
use crate::AggregateMetrics;
use crate::AggregateProcessorConfig;
use crate::AggregateSynchronizer;
use crate::Event;
use crate::Gate;
use crate::GroupKeyBuilder;
use crate::GroupRegistry;
use crate::Record;
use crate::Result;

/// Shutdown progress of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Groups conclude when their window elapses
    Running,
    /// Every sweep concludes all groups
    Draining,
    /// No groups are left
    Ready,
}

pub struct AggregateProcessor {
    config: AggregateProcessorConfig,
    key_builder: GroupKeyBuilder,
    registry: Arc<GroupRegistry>,
    synchronizer: AggregateSynchronizer,
    holds_events: bool,
    gate: Option<Gate>,
    metrics: AggregateMetrics,
    metrics_registry: Registry,
    shutdown_state: RwLock<ShutdownState>,
}

impl AggregateProcessor {
    fn new(
        config: AggregateProcessorConfig,
        action: Arc<dyn AggregateAction>,
        gate: Option<Gate>,
        metrics: AggregateMetrics,
        metrics_registry: Registry,
    ) -> Self {
        let registry = Arc::new(GroupRegistry::new());
        let holds_events = action.holds_events();
        let synchronizer = AggregateSynchronizer::new(action, registry.clone(), metrics.clone(), config.window);

        Self {
            key_builder: GroupKeyBuilder::new(config.group_by_keys.clone()),
            config,
            registry,
            synchronizer,
            holds_events,
            gate,
            metrics,
            metrics_registry,
            shutdown_state: RwLock::new(ShutdownState::Running),
        }
    }

    pub fn builder(config: AggregateProcessorConfig) -> AggregateProcessorBuilder {
        AggregateProcessorBuilder::new(config)
    }

    /// Processes one batch.
    ///
    /// The output holds the events of groups concluded by this call's sweep,
    /// followed by the events forwarded while handling `records`. A gate
    /// evaluation failure aborts the batch before any group is touched.
    pub fn execute(
        &self,
        records: Vec<Record>,
    ) -> Result<Vec<Record>> {
        let timer = self.metrics.time_elapsed.start_timer();
        self.metrics.records_in.inc_by(records.len() as u64);

        let admitted = self.evaluate_gates(&records)?;

        let mut records_out = self.sweep();

        let mut handle_out = 0;
        let mut handle_dropped = 0;
        for (record, admitted) in records.into_iter().zip(admitted) {
            let (event, metadata) = record.into_parts();
            if !admitted {
                handle_dropped += 1;
                self.release_dropped(&event);
                continue;
            }

            let key = self.key_builder.build(&event);
            let group = self.registry.get_or_create(&key);
            let response = self.synchronizer.handle_event(&event, &key, group);

            if self.config.output_unaggregated_events {
                handle_out += 1;
                records_out.push(Record::with_metadata(event, metadata));
                continue;
            }
            match response.into_event() {
                Some(forwarded) => {
                    handle_out += 1;
                    records_out.push(Record::with_metadata(forwarded, metadata));
                }
                None => {
                    handle_dropped += 1;
                    self.release_dropped(&event);
                }
            }
        }

        self.metrics.handle_out.inc_by(handle_out);
        self.metrics.handle_dropped.inc_by(handle_dropped);
        self.metrics.current_group_count.set(self.registry.size() as i64);
        self.metrics.records_out.inc_by(records_out.len() as u64);
        timer.observe_duration();

        Ok(records_out)
    }

    fn evaluate_gates(
        &self,
        records: &[Record],
    ) -> Result<Vec<bool>> {
        match &self.gate {
            Some(gate) => records.iter().map(|record| gate.admits(record.event())).collect(),
            None => Ok(vec![true; records.len()]),
        }
    }

    /// Concludes every due group, or every group once shutdown was requested.
    fn sweep(&self) -> Vec<Record> {
        let force_conclude = self.shutdown_state() != ShutdownState::Running;
        let due = self.registry.due_for_conclusion(self.config.window, force_conclude);
        if !due.is_empty() {
            debug!(groups = due.len(), force_conclude, "concluding groups");
        }

        let mut records_out = Vec::new();
        for (key, group) in due {
            let output = self.synchronizer.conclude(&key, &group, force_conclude);
            if output.is_empty() {
                self.metrics.conclude_dropped.inc();
                continue;
            }
            for mut event in output.into_events() {
                if let Some(tag) = self.aggregated_events_tag() {
                    event.add_tags([tag]);
                }
                self.metrics.conclude_out.inc();
                records_out.push(Record::new(event));
            }
        }
        records_out
    }

    fn aggregated_events_tag(&self) -> Option<&str> {
        if self.config.output_unaggregated_events {
            self.config.aggregated_events_tag.as_deref()
        } else {
            None
        }
    }

    /// Acknowledges an input the engine lets go of, unless the action keeps it.
    fn release_dropped(
        &self,
        event: &Event,
    ) {
        if self.holds_events {
            return;
        }
        if let Some(handle) = event.event_handle() {
            handle.release(true);
        }
    }

    /// Switches every future sweep to force-conclude all groups.
    pub fn prepare_for_shutdown(&self) {
        let mut state = self.shutdown_state.write();
        if *state == ShutdownState::Running {
            info!(groups = self.registry.size(), "draining aggregate groups");
            *state = ShutdownState::Draining;
        }
    }

    /// True once no group is left. A draining processor becomes ready here.
    pub fn is_ready_for_shutdown(&self) -> bool {
        if !self.registry.is_empty() {
            return false;
        }
        let mut state = self.shutdown_state.write();
        if *state == ShutdownState::Draining {
            *state = ShutdownState::Ready;
        }
        true
    }

    /// Acknowledges the final shutdown. Groups are drained by then.
    pub fn shutdown(&self) {
        info!(state = ?self.shutdown_state(), "aggregate processor shut down");
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        *self.shutdown_state.read()
    }

    /// Group-by fields, for the forwarding layer
    pub fn identification_keys(&self) -> &[String] {
        self.key_builder.fields()
    }

    pub fn is_local_mode(&self) -> bool {
        self.config.local_mode
    }

    pub fn config(&self) -> &AggregateProcessorConfig {
        &self.config
    }

    pub fn group_count(&self) -> usize {
        self.registry.size()
    }

    pub fn metrics(&self) -> &AggregateMetrics {
        &self.metrics
    }

    pub fn metrics_registry(&self) -> &Registry {
        &self.metrics_registry
    }
}
