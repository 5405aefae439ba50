//! Assembles an [`AggregateProcessor`] from its configuration and collaborators.
//!
//! ## Example
//! ```ignore
//! let config = AggregateProcessorConfig::new()?.validate()?;
//! let processor = AggregateProcessorBuilder::new(config)
//!     .expression_evaluator(Arc::new(my_evaluator))   // required when `when` is set
//!     .metrics_registry(registry.clone())
//!     .build()?;
//! ```
//!
//! Unless overridden, the action is resolved by name through
//! [`ActionFactory::with_builtins`] and metrics go to a private registry.

use std::sync::Arc;

use prometheus::Registry;
use tracing::info;

use super::AggregateProcessor;
use crate::ActionFactory;
use crate::AggregateAction;
use crate::AggregateMetrics;
use crate::AggregateProcessorConfig;
use crate::Error;
use crate::ExpressionEvaluator;
use crate::Gate;
use crate::Result;

pub struct AggregateProcessorBuilder {
    config: AggregateProcessorConfig,
    action_factory: Option<ActionFactory>,
    action: Option<Arc<dyn AggregateAction>>,
    expression_evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    metrics_registry: Option<Registry>,
}

impl AggregateProcessorBuilder {
    pub fn new(config: AggregateProcessorConfig) -> Self {
        Self {
            config,
            action_factory: None,
            action: None,
            expression_evaluator: None,
            metrics_registry: None,
        }
    }

    /// Factory used to resolve `action.name`
    pub fn action_factory(
        mut self,
        action_factory: ActionFactory,
    ) -> Self {
        self.action_factory = Some(action_factory);
        self
    }

    /// Uses `action` as is, bypassing the factory
    pub fn action(
        mut self,
        action: Arc<dyn AggregateAction>,
    ) -> Self {
        self.action = Some(action);
        self
    }

    pub fn expression_evaluator(
        mut self,
        expression_evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> Self {
        self.expression_evaluator = Some(expression_evaluator);
        self
    }

    /// Registry the processor's collectors are registered into
    pub fn metrics_registry(
        mut self,
        registry: Registry,
    ) -> Self {
        self.metrics_registry = Some(registry);
        self
    }

    /// Validates the configuration and wires the processor.
    pub fn build(self) -> Result<AggregateProcessor> {
        let config = self.config.validate()?;

        let action = match self.action {
            Some(action) => action,
            None => self
                .action_factory
                .unwrap_or_else(ActionFactory::with_builtins)
                .create(&config.action)?,
        };

        let gate = match (&config.when, self.expression_evaluator) {
            (Some(when), Some(evaluator)) => Some(Gate::new(when.clone(), evaluator)?),
            (Some(when), None) => {
                return Err(Error::config(format!(
                    "when expression {when:?} requires an expression evaluator"
                )));
            }
            (None, _) => None,
        };

        let metrics = AggregateMetrics::new()?;
        let registry = self.metrics_registry.unwrap_or_default();
        metrics.register_custom_metrics(&registry)?;

        info!(
            action = %config.action.name,
            group_by_keys = ?config.group_by_keys,
            window = ?config.window,
            "aggregate processor created"
        );
        Ok(AggregateProcessor::new(config, action, gate, metrics, registry))
    }
}
