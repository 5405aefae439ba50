use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use super::AggregateAction;
use super::AppendAction;
use super::CountAction;
use super::HistogramAction;
use super::HistogramActionConfig;
use super::PercentSamplerAction;
use super::PercentSamplerActionConfig;
use super::PutAllAction;
use super::RateLimiterAction;
use super::RateLimiterActionConfig;
use super::RemoveDuplicatesAction;
use super::APPEND_ACTION;
use super::COUNT_ACTION;
use super::HISTOGRAM_ACTION;
use super::PERCENT_SAMPLER_ACTION;
use super::PUT_ALL_ACTION;
use super::RATE_LIMITER_ACTION;
use super::REMOVE_DUPLICATES_ACTION;
use crate::ActionConfig;
use crate::ActionError;
use crate::ActionResult;

/// Builds an action from its nested settings object.
pub type ActionConstructor =
    Arc<dyn Fn(&Map<String, Value>) -> ActionResult<Arc<dyn AggregateAction>> + Send + Sync + 'static>;

/// Name-keyed registry of action constructors.
#[derive(Clone, Default)]
pub struct ActionFactory {
    constructors: HashMap<String, ActionConstructor>,
}

impl ActionFactory {
    /// Empty factory with no actions registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory preloaded with every built-in action: `remove_duplicates`,
    /// `put_all`, `count`, `append`, `histogram`, `rate_limiter` and
    /// `percent_sampler`.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(REMOVE_DUPLICATES_ACTION, |_| {
            let action: Arc<dyn AggregateAction> = Arc::new(RemoveDuplicatesAction);
            Ok(action)
        });
        factory.register(PUT_ALL_ACTION, |_| {
            let action: Arc<dyn AggregateAction> = Arc::new(PutAllAction);
            Ok(action)
        });
        factory.register(COUNT_ACTION, |settings| {
            let action: Arc<dyn AggregateAction> = Arc::new(CountAction::new(bind_settings(COUNT_ACTION, settings)?));
            Ok(action)
        });
        factory.register(APPEND_ACTION, |settings| {
            let action: Arc<dyn AggregateAction> = Arc::new(AppendAction::new(bind_settings(APPEND_ACTION, settings)?));
            Ok(action)
        });
        factory.register(HISTOGRAM_ACTION, |settings| {
            let config: HistogramActionConfig = bind_settings(HISTOGRAM_ACTION, settings)?;
            config.validate()?;
            let action: Arc<dyn AggregateAction> = Arc::new(HistogramAction::new(config));
            Ok(action)
        });
        factory.register(RATE_LIMITER_ACTION, |settings| {
            let config: RateLimiterActionConfig = bind_settings(RATE_LIMITER_ACTION, settings)?;
            config.validate()?;
            let action: Arc<dyn AggregateAction> = Arc::new(RateLimiterAction::new(config));
            Ok(action)
        });
        factory.register(PERCENT_SAMPLER_ACTION, |settings| {
            let config: PercentSamplerActionConfig = bind_settings(PERCENT_SAMPLER_ACTION, settings)?;
            config.validate()?;
            let action: Arc<dyn AggregateAction> = Arc::new(PercentSamplerAction::new(config));
            Ok(action)
        });
        factory
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        constructor: F,
    ) -> &mut Self
    where
        F: Fn(&Map<String, Value>) -> ActionResult<Arc<dyn AggregateAction>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn create(
        &self,
        config: &ActionConfig,
    ) -> ActionResult<Arc<dyn AggregateAction>> {
        let constructor = self
            .constructors
            .get(&config.name)
            .ok_or_else(|| ActionError::UnknownAction(config.name.clone()))?;

        debug!(action = %config.name, "creating aggregate action");
        constructor(&config.settings)
    }
}

impl fmt::Debug for ActionFactory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ActionFactory").field("actions", &names).finish()
    }
}

/// Deserializes an action's settings object into its config type.
pub fn bind_settings<T: DeserializeOwned>(
    action: &str,
    settings: &Map<String, Value>,
) -> ActionResult<T> {
    serde_json::from_value(Value::Object(settings.clone())).map_err(|e| ActionError::InvalidSettings {
        action: action.to_string(),
        reason: e.to_string(),
    })
}
