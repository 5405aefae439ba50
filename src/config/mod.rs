//! Aggregate processor configuration.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. Type defaults
//! 2. File named by the `CONFIG_PATH` environment variable
//! 3. Environment variables prefixed with `AGGREGATE__`
//!
//! Loading never validates; callers run [`AggregateProcessorConfig::validate`]
//! once all overrides are applied.

mod action;
pub mod duration;
pub use action::*;


use std::env;
use std::time::Duration;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::DEFAULT_WINDOW_SECS;
use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Error;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateProcessorConfig {
    /// Event fields whose values identify a group
    #[serde(default)]
    pub group_by_keys: Vec<String>,

    /// Window length, measured from the first event of a group
    #[serde(default = "default_window", with = "duration")]
    pub window: Duration,

    #[serde(default)]
    pub action: ActionConfig,

    /// Hint for the forwarding layer; groups are always kept in-process here
    #[serde(default)]
    pub local_mode: bool,

    /// Emit gated-in input records alongside the aggregated output
    #[serde(default)]
    pub output_unaggregated_events: bool,

    /// Tag added to concluded events when unaggregated events are emitted too.
    /// Ignored while `output_unaggregated_events` is off.
    #[serde(default)]
    pub aggregated_events_tag: Option<String>,

    /// Gate expression; events it rejects bypass aggregation and are dropped
    #[serde(default)]
    pub when: Option<String>,
}

fn default_window() -> Duration {
    Duration::from_secs(DEFAULT_WINDOW_SECS)
}

impl Default for AggregateProcessorConfig {
    fn default() -> Self {
        Self {
            group_by_keys: Vec::new(),
            window: default_window(),
            action: ActionConfig::default(),
            local_mode: false,
            output_unaggregated_events: false,
            aggregated_events_tag: None,
            when: None,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("group_by_keys")
}

impl AggregateProcessorConfig {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment.
    ///
    /// # Example
    /// ```ignore
    /// std::env::set_var("AGGREGATE__GROUP_BY_KEYS", "user,host");
    /// std::env::set_var("AGGREGATE__ACTION__NAME", "count");
    /// let cfg = AggregateProcessorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(environment()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers another file, then the environment again, over this configuration.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Consumes the configuration and returns it if every rule holds.
    pub fn validate(self) -> Result<Self> {
        if self.group_by_keys.is_empty() {
            return Err(Error::config("group_by_keys must name at least one field"));
        }
        if let Some(blank) = self.group_by_keys.iter().find(|key| key.trim().is_empty()) {
            return Err(Error::config(format!("group_by_keys contains a blank field name: {blank:?}")));
        }
        if self.window.is_zero() {
            return Err(Error::config("window must be greater than zero"));
        }

        self.action.validate()?;

        if self.output_unaggregated_events
            && self.aggregated_events_tag.as_deref().map_or(true, |tag| tag.trim().is_empty())
        {
            return Err(Error::config(
                "aggregated_events_tag is required when output_unaggregated_events is enabled",
            ));
        }
        if !self.output_unaggregated_events && self.aggregated_events_tag.is_some() {
            warn!("aggregated_events_tag is ignored because output_unaggregated_events is disabled");
        }
        if let Some(when) = &self.when {
            if when.trim().is_empty() {
                return Err(Error::config("when expression cannot be empty"));
            }
        }
        Ok(self)
    }
}
