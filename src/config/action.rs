use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Result;

/// Which aggregate action to run and its settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Name the action is registered under in the [`crate::ActionFactory`]
    #[serde(default)]
    pub name: String,

    /// Free-form settings bound to the action's own config type
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl ActionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Map::new(),
        }
    }

    pub fn with_setting(
        mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("action.name is required"));
        }
        Ok(())
    }
}
