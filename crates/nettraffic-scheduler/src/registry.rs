use crate::error::{Result, SchedulerError};
use crate::framework::ScorePlugin;
use crate::network_traffic::{self, NetworkTraffic};
use std::collections::BTreeMap;
use tracing::debug;

/// Builds a plugin from its raw profile arguments
pub type PluginFactory = fn(serde_json::Value) -> Result<Box<dyn ScorePlugin>>;

/// Plugin name to factory map
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, PluginFactory>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, failing if the name is taken
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(SchedulerError::DuplicatePlugin { name });
        }
        debug!("Registered plugin {}", name);
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Builder-style `register`, with the same duplicate check
    pub fn with_plugin(mut self, name: impl Into<String>, factory: PluginFactory) -> Result<Self> {
        self.register(name, factory)?;
        Ok(self)
    }

    /// Registered plugin names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the plugin registered under `name`
    pub fn instantiate(&self, name: &str, args: serde_json::Value) -> Result<Box<dyn ScorePlugin>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownPlugin {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(args)
    }
}

/// Registry with every plugin this crate ships
pub fn default_registry() -> Result<Registry> {
    Registry::new().with_plugin(network_traffic::NAME, NetworkTraffic::factory)
}
