use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{DiagnosisResult, Plugin, RegistryError, RunContext};

/// Plugins indexed by name.
///
/// Names must be non-empty; a later plugin with the same name replaces an
/// earlier one.
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        let mut map = BTreeMap::new();
        for plugin in plugins {
            let name = plugin.name();
            if name.is_empty() {
                warn!("skipping plugin without a name");
                continue;
            }
            if map.insert(name, plugin).is_some() {
                warn!("plugin {} registered twice, keeping the last one", name);
            }
        }
        Self { plugins: map }
    }

    /// Registered plugins, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.values().map(Box::as_ref)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs the plugin registered as `name`.
    pub fn run(&self, name: &str, ctx: &RunContext) -> Result<DiagnosisResult, RegistryError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownPlugin(name.to_string()))?;
        debug!("running plugin {}", name);
        Ok(plugin.run(ctx)?)
    }
}
