//! Plugin registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugin::IntegrationPlugin;
use crate::sheets::GoogleSheetsPlugin;
use crate::slack::SlackPlugin;
use crate::webhook::WebhookPlugin;

/// Id → plugin map
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn IntegrationPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugin set
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GoogleSheetsPlugin));
        registry.register(Arc::new(SlackPlugin));
        registry.register(Arc::new(WebhookPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn IntegrationPlugin>) {
        self.plugins.insert(plugin.metadata().id, plugin);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn IntegrationPlugin>> {
        self.plugins.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
