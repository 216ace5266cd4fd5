use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;
use crate::invocation::{InvocationOutcome, QueryInvocation, ResultSink};
use crate::model::ResultItem;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to prepare '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub authors: Vec<String>,
    pub homepage: String,
    /// Prefix that routes input to this plugin; empty answers every query.
    pub trigger: String,
    /// Results arrive in a meaningful order and must not be re-sorted.
    pub disable_sort: bool,
}

/// The capability set a launcher host drives.
pub trait LauncherPlugin: Send + Sync {
    fn metadata(&self) -> &PluginMetadata;

    fn initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn finalize(&self) {}

    /// Items asking the user for missing setup, shown instead of query results.
    fn setup(&self, _query: &str) -> Option<Vec<ResultItem>> {
        None
    }

    fn handle_query(
        &self,
        invocation: QueryInvocation,
        sink: &mut dyn ResultSink,
    ) -> Result<InvocationOutcome, PluginError>;
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LauncherPlugin>>,
}

impl PluginRegistry {
    pub fn register(&mut self, plugin: Box<dyn LauncherPlugin>) -> Result<(), PluginError> {
        let id = plugin.metadata().id.trim().to_string();
        if self.plugins.iter().any(|p| p.metadata().id == id) {
            return Err(PluginError::DuplicatePlugin(id));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn LauncherPlugin> {
        self.plugins
            .iter()
            .find(|p| p.metadata().id == id)
            .map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn initialize_all(&self) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            plugin.initialize()?;
            tracing::info!(plugin = %plugin.metadata().id, "plugin initialized");
        }
        Ok(())
    }

    pub fn finalize_all(&self) {
        for plugin in self.plugins.iter().rev() {
            plugin.finalize();
        }
    }

    /// One invocation per plugin for `raw_input`.
    ///
    /// A plugin whose trigger prefixes the input receives the remainder as a
    /// triggered query; the rest see the raw input untriggered.
    pub fn dispatch(&self, raw_input: &str) -> Vec<(&dyn LauncherPlugin, QueryInvocation)> {
        self.plugins
            .iter()
            .map(|plugin| {
                let trigger = plugin.metadata().trigger.as_str();
                let invocation = if trigger.is_empty() {
                    QueryInvocation::new(raw_input)
                } else if let Some(rest) = raw_input.strip_prefix(trigger) {
                    QueryInvocation::new(rest)
                } else {
                    QueryInvocation::with_trigger_state(raw_input, false)
                };
                (plugin.as_ref(), invocation)
            })
            .collect()
    }
}
