use std::error::Error as _;
use std::time::Duration;

use crate::config::Config;
use crate::consolidate::consolidate;
use crate::data_store::{self, DataError};
use crate::engine::{EngineError, SearchEngine};
use crate::executor::{QueryExecutor, QueryLimits};
use crate::invocation::{InvocationOutcome, QueryInvocation, ResultSink};
use crate::model::{ActionDescriptor, ActionEffect, ResultItem};
use crate::plugin::{LauncherPlugin, PluginError, PluginMetadata};
use crate::presenter::{to_items, IconLookup, Platform, UNKNOWN_ICON};

pub const PLUGIN_ID: &str = "recoll";
pub const ERROR_ITEM_TEXT: &str = "Something went wrong! Press [ENTER] to copy error and report it";

pub struct RecollPlugin<E> {
    metadata: PluginMetadata,
    config: Config,
    executor: QueryExecutor<E>,
    icons: Box<dyn IconLookup>,
    platform: Platform,
}

impl<E: SearchEngine> RecollPlugin<E> {
    pub fn new(config: Config, engine: E, icons: Box<dyn IconLookup>) -> Self {
        Self::with_platform(config, engine, icons, Platform::current())
    }

    pub fn with_platform(
        config: Config,
        engine: E,
        icons: Box<dyn IconLookup>,
        platform: Platform,
    ) -> Self {
        let metadata = PluginMetadata {
            id: PLUGIN_ID.to_string(),
            name: "Recoll".to_string(),
            description: "Full-text document search through the Recoll index".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            authors: env!("CARGO_PKG_AUTHORS")
                .split(':')
                .filter(|author| !author.is_empty())
                .map(str::to_string)
                .collect(),
            homepage: env!("CARGO_PKG_HOMEPAGE").to_string(),
            trigger: config.trigger.clone(),
            disable_sort: true,
        };
        let executor = QueryExecutor::new(engine, QueryLimits::from(&config));
        Self {
            metadata,
            config,
            executor,
            icons,
            platform,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Persist a small value in the plugin's data directory.
    pub fn save_data(&self, name: &str, data: &str) -> Result<(), DataError> {
        data_store::save_data(&self.config.data_dir, name, data)
    }

    pub fn load_data(&self, name: &str) -> Result<String, DataError> {
        data_store::load_data(&self.config.data_dir, name)
    }

    fn error_item(&self, error: &EngineError) -> ResultItem {
        let target = self
            .metadata
            .homepage
            .split_once("://")
            .map(|(_, rest)| rest)
            .filter(|rest| !rest.is_empty())
            .unwrap_or("the plugin maintainers");
        ResultItem {
            id: PLUGIN_ID.to_string(),
            icon: self
                .icons
                .lookup("dialog-error")
                .or_else(|| self.icons.lookup(UNKNOWN_ICON))
                .unwrap_or_else(|| UNKNOWN_ICON.to_string()),
            text: ERROR_ITEM_TEXT.to_string(),
            subtext: error.to_string(),
            completion: String::new(),
            actions: vec![ActionDescriptor::new(
                &format!("Copy error - report it to {target}"),
                ActionEffect::CopyText {
                    text: error_report(error),
                },
            )],
        }
    }
}

impl<E: SearchEngine> LauncherPlugin for RecollPlugin<E> {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn initialize(&self) -> Result<(), PluginError> {
        for dir in self.config.plugin_dirs() {
            std::fs::create_dir_all(dir).map_err(|source| PluginError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn finalize(&self) {
        tracing::debug!(plugin = PLUGIN_ID, "plugin finalized");
    }

    fn setup(&self, _query: &str) -> Option<Vec<ResultItem>> {
        let dir = self.config.recoll_config_dir.as_ref()?;
        if dir.is_dir() {
            return None;
        }
        let shown = dir.to_string_lossy().into_owned();
        Some(vec![ResultItem {
            id: format!("{PLUGIN_ID}:setup"),
            icon: self
                .icons
                .lookup(UNKNOWN_ICON)
                .unwrap_or_else(|| UNKNOWN_ICON.to_string()),
            text: "Recoll configuration directory not found".to_string(),
            subtext: shown.clone(),
            completion: String::new(),
            actions: vec![ActionDescriptor::new(
                "Copy path to clipboard",
                ActionEffect::CopyText { text: shown },
            )],
        }])
    }

    fn handle_query(
        &self,
        mut invocation: QueryInvocation,
        sink: &mut dyn ResultSink,
    ) -> Result<InvocationOutcome, PluginError> {
        if !self.metadata.trigger.is_empty() && !invocation.is_triggered() {
            return Ok(invocation.publish(Vec::new(), sink));
        }

        if let Some(items) = self.setup(invocation.query()) {
            return Ok(invocation.publish(items, sink));
        }

        let delay = Duration::from_millis(self.config.debounce_ms);
        if !invocation.debounce(delay) {
            return Ok(InvocationOutcome::Abandoned);
        }

        let docs = match self.executor.execute(invocation.query()) {
            Ok(docs) => docs,
            Err(error) if self.config.dev_mode => {
                invocation.abandon();
                return Err(PluginError::Engine(error));
            }
            Err(error) => {
                tracing::error!(invocation = invocation.id(), %error, "recoll query failed");
                let item = self.error_item(&error);
                return Ok(invocation.publish(vec![item], sink));
            }
        };

        if !invocation.checkpoint() {
            return Ok(InvocationOutcome::Abandoned);
        }

        let fetched = docs.len();
        let docs = if self.config.remove_duplicates {
            consolidate(docs)
        } else {
            docs
        };
        let items = to_items(&docs, self.platform, self.icons.as_ref());
        tracing::debug!(
            invocation = invocation.id(),
            fetched,
            kept = docs.len(),
            items = items.len(),
            "recoll results ready"
        );
        Ok(invocation.publish(items, sink))
    }
}

/// Error text plus its source chain, one cause per line.
fn error_report(error: &EngineError) -> String {
    let mut report = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        report.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    report
}
