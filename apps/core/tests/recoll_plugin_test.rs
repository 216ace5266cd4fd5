use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use recoll_launcher::config::Config;
use recoll_launcher::engine::{EngineError, EngineSession, SearchEngine};
use recoll_launcher::invocation::{InvocationHandle, InvocationOutcome, QueryInvocation};
use recoll_launcher::model::{ActionEffect, DocumentRecord, ResultItem};
use recoll_launcher::plugin::{LauncherPlugin, PluginError, PluginRegistry};
use recoll_launcher::presenter::{IconLookup, Platform};
use recoll_launcher::recoll_plugin::{RecollPlugin, ERROR_ITEM_TEXT, PLUGIN_ID};

struct NoIcons;

impl IconLookup for NoIcons {
    fn lookup(&self, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct FakeEngine {
    docs: Vec<DocumentRecord>,
    unavailable: bool,
    connects: AtomicUsize,
    /// Invalidated while the query runs, as if the user kept typing.
    supersede_on_execute: Mutex<Option<InvocationHandle>>,
}

struct FakeSession<'a> {
    engine: &'a FakeEngine,
    rows: VecDeque<DocumentRecord>,
}

impl SearchEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn connect(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(EngineError::Unavailable("index locked".into()));
        }
        Ok(Box::new(FakeSession {
            engine: self,
            rows: VecDeque::new(),
        }))
    }
}

impl EngineSession for FakeSession<'_> {
    fn set_abstract_params(&mut self, _max_chars: usize, _context_words: usize) {}

    fn execute(&mut self, _query: &str) -> Result<usize, EngineError> {
        if let Some(handle) = self.engine.supersede_on_execute.lock().unwrap().take() {
            handle.invalidate();
        }
        self.rows = self.engine.docs.iter().cloned().collect();
        Ok(self.rows.len())
    }

    fn fetch_next(&mut self) -> Result<Option<DocumentRecord>, EngineError> {
        Ok(self.rows.pop_front())
    }
}

fn epub_chapters() -> Vec<DocumentRecord> {
    vec![
        DocumentRecord::new("file:///books/a.epub#1", "a.epub", Some("application/epub+zip"), "40%")
            .with_ipath("1"),
        DocumentRecord::new("file:///books/a.epub#2", "a.epub", Some("application/epub+zip"), "85%")
            .with_ipath("2"),
        DocumentRecord::new("http://example.com/x", "x", Some("text/html"), "70%"),
        DocumentRecord::new("file:///notes/todo.md", "todo.md", Some("text/markdown"), "30%"),
    ]
}

fn config_in(root: &Path) -> Config {
    Config {
        config_dir: root.join("config"),
        cache_dir: root.join("cache"),
        data_dir: root.join("data"),
        config_path: root.join("config").join("config.toml"),
        ..Config::default()
    }
}

fn plugin(config: Config, engine: &Arc<FakeEngine>) -> RecollPlugin<Arc<FakeEngine>> {
    RecollPlugin::with_platform(config, Arc::clone(engine), Box::new(NoIcons), Platform::Linux)
}

fn run(plugin: &dyn LauncherPlugin, query: &str) -> (Result<InvocationOutcome, PluginError>, Vec<ResultItem>) {
    let mut items = Vec::new();
    let outcome = plugin.handle_query(QueryInvocation::new(query), &mut items);
    (outcome, items)
}

#[test]
fn duplicates_are_merged_and_web_hits_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        docs: epub_chapters(),
        ..Default::default()
    });
    let plugin = plugin(config_in(dir.path()), &engine);

    let (outcome, items) = run(&plugin, "whale");

    assert_eq!(outcome.unwrap(), InvocationOutcome::Completed { published: 2 });
    assert_eq!(items[0].id, "recoll:file:///books/a.epub#2");
    assert_eq!(items[1].subtext, "/notes");
}

#[test]
fn duplicates_survive_when_merging_is_off() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        docs: epub_chapters(),
        ..Default::default()
    });
    let config = Config {
        remove_duplicates: false,
        ..config_in(dir.path())
    };

    let (_, items) = run(&plugin(config, &engine), "whale");

    assert_eq!(items.len(), 3);
}

#[test]
fn production_failure_becomes_a_single_error_item() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        unavailable: true,
        ..Default::default()
    });
    let plugin = plugin(config_in(dir.path()), &engine);

    let (outcome, items) = run(&plugin, "whale");

    assert_eq!(outcome.unwrap(), InvocationOutcome::Completed { published: 1 });
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, ERROR_ITEM_TEXT);
    assert_eq!(items[0].actions.len(), 1);
    assert_eq!(
        items[0].actions[0].label,
        "Copy error - report it to github.com/gerardsimons/recoll-albert"
    );
    match &items[0].actions[0].effect {
        ActionEffect::CopyText { text } => assert!(text.contains("index locked")),
        other => panic!("expected copy action, got {other:?}"),
    }
}

#[test]
fn dev_mode_failure_is_returned_to_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        unavailable: true,
        ..Default::default()
    });
    let config = Config {
        dev_mode: true,
        ..config_in(dir.path())
    };

    let (outcome, items) = run(&plugin(config, &engine), "whale");

    assert!(matches!(
        outcome,
        Err(PluginError::Engine(EngineError::Unavailable(_)))
    ));
    assert!(items.is_empty());
}

#[test]
fn superseded_during_the_engine_call_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        docs: epub_chapters(),
        ..Default::default()
    });
    let plugin = plugin(config_in(dir.path()), &engine);
    let invocation = QueryInvocation::new("whale");
    *engine.supersede_on_execute.lock().unwrap() = Some(invocation.handle());

    let mut items = Vec::new();
    let outcome = plugin.handle_query(invocation, &mut items).unwrap();

    assert_eq!(outcome, InvocationOutcome::Abandoned);
    assert!(items.is_empty());
    assert_eq!(engine.connects.load(Ordering::SeqCst), 1);
}

#[test]
fn stale_before_the_engine_call_skips_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        docs: epub_chapters(),
        ..Default::default()
    });
    let plugin = plugin(config_in(dir.path()), &engine);
    let invocation = QueryInvocation::new("whale");
    invocation.handle().invalidate();

    let mut items = Vec::new();
    let outcome = plugin.handle_query(invocation, &mut items).unwrap();

    assert_eq!(outcome, InvocationOutcome::Abandoned);
    assert_eq!(engine.connects.load(Ordering::SeqCst), 0);
}

#[test]
fn trigger_routes_only_prefixed_input() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        docs: epub_chapters(),
        ..Default::default()
    });
    let config = Config {
        trigger: "rc ".to_string(),
        ..config_in(dir.path())
    };
    let mut registry = PluginRegistry::default();
    registry.register(Box::new(plugin(config, &engine))).unwrap();

    let mut items = Vec::new();
    for (plugin, invocation) in registry.dispatch("whale") {
        let outcome = plugin.handle_query(invocation, &mut items).unwrap();
        assert_eq!(outcome, InvocationOutcome::Completed { published: 0 });
    }
    assert_eq!(engine.connects.load(Ordering::SeqCst), 0);

    for (plugin, invocation) in registry.dispatch("rc whale") {
        assert_eq!(invocation.query(), "whale");
        plugin.handle_query(invocation, &mut items).unwrap();
    }
    assert_eq!(items.len(), 2);
}

#[test]
fn missing_recoll_config_asks_for_setup() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let config = Config {
        recoll_config_dir: Some(dir.path().join("no-such-recoll")),
        ..config_in(dir.path())
    };

    let (outcome, items) = run(&plugin(config, &engine), "whale");

    assert_eq!(outcome.unwrap(), InvocationOutcome::Completed { published: 1 });
    assert!(items[0].subtext.ends_with("no-such-recoll"));
    assert_eq!(engine.connects.load(Ordering::SeqCst), 0);
}

#[test]
fn initialize_creates_plugin_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let plugin = plugin(config.clone(), &Arc::new(FakeEngine::default()));

    plugin.initialize().unwrap();

    assert!(config.config_dir.is_dir());
    assert!(config.cache_dir.is_dir());
    assert!(config.data_dir.is_dir());
}

#[test]
fn metadata_disables_host_sorting() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin(config_in(dir.path()), &Arc::new(FakeEngine::default()));

    assert_eq!(plugin.metadata().id, PLUGIN_ID);
    assert!(plugin.metadata().disable_sort);
    assert_eq!(plugin.metadata().version, env!("CARGO_PKG_VERSION"));
    assert_eq!(plugin.metadata().authors, vec!["Gerard Simons".to_string()]);
}
