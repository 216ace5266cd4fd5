use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{mpsc, Mutex};

use clap::Parser;
use thiserror::Error;

use crate::config::{self, Config, ConfigError};
use crate::contract::HostRequest;
use crate::invocation::{InvocationHandle, InvocationOutcome, QueryInvocation, ResultSink};
use crate::model::ResultItem;
use crate::plugin::{LauncherPlugin, PluginError, PluginRegistry};
use crate::presenter::{Platform, ThemeIconLookup};
use crate::recoll_plugin::RecollPlugin;
use crate::recollq::RecollqEngine;
use crate::transport::{self, ActivationTable, ErrorCode, TransportResponse};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("result encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("query worker stopped unexpectedly")]
    WorkerGone,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "recoll-launcher", version, about = "Recoll search plugin for launchers")]
pub struct RuntimeOptions {
    /// Config file to use instead of the default location.
    #[arg(long, env = "RECOLL_LAUNCHER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Run one query, print the items as JSON and exit.
    #[arg(long)]
    pub query: Option<String>,
    /// Let engine failures stop the plugin instead of showing an error row.
    #[arg(long)]
    pub dev: bool,
    #[arg(long, short)]
    pub verbose: bool,
}

pub fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let mut config = config::load(options.config.as_deref())?;
    if !config.config_path.exists() {
        config::save(&config)?;
    }
    if options.dev {
        config.dev_mode = true;
    }
    config::validate(&config)?;

    if let Err(error) = crate::logging::init(&config.logs_dir(), options.verbose) {
        eprintln!("[recoll-launcher] logging disabled: {error}");
    }
    tracing::info!(
        config_path = %config.config_path.display(),
        dev_mode = config.dev_mode,
        remove_duplicates = config.remove_duplicates,
        max_results = config.max_results,
        "startup"
    );

    let registry = build_registry(config)?;
    registry.initialize_all()?;

    let result = match options.query {
        Some(query) => run_once(&registry, &query, std::io::stdout().lock()),
        None => serve(
            &registry,
            BufReader::new(std::io::stdin()),
            std::io::stdout(),
            Platform::current(),
        ),
    };

    registry.finalize_all();
    result
}

pub fn build_registry(config: Config) -> Result<PluginRegistry, RuntimeError> {
    let engine = RecollqEngine::from_config(&config);
    let plugin = RecollPlugin::new(config, engine, Box::new(ThemeIconLookup::from_env()));
    let mut registry = PluginRegistry::default();
    registry.register(Box::new(plugin))?;
    Ok(registry)
}

/// Answer a single query and print every published item as pretty JSON.
pub fn run_once<W: Write>(
    registry: &PluginRegistry,
    query: &str,
    mut output: W,
) -> Result<(), RuntimeError> {
    let mut items: Vec<ResultItem> = Vec::new();
    for (plugin, invocation) in registry.dispatch(query) {
        plugin.handle_query(invocation, &mut items)?;
    }
    serde_json::to_writer_pretty(&mut output, &items)?;
    writeln!(output)?;
    Ok(())
}

type Dispatched<'r> = Vec<(&'r dyn LauncherPlugin, QueryInvocation)>;

enum WorkerMessage<'r> {
    Query(Dispatched<'r>),
    Activate(crate::contract::ActivateRequest),
}

/// What the serving loop waits on: host input, or the worker giving up.
enum InputEvent {
    Line(String),
    ReadFailed(std::io::Error),
    Closed,
    WorkerStopped,
}

/// Serve newline-delimited JSON requests from `input` until `Exit` or EOF.
///
/// Every request except `Activate` invalidates the in-flight invocations. A
/// single worker runs queries and activations in arrival order and drains
/// whatever is still queued at EOF. A worker failure ends serving at once, even
/// while the host is silent.
pub fn serve<R, W>(
    registry: &PluginRegistry,
    input: R,
    output: W,
    platform: Platform,
) -> Result<(), RuntimeError>
where
    R: BufRead + Send + 'static,
    W: Write + Send,
{
    let output = Mutex::new(output);
    let (events_tx, events) = mpsc::channel::<InputEvent>();
    spawn_reader(input, events_tx.clone())?;

    std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<WorkerMessage<'_>>();
        let shared = &output;
        let stopped = events_tx;
        let worker = scope.spawn(move || {
            let result = run_worker(rx, shared, platform);
            if result.is_err() {
                let _ = stopped.send(InputEvent::WorkerStopped);
            }
            result
        });

        let mut in_flight: Vec<InvocationHandle> = Vec::new();
        let mut read_result = Ok(());
        loop {
            let line = match events.recv() {
                Ok(InputEvent::Line(line)) => line,
                Ok(InputEvent::ReadFailed(error)) => {
                    read_result = Err(RuntimeError::Io(error));
                    break;
                }
                Ok(InputEvent::WorkerStopped) => {
                    tracing::warn!("query worker stopped; no longer reading host input");
                    break;
                }
                Ok(InputEvent::Closed) | Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }

            let request = match transport::parse_request(&line) {
                Ok(request) => request,
                Err(response) => {
                    write_response(&output, &response);
                    continue;
                }
            };

            let message = match request {
                HostRequest::Search(search) => {
                    invalidate_all(&mut in_flight);
                    let dispatched = registry.dispatch(&search.query);
                    in_flight.extend(dispatched.iter().map(|(_, invocation)| invocation.handle()));
                    WorkerMessage::Query(dispatched)
                }
                HostRequest::Interrupt => {
                    invalidate_all(&mut in_flight);
                    continue;
                }
                HostRequest::Activate(request) => WorkerMessage::Activate(request),
                HostRequest::Exit => {
                    invalidate_all(&mut in_flight);
                    break;
                }
            };
            if tx.send(message).is_err() {
                break;
            }
        }

        drop(tx);
        let worker_result = worker.join().map_err(|_| RuntimeError::WorkerGone)?;
        worker_result.and(read_result)
    })
}

/// Reads host lines on a detached thread; a blocked read never holds up shutdown.
fn spawn_reader<R>(input: R, events: mpsc::Sender<InputEvent>) -> Result<(), RuntimeError>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("host-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                let (event, last) = match line {
                    Ok(line) => (InputEvent::Line(line), false),
                    Err(error) => (InputEvent::ReadFailed(error), true),
                };
                if events.send(event).is_err() || last {
                    return;
                }
            }
            let _ = events.send(InputEvent::Closed);
        })?;
    Ok(())
}

fn invalidate_all(in_flight: &mut Vec<InvocationHandle>) {
    for handle in in_flight.drain(..) {
        handle.invalidate();
    }
}

fn run_worker<W: Write>(
    rx: mpsc::Receiver<WorkerMessage<'_>>,
    output: &Mutex<W>,
    platform: Platform,
) -> Result<(), RuntimeError> {
    let mut table = ActivationTable::default();

    for message in rx {
        match message {
            WorkerMessage::Query(dispatched) => {
                let mut fresh = true;
                for (plugin, invocation) in dispatched {
                    let mut sink = WriterSink {
                        plugin: &plugin.metadata().id,
                        output,
                        table: &mut table,
                        fresh: &mut fresh,
                    };
                    let outcome = match plugin.handle_query(invocation, &mut sink) {
                        Ok(outcome) => outcome,
                        Err(error) => {
                            tracing::error!(plugin = %plugin.metadata().id, %error, "query failed");
                            write_response(output, &plugin_failure(&error));
                            return Err(error.into());
                        }
                    };
                    if outcome == InvocationOutcome::Abandoned {
                        tracing::debug!(plugin = %plugin.metadata().id, "stale results dropped");
                    }
                }
            }
            WorkerMessage::Activate(request) => {
                let response = table.activate(request, platform);
                write_response(output, &response);
            }
        }
    }
    Ok(())
}

/// Publishes straight to the host, remembering items for later activation.
///
/// The table keeps the previous results until the new query actually publishes.
struct WriterSink<'a, W> {
    plugin: &'a str,
    output: &'a Mutex<W>,
    table: &'a mut ActivationTable,
    fresh: &'a mut bool,
}

impl<W: Write> ResultSink for WriterSink<'_, W> {
    fn publish(&mut self, invocation_id: u64, items: Vec<ResultItem>) {
        if std::mem::take(self.fresh) {
            self.table.clear();
        }
        self.table.extend(&items);
        let response = TransportResponse::results(invocation_id, self.plugin, items);
        write_response(self.output, &response);
    }
}

fn write_response<W: Write>(output: &Mutex<W>, response: &TransportResponse) {
    let line = transport::encode(response);
    let Ok(mut out) = output.lock() else {
        tracing::error!("output lock poisoned");
        return;
    };
    if let Err(error) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        tracing::warn!(%error, "failed to write response");
    }
}

fn plugin_failure(error: &PluginError) -> TransportResponse {
    TransportResponse::error(ErrorCode::Plugin, error.to_string())
}
