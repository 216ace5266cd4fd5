//! Search engine binding backed by Recoll's `recollq` command-line tool.
//!
//! `recollq -F <fields>` prints a short header followed by one line per
//! document, each field base64-encoded and separated by a single space.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::Config;
use crate::engine::{EngineError, EngineSession, SearchEngine};
use crate::model::DocumentRecord;

const FIELDS: &str = "url filename mtype relevancyrating abstract ipath";
const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone)]
pub struct RecollqEngine {
    program: String,
    config_dir: Option<PathBuf>,
    fetch_window: usize,
}

impl RecollqEngine {
    pub fn new(program: &str, config_dir: Option<PathBuf>, fetch_window: usize) -> Self {
        Self {
            program: program.to_string(),
            config_dir,
            fetch_window: fetch_window.max(1),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            &cfg.recollq_program,
            cfg.recoll_config_dir.clone(),
            cfg.max_results,
        )
    }
}

impl SearchEngine for RecollqEngine {
    fn name(&self) -> &'static str {
        "recollq"
    }

    fn connect(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        let program = resolve_program(&self.program).ok_or_else(|| {
            EngineError::Unavailable(format!("'{}' not found; is Recoll installed?", self.program))
        })?;
        if let Some(dir) = &self.config_dir {
            if !dir.is_dir() {
                return Err(EngineError::Unavailable(format!(
                    "recoll config dir does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(Box::new(RecollqSession {
            engine: self,
            program,
            max_chars: usize::MAX,
            context_words: 0,
            rows: VecDeque::new(),
        }))
    }
}

struct RecollqSession<'a> {
    engine: &'a RecollqEngine,
    program: PathBuf,
    max_chars: usize,
    context_words: usize,
    rows: VecDeque<DocumentRecord>,
}

impl EngineSession for RecollqSession<'_> {
    fn set_abstract_params(&mut self, max_chars: usize, context_words: usize) {
        self.max_chars = max_chars;
        self.context_words = context_words;
    }

    fn execute(&mut self, query: &str) -> Result<usize, EngineError> {
        self.rows.clear();

        let mut command = Command::new(&self.program);
        if let Some(dir) = &self.engine.config_dir {
            command.arg("-c").arg(dir);
        }
        command
            .arg("-A")
            .arg("-n")
            .arg(format!("0-{}", self.engine.fetch_window))
            .arg("-F")
            .arg(FIELDS)
            .arg(query_argument(query));

        tracing::debug!(
            program = %self.program.display(),
            window = self.engine.fetch_window,
            context_words = self.context_words,
            "running recollq"
        );
        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("recollq exited with {}", output.status)
            } else {
                stderr
            };
            return Err(EngineError::Query {
                query: query.to_string(),
                message,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (available, rows) = parse_output(&stdout, self.max_chars)?;
        self.rows = rows.into();
        Ok(available)
    }

    fn fetch_next(&mut self) -> Result<Option<DocumentRecord>, EngineError> {
        Ok(self.rows.pop_front())
    }
}

/// recollq treats any leading `-` as an option; a leading space keeps
/// Recoll's `-term` exclusion syntax intact.
fn query_argument(query: &str) -> String {
    if query.starts_with('-') {
        format!(" {query}")
    } else {
        query.to_string()
    }
}

/// Parse `recollq -F` output into the reported result count and the rows.
pub fn parse_output(
    stdout: &str,
    max_chars: usize,
) -> Result<(usize, Vec<DocumentRecord>), EngineError> {
    let mut lines = stdout.lines();
    let mut available = None;
    for line in lines.by_ref() {
        if let Some(count) = parse_count_header(line) {
            available = Some(count);
            break;
        }
    }
    let available =
        available.ok_or_else(|| EngineError::Decode("missing result count header".into()))?;

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        rows.push(parse_row(line, max_chars)?);
    }
    Ok((available, rows))
}

fn parse_count_header(line: &str) -> Option<usize> {
    let mut parts = line.split_whitespace();
    let count = parts.next()?.parse::<usize>().ok()?;
    let label = parts.next()?;
    label.starts_with("result").then_some(count)
}

fn parse_row(line: &str, max_chars: usize) -> Result<DocumentRecord, EngineError> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    for encoded in line.trim_end().split(' ') {
        fields.push(decode_field(encoded)?);
    }
    if fields.len() > FIELD_COUNT {
        return Err(EngineError::Decode(format!(
            "expected {FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }
    fields.resize(FIELD_COUNT, String::new());

    let mut fields = fields.into_iter();
    let url = fields.next().unwrap_or_default();
    let filename = fields.next().unwrap_or_default();
    let mime_type = fields.next().filter(|value| !value.is_empty());
    let relevancy_rating = fields.next().unwrap_or_default();
    let abstract_text = truncate_abstract(&fields.next().unwrap_or_default(), max_chars);
    let ipath = fields.next().unwrap_or_default();

    if url.is_empty() {
        return Err(EngineError::Decode("record without url".into()));
    }

    Ok(DocumentRecord {
        url,
        filename,
        mime_type,
        relevancy_rating,
        abstract_text,
        ipath,
    })
}

fn decode_field(encoded: &str) -> Result<String, EngineError> {
    if encoded.is_empty() {
        return Ok(String::new());
    }
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|error| EngineError::Decode(format!("bad base64 field: {error}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Cut `text` to at most `max_chars` characters, on a word boundary when one exists.
pub fn truncate_abstract(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(char::is_whitespace) {
        Some(position) if position > 0 => cut[..position].trim_end().to_string(),
        _ => cut,
    }
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        executable_names(program)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

fn executable_names(program: &str) -> Vec<String> {
    if cfg!(windows) && Path::new(program).extension().is_none() {
        vec![format!("{program}.exe"), program.to_string()]
    } else {
        vec![program.to_string()]
    }
}
