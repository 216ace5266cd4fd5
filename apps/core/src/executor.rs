use crate::config::Config;
use crate::engine::{EngineError, SearchEngine};
use crate::model::DocumentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_results: usize,
    pub max_chars: usize,
    pub context_words: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_results: 10,
            max_chars: 80,
            context_words: 4,
        }
    }
}

impl From<&Config> for QueryLimits {
    fn from(cfg: &Config) -> Self {
        Self {
            max_results: cfg.max_results,
            max_chars: cfg.max_chars,
            context_words: cfg.context_words,
        }
    }
}

pub struct QueryExecutor<E> {
    engine: E,
    limits: QueryLimits,
}

impl<E: SearchEngine> QueryExecutor<E> {
    pub fn new(engine: E, limits: QueryLimits) -> Self {
        Self { engine, limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn execute(&self, query: &str) -> Result<Vec<DocumentRecord>, EngineError> {
        execute(&self.engine, query, self.limits)
    }
}

/// Run `query` and collect up to `limits.max_results` records in engine order.
///
/// The session is scoped to this call and dropped on every return path.
pub fn execute<E: SearchEngine + ?Sized>(
    engine: &E,
    query: &str,
    limits: QueryLimits,
) -> Result<Vec<DocumentRecord>, EngineError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut session = engine.connect()?;
    session.set_abstract_params(limits.max_chars, limits.context_words);
    let available = session.execute(query)?;
    let wanted = available.min(limits.max_results);

    let mut docs = Vec::with_capacity(wanted);
    while docs.len() < wanted {
        match session.fetch_next()? {
            Some(doc) => docs.push(doc),
            None => break,
        }
    }

    tracing::debug!(
        engine = engine.name(),
        available,
        fetched = docs.len(),
        "query executed"
    );
    Ok(docs)
}
