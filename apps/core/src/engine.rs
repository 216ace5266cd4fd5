use thiserror::Error;

use crate::model::DocumentRecord;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("search engine unavailable: {0}")]
    Unavailable(String),
    #[error("query '{query}' failed: {message}")]
    Query { query: String, message: String },
    #[error("failed to start search engine: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("unreadable search engine output: {0}")]
    Decode(String),
}

/// A full-text search backend the plugin can open sessions against.
pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn connect(&self) -> Result<Box<dyn EngineSession + '_>, EngineError>;
}

/// One connection to the engine. Dropping it releases the connection.
///
/// Sessions carry no state from one `execute` call to the next.
pub trait EngineSession {
    fn set_abstract_params(&mut self, max_chars: usize, context_words: usize);

    /// Submit `query` and return how many records are available.
    fn execute(&mut self, query: &str) -> Result<usize, EngineError>;

    /// Next record in engine ranking order, `None` at end of results.
    fn fetch_next(&mut self) -> Result<Option<DocumentRecord>, EngineError>;
}

impl<E: SearchEngine + ?Sized> SearchEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn connect(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        (**self).connect()
    }
}

impl<E: SearchEngine + ?Sized> SearchEngine for std::sync::Arc<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn connect(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        (**self).connect()
    }
}
