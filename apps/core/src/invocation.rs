use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::ResultItem;

const DEBOUNCE_SLICE: Duration = Duration::from_millis(5);

static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Completed,
    Abandoned,
}

/// Terminal result of processing one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    Completed { published: usize },
    Abandoned,
}

/// Receives the items of an invocation that is still current.
pub trait ResultSink {
    fn publish(&mut self, invocation_id: u64, items: Vec<ResultItem>);
}

impl ResultSink for Vec<ResultItem> {
    fn publish(&mut self, _invocation_id: u64, items: Vec<ResultItem>) {
        self.extend(items);
    }
}

/// Host-side handle used to mark an invocation as superseded.
#[derive(Debug, Clone)]
pub struct InvocationHandle {
    id: u64,
    valid: Arc<AtomicBool>,
}

impl InvocationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

/// One query lifecycle: `Pending` until it is published or abandoned.
#[derive(Debug)]
pub struct QueryInvocation {
    id: u64,
    query: String,
    triggered: bool,
    valid: Arc<AtomicBool>,
    state: InvocationState,
}

impl QueryInvocation {
    pub fn new(query: &str) -> Self {
        Self::with_trigger_state(query, true)
    }

    pub fn with_trigger_state(query: &str, triggered: bool) -> Self {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            query: query.to_string(),
            triggered,
            valid: Arc::new(AtomicBool::new(true)),
            state: InvocationState::Pending,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn handle(&self) -> InvocationHandle {
        InvocationHandle {
            id: self.id,
            valid: Arc::clone(&self.valid),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    /// Wait out `delay` unless the invocation goes stale first.
    ///
    /// Returns `false` (and abandons) when the host invalidated it meanwhile.
    pub fn debounce(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            if !self.checkpoint() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(DEBOUNCE_SLICE.min(deadline - now));
        }
    }

    /// Re-check validity, abandoning the invocation if it went stale.
    pub fn checkpoint(&mut self) -> bool {
        if self.state == InvocationState::Abandoned {
            return false;
        }
        if self.is_valid() {
            return true;
        }
        self.abandon();
        false
    }

    pub fn abandon(&mut self) -> InvocationOutcome {
        if self.state == InvocationState::Pending {
            self.state = InvocationState::Abandoned;
            tracing::debug!(invocation = self.id, query = %self.query, "invocation abandoned");
        }
        InvocationOutcome::Abandoned
    }

    /// Hand `items` to `sink` if, and only if, the invocation is still current.
    pub fn publish(&mut self, items: Vec<ResultItem>, sink: &mut dyn ResultSink) -> InvocationOutcome {
        if self.state != InvocationState::Pending || !self.checkpoint() {
            return InvocationOutcome::Abandoned;
        }
        let published = items.len();
        sink.publish(self.id, items);
        self.state = InvocationState::Completed;
        InvocationOutcome::Completed { published }
    }
}
