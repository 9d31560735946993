//! Per-thread conversation memory.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::llm::ChatMessage;

/// Threads kept before the least recently used one is evicted.
pub const DEFAULT_MAX_THREADS: usize = 1024;

/// History of one conversation thread.
pub type ThreadHistory = Arc<Mutex<Vec<ChatMessage>>>;

#[derive(Debug)]
struct Slot {
    history: ThreadHistory,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Threads {
    slots: HashMap<String, Slot>,
    clock: u64,
}

/// In-memory checkpointer keyed by thread id.
///
/// Turns on the same thread are serialized by the thread's own lock;
/// different threads proceed independently. At most `max_threads` threads
/// are kept; idle ones are evicted least recently used first.
#[derive(Debug, Clone)]
pub struct MemorySaver {
    threads: Arc<Mutex<Threads>>,
    max_threads: usize,
}

impl Default for MemorySaver {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_THREADS)
    }
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_threads: usize) -> Self {
        Self {
            threads: Arc::default(),
            max_threads: max_threads.max(1),
        }
    }

    /// History handle for `thread_id`, created empty on first use.
    pub async fn thread(&self, thread_id: &str) -> ThreadHistory {
        let mut threads = self.threads.lock().await;
        threads.clock += 1;
        let now = threads.clock;

        if let Some(slot) = threads.slots.get_mut(thread_id) {
            slot.last_used = now;
            return slot.history.clone();
        }

        if threads.slots.len() >= self.max_threads {
            evict_idle(&mut threads.slots);
        }

        let history = ThreadHistory::default();
        threads.slots.insert(
            thread_id.to_string(),
            Slot {
                history: history.clone(),
                last_used: now,
            },
        );
        history
    }

    /// Drop `thread_id` if it holds no messages and nobody else is using it.
    ///
    /// Called after a failed turn so that only committed turns occupy memory.
    pub async fn release(&self, thread_id: &str) -> bool {
        let mut threads = self.threads.lock().await;
        let unused = match threads.slots.get(thread_id) {
            Some(slot) => {
                Arc::strong_count(&slot.history) == 1
                    && slot.history.try_lock().map(|h| h.is_empty()).unwrap_or(false)
            }
            None => false,
        };
        if unused {
            threads.slots.remove(thread_id);
        }
        unused
    }

    /// Copy of a thread's messages.
    pub async fn history(&self, thread_id: &str) -> Vec<ChatMessage> {
        let handle = {
            let threads = self.threads.lock().await;
            threads.slots.get(thread_id).map(|s| s.history.clone())
        };
        match handle {
            Some(history) => history.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Forget a thread. Returns whether it existed.
    pub async fn clear(&self, thread_id: &str) -> bool {
        self.threads.lock().await.slots.remove(thread_id).is_some()
    }

    /// Number of known threads.
    pub async fn len(&self) -> usize {
        self.threads.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Remove the least recently used thread nobody holds a handle to.
fn evict_idle(slots: &mut HashMap<String, Slot>) {
    let victim = slots
        .iter()
        .filter(|(_, slot)| Arc::strong_count(&slot.history) == 1)
        .min_by_key(|(_, slot)| slot.last_used)
        .map(|(id, _)| id.clone());

    if let Some(id) = victim {
        tracing::debug!(thread = %id, "evicting conversation thread");
        slots.remove(&id);
    }
}
