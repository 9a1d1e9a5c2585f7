//! Typed publish/subscribe hooks for cache activity

use crate::memory::MemoryPressureLevel;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Category a subscriber listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Operation,
    MemoryPressure,
    EvictionCompleted,
}

/// Public cache operations reported through [`OperationEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    Has,
    Clear,
    Cleanup,
}

impl CacheOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Has => "has",
            Self::Clear => "clear",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one public operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationEvent {
    pub operation: CacheOperation,
    /// Absent for whole-cache operations such as `clear`
    pub key: Option<String>,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Operation(OperationEvent),
    MemoryPressure {
        level: MemoryPressureLevel,
        usage_ratio: f64,
        message: String,
    },
    EvictionCompleted {
        evicted: usize,
        remaining: usize,
    },
}

impl CacheEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Operation(_) => EventKind::Operation,
            Self::MemoryPressure { .. } => EventKind::MemoryPressure,
            Self::EvictionCompleted { .. } => EventKind::EvictionCompleted,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: EventHandler,
}

/// Fan-out of cache events to registered handlers.
///
/// Handlers run synchronously on the emitting task and must not block.
pub struct EventBus {
    next_id: AtomicU64,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscriptions.read().iter().any(|s| s.kind == kind)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn emit(&self, event: &CacheEvent) {
        let kind = event.kind();
        // Handlers may subscribe or unsubscribe, so call them outside the lock
        let handlers: Vec<EventHandler> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
