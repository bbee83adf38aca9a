//! Change notifier: coarse "collection changed" fan-out.
//!
//! Events carry no payload beyond which collection changed. Every
//! subscriber, including the writer's own view, responds by invalidating its
//! cached read model and re-fetching.
//!
//! ```text
//! repository write ──▶ ChangeNotifier::publish ──▶ broadcast ──┬──▶ admin view
//!                                                              ├──▶ storefront view
//! PgChangeFeed (LISTEN catalog_changes) ──▶ publish ───────────┘──▶ SSE clients
//! ```

pub mod postgres;

use core::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use postgres::PgChangeFeed;

/// Default capacity of the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Which collection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Something in the product collection changed.
    ProductsChanged,
    /// Something in the category collection changed.
    CategoriesChanged,
}

impl ChangeEvent {
    /// Topic name used on the wire (SSE data, `pg_notify` payload).
    #[must_use]
    pub const fn topic(self) -> &'static str {
        match self {
            Self::ProductsChanged => "products",
            Self::CategoriesChanged => "categories",
        }
    }

    /// Parse a topic name back into an event.
    #[must_use]
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic.trim() {
            "products" => Some(Self::ProductsChanged),
            "categories" => Some(Self::CategoriesChanged),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// In-process publish/subscribe channel for catalog changes.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a notifier whose subscribers may fall `capacity` events behind
    /// before they observe a lag.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fan an event out to every current subscriber.
    ///
    /// Returns the number of subscribers reached. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let reached = self.tx.send(event).unwrap_or(0);
        tracing::debug!(%event, subscribers = reached, "Published catalog change");
        reached
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
