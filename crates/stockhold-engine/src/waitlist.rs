//! # Waitlist Queue
//!
//! Per-SKU FIFO queues of demand that could not be satisfied immediately.
//!
//! ## Promotion Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Waitlist Flow                                  │
//! │                                                                         │
//! │  reserve() short on stock ──► enqueue(tail)                            │
//! │                                                                         │
//! │  cancel/expire releases stock                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pop_front() ──► try to reserve for that entry                         │
//! │       │                  │                                              │
//! │       │          success ┴ failure                                      │
//! │       │             │         │                                         │
//! │       ▼             ▼         ▼                                         │
//! │  (empty: no-op)  promoted   requeue(head | tail)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry is stamped with a global sequence number, so queue order can
//! be checked after the fact even when entries are re-queued.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockhold_core::WaitlistEntry;
use tokio::sync::RwLock;

use crate::error::EngineError;

// =============================================================================
// Requeue Position
// =============================================================================

/// Where an entry returns to after a failed promotion.
///
/// ## Trade-off
/// ```text
///   HEAD (default)                    TAIL
///   ──────────────                    ────
///   • Strict FIFO                     • Later arrivals may overtake
///   • A large head request blocks     • Small requests behind a large
///     smaller ones behind it            one can still be served
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeuePosition {
    /// Put the entry back at the front, keeping its place in line.
    #[default]
    Head,
    /// Append the entry behind everyone else.
    Tail,
}

impl std::fmt::Display for RequeuePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequeuePosition::Head => write!(f, "head"),
            RequeuePosition::Tail => write!(f, "tail"),
        }
    }
}

impl std::str::FromStr for RequeuePosition {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head" | "front" => Ok(RequeuePosition::Head),
            "tail" | "back" => Ok(RequeuePosition::Tail),
            other => Err(EngineError::InvalidConfig(format!(
                "Unknown requeue position: '{}'. Valid options: head, tail",
                other
            ))),
        }
    }
}

// =============================================================================
// Waitlist Queue
// =============================================================================

/// SKU → FIFO of waiting requests.
#[derive(Debug, Default)]
pub struct WaitlistQueue {
    queues: RwLock<HashMap<String, VecDeque<WaitlistEntry>>>,
    next_sequence: AtomicU64,
}

impl WaitlistQueue {
    /// Creates an empty waitlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request to the tail of `sku`'s queue.
    ///
    /// Returns the queue length after the append.
    pub async fn enqueue(
        &self,
        sku: &str,
        user_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> usize {
        let entry = WaitlistEntry {
            sku: sku.to_string(),
            user_id: user_id.to_string(),
            quantity,
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            enqueued_at: now,
        };

        let mut queues = self.queues.write().await;
        let queue = queues.entry(sku.to_string()).or_default();
        queue.push_back(entry);
        queue.len()
    }

    /// Removes and returns the head of `sku`'s queue.
    pub async fn pop_front(&self, sku: &str) -> Option<WaitlistEntry> {
        self.queues
            .write()
            .await
            .get_mut(sku)
            .and_then(VecDeque::pop_front)
    }

    /// Puts a previously popped entry back, keeping its original sequence.
    pub async fn requeue(&self, entry: WaitlistEntry, position: RequeuePosition) {
        let mut queues = self.queues.write().await;
        let queue = queues.entry(entry.sku.clone()).or_default();
        match position {
            RequeuePosition::Head => queue.push_front(entry),
            RequeuePosition::Tail => queue.push_back(entry),
        }
    }

    /// Number of requests waiting on `sku`.
    pub async fn len(&self, sku: &str) -> usize {
        self.queues
            .read()
            .await
            .get(sku)
            .map_or(0, VecDeque::len)
    }

    /// Copy of `sku`'s queue, head first.
    pub async fn snapshot(&self, sku: &str) -> Vec<WaitlistEntry> {
        self.queues
            .read()
            .await
            .get(sku)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let waitlist = WaitlistQueue::new();
        let now = Utc::now();
        assert_eq!(waitlist.enqueue("X", "a", 1, now).await, 1);
        assert_eq!(waitlist.enqueue("X", "b", 2, now).await, 2);
        assert_eq!(waitlist.enqueue("X", "c", 1, now).await, 3);

        let users: Vec<_> = waitlist
            .snapshot("X")
            .await
            .into_iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(users, ["a", "b", "c"]);

        assert_eq!(waitlist.pop_front("X").await.unwrap().user_id, "a");
        assert_eq!(waitlist.pop_front("X").await.unwrap().user_id, "b");
        assert_eq!(waitlist.len("X").await, 1);
    }

    #[tokio::test]
    async fn test_queues_are_per_sku() {
        let waitlist = WaitlistQueue::new();
        let now = Utc::now();
        waitlist.enqueue("X", "a", 1, now).await;

        assert_eq!(waitlist.len("Y").await, 0);
        assert!(waitlist.pop_front("Y").await.is_none());
        assert!(waitlist.snapshot("Y").await.is_empty());
        assert_eq!(waitlist.len("X").await, 1);
    }

    #[tokio::test]
    async fn test_requeue_head_keeps_place() {
        let waitlist = WaitlistQueue::new();
        let now = Utc::now();
        waitlist.enqueue("X", "a", 5, now).await;
        waitlist.enqueue("X", "b", 1, now).await;

        let head = waitlist.pop_front("X").await.unwrap();
        let sequence = head.sequence;
        waitlist.requeue(head, RequeuePosition::Head).await;

        let snapshot = waitlist.snapshot("X").await;
        assert_eq!(snapshot[0].user_id, "a");
        assert_eq!(snapshot[0].sequence, sequence);
        assert_eq!(snapshot[1].user_id, "b");
    }

    #[tokio::test]
    async fn test_requeue_tail_moves_to_back() {
        let waitlist = WaitlistQueue::new();
        let now = Utc::now();
        waitlist.enqueue("X", "a", 5, now).await;
        waitlist.enqueue("X", "b", 1, now).await;

        let head = waitlist.pop_front("X").await.unwrap();
        waitlist.requeue(head, RequeuePosition::Tail).await;

        let users: Vec<_> = waitlist
            .snapshot("X")
            .await
            .into_iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(users, ["b", "a"]);
    }

    #[test]
    fn test_requeue_position_parsing() {
        assert_eq!("head".parse::<RequeuePosition>().unwrap(), RequeuePosition::Head);
        assert_eq!("TAIL".parse::<RequeuePosition>().unwrap(), RequeuePosition::Tail);
        assert!("middle".parse::<RequeuePosition>().is_err());
        assert_eq!(RequeuePosition::Tail.to_string(), "tail");
    }
}
