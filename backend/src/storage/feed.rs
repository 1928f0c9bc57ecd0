//! Subscriber registry shared by the backends' change channels.

use log::debug;
use shared::ChangeEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use super::traits::ChangeStream;

struct Subscriber {
    table: String,
    owner: String,
    sender: mpsc::UnboundedSender<ChangeEvent>,
}

/// Fans change events out to every open subscription whose `(table, owner)`
/// filter matches. Closed subscriptions are pruned on the next publish.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: &str, owner: &str) -> ChangeStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.push(Subscriber {
            table: table.to_string(),
            owner: owner.to_string(),
            sender,
        });
        debug!("Opened change stream for {} (owner {})", table, owner);
        ChangeStream::new(receiver)
    }

    pub fn publish(&self, table: &str, owner: &str, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in subscribers.iter() {
            if subscriber.table == table && subscriber.owner == owner {
                // A send only fails if the receiver closed since the prune above
                let _ = subscriber.sender.send(event.clone());
            }
        }
    }

    /// Number of live subscriptions on `table`
    pub fn subscriber_count(&self, table: &str) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.iter().filter(|s| s.table == table).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert_event(id: &str) -> ChangeEvent {
        ChangeEvent::Insert {
            row: json!({"id": id}).as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_events_are_filtered_by_table_and_owner() {
        let feed = ChangeFeed::new();
        let mut mine = feed.subscribe("bank_accounts", "user-1");
        let mut other_owner = feed.subscribe("bank_accounts", "user-2");

        feed.publish("bank_accounts", "user-1", insert_event("a"));
        feed.publish("cash_vaults", "user-1", insert_event("b"));

        assert_eq!(mine.next().await, Some(insert_event("a")));
        other_owner.close();
        assert_eq!(other_owner.next().await, None);
    }

    #[tokio::test]
    async fn test_closed_streams_are_pruned() {
        let feed = ChangeFeed::new();
        let stream = feed.subscribe("bank_accounts", "user-1");
        assert_eq!(feed.subscriber_count("bank_accounts"), 1);

        drop(stream);
        assert_eq!(feed.subscriber_count("bank_accounts"), 0);
    }
}
