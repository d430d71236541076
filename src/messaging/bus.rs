use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
/// Topic bus for pub/sub messaging
///
/// Routes published messages to every subscription whose topic filter matches.
/// The MQTT transport feeds it from its router thread; tests publish directly.
use std::sync::Arc;

use super::topic::{is_valid_filter, topic_matches};
use super::Transport;
use crate::error::BusError;

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// A message received from the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Route from a topic filter to one subscription
struct Route {
    id: SubscriberId,
    filter: String,
    sender: Sender<BusMessage>,
}

#[derive(Default)]
struct Routes {
    list: Vec<Route>,
    next_id: usize,
    /// Set once the bus is closed; no routes are accepted afterwards
    closed: Option<String>,
}

/// Topic bus routing messages to filtered subscriptions
#[derive(Clone, Default)]
pub struct TopicBus {
    routes: Arc<RwLock<Routes>>,
}

impl TopicBus {
    /// Create a new topic bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every topic matching `filter`
    pub fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        if !is_valid_filter(filter) {
            return Err(BusError::Subscribe {
                filter: filter.to_string(),
                source: format!("invalid topic filter {:?}", filter).into(),
            });
        }

        let (tx, rx) = unbounded();

        let mut routes = self.routes.write();
        if let Some(reason) = &routes.closed {
            return Err(BusError::Closed(reason.clone()));
        }

        let id = SubscriberId(routes.next_id);
        routes.next_id += 1;
        routes.list.push(Route {
            id,
            filter: filter.to_string(),
            sender: tx,
        });
        drop(routes);

        Ok(Subscription {
            id,
            filter: filter.to_string(),
            receiver: rx,
            bus: self.clone(),
        })
    }

    /// Remove a subscription's route; its message stream ends
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.routes.write().list.retain(|r| r.id != id);
    }

    /// Publish a message, returns how many subscriptions received it
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        let message = BusMessage {
            topic: topic.to_string(),
            payload: payload.into(),
        };

        let routes = self.routes.read();
        let mut delivered = 0;
        for route in routes.list.iter().filter(|r| topic_matches(&r.filter, topic)) {
            // If send fails, the subscription was dropped - that's ok
            if route.sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Close the bus, ending every subscription's message stream
    pub fn close(&self, reason: impl Into<String>) {
        let mut routes = self.routes.write();
        if routes.closed.is_none() {
            routes.closed = Some(reason.into());
        }
        routes.list.clear();
    }

    /// Reason the bus was closed, if it was
    pub fn closed_reason(&self) -> Option<String> {
        self.routes.read().closed.clone()
    }

    /// Get number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.routes.read().list.len()
    }
}

impl Transport for TopicBus {
    fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        TopicBus::subscribe(self, filter)
    }
}

/// Lazy, non-restartable stream of messages for one topic filter.
///
/// Iteration blocks until the next message and ends when the bus closes.
pub struct Subscription {
    id: SubscriberId,
    filter: String,
    receiver: Receiver<BusMessage>,
    bus: TopicBus,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic_filter(&self) -> &str {
        &self.filter
    }

    /// Why the stream ended
    pub fn end_reason(&self) -> String {
        self.bus
            .closed_reason()
            .unwrap_or_else(|| "message stream ended".to_string())
    }
}

impl Iterator for Subscription {
    type Item = BusMessage;

    fn next(&mut self) -> Option<BusMessage> {
        self.receiver.recv().ok()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}
