/// Messaging module for bus subscriptions
///
/// ## Architecture
///
/// ```text
/// ┌────────┐  publish   ┌─────────────┐  router   ┌──────────┐  filter   ┌──────────────┐
/// │ Broker │ ─────────> │ rumqttc     │ ────────> │ TopicBus │ ────────> │ Subscription │
/// │        │            │ event loop  │  thread   │          │  match    │ (one/handler)│
/// └────────┘            └─────────────┘           └──────────┘           └──────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = MqttBus::connect(&config.mqtt)?;
///
/// // Each subscription is owned by exactly one handler thread
/// let subscription = bus.subscribe("soundboard/play")?;
///
/// for message in subscription {
///     println!("{}: {:?}", message.topic, message.payload);
/// }
/// ```

pub mod bus;
pub mod mqtt;
pub mod topic;

// Re-export commonly used types
pub use bus::{BusMessage, SubscriberId, Subscription, TopicBus};
pub use mqtt::MqttBus;
pub use topic::{is_valid_filter, topic_matches};

use crate::error::BusError;

/// A connected bus that hands out filtered subscriptions
pub trait Transport {
    fn subscribe(&self, filter: &str) -> Result<Subscription, BusError>;
}
