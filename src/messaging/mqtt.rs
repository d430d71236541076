/// MQTT transport
///
/// Wraps the synchronous `rumqttc` client. A single router thread owns the
/// event loop and fans incoming publishes out through a [`TopicBus`]; the
/// first connection error closes the bus, which ends every subscription.

use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};

use super::bus::{Subscription, TopicBus};
use super::Transport;
use crate::config::MqttConfig;
use crate::error::BusError;

/// Capacity of the client request queue
const REQUEST_CAPACITY: usize = 16;

/// Smallest keep-alive the client accepts
const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Connected MQTT bus
pub struct MqttBus {
    client: Client,
    bus: TopicBus,
    host: String,
}

impl MqttBus {
    /// Connect to the broker and wait for its acknowledgement.
    ///
    /// No reconnect is attempted: a failure here, or a lost connection later,
    /// is final.
    pub fn connect(config: &MqttConfig) -> Result<Self, BusError> {
        let connect_failed = |source: Box<dyn std::error::Error + Send + Sync>| BusError::Connect {
            host: config.host.clone(),
            port: config.port,
            source,
        };

        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS)));

        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);
        tracing::debug!("Connecting to {}:{}", config.host, config.port);

        wait_for_connack(&mut connection).map_err(connect_failed)?;

        let bus = TopicBus::new();
        let router_bus = bus.clone();
        thread::Builder::new()
            .name("mqtt-router".to_string())
            .spawn(move || route_messages(connection, router_bus))
            .map_err(|e| connect_failed(Box::new(e)))?;

        tracing::info!("connected to {}", config.host);

        Ok(Self {
            client,
            bus,
            host: config.host.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Transport for MqttBus {
    fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        // Route first so nothing published right after the SUBACK is missed
        let subscription = self.bus.subscribe(filter)?;

        if let Err(e) = self.client.subscribe(filter, QoS::AtMostOnce) {
            self.bus.unsubscribe(subscription.id());
            return Err(BusError::Subscribe {
                filter: filter.to_string(),
                source: e.to_string().into(),
            });
        }

        tracing::debug!("Subscribed to {}", filter);
        Ok(subscription)
    }
}

fn wait_for_connack(connection: &mut Connection) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut notifications = connection.iter();
    loop {
        match notifications.next() {
            Some(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                tracing::debug!("Broker acknowledged connection: {:?}", ack.code);
                return Ok(());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(Box::new(e)),
            None => return Err("event loop stopped before connecting".into()),
        }
    }
}

fn route_messages(mut connection: Connection, bus: TopicBus) {
    tracing::debug!("MQTT router thread started");

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let delivered = bus.publish(&publish.topic, publish.payload.to_vec());
                tracing::trace!("{} -> {} subscription(s)", publish.topic, delivered);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                tracing::debug!("Subscription acknowledged: {:?}", ack.return_codes);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Connection to broker lost: {}", e);
                bus.close(format!("connection to broker lost: {}", e));
                return;
            }
        }
    }

    bus.close("MQTT event loop stopped");
}
