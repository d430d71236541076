/// Dispatcher
///
/// Owns the bus connection, starts one handler thread per subscription (the
/// sound topic plus one per alias) and waits. Handlers only return when they
/// die, so the first one to return decides the dispatcher's result.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;
use parking_lot::RwLock;

use crate::alias::AliasBinding;
use crate::config::{Config, MqttConfig};
use crate::error::DispatchError;
use crate::handler::TriggerHandler;
use crate::messaging::{MqttBus, Transport};
use crate::playback::{CommandPlayer, Player};
use crate::resolver::SoundResolver;
use crate::state::{DispatchState, DispatchStateMachine};
use crate::trigger::TriggerRule;

/// Read-only view of the dispatcher state, shareable across threads
#[derive(Clone, Default)]
pub struct StateHandle(Arc<RwLock<DispatchStateMachine>>);

impl StateHandle {
    pub fn get(&self) -> DispatchState {
        self.0.read().state().clone()
    }
}

pub struct Dispatcher {
    sound_topic: String,
    aliases: Vec<AliasBinding>,
    resolver: SoundResolver,
    player: Arc<dyn Player>,
    state: StateHandle,
}

impl Dispatcher {
    /// Build a dispatcher that plays through the configured command
    pub fn new(config: &Config) -> Self {
        Self::with_player(config, Arc::new(CommandPlayer::new(config.sounds.play_cmd.clone())))
    }

    pub fn with_player(config: &Config, player: Arc<dyn Player>) -> Self {
        Self {
            sound_topic: config.sounds.topic.clone(),
            aliases: config.alias_bindings(),
            resolver: SoundResolver::new(&config.sounds.directory),
            player,
            state: StateHandle::default(),
        }
    }

    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Connect to the MQTT broker and dispatch until something fails
    pub fn connect_and_run(self, mqtt: &MqttConfig) -> Result<(), DispatchError> {
        self.state.0.write().begin_connect()?;

        let bus = match MqttBus::connect(mqtt) {
            Ok(bus) => bus,
            Err(e) => {
                self.state.0.write().fail(e.to_string());
                return Err(e.into());
            }
        };

        self.dispatch(&bus)
    }

    /// Dispatch over an already connected transport.
    ///
    /// Blocks for as long as every handler is alive. The transport must
    /// outlive the call since dropping it may disconnect the bus.
    pub fn run<T: Transport>(self, transport: &T) -> Result<(), DispatchError> {
        self.state.0.write().begin_connect()?;
        self.dispatch(transport)
    }

    fn dispatch<T: Transport>(self, transport: &T) -> Result<(), DispatchError> {
        let result = self.start_handlers(transport).and_then(|handlers| self.supervise(handlers));

        if let Err(e) = &result {
            tracing::error!("Dispatcher failed: {}", e);
            self.state.0.write().fail(e.to_string());
        }
        result
    }

    fn start_handlers<T: Transport>(&self, transport: &T) -> Result<Vec<TriggerHandler>, DispatchError> {
        let mut handlers = Vec::with_capacity(self.aliases.len() + 1);

        let subscription = transport.subscribe(&self.sound_topic)?;
        handlers.push(TriggerHandler::new(
            subscription,
            TriggerRule::SoundTopic,
            self.resolver.clone(),
            Arc::clone(&self.player),
        ));
        tracing::info!("main sounds topic is {}", self.sound_topic);

        for alias in &self.aliases {
            let subscription = transport.subscribe(&alias.topic)?;
            handlers.push(TriggerHandler::new(
                subscription,
                TriggerRule::Alias(alias.clone()),
                self.resolver.clone(),
                Arc::clone(&self.player),
            ));
            tracing::info!("added alias {} == {}", alias.topic, alias.expected);
        }

        Ok(handlers)
    }

    fn supervise(&self, handlers: Vec<TriggerHandler>) -> Result<(), DispatchError> {
        let (done_tx, done_rx) = unbounded();
        let count = handlers.len();

        for handler in handlers {
            let filter = handler.topic_filter().to_string();
            let done_tx = done_tx.clone();
            let thread_filter = filter.clone();

            thread::Builder::new()
                .name(format!("handler:{}", filter))
                .spawn(move || {
                    // Release builds abort on panic, so this only reports in debug and test builds
                    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.run()))
                        .unwrap_or_else(|_| Err(DispatchError::HandlerPanicked(thread_filter)));
                    let _ = done_tx.send(result);
                })
                .map_err(|source| DispatchError::ThreadSpawnFailed { filter, source })?;
        }
        drop(done_tx);

        self.state.0.write().mark_dispatching(count)?;
        tracing::info!("Dispatching {} subscription(s)", count);

        match done_rx.recv() {
            Ok(result) => result,
            // Every handler thread sends before exiting
            Err(_) => Err(DispatchError::HandlerPanicked("unknown".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::TopicBus;
    use std::time::{Duration, Instant};

    fn config(aliases: &str) -> Config {
        Config::from_json(&format!(
            r#"{{
                "mqtt": {{ "host": "localhost" }},
                "sounds": {{ "directory": "/nonexistent", "topic": "sound/play", "play_cmd": "true %s" }},
                "aliases": {}
            }}"#,
            aliases
        ))
        .unwrap()
    }

    fn wait_for(state: &StateHandle, check: impl Fn(&DispatchState) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !check(&state.get()) {
            assert!(Instant::now() < deadline, "timed out in state {:?}", state.get());
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_subscribes_sound_topic_and_aliases() {
        let bus = TopicBus::new();
        let dispatcher = Dispatcher::new(&config(
            r#"[ { "sound": "horn", "topic": "door/bell" }, { "sound": "beep", "topic": "door/lock", "value": "ON" } ]"#,
        ));
        let state = dispatcher.state();

        let runner = {
            let bus = bus.clone();
            thread::spawn(move || dispatcher.run(&bus))
        };

        wait_for(&state, |s| s.is_dispatching());
        assert_eq!(bus.subscriber_count(), 3);
        match state.get() {
            DispatchState::Dispatching { handlers, .. } => assert_eq!(handlers, 3),
            other => panic!("Expected Dispatching, got {:?}", other),
        }

        bus.close("test over");
        let err = runner.join().unwrap().unwrap_err();
        assert!(matches!(err, DispatchError::SubscriptionClosed { .. }));
        assert!(state.get().is_failed());
    }

    #[test]
    fn test_invalid_alias_filter_fails_startup() {
        let bus = TopicBus::new();
        let dispatcher = Dispatcher::new(&config(r#"[ { "sound": "horn", "topic": "door/#/bell" } ]"#));
        let state = dispatcher.state();

        let err = dispatcher.run(&bus).unwrap_err();
        assert!(matches!(err, DispatchError::Bus(_)));
        assert!(state.get().is_failed());
    }

    #[test]
    fn test_closed_bus_fails_immediately() {
        let bus = TopicBus::new();
        bus.close("refused");
        let dispatcher = Dispatcher::new(&config("[]"));

        match dispatcher.run(&bus) {
            Err(DispatchError::Bus(e)) => assert_eq!(e.to_string(), "Bus is closed: refused"),
            other => panic!("Expected bus error, got {:?}", other),
        }
    }
}
