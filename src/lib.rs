//! MQTT soundboard
//!
//! Listens on an MQTT broker for sound triggers and plays matching local audio
//! files through an external player command.

pub mod alias;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod messaging;
pub mod playback;
pub mod resolver;
pub mod sound;
pub mod state;
pub mod trigger;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{AppResult, BusError, ConfigError, DispatchError, PlaybackError, ResolveError};
pub use resolver::SoundResolver;
pub use sound::SoundName;
