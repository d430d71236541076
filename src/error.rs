use std::path::PathBuf;

use thiserror::Error;

/// Soundboard errors using thiserror for structured error handling.
///
/// Dropped payloads and unknown sounds are not errors; they never show up here.
/// Everything below is either logged by a handler and skipped, or surfaced
/// by the dispatcher as a process-level failure.

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Sound directory {0} has no candidate files")]
    NoCandidates(PathBuf),

    #[error("Filesystem error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to launch player: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for player: {command}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to connect to broker {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to subscribe to {filter}")]
    Subscribe {
        filter: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Bus is closed: {0}")]
    Closed(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("Subscription {filter} ended: {reason}")]
    SubscriptionClosed { filter: String, reason: String },

    #[error("Failed to start handler thread for {filter}")]
    ThreadSpawnFailed {
        filter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Handler thread for {0} panicked")]
    HandlerPanicked(String),

    #[error(transparent)]
    Transition(#[from] crate::state::TransitionError),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
