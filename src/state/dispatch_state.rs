/// Dispatcher state machine
///
/// `Disconnected → Connecting → Dispatching → Failed`. There is no way back:
/// the process is expected to exit once the dispatcher has failed.

use std::time::Instant;

/// State of the dispatcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing started yet
    Disconnected,

    /// Connecting to the broker and subscribing
    Connecting,

    /// Handler threads are running
    Dispatching { since: Instant, handlers: usize },

    /// Connection failed or a handler died
    Failed { reason: String },
}

impl DispatchState {
    pub fn is_dispatching(&self) -> bool {
        matches!(self, DispatchState::Dispatching { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchState::Failed { .. })
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            DispatchState::Disconnected => "Disconnected",
            DispatchState::Connecting => "Connecting...",
            DispatchState::Dispatching { .. } => "Dispatching",
            DispatchState::Failed { .. } => "Failed",
        }
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        DispatchState::Disconnected
    }
}

/// Invalid state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Connecting was already started
    AlreadyStarted,

    /// Dispatching requires a connection in progress
    NotConnecting,

    /// Failed is terminal
    AlreadyFailed,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyStarted => write!(f, "Dispatcher was already started"),
            TransitionError::NotConnecting => write!(f, "Dispatcher is not connecting"),
            TransitionError::AlreadyFailed => write!(f, "Dispatcher has already failed"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// State machine for dispatcher transitions
#[derive(Debug, Default)]
pub struct DispatchStateMachine {
    state: DispatchState,
}

impl DispatchStateMachine {
    /// Create a new state machine in the Disconnected state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// Transition from Disconnected to Connecting
    pub fn begin_connect(&mut self) -> Result<(), TransitionError> {
        match self.state {
            DispatchState::Disconnected => {
                self.state = DispatchState::Connecting;
                Ok(())
            }
            DispatchState::Failed { .. } => Err(TransitionError::AlreadyFailed),
            _ => Err(TransitionError::AlreadyStarted),
        }
    }

    /// Transition from Connecting to Dispatching
    pub fn mark_dispatching(&mut self, handlers: usize) -> Result<(), TransitionError> {
        match self.state {
            DispatchState::Connecting => {
                self.state = DispatchState::Dispatching {
                    since: Instant::now(),
                    handlers,
                };
                Ok(())
            }
            DispatchState::Failed { .. } => Err(TransitionError::AlreadyFailed),
            _ => Err(TransitionError::NotConnecting),
        }
    }

    /// Enter the terminal Failed state, keeping the first reason
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.state.is_failed() {
            self.state = DispatchState::Failed { reason: reason.into() };
        }
    }
}
