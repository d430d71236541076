/// State management module
///
/// Lifecycle of the dispatcher, observable from other threads.

pub mod dispatch_state;

// Re-export commonly used types
pub use dispatch_state::{DispatchState, DispatchStateMachine, TransitionError};
