//! Session state machine and the handle the presentation layer drives it with.

mod command;
mod controller;
mod state;

pub use command::{CommandOutcome, SessionCommand, SessionHandle, SessionRequest};
pub use controller::{Completion, SessionController, SessionStats};
pub use state::SessionState;
