//! Application lifecycle: wires the components together from configuration,
//! runs them until a signal or quit request, then tears them down.

mod cycle;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::EviveOrchestrator;
pub use types::{ComponentState, ShutdownReason};
