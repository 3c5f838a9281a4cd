pub mod actions;
pub mod executor;
pub mod history;

pub use executor::{CallMachine, Effect, ProcessOutcome};
pub use history::{TransitionHistory, TransitionRecord};
