//! Agent module: the vendor onboarding turn loop.

pub mod agent_loop;

pub use agent_loop::{AgentDeps, NO_RESPONSE, TurnOutcome, TurnState, VendorAgent};
