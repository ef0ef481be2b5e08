//! Vendor onboarding: session facts and the assistant prompt.
//!
//! A session collects three sections (company information, compliance
//! certifications, data access requirements). Sessions are created on first
//! write and live for the lifetime of the process.

pub mod model;
pub mod prompts;
pub mod routes;
pub mod store;

pub use model::{OnboardingSection, Progress, SessionSnapshot, SessionUpdate, VendorSession};
pub use prompts::{WELCOME_MESSAGE, new_session_id, vendor_system_prompt};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use store::{InMemorySessionStore, SessionStore};
