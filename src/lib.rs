//! Vendor onboarding assistant. Collects a vendor application through a
//! tool-calling chat loop.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod retrieval;
pub mod telemetry;
pub mod tools;
