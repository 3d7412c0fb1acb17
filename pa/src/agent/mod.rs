//! Request orchestration
//!
//! Turns request text into generated pipeline code plus deployment settings,
//! one linear chain of steps per request, many requests concurrently.

mod error;
mod orchestrator;

pub use error::AgentError;
pub use orchestrator::{DeploymentContext, RequestOrchestrator};
