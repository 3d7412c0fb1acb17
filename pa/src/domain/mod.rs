//! Domain types for pipeagent
//!
//! - `PipelineDefinition` / `TableDefinition`: the validated shape of a model's
//!   pipeline proposal. Only the schema validator constructs them.
//! - `RequestOutcome` / `BatchRecord`: the per-request result and batch input records.

mod outcome;
mod pipeline;

pub use outcome::{BatchRecord, RequestOutcome};
pub use pipeline::{PipelineDefinition, TableDefinition};
