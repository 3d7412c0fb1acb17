//! Built-in dry-run tool handlers

mod python_exec;
mod sql_exec;

pub use python_exec::PythonExecTool;
pub use sql_exec::SqlExecTool;
