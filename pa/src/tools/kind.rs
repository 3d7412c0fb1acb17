//! Closed set of supported tool kinds

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A tool the model may be told about
///
/// Config names outside this set fail deserialization, so an unknown tool is a
/// startup error rather than a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "system.ai.python_exec")]
    PythonExec,
    #[serde(rename = "system.ai.sql_exec")]
    SqlExec,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::PythonExec, ToolKind::SqlExec];

    /// Name as written in the config file
    pub fn name(&self) -> &'static str {
        match self {
            Self::PythonExec => "system.ai.python_exec",
            Self::SqlExec => "system.ai.sql_exec",
        }
    }

    /// Look up a kind by its config name
    pub fn from_name(name: &str) -> Option<Self> {
        debug!(%name, "ToolKind::from_name: called");
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(ToolKind::from_name("system.ai.python_exec"), Some(ToolKind::PythonExec));
        assert_eq!(ToolKind::from_name("system.ai.sql_exec"), Some(ToolKind::SqlExec));
        assert_eq!(ToolKind::from_name("system.ai.shell"), None);
    }

    #[test]
    fn test_serde_names_match_display() {
        for kind in ToolKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
            let back: ToolKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }
}
