use std::fmt;

/// Failures that stop a run before any block executes.
/// Problems inside the tree are reported as diagnostics instead.
#[derive(Debug)]
pub enum RunError {
    UndefinedWorkspace { name: String, available: Vec<String> },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UndefinedWorkspace { name, available } => write!(
                f,
                "undefined workspace: '{}' (available workspaces: {})",
                name,
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            ),
        }
    }
}

impl std::error::Error for RunError {}
