//! Explicit resource scopes for storage handle acquisition.

use std::fmt;

/// Identifies the caller a pooled storage handle is bound to.
///
/// Callers pass this explicitly instead of the pool inspecting the current
/// thread or task, so handle ownership is visible at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeToken(String);

impl ScopeToken {
    const MAINTENANCE: &'static str = "__maintenance__";

    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Scope used by schema setup, retention sweeps and other housekeeping.
    pub fn maintenance() -> Self {
        Self(Self::MAINTENANCE.to_string())
    }

    /// Scope for work done on behalf of an agent.
    pub fn for_agent(agent: &str) -> Self {
        Self(format!("agent:{agent}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeToken {
    fn from(scope: &str) -> Self {
        Self::new(scope)
    }
}
