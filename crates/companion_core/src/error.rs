//! Error taxonomy shared by every engine.
//!
//! The split matters: `PipelineError` variants are things the dispatcher
//! recovers from locally (timeout, unavailable, budget policy outcomes are
//! not even represented here — see `companion_budget::Admission`).
//! `invalid_event` and `internal_invariant_violation` are the only fatal
//! kinds; everything else degrades.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("rate limited")]
    RateLimited,

    #[error("dependency timeout: {component} after {elapsed_ms}ms")]
    DependencyTimeout { component: String, elapsed_ms: u64 },

    #[error("dependency unavailable: {component}: {reason}")]
    DependencyUnavailable { component: String, reason: String },

    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),
}

impl PipelineError {
    /// Whether this error is fatal to the overall request, as opposed to
    /// being recoverable via a documented degraded path.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidEvent(_)
                | PipelineError::AuthFailed(_)
                | PipelineError::RateLimited
                | PipelineError::InternalInvariantViolation(_)
        )
    }

    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::InvalidEvent(_) => 400,
            PipelineError::AuthFailed(_) => 401,
            PipelineError::RateLimited => 429,
            PipelineError::DependencyTimeout { .. } | PipelineError::DependencyUnavailable { .. } => {
                200 // recovered locally; caller still gets 200 partial
            }
            PipelineError::InternalInvariantViolation(_) => 500,
        }
    }

    /// A short machine-readable tag suitable for `degraded_reasons`.
    pub fn degraded_reason(&self) -> String {
        match self {
            PipelineError::DependencyTimeout { component, .. } => format!("{component}_timeout"),
            PipelineError::DependencyUnavailable { component, .. } => {
                format!("{component}_unavailable")
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_match_spec() {
        assert!(PipelineError::InvalidEvent("x".into()).is_fatal());
        assert!(PipelineError::AuthFailed("x".into()).is_fatal());
        assert!(PipelineError::RateLimited.is_fatal());
        assert!(PipelineError::InternalInvariantViolation("x".into()).is_fatal());
    }

    #[test]
    fn recoverable_kinds_are_not_fatal() {
        let timeout = PipelineError::DependencyTimeout {
            component: "memory".into(),
            elapsed_ms: 600,
        };
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.degraded_reason(), "memory_timeout");
        assert_eq!(timeout.http_status(), 200);
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(PipelineError::InvalidEvent("x".into()).http_status(), 400);
        assert_eq!(PipelineError::AuthFailed("x".into()).http_status(), 401);
        assert_eq!(PipelineError::RateLimited.http_status(), 429);
        assert_eq!(
            PipelineError::InternalInvariantViolation("x".into()).http_status(),
            500
        );
    }
}
