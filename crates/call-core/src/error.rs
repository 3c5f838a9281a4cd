//! Error types for call-core
//!
//! Errors are grouped the way the call lifecycle treats them:
//!
//! - **Registry errors** ([`RegistryError`]) - what a single exchange with the
//!   call registry can produce: transport failures, rejections, a missing
//!   bearer credential or an undecodable response.
//! - **Task errors** ([`TaskError`]) - a registry error attributed to the
//!   async task that hit it. Creation and join failures drive the machine
//!   into `failed_to_connect`; end-call failures are logged and absorbed.
//! - **Handle errors** ([`CallError`]) - misuse of a running machine, such as
//!   sending to an actor that has shut down, posting a runtime-only event,
//!   or invalid configuration.
//!
//! None of these is fatal: every failure path leaves the machine in `idle`
//! or `failed_to_connect`.

use thiserror::Error;

use crate::events::EventKind;

/// Result type alias for call-core handle operations
pub type CallResult<T> = Result<T, CallError>;

/// Result type alias for registry exchanges
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure of a single request/response exchange with the call registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry unreachable, connection reset, request timed out
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The registry answered with a non-success status
    #[error("Rejected by registry ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No bearer credential was available for the request
    #[error("Missing bearer credential")]
    MissingCredential,

    /// The registry answered but the body could not be interpreted
    #[error("Invalid registry response: {reason}")]
    InvalidResponse { reason: String },
}

impl RegistryError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport { reason: reason.into() }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse { reason: reason.into() }
    }

    /// Message supplied by the registry, when it supplied one
    pub fn registry_message(&self) -> Option<&str> {
        match self {
            RegistryError::Rejected { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Check if retrying the same request could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            RegistryError::Transport { .. } => true,
            RegistryError::Rejected { status, .. } => *status >= 500,
            RegistryError::MissingCredential | RegistryError::InvalidResponse { .. } => false,
        }
    }

    /// Check if error indicates an authentication issue
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            RegistryError::MissingCredential | RegistryError::Rejected { status: 401, .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            RegistryError::Transport { .. } => "network",
            RegistryError::Rejected { .. } => "registry",
            RegistryError::MissingCredential => "credential",
            RegistryError::InvalidResponse { .. } => "protocol",
        }
    }
}

/// Failure of one of the machine's async tasks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Call creation failed: {source}")]
    CallCreation { source: RegistryError },

    #[error("Call join failed: {source}")]
    CallJoin { source: RegistryError },

    #[error("Call end failed: {source}")]
    CallEnd { source: RegistryError },
}

impl TaskError {
    /// The underlying registry error
    pub fn registry_error(&self) -> &RegistryError {
        match self {
            TaskError::CallCreation { source }
            | TaskError::CallJoin { source }
            | TaskError::CallEnd { source } => source,
        }
    }

    /// Message supplied by the registry, when it supplied one
    pub fn message(&self) -> Option<&str> {
        self.registry_error().registry_message()
    }

    pub fn is_recoverable(&self) -> bool {
        self.registry_error().is_recoverable()
    }

    pub fn category(&self) -> &'static str {
        self.registry_error().category()
    }
}

/// Errors surfaced to callers of a running machine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Call machine has stopped")]
    MachineStopped,

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Timed out after {duration_ms}ms waiting for {waiting_for}")]
    WaitTimeout { waiting_for: String, duration_ms: u64 },

    #[error("{event} is posted by the call runtime and cannot be sent through a handle")]
    InternalEvent { event: EventKind },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl CallError {
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if the operation can be retried on the same handle
    pub fn is_recoverable(&self) -> bool {
        match self {
            CallError::WaitTimeout { .. } => true,
            CallError::Registry(e) => e.is_recoverable(),
            CallError::MachineStopped
            | CallError::InvalidConfiguration { .. }
            | CallError::InternalEvent { .. } => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            CallError::MachineStopped | CallError::WaitTimeout { .. } => "machine",
            CallError::InvalidConfiguration { .. } => "configuration",
            CallError::InternalEvent { .. } => "usage",
            CallError::Registry(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_message_only_from_rejections() {
        let rejected = RegistryError::rejected(404, "Receiver not found");
        assert_eq!(rejected.registry_message(), Some("Receiver not found"));

        let transport = RegistryError::transport("connection refused");
        assert_eq!(transport.registry_message(), None);

        let empty = RegistryError::rejected(500, "");
        assert_eq!(empty.registry_message(), None);
    }

    #[test]
    fn test_recoverability() {
        assert!(RegistryError::transport("reset").is_recoverable());
        assert!(RegistryError::rejected(503, "unavailable").is_recoverable());
        assert!(!RegistryError::rejected(400, "Cannot join ended call").is_recoverable());
        assert!(!RegistryError::MissingCredential.is_recoverable());
    }

    #[test]
    fn test_task_error_carries_registry_message() {
        let error = TaskError::CallCreation {
            source: RegistryError::rejected(404, "Receiver not found"),
        };
        assert_eq!(error.message(), Some("Receiver not found"));
        assert_eq!(error.category(), "registry");
        assert_eq!(
            error.to_string(),
            "Call creation failed: Rejected by registry (404): Receiver not found"
        );
    }

    #[test]
    fn test_auth_errors() {
        assert!(RegistryError::MissingCredential.is_auth_error());
        assert!(RegistryError::rejected(401, "Authentication required").is_auth_error());
        assert!(!RegistryError::rejected(404, "Call not found").is_auth_error());
    }

    #[test]
    fn test_internal_event_is_a_usage_error() {
        let error = CallError::InternalEvent { event: EventKind::Timeout };
        assert_eq!(error.category(), "usage");
        assert!(!error.is_recoverable());
        assert_eq!(
            error.to_string(),
            "TIMEOUT is posted by the call runtime and cannot be sent through a handle"
        );
    }
}
