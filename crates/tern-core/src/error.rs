//! Unified error types for the Tern core.
//!
//! Every failure the core reports to a caller is a closed, typed variant
//! carrying the offending key. Handler failures are never surfaced here:
//! they are contained and logged by the dispatcher.

use thiserror::Error;

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors reported by handler registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The handler is already registered for this event, at some priority.
    #[error("handler '{handler}' is already registered for event '{event}'")]
    DuplicateHandler {
        /// The event name.
        event: String,
        /// Display name of the handler.
        handler: String,
    },

    /// The handler is not registered for this event.
    #[error("handler '{handler}' is not registered for event '{event}'")]
    HandlerNotFound {
        /// The event name.
        event: String,
        /// Display name of the handler.
        handler: String,
    },

    /// The event name does not belong to the dispatcher's namespace.
    #[error("unknown {namespace} event name '{name}'")]
    UnknownEvent {
        /// The namespace the dispatcher is restricted to.
        namespace: &'static str,
        /// The rejected name.
        name: String,
    },
}

// =============================================================================
// Capability Errors
// =============================================================================

/// Errors reported by the capability registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The name is declared by the owner or was already added.
    #[error("attribute '{name}' is already defined on {owner}")]
    Conflict {
        /// Identity of the owning object.
        owner: String,
        /// The conflicting name.
        name: String,
    },

    /// `set` or `remove` on a name that was never added.
    #[error("attribute '{name}' was never added to {owner}")]
    NotAdded {
        /// Identity of the owning object.
        owner: String,
        /// The missing name.
        name: String,
    },

    /// Neither a declared attribute nor an added capability.
    #[error("{owner} has no attribute '{name}'")]
    NotFound {
        /// Identity of the owning object.
        owner: String,
        /// The requested name.
        name: String,
    },

    /// The stored value is not of the requested type.
    #[error("attribute '{name}' is not of type {expected}")]
    TypeMismatch {
        /// The requested name.
        name: String,
        /// The requested type name.
        expected: &'static str,
    },

    /// The name is a built-in method, reachable only through the owner's API.
    #[error("'{name}' is a built-in method of {owner}")]
    Builtin {
        /// Identity of the owning object.
        owner: String,
        /// The requested name.
        name: String,
    },
}

// =============================================================================
// Encode Errors
// =============================================================================

/// Errors from encoding an outbound line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A part of the line contains CR, LF or NUL.
    #[error("{part} contains a line break or NUL: {value:?}")]
    ForbiddenCharacter {
        /// Which part of the line, e.g. `parameter 1`.
        part: String,
        /// The offending value.
        value: String,
    },

    /// A parameter other than the last is empty, contains a space or
    /// starts with `:`.
    #[error("parameter {index} can only be sent last: {param:?}")]
    MiddleParam {
        /// Zero-based parameter index.
        index: usize,
        /// The offending parameter.
        param: String,
    },

    /// The command is empty or contains whitespace.
    #[error("invalid command: {command:?}")]
    InvalidCommand {
        /// The offending command.
        command: String,
    },
}

// =============================================================================
// Context Errors
// =============================================================================

/// Errors from outbound operations on a network context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The connection driver dropped the outbound queue.
    #[error("connection for network '{network}' is closed")]
    ConnectionClosed {
        /// The network name.
        network: String,
    },

    /// The line cannot be sent as a single protocol line.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

// =============================================================================
// Configuration Key Errors
// =============================================================================

/// Errors from dot-path configuration lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// No value exists at the path.
    #[error("cannot find '{key}'")]
    NotFound {
        /// The full requested key.
        key: String,
    },

    /// An intermediate element is not a mapping.
    #[error("element '{path}' is not a mapping")]
    NotAMapping {
        /// The path of the offending element.
        path: String,
    },

    /// The key contains an empty segment.
    #[error("empty sub-key after '{path}'")]
    EmptyKey {
        /// The path leading up to the empty segment.
        path: String,
    },
}

impl KeyError {
    /// Returns `true` if the key is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors from validating configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A dot-path lookup failed for a reason other than absence.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The root mapping has no `networks` section.
    #[error("no networks found")]
    NoNetworks,

    /// Required options are missing for a network, even after fallback.
    #[error("network '{network}' is missing the following options: {}", .keys.join(", "))]
    MissingKeys {
        /// The network name.
        network: String,
        /// The missing keys.
        keys: Vec<String>,
    },

    /// The network lists no server.
    #[error("network '{network}' has no server")]
    NoServers {
        /// The network name.
        network: String,
    },

    /// A server entry could not be parsed.
    #[error("invalid server '{value}': {reason}")]
    InvalidServer {
        /// The offending entry.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A value has the wrong shape.
    #[error("invalid value for '{key}': expected {expected}")]
    InvalidValue {
        /// Dot-path of the value.
        key: String,
        /// Description of the expected shape.
        expected: &'static str,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registration operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result type for line encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Result type for configuration lookups.
pub type KeyResult<T> = Result<T, KeyError>;

/// Result type for configuration validation.
pub type ValidationResult<T> = Result<T, ValidationError>;
