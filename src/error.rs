//! Error types for dependency injection

use thiserror::Error;

/// Errors that can occur during dependency injection operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Id was not found in the container and could not be autowired
    #[error("The id \"{id}\" is not found in the container")]
    NotFound { id: String },

    /// Ids must be non-empty strings
    #[error("Invalid id: ids must be non-empty strings")]
    InvalidId,

    /// Definition was rejected at registration
    #[error("Invalid definition: {reason}")]
    InvalidDefinition { reason: String },

    /// Parameter or method binding attached to an unsuitable id
    #[error("Invalid binding for \"{id}\": {reason}")]
    InvalidBinding { id: String, reason: String },

    /// `set_param`/`set_method` was called before any `set`
    #[error("No definition selected: call `set` before binding parameters or methods")]
    NoDefinitionSelected,

    /// `make` or `call` on an id that is not backed by a type
    #[error("The id \"{id}\" is not bound to a type: make and call only work on types")]
    NotConstructible { id: String },

    /// `call_function` received something other than a factory
    #[error("call_function expects a factory")]
    NotCallable,

    /// Provider reference was rejected
    #[error("Invalid service provider {name}: {reason}")]
    InvalidProvider { name: String, reason: String },

    /// Malformed batch input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required parameter had neither a binding, a resolvable type nor a default
    #[error("Too few arguments to {type_name}: parameter `{parameter}` has no value and no default")]
    MissingArgument { type_name: String, parameter: String },

    /// Introspection was asked about a type it does not know
    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    /// Introspection was asked about a method the type does not declare
    #[error("Unknown method {type_name}::{method}")]
    UnknownMethod { type_name: String, method: String },

    /// A value could not be converted into the expected shape
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Constructor or factory failed to create a value
    #[error("Failed to create {type_name}: {reason}")]
    CreationFailed { type_name: String, reason: String },
}

/// Coarse classification of [`DiError`] so callers can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Id (or named value) absent
    NotFound,
    /// Misuse of the container API
    InvalidUsage,
    /// Malformed batch input
    InvalidArgument,
    /// Construction could not complete
    ConstructionFailure,
}

impl DiError {
    /// Create a NotFound error for an id
    #[inline]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an InvalidDefinition error
    #[inline]
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            reason: reason.into(),
        }
    }

    /// Create an InvalidBinding error
    #[inline]
    pub fn invalid_binding(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidProvider error
    #[inline]
    pub fn invalid_provider(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProvider {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::MissingArgument { .. } | Self::TypeMismatch { .. } | Self::CreationFailed { .. } => {
                ErrorKind::ConstructionFailure
            }
            Self::InvalidId
            | Self::InvalidDefinition { .. }
            | Self::InvalidBinding { .. }
            | Self::NoDefinitionSelected
            | Self::NotConstructible { .. }
            | Self::NotCallable
            | Self::InvalidProvider { .. }
            | Self::UnknownType { .. }
            | Self::UnknownMethod { .. } => ErrorKind::InvalidUsage,
        }
    }

    /// True for [`ErrorKind::NotFound`]
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True for [`ErrorKind::InvalidUsage`]
    #[inline]
    pub fn is_container_error(&self) -> bool {
        self.kind() == ErrorKind::InvalidUsage
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
