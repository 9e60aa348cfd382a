//! Error types for bean resolution

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by constructors, factory operations and descriptor sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared error source, kept behind an `Arc` so `BeanError` stays `Clone`
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while registering or resolving beans
#[derive(Error, Debug, Clone)]
pub enum BeanError {
    /// Two descriptors map to the same bean name
    #[error("Duplicate bean definition: {name}")]
    DuplicateDefinition { name: String },

    /// No definition is registered under the requested name
    #[error("No bean definition found: {name}")]
    DefinitionNotFound { name: String },

    /// A parameter type has no satisfying bean
    #[error("Bean '{bean}' depends on {dependency}, but no bean provides it")]
    MissingDependency {
        bean: String,
        dependency: &'static str,
    },

    /// A parameter type has several satisfying beans and none matches by name
    #[error("Bean '{bean}' depends on {dependency}, which is ambiguous: {candidates:?}")]
    AmbiguousDependency {
        bean: String,
        dependency: &'static str,
        candidates: Vec<String>,
    },

    /// Resolution re-entered a bean that is still under construction
    #[error("Cyclic dependency detected while resolving '{name}': {}", path.join(" -> "))]
    CyclicDependency { name: String, path: Vec<String> },

    /// A factory operation produced no instance
    #[error("Factory for bean '{name}' returned no instance")]
    NullFactoryResult { name: String },

    /// The constructor or factory operation itself failed
    #[error("Failed to construct bean '{name}': {source}")]
    ConstructionFailure {
        name: String,
        #[source]
        source: SharedError,
    },

    /// A component was described without any constructor
    #[error("Component '{name}' declares no constructor")]
    NoConstructor { name: String },

    /// The bean exists but cannot be viewed as the requested type
    #[error("Bean '{name}' is a {actual}, not a {requested}")]
    TypeMismatch {
        name: String,
        requested: &'static str,
        actual: &'static str,
    },

    /// Definitions are immutable once the context is initialized
    #[error("Registry is locked - cannot register new definitions")]
    Locked,

    /// `init()` was called more than once
    #[error("Context is already initialized")]
    AlreadyInitialized,

    /// `get()` was called before `init()`
    #[error("Context is not initialized")]
    NotInitialized,

    /// A singleton slot was written twice
    #[error("Singleton already stored for bean '{name}'")]
    SingletonAlreadySet { name: String },

    /// The descriptor source failed
    #[error("Descriptor discovery failed: {source}")]
    Discovery {
        #[source]
        source: SharedError,
    },

    /// Internal error
    #[error("Internal bean error: {0}")]
    Internal(String),
}

impl BeanError {
    /// Create a DefinitionNotFound error
    #[inline]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::DefinitionNotFound { name: name.into() }
    }

    /// Create a ConstructionFailure error
    #[inline]
    pub fn construction(name: impl Into<String>, source: BoxError) -> Self {
        Self::ConstructionFailure {
            name: name.into(),
            source: Arc::from(source),
        }
    }

    /// Create a Discovery error
    #[inline]
    pub fn discovery(source: BoxError) -> Self {
        Self::Discovery {
            source: Arc::from(source),
        }
    }

    /// Name of the bean this error is about, if any
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateDefinition { name }
            | Self::DefinitionNotFound { name }
            | Self::CyclicDependency { name, .. }
            | Self::NullFactoryResult { name }
            | Self::ConstructionFailure { name, .. }
            | Self::NoConstructor { name }
            | Self::TypeMismatch { name, .. }
            | Self::SingletonAlreadySet { name } => Some(name),
            Self::MissingDependency { bean, .. } | Self::AmbiguousDependency { bean, .. } => {
                Some(bean)
            }
            Self::Locked
            | Self::AlreadyInitialized
            | Self::NotInitialized
            | Self::Discovery { .. }
            | Self::Internal(_) => None,
        }
    }
}

/// Result type alias for bean operations
pub type Result<T> = std::result::Result<T, BeanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = BeanError::CyclicDependency {
            name: "a".into(),
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic dependency detected while resolving 'a': a -> b -> a"
        );
    }

    #[test]
    fn test_construction_failure_keeps_source() {
        let err = BeanError::construction("db", "connection refused".into());
        let cloned = err.clone();

        assert_eq!(cloned.bean_name(), Some("db"));
        let source = std::error::Error::source(&cloned).unwrap();
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn test_bean_name_for_dependency_errors() {
        let err = BeanError::MissingDependency {
            bean: "userService".into(),
            dependency: "my_app::Repository",
        };
        assert_eq!(err.bean_name(), Some("userService"));
        assert_eq!(BeanError::Locked.bean_name(), None);
    }
}
