//! Error types for locator

use thiserror::Error;

/// Boxed error returned by user supplied builders, delegators and initializers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Container result alias.
pub type Result<T, E = ContainerError> = std::result::Result<T, E>;

/// Failures raised while registering or resolving services.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Nothing local, no abstract factory and no peer could provide the name
    #[error("Service '{name}' is not registered{}", not_found_detail(.peers_consulted, .suggestion.as_deref()))]
    ServiceNotFound {
        name: String,
        peers_consulted: usize,
        suggestion: Option<String>,
    },

    /// A name was requested again while it was still being resolved
    #[error("Circular dependency detected while resolving '{name}': {}", .chain.join(" -> "))]
    CircularDependency { name: String, chain: Vec<String> },

    /// Re-registration while override mode is disabled
    #[error("Service '{name}' is already defined and overriding is disabled")]
    DuplicateDefinition { name: String },

    /// A factory, delegator or initializer failed
    #[error("Failed to create service '{name}'")]
    BuilderFailure {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Typed retrieval asked for the wrong concrete type
    #[error("Type cast failed for service '{name}': expected '{expected}'")]
    TypeCastFailed { name: String, expected: &'static str },

    /// Scope lifecycle calls are not implemented by this container
    #[error("Service scopes are not supported (attempted '{operation}')")]
    UnsupportedScope { operation: &'static str },

    /// Parameter resolution failed
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

fn not_found_detail(peers_consulted: &usize, suggestion: Option<&str>) -> String {
    let mut detail = String::new();
    if *peers_consulted > 0 {
        detail.push_str(&format!(" (also checked {peers_consulted} peer container(s))"));
    }
    if let Some(suggestion) = suggestion {
        detail.push_str(&format!(". Did you mean '{suggestion}'?"));
    }
    detail
}

impl ContainerError {
    /// Deepest container error in a chain of nested builder failures.
    pub fn innermost(&self) -> &ContainerError {
        let mut current = self;
        while let ContainerError::BuilderFailure { source, .. } = current {
            match source.downcast_ref::<ContainerError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Names of every service in the failure chain, outermost first.
    pub fn failing_services(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(err) = current {
            current = None;
            match err {
                ContainerError::BuilderFailure { name, source } => {
                    names.push(name.as_str());
                    current = source.downcast_ref::<ContainerError>();
                }
                ContainerError::ServiceNotFound { name, .. }
                | ContainerError::CircularDependency { name, .. }
                | ContainerError::DuplicateDefinition { name }
                | ContainerError::TypeCastFailed { name, .. } => names.push(name.as_str()),
                ContainerError::UnsupportedScope { .. } | ContainerError::Parameter(_) => {}
            }
        }
        names
    }

    /// Full causal chain rendered as `outer: inner: root`.
    pub fn chain_message(&self) -> String {
        let mut parts = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            parts.push(err.to_string());
            source = err.source();
        }
        parts.join(": ")
    }

    /// Whether the root cause is a missing service.
    pub fn is_not_found(&self) -> bool {
        matches!(self.innermost(), ContainerError::ServiceNotFound { .. })
    }

    /// Whether the root cause is a dependency cycle.
    pub fn is_circular(&self) -> bool {
        matches!(self.innermost(), ContainerError::CircularDependency { .. })
    }
}

/// Failures raised while resolving `%placeholder%` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    /// A placeholder names a parameter that does not exist
    #[error("Parameter '{name}' is not defined{}", .referenced_by.as_ref().map(|r| format!(" (referenced by '{r}')")).unwrap_or_default())]
    UnresolvedParameter {
        name: String,
        referenced_by: Option<String>,
    },

    /// Resolving a parameter transitively required itself
    #[error("Circular parameter reference: {}", .chain.join(" -> "))]
    CircularParameter { chain: Vec<String> },

    /// A table or array was interpolated into surrounding text
    #[error("Parameter '{name}' is not a scalar and cannot be embedded in a string")]
    NonScalarInterpolation { name: String },
}

impl ParameterError {
    /// Name of the parameter the error is about.
    pub fn parameter(&self) -> &str {
        match self {
            ParameterError::UnresolvedParameter { name, .. }
            | ParameterError::NonScalarInterpolation { name } => name,
            ParameterError::CircularParameter { chain } => {
                chain.first().map(String::as_str).unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str, source: BoxError) -> ContainerError {
        ContainerError::BuilderFailure {
            name: name.to_string(),
            source,
        }
    }

    #[test]
    fn test_not_found_message_includes_peers_and_suggestion() {
        let err = ContainerError::ServiceNotFound {
            name: "loger".to_string(),
            peers_consulted: 2,
            suggestion: Some("logger".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("'loger' is not registered"));
        assert!(message.contains("2 peer container(s)"));
        assert!(message.contains("Did you mean 'logger'?"));
    }

    #[test]
    fn test_innermost_walks_nested_failures() {
        let root = ContainerError::ServiceNotFound {
            name: "cache".to_string(),
            peers_consulted: 0,
            suggestion: None,
        };
        let err = failure("router", Box::new(failure("view", Box::new(root))));

        assert!(err.is_not_found());
        assert_eq!(err.failing_services(), vec!["router", "view", "cache"]);
    }

    #[test]
    fn test_chain_message_reads_outer_to_inner() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = failure("router", Box::new(failure("view", Box::new(io))));

        assert_eq!(
            err.chain_message(),
            "Failed to create service 'router': Failed to create service 'view': disk gone"
        );
        // a foreign root cause stops the walk at the last container error
        assert!(matches!(err.innermost(), ContainerError::BuilderFailure { name, .. } if name == "view"));
    }

    #[test]
    fn test_circular_message_shows_chain() {
        let err = ContainerError::CircularDependency {
            name: "a".to_string(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.is_circular());
        assert!(err.to_string().ends_with("a -> b -> a"));
    }

    #[test]
    fn test_parameter_error_messages() {
        let err = ParameterError::UnresolvedParameter {
            name: "db.host".to_string(),
            referenced_by: Some("dsn".to_string()),
        };
        assert_eq!(err.to_string(), "Parameter 'db.host' is not defined (referenced by 'dsn')");
        assert_eq!(err.parameter(), "db.host");

        let wrapped: ContainerError = err.into();
        assert!(matches!(wrapped, ContainerError::Parameter(_)));
    }
}
