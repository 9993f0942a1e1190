//! locator - a named service container with `%placeholder%` parameters.
//!
//! ```
//! use locator::{into_service, ServiceContainer};
//!
//! #[derive(Default)]
//! struct Mailer;
//!
//! let container = ServiceContainer::new();
//! container.register_invokable::<Mailer>("mailer").unwrap();
//! container.alias("mail", "mailer").unwrap();
//! container.set("answer", into_service(42u32));
//!
//! assert!(container.has("Mail"));
//! assert!(container.get_as::<Mailer>("mail").is_ok());
//! assert_eq!(*container.get_as::<u32>("answer").unwrap(), 42);
//! ```

pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;
pub mod parameters;

// Re-export commonly used items for convenience
pub use config::{ConfigLoader, ContainerConfig, ServicesConfig};
pub use errors::ConfigError;
pub use infrastructure::container::{
    into_service, BoxError, ContainerError, ContainerStats, Service, ServiceContainer,
    ServiceLocator, ServiceName,
};
pub use infrastructure::{build_container, Module, ModuleManager, ProviderCatalog};
pub use locator_types::ParameterError;
pub use parameters::ParameterStore;
