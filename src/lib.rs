//! # di-container - String-Keyed Dependency Injection for Rust
//!
//! A dependency injection container that maps string ids to definitions and
//! builds them on demand, resolving constructor and setter dependencies
//! through a runtime type registry.
//!
//! ## Features
//!
//! - **String ids** - type names, interface names or arbitrary aliases
//! - **Singleton or fresh** - `get` caches per id, `make` always builds anew
//! - **Constructor and setter injection** - bind parameters and methods per id
//! - **Factories** - closures that may receive the container or resolved arguments
//! - **Autowiring** - opt-in construction of unregistered types
//! - **Service providers** - deferred two-phase register/boot units
//! - **Lock-free storage** - `DashMap` with `ahash` behind every map
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use di_container::{Container, Parameter, TypeDescriptor, TypeRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Database;
//!
//! struct UserService {
//!     db: Arc<Database>,
//!     table: String,
//! }
//!
//! let types = TypeRegistry::new();
//! types.register(TypeDescriptor::builder::<Database>("Database").default_constructor().build());
//! types.register(
//!     TypeDescriptor::builder::<UserService>("UserService")
//!         .constructor(
//!             [Parameter::typed("db", "Database"), Parameter::primitive("table", "string")],
//!             |args| Ok(UserService { db: args.get("db")?, table: args.get("table")? }),
//!         )
//!         .build(),
//! );
//!
//! let container = Container::with_types(types);
//! container.set_type("Database").unwrap();
//! container.set_type("UserService").unwrap().set_param("table", "users").unwrap();
//!
//! let users = container.get_as::<UserService>("UserService").unwrap();
//! let db = container.get_as::<Database>("Database").unwrap();
//! assert!(Arc::ptr_eq(&users.db, &db));
//! assert_eq!(users.table, "users");
//! ```
//!
//! ## Definitions
//!
//! ```rust
//! use di_container::{Container, Factory, Value};
//!
//! let container = Container::new();
//!
//! // Literals come back unchanged
//! container.set("debug", true).unwrap();
//! container.set("nothing", ()).unwrap();
//!
//! // Factories run on every get
//! container.set("greeting", Factory::new(|| "hello")).unwrap();
//!
//! // Factories may ask for the container
//! container
//!     .set("loud", Factory::with_container(|c| {
//!         Ok(c.get("greeting")?.as_str().unwrap_or_default().to_uppercase())
//!     }))
//!     .unwrap();
//!
//! assert_eq!(container.get("nothing").unwrap(), Value::Null);
//! assert_eq!(container.get("loud").unwrap().as_str(), Some("HELLO"));
//! ```
//!
//! ## Derive
//!
//! With the `derive` feature, `#[derive(Component)]` generates the
//! descriptor from a struct's fields:
//!
//! ```rust
//! # #[cfg(feature = "derive")] {
//! use di_container::{Component, Container, TypeRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Component, Default)]
//! struct Mailer;
//!
//! #[derive(Component)]
//! struct Newsletter {
//!     mailer: Arc<Mailer>,
//!     #[inject(default = 10)]
//!     batch: i64,
//! }
//!
//! let types = TypeRegistry::new();
//! types.register_component::<Mailer>();
//! types.register_component::<Newsletter>();
//!
//! let container = Container::with_types(types);
//! container.autowire();
//!
//! let newsletter = container.get_as::<Newsletter>("Newsletter").unwrap();
//! assert_eq!(newsletter.batch, 10);
//! # }
//! ```

mod container;
mod definition;
mod error;
mod introspect;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolver;
mod storage;
mod value;

pub use container::*;
pub use definition::{Bindings, Definition, DefinitionEntry, Factory};
pub use error::*;
pub use introspect::*;
pub use provider::{ProviderPhase, ProviderRef, ProviderRegistry, ServiceProvider};
pub use storage::DefinitionStore;
pub use value::*;

#[cfg(feature = "derive")]
pub use di_container_derive::Component;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        bindings, Arguments, Bindings, Container, Definition, DefinitionEntry, DiError, Factory,
        Instance, Parameter, ProviderRef, Result, ServiceProvider, TypeDescriptor, TypeRegistry,
        Value,
    };

    #[cfg(feature = "derive")]
    pub use crate::Component;

    pub use std::sync::Arc;
}
