//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use di_container::{
    bindings, Container, Factory, Parameter, ProviderRef, Result, ServiceProvider,
    TypeDescriptor, TypeRegistry,
};
use std::sync::{Arc, RwLock};

// Example services
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
    table: String,
    page_size: RwLock<i64>,
}

struct DatabaseProvider;

impl ServiceProvider for DatabaseProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container
            .set_type("Database")?
            .set_param("url", "postgres://localhost/mydb")?;
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        println!("  [App] Warming up the database connection...");
        container.get("Database")?;
        Ok(())
    }
}

fn types() -> TypeRegistry {
    let types = TypeRegistry::new();
    types.register(
        TypeDescriptor::builder::<Database>("Database")
            .constructor([Parameter::primitive("url", "string")], |args| {
                Ok(Database {
                    url: args.get("url")?,
                })
            })
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<UserService>("UserService")
            .constructor(
                [
                    Parameter::typed("db", "Database"),
                    Parameter::primitive("table", "string").with_default("users"),
                ],
                |args| {
                    Ok(UserService {
                        db: args.get("db")?,
                        table: args.get("table")?,
                        page_size: RwLock::new(10),
                    })
                },
            )
            .method(
                "set_page_size",
                [Parameter::primitive("size", "int")],
                |service: &UserService, args| {
                    *service.page_size.write().unwrap() = args.get("size")?;
                    Ok(())
                },
            )
            .build(),
    );
    types
}

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    #[cfg(feature = "logging")]
    {
        di_container::logging::init();
    }

    println!("=== di-container Logging Demo ===\n");

    // Create container (logs: "Creating new DI container")
    let container = Container::with_types(types());

    // Register a provider (logs: "Registering service provider")
    container.register_provider(DatabaseProvider).unwrap();

    // Register definitions (logs: "Registering definition", "Binding method")
    container
        .set_type("UserService")
        .unwrap()
        .set_method("set_page_size", bindings! { "size" => 50 })
        .unwrap();
    container
        .set("request_id", Factory::new(|| "req-12345"))
        .unwrap();

    // First resolution runs the providers (logs: "Running service provider")
    let _users = container.get("UserService").unwrap();

    // Cached on the second call (logs: "Service resolved from singleton cache")
    let _users = container.get("UserService").unwrap();

    // Fresh instance every time
    let _fresh = container.make("UserService").unwrap();

    // Factories run on every get
    let _request = container.get("request_id").unwrap();

    // Unknown ids fail (logs: "Service not found in container")
    let missing = container.get("Cache");
    assert!(missing.is_err());

    // Named providers that are not providers are rejected
    let invalid = container.register_provider(ProviderRef::named("Database"));
    assert!(invalid.is_err());

    // Autowiring builds unregistered types (logs: "Autowiring enabled")
    container.autowire();
    let _autowired = container.make("UserService").unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
