//! Shared fixtures for the integration tests.
//!
//! Mailers record every message they send so tests can assert on output.

#![allow(dead_code)]

use di_container::{
    bindings, Arguments, Container, Exception, Instance, Parameter, Result, ServiceProvider,
    TypeDescriptor, TypeRegistry,
};
use std::ops::Deref;
use std::sync::{Arc, Mutex, RwLock};

// =============================================================================
// Mailers
// =============================================================================

#[derive(Default)]
pub struct Mailer {
    sent: Mutex<Vec<String>>,
}

impl Mailer {
    pub fn send(&self, email: &str, body: &str) -> String {
        let line = format!("The message ({body}) was sent to : {email}");
        self.sent.lock().unwrap().push(line.clone());
        line
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MarketingMailer {
    sent: Mutex<Vec<String>>,
}

impl MarketingMailer {
    pub fn send(&self, email: &str, body: &str) -> String {
        let line = format!("The campaign ({body}) was sent to : {email}");
        self.sent.lock().unwrap().push(line.clone());
        line
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

/// Send through whichever mailer the instance holds
pub fn deliver(mailer: &Instance, email: &str, body: &str) -> String {
    if let Some(mailer) = mailer.downcast_ref::<Mailer>() {
        mailer.send(email, body)
    } else if let Some(mailer) = mailer.downcast_ref::<MarketingMailer>() {
        mailer.send(email, body)
    } else {
        panic!("{} is not a mailer", mailer.type_name())
    }
}

fn send_method(args: &Arguments) -> Result<(String, String)> {
    Ok((args.get("email")?, args.get("body")?))
}

// =============================================================================
// Users
// =============================================================================

pub struct Parcel {
    pub height: i64,
    pub width: i64,
    pub length: i64,
}

pub struct User {
    mailer: Instance,
    name: RwLock<String>,
    email: RwLock<String>,
}

impl User {
    pub fn new(mailer: Instance) -> Self {
        Self {
            mailer,
            name: RwLock::default(),
            email: RwLock::default(),
        }
    }

    pub fn with_identity(mailer: Instance, name: String, email: String) -> Self {
        Self {
            mailer,
            name: RwLock::new(name),
            email: RwLock::new(email),
        }
    }

    pub fn set_name(&self, name: &str) {
        *self.name.write().unwrap() = name.to_owned();
    }

    pub fn set_email(&self, email: &str) {
        *self.email.write().unwrap() = email.to_owned();
    }

    pub fn name(&self) -> String {
        self.name.read().unwrap().clone()
    }

    pub fn email(&self) -> String {
        self.email.read().unwrap().clone()
    }

    pub fn mailer(&self) -> &Instance {
        &self.mailer
    }

    pub fn send_welcome_mail(&self) -> String {
        deliver(&self.mailer, &self.email(), &format!("Hello \"{}\"", self.name()))
    }
}

pub struct Admin(User);

impl Deref for Admin {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

/// Takes `MarketingMailer|Mailer`
pub struct SuperAdmin(User);

impl Deref for SuperAdmin {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

/// Takes any `MailerInterface`
pub struct Customer(User);

impl Customer {
    pub fn send_welcome_mail(&self) -> String {
        deliver(
            self.0.mailer(),
            &self.0.email(),
            &format!("Hi , Customer \"{}\"", self.0.name()),
        )
    }
}

impl Deref for Customer {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

// =============================================================================
// Setter injection targets
// =============================================================================

#[derive(Default)]
pub struct Notification {
    mailer: RwLock<Option<Arc<Mailer>>>,
}

impl Notification {
    pub fn set_mailer(&self, mailer: Arc<Mailer>) {
        *self.mailer.write().unwrap() = Some(mailer);
    }

    pub fn mailer(&self) -> Option<Arc<Mailer>> {
        self.mailer.read().unwrap().clone()
    }

    pub fn push_message(&self, name: &str, email: &str) -> String {
        let mailer = self.mailer().expect("mailer was not injected");
        mailer.send(email, &format!("Notification to : \"{name}\""))
    }

    pub fn push_message_using_mailer(mailer: &Mailer, name: &str, email: &str) -> String {
        mailer.send(email, &format!("Notification using mailer to : \"{name}\""))
    }
}

#[derive(Default)]
pub struct Log {
    state: RwLock<Option<(Arc<Mailer>, String, String)>>,
}

impl Log {
    pub fn set_mailer_and_admin(&self, mailer: Arc<Mailer>, name: String, email: String) {
        *self.state.write().unwrap() = Some((mailer, name, email));
    }

    pub fn mailer(&self) -> Option<Arc<Mailer>> {
        self.state.read().unwrap().as_ref().map(|(m, _, _)| Arc::clone(m))
    }

    pub fn send_alert(&self) -> String {
        let state = self.state.read().unwrap();
        let (mailer, name, email) = state.as_ref().expect("admin was not injected");
        mailer.send(email, &format!("Alert to : \"{name}\""))
    }
}

pub struct ErrorHandler {
    error: Arc<Exception>,
}

impl ErrorHandler {
    pub fn print_error_message(&self) -> String {
        let message = match self.error.message() {
            "" => "Exception",
            message => message,
        };
        format!("Help !! {message}")
    }
}

#[derive(Default)]
pub struct Greeter;

impl Greeter {
    pub fn greet(&self) -> String {
        "Hello di-container !".to_owned()
    }
}

// =============================================================================
// Providers
// =============================================================================

#[derive(Default)]
pub struct MailerServiceProvider;

impl ServiceProvider for MailerServiceProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.set_type("Mailer")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct UserServiceProvider;

impl ServiceProvider for UserServiceProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.set_type("Mailer")?;
        container.set_type("User")?.set_param_type("Mailer")?;
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        let user = container.get_as::<User>("User")?;
        user.set_name("mohamed");
        user.set_email("mohamed@example.com");
        user.send_welcome_mail();
        Ok(())
    }
}

#[derive(Default)]
pub struct LogServiceProvider;

impl ServiceProvider for LogServiceProvider {
    fn register(&self, _container: &Container) -> Result<()> {
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        let name = container.get("admin_name")?;
        let email = container.get("admin_email")?;

        container.set_type("Log")?.set_method(
            "set_mailer_and_admin",
            bindings! {
                "mailer" => "Mailer",
                "name" => name,
                "email" => email,
            },
        )?;

        container.get_as::<Log>("Log")?.send_alert();
        Ok(())
    }
}

/// Exists as a type but is not a provider
#[derive(Default)]
pub struct InvalidServiceProvider;

// =============================================================================
// Registry
// =============================================================================

pub fn types() -> TypeRegistry {
    let types = TypeRegistry::new();

    types.register(
        TypeDescriptor::builder::<Mailer>("Mailer")
            .default_constructor()
            .method(
                "send",
                [Parameter::untyped("email"), Parameter::untyped("body")],
                |mailer: &Mailer, args| {
                    let (email, body) = send_method(&args)?;
                    Ok(mailer.send(&email, &body))
                },
            )
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<MarketingMailer>("MarketingMailer")
            .default_constructor()
            .method(
                "send",
                [Parameter::untyped("email"), Parameter::untyped("body")],
                |mailer: &MarketingMailer, args| {
                    let (email, body) = send_method(&args)?;
                    Ok(mailer.send(&email, &body))
                },
            )
            .build(),
    );
    types.register(TypeDescriptor::interface("MailerInterface"));

    types.register(
        TypeDescriptor::builder::<Parcel>("Box")
            .constructor(
                [
                    Parameter::untyped("height"),
                    Parameter::untyped("width"),
                    Parameter::untyped("length").with_default(50),
                ],
                |args| {
                    Ok(Parcel {
                        height: args.get("height")?,
                        width: args.get("width")?,
                        length: args.get("length")?,
                    })
                },
            )
            .build(),
    );

    types.register(
        TypeDescriptor::builder::<User>("User")
            .constructor([Parameter::typed("mailer", "Mailer")], |args| {
                Ok(User::new(args.get("mailer")?))
            })
            .method("send_welcome_mail", [], |user: &User, _| {
                Ok(user.send_welcome_mail())
            })
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<Admin>("Admin")
            .constructor(
                [
                    Parameter::typed("mailer", "Mailer"),
                    Parameter::untyped("name"),
                    Parameter::untyped("email"),
                ],
                |args| {
                    Ok(Admin(User::with_identity(
                        args.get("mailer")?,
                        args.get("name")?,
                        args.get("email")?,
                    )))
                },
            )
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<SuperAdmin>("SuperAdmin")
            .constructor(
                [Parameter::union("mailer", ["MarketingMailer", "Mailer"])],
                |args| Ok(SuperAdmin(User::new(args.get("mailer")?))),
            )
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<Customer>("Customer")
            .constructor([Parameter::typed("mailer", "MailerInterface")], |args| {
                Ok(Customer(User::new(args.get("mailer")?)))
            })
            .build(),
    );

    types.register(
        TypeDescriptor::builder::<Notification>("Notification")
            .default_constructor()
            .method(
                "set_mailer",
                [Parameter::typed("mailer", "Mailer")],
                |notification: &Notification, args| {
                    notification.set_mailer(args.get("mailer")?);
                    Ok(())
                },
            )
            .method(
                "push_message",
                [Parameter::untyped("name"), Parameter::untyped("email")],
                |notification: &Notification, args| {
                    Ok(notification.push_message(
                        &args.get::<String>("name")?,
                        &args.get::<String>("email")?,
                    ))
                },
            )
            .method(
                "push_message_using_mailer",
                [
                    Parameter::typed("mailer", "Mailer"),
                    Parameter::untyped("name"),
                    Parameter::untyped("email").with_default("testing@example.com"),
                ],
                |_: &Notification, args| {
                    let mailer: Arc<Mailer> = args.get("mailer")?;
                    Ok(Notification::push_message_using_mailer(
                        &mailer,
                        &args.get::<String>("name")?,
                        &args.get::<String>("email")?,
                    ))
                },
            )
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<Log>("Log")
            .default_constructor()
            .method(
                "set_mailer_and_admin",
                [
                    Parameter::typed("mailer", "Mailer"),
                    Parameter::untyped("name"),
                    Parameter::untyped("email"),
                ],
                |log: &Log, args| {
                    log.set_mailer_and_admin(args.get("mailer")?, args.get("name")?, args.get("email")?);
                    Ok(())
                },
            )
            .method(
                "default_parameters",
                [
                    Parameter::untyped("name").with_default("default_admin"),
                    Parameter::untyped("email").with_default("default_admin@example.com"),
                ],
                |log: &Log, args| {
                    log.set_mailer_and_admin(
                        Arc::new(Mailer::default()),
                        args.get("name")?,
                        args.get("email")?,
                    );
                    Ok(())
                },
            )
            .method("send_alert", [], |log: &Log, _| Ok(log.send_alert()))
            .build(),
    );

    types.register(
        TypeDescriptor::builder::<ErrorHandler>("ErrorHandler")
            .constructor([Parameter::typed("error", "Exception")], |args| {
                Ok(ErrorHandler {
                    error: args.get("error")?,
                })
            })
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<Greeter>("Greeter")
            .default_constructor()
            .build(),
    );

    types.register(
        TypeDescriptor::builder::<MailerServiceProvider>("MailerServiceProvider")
            .default_constructor()
            .service_provider()
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<UserServiceProvider>("UserServiceProvider")
            .default_constructor()
            .service_provider()
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<LogServiceProvider>("LogServiceProvider")
            .default_constructor()
            .service_provider()
            .build(),
    );
    types.register(
        TypeDescriptor::builder::<InvalidServiceProvider>("InvalidServiceProvider")
            .default_constructor()
            .build(),
    );

    types
}

/// Container backed by every fixture type
pub fn container() -> Container {
    Container::with_types(types())
}
