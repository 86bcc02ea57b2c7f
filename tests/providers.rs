//! Service provider lifecycle.

mod common;

use common::*;
use di_container::{
    bindings, Container, DiError, ProviderPhase, ProviderRef, Result, ServiceProvider,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Records every phase it runs into a shared journal
struct Recording {
    label: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn new(label: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            journal: Arc::clone(journal),
        }
    }

    fn note(&self, phase: &str) {
        self.journal.lock().unwrap().push(format!("{}:{phase}", self.label));
    }
}

impl ServiceProvider for Recording {
    fn register(&self, container: &Container) -> Result<()> {
        self.note("register");
        container.set(self.label, true)?;
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        // resolving from inside a phase must not re-enter it
        container.get(self.label)?;
        self.note("boot");
        Ok(())
    }
}

struct FailingRegister;

impl ServiceProvider for FailingRegister {
    fn register(&self, _container: &Container) -> Result<()> {
        Err(DiError::invalid_definition("cannot register"))
    }
}

/// Registers an alias for the mailer
struct MailerAlias;

impl ServiceProvider for MailerAlias {
    fn register(&self, container: &Container) -> Result<()> {
        container.set("mailer", "Mailer")?;
        Ok(())
    }
}

/// Takes a while to register the mailer
struct SlowMailer;

impl ServiceProvider for SlowMailer {
    fn register(&self, container: &Container) -> Result<()> {
        thread::sleep(Duration::from_millis(200));
        container.set_type("Mailer")?;
        Ok(())
    }
}

fn journal() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_named_provider_registers_lazily() {
    let container = container();
    container
        .register_provider(ProviderRef::named("MailerServiceProvider"))
        .unwrap();

    assert_eq!(container.provider_count(), 1);
    assert_eq!(container.provider_phase(), ProviderPhase::Unregistered);
    assert!(!container.has("Mailer"));

    assert!(container.get_as::<Mailer>("Mailer").is_ok());
    assert!(container.has("Mailer"));
    assert_eq!(container.provider_phase(), ProviderPhase::Booted);
}

#[test]
fn test_provider_boot_can_resolve_services() {
    let container = container();
    container.register_provider(UserServiceProvider).unwrap();

    let mailer = container.get_as::<Mailer>("Mailer").unwrap();
    assert_eq!(
        mailer.sent(),
        ["The message (Hello \"mohamed\") was sent to : mohamed@example.com"]
    );

    let user = container.get_as::<User>("User").unwrap();
    assert_eq!(user.name(), "mohamed");
}

#[test]
fn test_providers_see_definitions_made_before_them() {
    let container = container();
    container.set("admin_name", "admin2").unwrap();
    container.set("admin_email", "admin2@example.com").unwrap();
    container
        .register_providers([
            ProviderRef::named("MailerServiceProvider"),
            ProviderRef::named("LogServiceProvider"),
        ])
        .unwrap();

    let log = container.get_as::<Log>("Log").unwrap();
    let mailer = container.get_as::<Mailer>("Mailer").unwrap();

    assert!(Arc::ptr_eq(&log.mailer().unwrap(), &mailer));
    assert_eq!(
        mailer.sent(),
        ["The message (Alert to : \"admin2\") was sent to : admin2@example.com"]
    );
}

#[test]
fn test_invalid_named_providers() {
    let container = container();
    for name in ["InvalidServiceProvider", "Mailer", "Exception", "Missing"] {
        let err = container
            .register_provider(ProviderRef::named(name))
            .unwrap_err();
        assert!(
            matches!(&err, DiError::InvalidProvider { name: n, .. } if n == name),
            "{name}: {err}"
        );
        assert!(err.is_container_error());
    }
    assert_eq!(container.provider_count(), 0);
}

#[test]
fn test_register_providers_stops_at_first_failure() {
    let container = container();
    let err = container
        .register_providers([
            ProviderRef::named("MailerServiceProvider"),
            ProviderRef::named("InvalidServiceProvider"),
            ProviderRef::named("UserServiceProvider"),
        ])
        .unwrap_err();

    assert!(matches!(err, DiError::InvalidProvider { .. }));
    assert_eq!(container.provider_count(), 1);
}

#[test]
fn test_register_providers_rejects_empty_list() {
    let container = container();
    let err = container
        .register_providers(Vec::<ProviderRef>::new())
        .unwrap_err();
    assert!(matches!(err, DiError::InvalidArgument(_)));
}

#[test]
fn test_shared_provider_instances() {
    let journal = journal();
    let provider: Arc<dyn ServiceProvider> = Arc::new(Recording::new("shared", &journal));

    let container = Container::new();
    container.register_provider(Arc::clone(&provider)).unwrap();

    assert_eq!(container.get("shared").unwrap().as_bool(), Some(true));
    assert_eq!(*journal.lock().unwrap(), ["shared:register", "shared:boot"]);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_every_register_runs_before_any_boot() {
    let journal = journal();
    let container = Container::new();
    container
        .register_providers([
            Recording::new("first", &journal),
            Recording::new("second", &journal),
        ])
        .unwrap();

    container.get("first").unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        ["first:register", "second:register", "first:boot", "second:boot"]
    );
}

#[test]
fn test_phases_run_once() {
    let journal = journal();
    let container = Container::new();
    container.register_provider(Recording::new("once", &journal)).unwrap();

    for _ in 0..3 {
        container.get("once").unwrap();
    }
    let _ = container.make("once");

    assert_eq!(journal.lock().unwrap().len(), 2);
}

#[test]
fn test_has_does_not_run_providers() {
    let journal = journal();
    let container = Container::new();
    container.register_provider(Recording::new("lazy", &journal)).unwrap();

    assert!(!container.has("lazy"));
    assert!(journal.lock().unwrap().is_empty());
}

#[test]
fn test_providers_added_after_boot_never_run() {
    let journal = journal();
    let container = Container::new();
    container.register_provider(Recording::new("early", &journal)).unwrap();
    container.get("early").unwrap();

    container.register_provider(Recording::new("late", &journal)).unwrap();
    assert_eq!(container.provider_count(), 2);
    assert!(container.get("late").unwrap_err().is_not_found());
    assert!(!journal.lock().unwrap().iter().any(|e| e.starts_with("late")));
}

#[test]
fn test_failing_provider_error_propagates_once() {
    let container = Container::new();
    container.set("ready", 1).unwrap();
    container.register_provider(FailingRegister).unwrap();

    let err = container.get("ready").unwrap_err();
    assert!(matches!(err, DiError::InvalidDefinition { .. }));
    assert_eq!(container.provider_phase(), ProviderPhase::Registered);

    // the register phase is over; the next resolution boots
    assert_eq!(container.get("ready").unwrap().as_int(), Some(1));
    assert_eq!(container.provider_phase(), ProviderPhase::Booted);
}

#[test]
fn test_call_runs_providers_first() {
    let container = container();
    container.register_provider(MailerAlias).unwrap();

    let output = container
        .call(
            "mailer",
            "send",
            bindings! { "email" => "a@b.com", "body" => "hi" },
        )
        .unwrap();

    assert_eq!(output.as_str(), Some("The message (hi) was sent to : a@b.com"));
    assert_eq!(container.provider_phase(), ProviderPhase::Booted);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_other_threads_wait_for_providers() {
    let container = container();
    container.register_provider(SlowMailer).unwrap();

    let first = {
        let container = container.clone();
        thread::spawn(move || container.get_as::<Mailer>("Mailer"))
    };
    thread::sleep(Duration::from_millis(50));
    let second = {
        let container = container.clone();
        thread::spawn(move || container.get_as::<Mailer>("Mailer"))
    };

    let first = first.join().unwrap().unwrap();
    let second = second.join().unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(container.provider_phase(), ProviderPhase::Booted);
}
