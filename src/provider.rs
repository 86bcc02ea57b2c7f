//! Service providers
//!
//! A provider is a deferred registration unit with two phases: `register`
//! adds definitions, `boot` may resolve them. Both phases run lazily, the
//! first time anything is resolved from the container.
//!
//! ```text
//! Unregistered -> Registering -> Registered -> Booting -> Booted
//! ```
//!
//! Transitions only move forward. One thread at a time runs the phases.
//! Resolutions made by that thread from inside a provider do not re-enter
//! the loop, while other threads wait until booting is over.

use crate::{Container, DiError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Deferred registration and boot logic.
///
/// # Examples
///
/// ```rust
/// use di_container::{Container, Result, ServiceProvider};
///
/// struct SettingsProvider;
///
/// impl ServiceProvider for SettingsProvider {
///     fn register(&self, container: &Container) -> Result<()> {
///         container.set("app.name", "demo")?;
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register_provider(SettingsProvider).unwrap();
///
/// assert_eq!(container.get("app.name").unwrap().as_str(), Some("demo"));
/// ```
pub trait ServiceProvider: Send + Sync + 'static {
    /// Add definitions to the container
    fn register(&self, container: &Container) -> Result<()>;

    /// Run after every provider has registered
    fn boot(&self, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Something that identifies a provider.
pub enum ProviderRef {
    /// Ready-made provider
    Instance(Arc<dyn ServiceProvider>),
    /// Type name, instantiated through the container's introspector
    Named(String),
}

impl ProviderRef {
    /// Reference a provider type by name
    pub fn named(name: impl Into<String>) -> Self {
        ProviderRef::Named(name.into())
    }
}

impl<P: ServiceProvider> From<P> for ProviderRef {
    fn from(provider: P) -> Self {
        ProviderRef::Instance(Arc::new(provider))
    }
}

impl From<Arc<dyn ServiceProvider>> for ProviderRef {
    fn from(provider: Arc<dyn ServiceProvider>) -> Self {
        ProviderRef::Instance(provider)
    }
}

impl fmt::Debug for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRef::Instance(p) => f.debug_tuple("Instance").field(&p.name()).finish(),
            ProviderRef::Named(n) => f.debug_tuple("Named").field(n).finish(),
        }
    }
}

/// Lifecycle of the provider list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProviderPhase {
    Unregistered = 0,
    Registering = 1,
    Registered = 2,
    Booting = 3,
    Booted = 4,
}

impl ProviderPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ProviderPhase::Unregistered,
            1 => ProviderPhase::Registering,
            2 => ProviderPhase::Registered,
            3 => ProviderPhase::Booting,
            _ => ProviderPhase::Booted,
        }
    }
}

/// Ordered provider list plus its lifecycle state
pub struct ProviderRegistry {
    providers: Mutex<Vec<Arc<dyn ServiceProvider>>>,
    phase: AtomicU8,
    /// Held for as long as phases are running
    boot_lock: Mutex<()>,
    /// Thread currently running phases
    owner: Mutex<Option<ThreadId>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(Vec::new()),
            phase: AtomicU8::new(ProviderPhase::Unregistered as u8),
            boot_lock: Mutex::new(()),
            owner: Mutex::new(None),
        }
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> ProviderPhase {
        ProviderPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Append a provider.
    ///
    /// Providers added while a phase is running still take part in it.
    /// Providers added after booting never run.
    pub fn push(&self, provider: Arc<dyn ServiceProvider>) {
        #[cfg(feature = "logging")]
        {
            let phase = self.phase();
            if phase == ProviderPhase::Booted {
                warn!(
                    target: "di_container",
                    provider = provider.name(),
                    "Provider registered after boot will never run"
                );
            } else {
                debug!(
                    target: "di_container",
                    provider = provider.name(),
                    phase = ?phase,
                    "Registering service provider"
                );
            }
        }

        self.lock().push(provider);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run the register phase, then the boot phase, each at most once.
    ///
    /// The thread running the phases may call back in and returns
    /// immediately. Other threads block until the phases are over. A failing
    /// provider stops its phase, the phase is still marked complete and the
    /// error is returned.
    pub fn ensure_booted(&self, container: &Container) -> Result<()> {
        if self.phase() == ProviderPhase::Booted {
            return Ok(());
        }

        let current = thread::current().id();
        if *lock(&self.owner) == Some(current) {
            return Ok(());
        }

        let _running = lock(&self.boot_lock);
        let _owner = OwnerGuard::set(&self.owner, current);

        if self.transition(ProviderPhase::Unregistered, ProviderPhase::Registering) {
            let result = self.run_phase(container, "register", |p, c| p.register(c));
            self.phase
                .store(ProviderPhase::Registered as u8, Ordering::Release);
            result?;
        }

        if self.transition(ProviderPhase::Registered, ProviderPhase::Booting) {
            let result = self.run_phase(container, "boot", |p, c| p.boot(c));
            self.phase.store(ProviderPhase::Booted as u8, Ordering::Release);

            #[cfg(feature = "logging")]
            debug!(
                target: "di_container",
                providers = self.len(),
                "Service providers booted"
            );

            result?;
        }

        Ok(())
    }

    fn transition(&self, from: ProviderPhase, to: ProviderPhase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Walk the list by index so the lock is not held while providers run.
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn run_phase<F>(&self, container: &Container, label: &str, run: F) -> Result<()>
    where
        F: Fn(&dyn ServiceProvider, &Container) -> Result<()>,
    {
        let mut index = 0;
        while let Some(provider) = self.at(index) {
            #[cfg(feature = "logging")]
            debug!(
                target: "di_container",
                provider = provider.name(),
                phase = label,
                "Running service provider"
            );

            if let Err(e) = run(provider.as_ref(), container) {
                #[cfg(feature = "logging")]
                debug!(
                    target: "di_container",
                    provider = provider.name(),
                    phase = label,
                    error = %e,
                    "Service provider failed"
                );
                return Err(e);
            }
            index += 1;
        }
        Ok(())
    }

    fn at(&self, index: usize) -> Option<Arc<dyn ServiceProvider>> {
        self.lock().get(index).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn ServiceProvider>>> {
        lock(&self.providers)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records the running thread and clears it on drop, unwinding included.
struct OwnerGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<'a> OwnerGuard<'a> {
    fn set(owner: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *lock(owner) = Some(thread);
        Self { owner }
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("count", &self.len())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Validate a named provider through the container's introspector.
pub(crate) fn instantiate_named(container: &Container, name: &str) -> Result<Arc<dyn ServiceProvider>> {
    let types = container.types();
    if !types.type_exists(name) {
        return Err(DiError::invalid_provider(name, "type does not exist"));
    }
    if !types.is_user_defined(name) {
        return Err(DiError::invalid_provider(name, "platform types cannot be providers"));
    }
    types
        .service_provider(name)?
        .ok_or_else(|| DiError::invalid_provider(name, "type does not implement ServiceProvider"))
}
