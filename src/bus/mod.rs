//! RegistrationBus - the process-wide wallet registry and its event stream
//!
//! The bus stores an ordered, duplicate-free set of wallet references and
//! notifies `register`/`unregister` listeners synchronously, inside the
//! triggering call. Listeners run over a snapshot of the listener list with
//! the state lock released, so a listener may call back into the bus
//! (re-register, unregister, read) and will observe post-mutation state.
//!
//! # Shape
//!
//! ```text
//! RegistrationBus (Clone) ── Arc<Mutex<BusInner>>
//!   ├── register(wallets) -> Registration   (idempotent unregister guard)
//!   ├── get() -> Arc<[WalletRef]>           (cached snapshot, stable Arc)
//!   └── on(event, listener) -> Subscription (idempotent off)
//! ```

use crate::wallet::WalletRef;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Bus event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusEvent {
    Register,
    Unregister,
}

impl BusEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusEvent::Register => "register",
            BusEvent::Unregister => "unregister",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "register" => Some(BusEvent::Register),
            "unregister" => Some(BusEvent::Unregister),
            _ => None,
        }
    }
}

/// Listener invoked with exactly the wallets the event is about, never the
/// full store.
pub type BusListener = Arc<dyn Fn(&[WalletRef]) + Send + Sync>;

struct BusInner {
    wallets: Vec<WalletRef>,
    /// Cached `get()` result; replaced only when the set actually changes so
    /// that consumers can use pointer equality as "nothing changed".
    snapshot: Arc<[WalletRef]>,
    register: Vec<(u64, BusListener)>,
    unregister: Vec<(u64, BusListener)>,
    next_listener: u64,
}

impl BusInner {
    fn rebuild_snapshot(&mut self) {
        self.snapshot = self.wallets.clone().into();
    }

    fn listeners_mut(&mut self, event: BusEvent) -> &mut Vec<(u64, BusListener)> {
        match event {
            BusEvent::Register => &mut self.register,
            BusEvent::Unregister => &mut self.unregister,
        }
    }

    fn listener_snapshot(&self, event: BusEvent) -> Vec<BusListener> {
        let list = match event {
            BusEvent::Register => &self.register,
            BusEvent::Unregister => &self.unregister,
        };
        list.iter().map(|(_, listener)| listener.clone()).collect()
    }
}

#[derive(Clone)]
pub struct RegistrationBus {
    inner: Arc<Mutex<BusInner>>,
}

impl Default for RegistrationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                wallets: Vec::new(),
                snapshot: Vec::new().into(),
                register: Vec::new(),
                unregister: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current registered set. The returned `Arc` is pointer-identical across
    /// calls until the set changes.
    pub fn get(&self) -> Arc<[WalletRef]> {
        self.lock().snapshot.clone()
    }

    /// Add wallets not already present (by reference identity) and notify
    /// `register` listeners with exactly the newly added ones. Registering
    /// nothing new emits no event and returns an inert [`Registration`].
    pub fn register(&self, wallets: Vec<WalletRef>) -> Registration {
        let (added, listeners) = {
            let mut inner = self.lock();
            let mut added: Vec<WalletRef> = Vec::new();
            for wallet in wallets {
                if !inner.wallets.contains(&wallet) && !added.contains(&wallet) {
                    added.push(wallet);
                }
            }
            if added.is_empty() {
                return Registration::inert();
            }
            inner.wallets.extend(added.iter().cloned());
            inner.rebuild_snapshot();
            (added, inner.listener_snapshot(BusEvent::Register))
        };
        emit(&listeners, &added);
        Registration {
            inner: Some(Arc::downgrade(&self.inner)),
            wallets: added,
            done: AtomicBool::new(false),
        }
    }

    /// Subscribe to `register` or `unregister`. Listeners accumulate per
    /// event; each [`Subscription`] removes only its own listener.
    pub fn on(&self, event: BusEvent, listener: BusListener) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners_mut(event).push((id, listener));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            event,
            id,
            active: AtomicBool::new(true),
        }
    }
}

/// The result of [`RegistrationBus::register`]: undoes exactly that
/// registration. Safe to call more than once; only the first call acts.
pub struct Registration {
    /// `None` for the inert registration handed out when nothing was added.
    inner: Option<Weak<Mutex<BusInner>>>,
    wallets: Vec<WalletRef>,
    done: AtomicBool,
}

impl Registration {
    fn inert() -> Self {
        Self {
            inner: None,
            wallets: Vec::new(),
            done: AtomicBool::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.done.load(Ordering::SeqCst)
    }

    /// Remove exactly the wallets this registration added (skipping any that
    /// are no longer present) and notify `unregister` listeners with them.
    pub fn unregister(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(bus) = self.inner.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let (removed, listeners) = {
            let mut inner = bus.lock().unwrap_or_else(PoisonError::into_inner);
            let removed: Vec<WalletRef> = self
                .wallets
                .iter()
                .filter(|wallet| inner.wallets.contains(wallet))
                .cloned()
                .collect();
            if removed.is_empty() {
                return;
            }
            inner.wallets.retain(|wallet| !removed.contains(wallet));
            inner.rebuild_snapshot();
            (removed, inner.listener_snapshot(BusEvent::Unregister))
        };
        emit(&listeners, &removed);
    }
}

/// The result of [`RegistrationBus::on`]: detaches exactly one listener.
/// Dropping the subscription leaves the listener attached; only an explicit
/// `off()` removes it, and repeated calls are no-ops.
pub struct Subscription {
    inner: Weak<Mutex<BusInner>>,
    event: BusEvent,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn off(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(bus) = self.inner.upgrade() {
            let mut inner = bus.lock().unwrap_or_else(PoisonError::into_inner);
            let id = self.id;
            let event = self.event;
            inner.listeners_mut(event).retain(|(lid, _)| *lid != id);
        }
    }
}

/// Invoke each listener in subscription order; a panicking listener is logged
/// and never prevents siblings from running.
fn emit(listeners: &[BusListener], wallets: &[WalletRef]) {
    for listener in listeners {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(wallets))) {
            tracing::error!(reason = panic_message(&panic), "wallet event listener panicked");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
