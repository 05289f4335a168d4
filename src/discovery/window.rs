//! In-process stand-in for the window handshake surface
//!
//! Browsers give wallets and pages a shared event target; headless and native
//! embeddings get this one instead. Both handshake events are synthetic,
//! non-bubbling, non-cancelable, and non-composed. `prevent_default` and
//! `stop_propagation` are silent no-ops: cancellation is not part of the
//! handshake contract.

use crate::bus::Registration;
use crate::wallet::WalletRef;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Dispatched by the page once, carrying its registration callback.
pub const APP_READY_EVENT: &str = "wallet-standard:app-ready";
/// Dispatched by each wallet once, carrying a callback for the page's API.
pub const REGISTER_WALLET_EVENT: &str = "wallet-standard:register-wallet";

pub type RegisterFn = Arc<dyn Fn(WalletRef) -> Registration + Send + Sync>;

/// The `{ register }` payload the page hands to wallets.
#[derive(Clone)]
pub struct RegistrationApi {
    register: RegisterFn,
}

impl RegistrationApi {
    pub fn new(register: RegisterFn) -> Self {
        Self { register }
    }

    pub fn register(&self, wallet: WalletRef) -> Registration {
        (self.register)(wallet)
    }
}

#[derive(Clone)]
pub struct AppReadyEvent {
    api: RegistrationApi,
}

impl AppReadyEvent {
    pub fn new(api: RegistrationApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &RegistrationApi {
        &self.api
    }

    pub fn event_type(&self) -> &'static str {
        APP_READY_EVENT
    }

    pub fn bubbles(&self) -> bool {
        false
    }

    pub fn cancelable(&self) -> bool {
        false
    }

    pub fn composed(&self) -> bool {
        false
    }

    pub fn prevent_default(&self) {}

    pub fn stop_propagation(&self) {}
}

pub type RegisterWalletCallback = Arc<dyn Fn(&RegistrationApi) + Send + Sync>;

#[derive(Clone)]
pub struct RegisterWalletEvent {
    callback: RegisterWalletCallback,
}

impl RegisterWalletEvent {
    pub fn new(callback: RegisterWalletCallback) -> Self {
        Self { callback }
    }

    pub fn callback(&self) -> &RegisterWalletCallback {
        &self.callback
    }

    pub fn event_type(&self) -> &'static str {
        REGISTER_WALLET_EVENT
    }

    pub fn bubbles(&self) -> bool {
        false
    }

    pub fn cancelable(&self) -> bool {
        false
    }

    pub fn composed(&self) -> bool {
        false
    }

    pub fn prevent_default(&self) {}

    pub fn stop_propagation(&self) {}
}

pub type AppReadyListener = Arc<dyn Fn(&AppReadyEvent) + Send + Sync>;
pub type RegisterWalletListener = Arc<dyn Fn(&RegisterWalletEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Shared event target for the handshake. Dispatch walks a snapshot of the
/// listener list; a panicking listener is logged and never suppresses
/// siblings.
#[derive(Default)]
pub struct Window {
    app_ready: Mutex<Vec<(u64, AppReadyListener)>>,
    register_wallet: Mutex<Vec<(u64, RegisterWalletListener)>>,
    next_listener: AtomicU64,
}

impl Window {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_id(&self) -> u64 {
        self.next_listener.fetch_add(1, Ordering::Relaxed)
    }

    pub fn on_app_ready(&self, listener: AppReadyListener) -> ListenerId {
        let id = self.next_id();
        self.app_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        ListenerId(id)
    }

    pub fn on_register_wallet(&self, listener: RegisterWalletListener) -> ListenerId {
        let id = self.next_id();
        self.register_wallet
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        ListenerId(id)
    }

    pub fn remove_app_ready(&self, id: ListenerId) {
        self.app_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id.0);
    }

    pub fn remove_register_wallet(&self, id: ListenerId) {
        self.register_wallet
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id.0);
    }

    pub fn dispatch_app_ready(&self, event: &AppReadyEvent) {
        let listeners: Vec<AppReadyListener> = self
            .app_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            guard(event.event_type(), || listener(event));
        }
    }

    pub fn dispatch_register_wallet(&self, event: &RegisterWalletEvent) {
        let listeners: Vec<RegisterWalletListener> = self
            .register_wallet
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            guard(event.event_type(), || listener(event));
        }
    }
}

fn guard(event: &'static str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(event, reason = panic_message(&panic), "handshake listener panicked");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

static SHARED: OnceCell<Option<Arc<Window>>> = OnceCell::new();

/// Install the process-wide window slot before first use. Passing `None`
/// models an environment with no shared event target; the handshake then
/// degrades to direct registration. First call wins.
pub fn install(window: Option<Arc<Window>>) -> bool {
    SHARED.set(window).is_ok()
}

/// The process-wide window, lazily created on first use unless `install`
/// already decided otherwise.
pub fn shared() -> Option<Arc<Window>> {
    SHARED.get_or_init(|| Some(Window::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn noop_api() -> RegistrationApi {
        RegistrationApi::new(Arc::new(|_wallet| {
            // A bus-less API for event plumbing tests.
            crate::bus::RegistrationBus::new().register(Vec::new())
        }))
    }

    #[test]
    fn events_are_synthetic_and_inert() {
        let event = AppReadyEvent::new(noop_api());
        assert_eq!(event.event_type(), APP_READY_EVENT);
        assert!(!event.bubbles());
        assert!(!event.cancelable());
        assert!(!event.composed());
        // Silent no-ops.
        event.prevent_default();
        event.stop_propagation();
    }

    #[test]
    fn dispatch_reaches_every_listener_despite_a_panic() {
        let window = Window::new();
        let reached = Arc::new(AtomicUsize::new(0));

        window.on_app_ready(Arc::new(|_| panic!("first listener fails")));
        let counter = Arc::clone(&reached);
        window.on_app_ready(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        window.dispatch_app_ready(&AppReadyEvent::new(noop_api()));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_no_longer_fires() {
        let window = Window::new();
        let reached = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reached);
        let id = window.on_app_ready(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        window.dispatch_app_ready(&AppReadyEvent::new(noop_api()));
        window.remove_app_ready(id);
        window.dispatch_app_ready(&AppReadyEvent::new(noop_api()));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }
}
