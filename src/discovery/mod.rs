//! Wallet discovery: the handshake protocol and the `Wallets` facade
//!
//! Load order between a page and the wallet extensions injected into it is
//! arbitrary, so both sides dispatch *and* listen:
//!
//! ```text
//! app:    get_wallets() ── listen register-wallet ── dispatch app-ready
//! wallet: register_wallet(w) ── dispatch register-wallet ── listen app-ready
//! ```
//!
//! Whichever side initializes second still sees the other's announcement, and
//! either path ends with `api.register(wallet)` on the same process-wide bus.
//! Environments without a shared window degrade to a working in-memory
//! facade; discovery failures are logged, never propagated.

pub mod legacy;
pub mod window;

use crate::bus::{BusEvent, BusListener, Registration, RegistrationBus, Subscription};
use crate::handles::{Handle, HandleError, HandleRegistry};
use crate::views::{ViewCache, WalletView};
use crate::wallet::{WalletAccount, WalletRef};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use window::{
    AppReadyEvent, RegisterWalletCallback, RegisterWalletEvent, RegistrationApi, Window,
};

/// The app-side surface: registration bus plus the view and handle
/// registries, wired so that unregistering a wallet reclaims its views and
/// handles.
#[derive(Clone)]
pub struct Wallets {
    bus: RegistrationBus,
    views: Arc<ViewCache>,
}

impl Default for Wallets {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallets {
    pub fn new() -> Self {
        let bus = RegistrationBus::new();
        let views = Arc::new(ViewCache::new(Arc::new(HandleRegistry::new())));

        // Eviction is the arena's reclamation policy; the listener stays
        // attached for the bus lifetime.
        let cache = Arc::clone(&views);
        let _evictor = bus.on(
            BusEvent::Unregister,
            Arc::new(move |removed: &[WalletRef]| {
                for wallet in removed {
                    cache.evict(wallet);
                }
            }),
        );

        Self { bus, views }
    }

    /// Current registered wallets; pointer-stable until the set changes.
    pub fn get(&self) -> Arc<[WalletRef]> {
        self.bus.get()
    }

    pub fn register(&self, wallets: Vec<WalletRef>) -> Registration {
        self.bus.register(wallets)
    }

    pub fn on(&self, event: BusEvent, listener: BusListener) -> Subscription {
        self.bus.on(event, listener)
    }

    /// Referentially-stable view of `wallet`; see [`crate::views`].
    pub fn view_of(&self, wallet: &WalletRef) -> Arc<WalletView> {
        self.views.wallet_view(wallet)
    }

    pub fn wallet_for(&self, handle: Handle) -> Result<WalletRef, HandleError> {
        self.views.handles().wallet_for(handle)
    }

    pub fn account_for(&self, handle: Handle) -> Result<WalletAccount, HandleError> {
        self.views.handles().account_for(handle)
    }

    /// The `{ register }` payload this facade hands to wallets.
    pub fn registration_api(&self) -> RegistrationApi {
        let bus = self.bus.clone();
        RegistrationApi::new(Arc::new(move |wallet| bus.register(vec![wallet])))
    }
}

/// Attach the app side of the handshake to `window`: listen for
/// register-wallet announcements, then tell already-loaded wallets the app is
/// ready. [`get_wallets`] does this on the process-wide window; embedders
/// with their own window call it directly.
pub fn announce_app(window: &Arc<Window>, wallets: &Wallets) {
    let api = wallets.registration_api();
    let listener_api = api.clone();
    window.on_register_wallet(Arc::new(move |event: &RegisterWalletEvent| {
        (event.callback())(&listener_api)
    }));
    window.dispatch_app_ready(&AppReadyEvent::new(api));
}

/// Announce one wallet on `window`: tell an already-loaded app about it, and
/// stay subscribed for apps that initialize later.
pub fn announce_wallet(window: &Arc<Window>, wallet: WalletRef) {
    let callback: RegisterWalletCallback = Arc::new(move |api: &RegistrationApi| {
        // The registration guard belongs to the app side; wallets fire and
        // forget.
        let _ = api.register(wallet.clone());
    });
    window.dispatch_register_wallet(&RegisterWalletEvent::new(Arc::clone(&callback)));
    window.on_app_ready(Arc::new(move |event: &AppReadyEvent| callback(event.api())));
}

static WALLETS: OnceCell<Wallets> = OnceCell::new();

/// The process-wide facade. The first call constructs it, takes over the
/// legacy `navigator.wallets` inbox, and performs the window handshake
/// exactly once; every later call returns the same instance.
pub fn get_wallets() -> Wallets {
    WALLETS
        .get_or_init(|| {
            let wallets = Wallets::new();
            legacy::navigator_wallets().initialize(&wallets);
            match window::shared() {
                Some(window) => announce_app(&window, &wallets),
                None => tracing::warn!(
                    "no shared window; wallet discovery limited to direct registration"
                ),
            }
            wallets
        })
        .clone()
}

/// Announce `wallet` to whatever app is (or will be) listening on the
/// process-wide window.
pub fn register_wallet(wallet: WalletRef) {
    match window::shared() {
        Some(window) => announce_wallet(&window, wallet),
        None => tracing::warn!(wallet = %wallet.name(), "no shared window; wallet not announced"),
    }
}
