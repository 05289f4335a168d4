//! Wallet Standard core: wallet discovery bus + referentially-stable views.
//!
//! Independently-loaded wallet providers announce themselves to an
//! application, and the application discovers, tracks, and safely references
//! those wallets and their accounts, without either side needing to load
//! first. Read-only, identity-stable snapshots ("views") of wallets and
//! accounts let reactive consumers diff renders with pointer equality.
//!
//! # Architecture
//!
//! ```text
//! get_wallets() / register_wallet()     (handshake, load-order agnostic)
//!   │
//!   ├── Wallets (facade)
//!   │     ├── RegistrationBus          register/unregister events,
//!   │     │                            cached duplicate-free snapshot
//!   │     ├── ViewCache                clone-on-write frozen views
//!   │     │     └── HandleRegistry     opaque handle arena
//!   │     └── legacy navigator inbox   deprecated command replay
//!   │
//!   └── window                         in-process app-ready /
//!                                      register-wallet events
//! ```
//!
//! # Guarantees
//!
//! | Surface | Guarantee |
//! |---------|-----------|
//! | `RegistrationBus::register` | idempotent by reference; events carry only the delta |
//! | `RegistrationBus::get` | same `Arc` until the set actually changes |
//! | `ViewCache::wallet_view` | same `Arc` until a tracked field actually changes |
//! | listeners | one panicking listener never suppresses siblings |
//! | handshake | works in either load order; degrades to in-memory without a window |
//!
//! # Usage
//!
//! ```ignore
//! use wallet_standard::{get_wallets, register_wallet, BusEvent, WalletRef};
//!
//! // Wallet side (an extension adapter):
//! register_wallet(WalletRef::from_wallet(my_wallet));
//!
//! // App side:
//! let wallets = get_wallets();
//! let sub = wallets.on(BusEvent::Register, std::sync::Arc::new(|added| {
//!     for wallet in added {
//!         println!("discovered {}", wallet.name());
//!     }
//! }));
//! for wallet in wallets.get().iter() {
//!     let view = wallets.view_of(wallet);
//!     println!("{} supports {} chains", view.name, view.chains.len());
//! }
//! ```
//!
//! The core performs no signing, no transaction construction, and no network
//! I/O; wallet-supplied data is validated structurally only.

pub mod bus;
pub mod compare;
pub mod discovery;
pub mod features;
pub mod handles;
pub mod logging;
pub mod views;
pub mod wallet;

pub use bus::{BusEvent, BusListener, Registration, RegistrationBus, Subscription};
pub use discovery::legacy::{navigator_wallets, NavigatorSlot, WalletCommand};
pub use discovery::window::{
    AppReadyEvent, RegisterWalletEvent, RegistrationApi, Window, APP_READY_EVENT,
    REGISTER_WALLET_EVENT,
};
pub use discovery::{announce_app, announce_wallet, get_wallets, register_wallet, Wallets};
pub use features::{
    assert_has_feature, has_feature, Capability, FeatureError, FeatureId, FeatureSource, Features,
    SourceIdentity, STANDARD_CONNECT, STANDARD_DISCONNECT, STANDARD_EVENTS,
};
pub use handles::{Handle, HandleError, HandleRegistry};
pub use views::{AccountView, ViewCache, WalletView};
pub use wallet::{
    ChainId, Icon, IdentifierError, Wallet, WalletAccount, WalletRef, WalletVersion,
    WeakWalletRef, STANDARD_VERSION,
};
