//! Headless Environment Test Suite
//!
//! Runs in its own process so the window slot can be claimed with `None`
//! before anything else touches it.
//!
//! Test 1: With no window installed, the global facade still works and the
//!         announce path degrades to a logged no-op

use wallet_standard::discovery::window;
use wallet_standard::logging::init_logging;
use wallet_standard::{get_wallets, register_wallet, Features, Icon, Wallet, WalletAccount, WalletRef};

struct MockWallet {
    name: String,
}

impl Wallet for MockWallet {
    fn name(&self) -> String {
        self.name.clone()
    }
    fn icon(&self) -> Icon {
        Icon::from_bytes("image/png", &[])
    }
    fn chains(&self) -> Vec<wallet_standard::ChainId> {
        Vec::new()
    }
    fn features(&self) -> Features {
        Features::new()
    }
    fn accounts(&self) -> Vec<WalletAccount> {
        Vec::new()
    }
}

fn mock(name: &str) -> WalletRef {
    WalletRef::from_wallet(MockWallet { name: name.into() })
}

/// Test 1: a windowless process still gets a working in-memory facade
#[test]
fn windowless_process_degrades_to_direct_registration() {
    init_logging();

    // First claim wins; this process never gets a shared window.
    assert!(window::install(None));
    assert!(window::shared().is_none());

    let wallets = get_wallets();
    assert_eq!(wallets.get().len(), 0);

    // Announcing has nowhere to go; it warns and drops the wallet.
    register_wallet(mock("unreachable"));
    assert_eq!(wallets.get().len(), 0);

    // Direct registration is unaffected.
    let wallet = mock("direct");
    wallets.register(vec![wallet.clone()]);
    assert_eq!(&*wallets.get(), &[wallet]);
    assert_eq!(get_wallets().get().len(), 1);
}
