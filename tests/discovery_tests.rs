//! Discovery Handshake Test Suite
//!
//! Test 1: Handshake succeeds when the app initializes first
//! Test 2: Handshake succeeds when the wallet announces first
//! Test 3: A wallet is registered once even though both handshake legs fire
//! Test 4: Discovery works with no window at all
//! Test 5: The legacy navigator slot queues, replays in order, then forwards
//! Test 6: Slot takeover is idempotent
//! Test 7: Unknown legacy commands are dropped, not fatal
//! Test 8: The process-wide entry points share one facade

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wallet_standard::{
    announce_app, announce_wallet, get_wallets, register_wallet, BusEvent, Features, Icon,
    NavigatorSlot, Wallet, WalletAccount, WalletCommand, WalletRef, Wallets, Window,
};

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

/// Test 1: app attaches first, wallet announces second
#[test]
fn app_first_then_wallet() {
    let window = Window::new();
    let wallets = Wallets::new();

    announce_app(&window, &wallets);
    let wallet = mock("late-wallet");
    announce_wallet(&window, wallet.clone());

    assert_eq!(&*wallets.get(), &[wallet]);
}

/// Test 2: wallet announces first, app attaches second
#[test]
fn wallet_first_then_app() {
    let window = Window::new();
    let wallet = mock("early-wallet");
    announce_wallet(&window, wallet.clone());

    let wallets = Wallets::new();
    announce_app(&window, &wallets);

    assert_eq!(&*wallets.get(), &[wallet]);
}

/// Test 3: both legs fire for a concurrent load, the bus registers once
#[test]
fn double_announcement_registers_once() {
    let window = Window::new();
    let wallets = Wallets::new();
    let wallet = mock("w");

    // Wallet announced before and after the app attached; its app-ready
    // subscription fires on top of the app's register-wallet subscription.
    announce_wallet(&window, wallet.clone());
    announce_app(&window, &wallets);
    announce_wallet(&window, wallet.clone());

    assert_eq!(wallets.get().len(), 1);
}

/// Test 3b: two apps on one window both discover the same wallet
#[test]
fn multiple_apps_share_announcements() {
    let window = Window::new();
    let first = Wallets::new();
    let second = Wallets::new();
    let wallet = mock("w");

    announce_app(&window, &first);
    announce_app(&window, &second);
    announce_wallet(&window, wallet.clone());

    assert_eq!(&*first.get(), &[wallet.clone()]);
    assert_eq!(&*second.get(), &[wallet]);
}

/// Test 4: no window, no problem; direct registration still works
#[test]
fn headless_facade_works_without_a_window() {
    let wallets = Wallets::new();
    let wallet = mock("local");

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    wallets.on(
        BusEvent::Register,
        Arc::new(move |added: &[WalletRef]| {
            counter.fetch_add(added.len(), Ordering::SeqCst);
        }),
    );

    wallets.register(vec![wallet.clone()]);
    assert_eq!(&*wallets.get(), &[wallet]);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

/// Test 5: pre-takeover commands queue and replay in push order; later
/// pushes forward immediately
#[test]
fn legacy_slot_queues_then_replays_in_order() {
    let slot = NavigatorSlot::new();
    let (a, b) = (mock("a"), mock("b"));
    let order = Arc::new(Mutex::new(Vec::<String>::new()));

    assert!(!slot.is_initialized());

    let log = Arc::clone(&order);
    slot.push(vec![WalletCommand::Register {
        wallets: vec![a.clone()],
        callback: Box::new(move |registration| {
            log.lock().unwrap().push("register".into());
            assert!(registration.is_active());
        }),
    }]);
    let log = Arc::clone(&order);
    slot.push(vec![WalletCommand::Get {
        callback: Box::new(move |snapshot| {
            log.lock().unwrap().push(format!("get:{}", snapshot.len()));
        }),
    }]);

    // Nothing ran yet.
    assert!(order.lock().unwrap().is_empty());

    let wallets = Wallets::new();
    assert!(slot.initialize(&wallets));
    assert!(slot.is_initialized());
    assert_eq!(
        &*order.lock().unwrap(),
        &["register".to_string(), "get:1".to_string()]
    );
    assert_eq!(&*wallets.get(), &[a]);

    // Post-takeover pushes go straight through.
    let log = Arc::clone(&order);
    slot.push(vec![WalletCommand::Register {
        wallets: vec![b.clone()],
        callback: Box::new(move |_| log.lock().unwrap().push("forwarded".into())),
    }]);
    assert_eq!(wallets.get().len(), 2);
    assert_eq!(order.lock().unwrap().last().map(String::as_str), Some("forwarded"));
}

/// Test 5b: a queued subscription command attaches a live listener
#[test]
fn legacy_on_command_attaches_listener() {
    let slot = NavigatorSlot::new();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&count);
    slot.push(vec![WalletCommand::On {
        event: BusEvent::Register,
        listener: Arc::new(move |added: &[WalletRef]| {
            counter.fetch_add(added.len(), Ordering::SeqCst);
        }),
        callback: Box::new(|subscription| assert!(subscription.is_active())),
    }]);

    let wallets = Wallets::new();
    slot.initialize(&wallets);
    wallets.register(vec![mock("w")]);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// Test 6: a second takeover returns false and leaves the first facade wired
#[test]
fn slot_takeover_is_idempotent() {
    let slot = NavigatorSlot::new();
    let first = Wallets::new();
    let second = Wallets::new();

    assert!(slot.initialize(&first));
    assert!(!slot.initialize(&second));

    slot.push(vec![WalletCommand::Register {
        wallets: vec![mock("w")],
        callback: Box::new(|_| {}),
    }]);
    assert_eq!(first.get().len(), 1);
    assert_eq!(second.get().len(), 0);
}

/// Test 7: unknown methods are ignored and the commands around them run
#[test]
fn unknown_legacy_commands_are_ignored() {
    let slot = NavigatorSlot::new();
    let wallets = Wallets::new();
    slot.initialize(&wallets);

    let wallet = mock("w");
    slot.push(vec![
        WalletCommand::Unknown {
            method: "push".into(),
        },
        WalletCommand::Register {
            wallets: vec![wallet.clone()],
            callback: Box::new(|_| {}),
        },
    ]);
    assert_eq!(&*wallets.get(), &[wallet]);
}

/// Test 8: get_wallets() is a singleton and register_wallet() reaches it.
/// Everything global lives in this one test; the rest of the suite sticks to
/// local windows and facades.
#[test]
fn global_entry_points_share_one_facade() {
    let wallets = get_wallets();
    let again = get_wallets();
    let baseline = wallets.get().len();

    let wallet = mock("global");
    register_wallet(wallet.clone());

    assert_eq!(wallets.get().len(), baseline + 1);
    assert!(wallets.get().contains(&wallet));
    assert_eq!(again.get().len(), wallets.get().len());
}
