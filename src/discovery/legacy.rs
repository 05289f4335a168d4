//! Deprecated `navigator.wallets` command inbox
//!
//! Before the bus singleton exists, early wallets and apps push command
//! objects into a plain queue. The first party that needs the real API takes
//! the slot over: the queue is replaced by the constructed facade and every
//! queued command replays through it in order. Later pushes forward directly.
//! Taking over an already-constructed slot is a no-op; the existing facade
//! stays in place.
//!
//! New integrations should use the event handshake in [`crate::discovery`].

use crate::bus::{BusEvent, BusListener, Registration, Subscription};
use crate::discovery::Wallets;
use crate::wallet::WalletRef;
use once_cell::sync::Lazy;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One queued command. Unknown methods exist so forwarding layers can hand
/// through commands this version does not understand; they are logged and
/// dropped, never an error.
pub enum WalletCommand {
    Register {
        wallets: Vec<WalletRef>,
        callback: Box<dyn FnOnce(Registration) + Send>,
    },
    Get {
        callback: Box<dyn FnOnce(&[WalletRef]) + Send>,
    },
    On {
        event: BusEvent,
        listener: BusListener,
        callback: Box<dyn FnOnce(Subscription) + Send>,
    },
    Unknown {
        method: String,
    },
}

enum SlotState {
    Queue(Vec<WalletCommand>),
    Bus(Wallets),
}

/// The `navigator.wallets` slot: a command queue until takeover, the facade
/// afterwards.
pub struct NavigatorSlot {
    state: Mutex<SlotState>,
}

impl Default for NavigatorSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigatorSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Queue(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.lock(), SlotState::Bus(_))
    }

    /// Queue commands before takeover, forward them afterwards. Execution
    /// happens outside the slot lock so callbacks may push again.
    pub fn push(&self, commands: Vec<WalletCommand>) {
        let forward = {
            let mut state = self.lock();
            match &mut *state {
                SlotState::Queue(queue) => {
                    queue.extend(commands);
                    None
                }
                SlotState::Bus(wallets) => Some((wallets.clone(), commands)),
            }
        };
        if let Some((wallets, commands)) = forward {
            for command in commands {
                execute(&wallets, command);
            }
        }
    }

    /// Replace the queue with the constructed facade and replay every queued
    /// command in order. Returns `false` (leaving the existing facade alone)
    /// if the slot was already taken over.
    pub fn initialize(&self, wallets: &Wallets) -> bool {
        let queued = {
            let mut state = self.lock();
            match &mut *state {
                SlotState::Bus(_) => return false,
                SlotState::Queue(queue) => {
                    let queued = std::mem::take(queue);
                    *state = SlotState::Bus(wallets.clone());
                    queued
                }
            }
        };
        for command in queued {
            execute(wallets, command);
        }
        true
    }
}

fn execute(wallets: &Wallets, command: WalletCommand) {
    match command {
        WalletCommand::Register {
            wallets: batch,
            callback,
        } => {
            let registration = wallets.register(batch);
            guard_callback(move || callback(registration));
        }
        WalletCommand::Get { callback } => {
            let snapshot = wallets.get();
            guard_callback(move || callback(&snapshot));
        }
        WalletCommand::On {
            event,
            listener,
            callback,
        } => {
            let subscription = wallets.on(event, listener);
            guard_callback(move || callback(subscription));
        }
        WalletCommand::Unknown { method } => {
            tracing::warn!(%method, "ignoring unrecognized wallet command");
        }
    }
}

fn guard_callback(f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!("wallet command callback panicked");
    }
}

static NAVIGATOR_WALLETS: Lazy<NavigatorSlot> = Lazy::new(NavigatorSlot::new);

/// The process-wide slot, shared by legacy wallets and the facade bootstrap.
pub fn navigator_wallets() -> &'static NavigatorSlot {
    &NAVIGATOR_WALLETS
}
