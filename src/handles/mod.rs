//! Handle arena - opaque tokens standing in for wallets and accounts
//!
//! A [`Handle`] is an unforgeable token callers can hold without gaining any
//! access to the mutable wallet behind it (capability erasure). The registry
//! maps tokens to weak wallet references; entries are dropped explicitly when
//! a wallet unregisters, and resolve to a registry miss once the wallet is
//! gone either way.

use crate::wallet::{WalletAccount, WalletRef, WeakWalletRef};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The handle was never issued, was evicted, or its wallet is gone.
    #[error("handle does not resolve to a registered wallet or account")]
    RegistryMiss,
    /// The owning wallet no longer lists an account with this address.
    #[error("no account with address `{address}` on wallet '{wallet}'")]
    AccountNotFound { address: String, wallet: String },
}

/// Opaque token. Carries no behavior; only the issuing registry can resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Handle(u64);

enum Entry {
    Wallet(WeakWalletRef),
    Account {
        wallet: WeakWalletRef,
        address: String,
    },
}

impl Entry {
    fn owner(&self) -> &WeakWalletRef {
        match self {
            Entry::Wallet(wallet) | Entry::Account { wallet, .. } => wallet,
        }
    }
}

#[derive(Default)]
pub struct HandleRegistry {
    entries: Mutex<HashMap<u64, Entry>>,
    next: AtomicU64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self) -> Handle {
        Handle(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Associate a fresh handle with a wallet. Last write wins per handle.
    pub fn register_wallet(&self, wallet: &WalletRef) -> Handle {
        let handle = self.issue();
        self.lock().insert(handle.0, Entry::Wallet(wallet.downgrade()));
        handle
    }

    /// Associate a fresh handle with one of a wallet's accounts, joined by
    /// address since the wallet may replace account objects at any time.
    pub fn register_account(&self, wallet: &WalletRef, address: impl Into<String>) -> Handle {
        let handle = self.issue();
        self.lock().insert(
            handle.0,
            Entry::Account {
                wallet: wallet.downgrade(),
                address: address.into(),
            },
        );
        handle
    }

    pub fn wallet_for(&self, handle: Handle) -> Result<WalletRef, HandleError> {
        match self.lock().get(&handle.0) {
            Some(Entry::Wallet(weak)) => weak.upgrade().ok_or(HandleError::RegistryMiss),
            _ => Err(HandleError::RegistryMiss),
        }
    }

    pub fn account_for(&self, handle: Handle) -> Result<WalletAccount, HandleError> {
        let (wallet, address) = match self.lock().get(&handle.0) {
            Some(Entry::Account { wallet, address }) => (
                wallet.upgrade().ok_or(HandleError::RegistryMiss)?,
                address.clone(),
            ),
            _ => return Err(HandleError::RegistryMiss),
        };
        // Scan the live account list outside the lock; the wallet getter is
        // caller-supplied code.
        wallet
            .accounts()
            .into_iter()
            .find(|account| account.address == address)
            .ok_or_else(|| HandleError::AccountNotFound {
                address,
                wallet: wallet.name(),
            })
    }

    /// Drop every handle owned by `wallet`, and any whose wallet is already
    /// gone.
    pub fn evict(&self, wallet: &WalletRef) {
        self.lock().retain(|_, entry| match entry.owner().upgrade() {
            Some(live) => live != *wallet,
            None => false,
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}
