//! Frozen wallet and account views with memoized identity
//!
//! A view is a read-only snapshot of a wallet's externalized fields. Its
//! *identity* (the `Arc` pointer) only changes when a tracked field actually
//! changed, so reactive consumers can use pointer equality as their "should I
//! re-render" check. The differ clones the previous view at most once per
//! recomputation (first changed field sets the dirty path) and never mutates
//! a view it already handed out.
//!
//! Capability erasure: views carry the *identifiers* of features, never the
//! capability payloads, and the only road back to the mutable wallet is the
//! handle arena.

use crate::compare::{arrays_equal, bytes_equal};
use crate::features::{FeatureId, FeatureSource, SourceIdentity};
use crate::handles::{Handle, HandleRegistry};
use crate::wallet::{ChainId, Icon, WalletAccount, WalletRef, WalletVersion, WeakWalletRef};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Read-only snapshot of one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    #[serde(skip)]
    handle: Handle,
    pub address: String,
    #[serde(serialize_with = "crate::wallet::serialize_hex")]
    pub public_key: Vec<u8>,
    pub chains: Vec<ChainId>,
    pub features: Vec<FeatureId>,
    pub label: Option<String>,
    pub icon: Option<Icon>,
}

impl AccountView {
    /// Token resolving back to the live account via the handle arena.
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl FeatureSource for AccountView {
    fn feature_ids(&self) -> Vec<FeatureId> {
        self.features.clone()
    }

    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Addressed {
            address: self.address.clone(),
            label: self.label.clone(),
        }
    }
}

/// Read-only snapshot of one wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletView {
    #[serde(skip)]
    handle: Handle,
    pub version: WalletVersion,
    pub name: String,
    pub icon: Icon,
    pub chains: Vec<ChainId>,
    /// Feature identifiers only; payloads stay behind the handle.
    pub features: Vec<FeatureId>,
    pub accounts: Vec<Arc<AccountView>>,
}

impl WalletView {
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl FeatureSource for WalletView {
    fn feature_ids(&self) -> Vec<FeatureId> {
        self.features.clone()
    }

    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Named(self.name.clone())
    }
}

struct CacheEntry {
    wallet: WeakWalletRef,
    view: Arc<WalletView>,
    /// Per-address memo for account views; the address is the stable join key
    /// because the wallet may replace account objects at any time.
    accounts: HashMap<String, Arc<AccountView>>,
}

/// View memoizer keyed by wallet identity.
pub struct ViewCache {
    handles: Arc<HandleRegistry>,
    entries: Mutex<HashMap<usize, CacheEntry>>,
}

impl ViewCache {
    pub fn new(handles: Arc<HandleRegistry>) -> Self {
        Self {
            handles,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Produce the view for `wallet`, reusing the previous view object when no
    /// tracked field changed.
    pub fn wallet_view(&self, wallet: &WalletRef) -> Arc<WalletView> {
        // Snapshot the mutable wallet before taking the cache lock; getters
        // are caller-supplied code.
        let version = wallet.version();
        let name = wallet.name();
        let icon = wallet.icon();
        let chains = wallet.chains();
        let features: Vec<FeatureId> = wallet.features().keys().cloned().collect();
        let accounts = wallet.accounts();

        let key = wallet.key();
        let mut entries = self.lock();

        // An allocation address can be reused after the old wallet died, so a
        // cache hit also has to prove the entry is for this wallet.
        let stale = entries
            .get(&key)
            .map_or(false, |entry| entry.wallet.upgrade().as_ref() != Some(wallet));
        if stale {
            entries.remove(&key);
        }

        if let Some(entry) = entries.get_mut(&key) {
            let mut next_accounts = Vec::with_capacity(accounts.len());
            for account in &accounts {
                next_accounts.push(memoized_account_view(
                    &self.handles,
                    wallet,
                    &mut entry.accounts,
                    account,
                ));
            }
            entry
                .accounts
                .retain(|address, _| accounts.iter().any(|a| &a.address == address));

            let prev = &entry.view;
            let version_changed = prev.version != version;
            let name_changed = prev.name != name;
            let icon_changed = prev.icon != icon;
            let chains_changed = !arrays_equal(&prev.chains, &chains);
            let features_changed = !arrays_equal(&prev.features, &features);
            let accounts_changed = prev.accounts.len() != next_accounts.len()
                || prev
                    .accounts
                    .iter()
                    .zip(&next_accounts)
                    .any(|(a, b)| !Arc::ptr_eq(a, b));

            if !(version_changed
                || name_changed
                || icon_changed
                || chains_changed
                || features_changed
                || accounts_changed)
            {
                return entry.view.clone();
            }

            // Clone-on-write: one allocation, overwrite only what changed.
            let mut next = (*entry.view).clone();
            if version_changed {
                next.version = version;
            }
            if name_changed {
                next.name = name;
            }
            if icon_changed {
                next.icon = icon;
            }
            if chains_changed {
                next.chains = chains;
            }
            if features_changed {
                next.features = features;
            }
            if accounts_changed {
                next.accounts = next_accounts;
            }
            next.handle = self.handles.register_wallet(wallet);
            let next = Arc::new(next);
            entry.view = Arc::clone(&next);
            return next;
        }

        let mut memo = HashMap::new();
        let account_views = accounts
            .iter()
            .map(|account| memoized_account_view(&self.handles, wallet, &mut memo, account))
            .collect();
        let view = Arc::new(WalletView {
            handle: self.handles.register_wallet(wallet),
            version,
            name,
            icon,
            chains,
            features,
            accounts: account_views,
        });
        entries.insert(
            key,
            CacheEntry {
                wallet: wallet.downgrade(),
                view: Arc::clone(&view),
                accounts: memo,
            },
        );
        view
    }

    /// Drop the cached view and every handle owned by `wallet`. Called when
    /// the wallet unregisters; this is the arena's reclamation policy.
    pub fn evict(&self, wallet: &WalletRef) {
        self.lock().remove(&wallet.key());
        self.handles.evict(wallet);
    }
}

fn memoized_account_view(
    handles: &HandleRegistry,
    wallet: &WalletRef,
    memo: &mut HashMap<String, Arc<AccountView>>,
    account: &WalletAccount,
) -> Arc<AccountView> {
    if let Some(prev) = memo.get(&account.address) {
        let public_key_changed = !bytes_equal(&prev.public_key, &account.public_key);
        let chains_changed = !arrays_equal(&prev.chains, &account.chains);
        let features_changed = !arrays_equal(&prev.features, &account.features);
        let label_changed = prev.label != account.label;
        let icon_changed = prev.icon != account.icon;

        if !(public_key_changed || chains_changed || features_changed || label_changed || icon_changed) {
            return Arc::clone(prev);
        }

        let mut next = (**prev).clone();
        if public_key_changed {
            next.public_key = account.public_key.clone();
        }
        if chains_changed {
            next.chains = account.chains.clone();
        }
        if features_changed {
            next.features = account.features.clone();
        }
        if label_changed {
            next.label = account.label.clone();
        }
        if icon_changed {
            next.icon = account.icon.clone();
        }
        next.handle = handles.register_account(wallet, &account.address);
        let next = Arc::new(next);
        memo.insert(account.address.clone(), Arc::clone(&next));
        return next;
    }

    let view = Arc::new(AccountView {
        handle: handles.register_account(wallet, &account.address),
        address: account.address.clone(),
        public_key: account.public_key.clone(),
        chains: account.chains.clone(),
        features: account.features.clone(),
        label: account.label.clone(),
        icon: account.icon.clone(),
    });
    memo.insert(account.address.clone(), Arc::clone(&view));
    view
}
