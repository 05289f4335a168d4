//! Wallet data model - externally mutable wallets and their accounts
//!
//! Wallets are created, mutated, and destroyed entirely by the extension that
//! owns them. The core only holds shared references and reads snapshots through
//! the [`Wallet`] trait getters; it never assumes a wallet is immutable.
//!
//! Identity is *reference* identity: two wallets are the same wallet only if
//! they are the same allocation ([`WalletRef`] compares with `Arc::ptr_eq`).

use crate::features::{FeatureId, Features};
use base64::Engine;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Structural-validation failure for wallet-supplied identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("chain identifier '{0}' is not of the form namespace:reference")]
    MalformedChain(String),
    #[error("feature identifier '{0}' is not of the form namespace:name")]
    MalformedFeature(String),
    #[error("icon '{0}' is not a data URI")]
    MalformedIcon(String),
}

/// Split a `namespace:rest` identifier, rejecting empty halves.
pub(crate) fn split_identifier(s: &str) -> Option<(&str, &str)> {
    match s.split_once(':') {
        Some((namespace, rest)) if !namespace.is_empty() && !rest.is_empty() => {
            Some((namespace, rest))
        }
        _ => None,
    }
}

/// Chain identifier of the form `namespace:reference`, e.g. `solana:mainnet`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn parse(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        match split_identifier(&s) {
            Some(_) => Ok(Self(s)),
            None => Err(IdentifierError::MalformedChain(s)),
        }
    }

    pub fn namespace(&self) -> &str {
        split_identifier(&self.0).map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn reference(&self) -> &str {
        split_identifier(&self.0).map(|(_, r)| r).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version of the standard a wallet implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WalletVersion(&'static str);

/// The current version of the standard.
pub const STANDARD_VERSION: WalletVersion = WalletVersion("1.0.0");

impl WalletVersion {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Icon as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Icon(String);

impl Icon {
    /// Accept an existing data URI, rejecting anything else.
    pub fn parse(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        if s.starts_with("data:") {
            Ok(Self(s))
        } else {
            Err(IdentifierError::MalformedIcon(s))
        }
    }

    /// Encode raw image bytes as `data:<mime>;base64,...`.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("data:{};base64,{}", mime, payload))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) fn serialize_hex<S: serde::Serializer>(
    bytes: &Vec<u8>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// One authorized account exposed by a wallet.
///
/// The `address` is an opaque string chosen by the wallet; it is not required
/// to be an encoding of `public_key`. Accounts may be replaced wholesale by the
/// wallet at any time, so the address is the only stable join key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletAccount {
    pub address: String,
    #[serde(serialize_with = "serialize_hex")]
    pub public_key: Vec<u8>,
    /// Subset of the owning wallet's chains this account supports.
    pub chains: Vec<ChainId>,
    /// Feature identifiers this account is authorized to use.
    pub features: Vec<FeatureId>,
    pub label: Option<String>,
    pub icon: Option<Icon>,
}

impl WalletAccount {
    pub fn new(address: impl Into<String>, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            address: address.into(),
            public_key: public_key.into(),
            chains: Vec::new(),
            features: Vec::new(),
            label: None,
            icon: None,
        }
    }

    pub fn with_chains(mut self, chains: Vec<ChainId>) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_features(mut self, features: Vec<FeatureId>) -> Self {
        self.features = features;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }
}

/// An extension-provided wallet. Adapters implement this over whatever the
/// vendor injects; every getter returns the *current* state.
pub trait Wallet: Send + Sync {
    fn version(&self) -> WalletVersion {
        STANDARD_VERSION
    }
    fn name(&self) -> String;
    fn icon(&self) -> Icon;
    /// Ordered list of chain identifiers the wallet supports.
    fn chains(&self) -> Vec<ChainId>;
    /// Current capability set. Payloads are opaque to the core.
    fn features(&self) -> Features;
    /// Ordered list of currently authorized accounts.
    fn accounts(&self) -> Vec<WalletAccount>;
}

/// Shared reference to a wallet. Equality is reference identity, never
/// name or address equality.
#[derive(Clone)]
pub struct WalletRef(Arc<dyn Wallet>);

impl WalletRef {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self(wallet)
    }

    pub fn from_wallet(wallet: impl Wallet + 'static) -> Self {
        Self(Arc::new(wallet))
    }

    /// Stable cache key for this allocation (valid while the wallet is alive).
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn downgrade(&self) -> WeakWalletRef {
        WeakWalletRef(Arc::downgrade(&self.0))
    }
}

impl std::ops::Deref for WalletRef {
    type Target = dyn Wallet;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl PartialEq for WalletRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for WalletRef {}

impl fmt::Debug for WalletRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WalletRef").field(&self.0.name()).finish()
    }
}

/// Non-owning wallet reference used by caches so they never keep a
/// dropped wallet alive.
#[derive(Clone)]
pub struct WeakWalletRef(Weak<dyn Wallet>);

impl WeakWalletRef {
    pub fn upgrade(&self) -> Option<WalletRef> {
        self.0.upgrade().map(WalletRef)
    }
}

impl fmt::Debug for WeakWalletRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakWalletRef")
    }
}
