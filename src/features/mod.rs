//! Feature identifiers, opaque capability payloads, and the feature guard
//!
//! A feature is a named capability (`namespace:name`) a wallet or account may
//! expose. The core treats payloads as opaque: views externalize only the set
//! of identifiers present, never the capability objects themselves.

use crate::wallet::{split_identifier, IdentifierError, Wallet, WalletAccount};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const STANDARD_EVENTS: &str = "standard:events";
pub const STANDARD_CONNECT: &str = "standard:connect";
pub const STANDARD_DISCONNECT: &str = "standard:disconnect";

/// Feature identifier of the form `namespace:name`, e.g. `standard:connect`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn parse(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        match split_identifier(&s) {
            Some(_) => Ok(Self(s)),
            None => Err(IdentifierError::MalformedFeature(s)),
        }
    }

    pub fn namespace(&self) -> &str {
        split_identifier(&self.0).map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        split_identifier(&self.0).map(|(_, n)| n).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type-erased capability payload. Consumers that negotiated a feature
/// downcast to the concrete capability type they expect.
#[derive(Clone)]
pub struct Capability(Arc<dyn Any + Send + Sync>);

impl Capability {
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self(Arc::new(payload))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Capability(..)")
    }
}

/// Capability set keyed by feature identifier. Ordered so feature lists
/// derived from it are deterministic.
pub type Features = BTreeMap<FeatureId, Capability>;

/// How a feature container names itself in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentity {
    /// A wallet-shaped container, identified by name.
    Named(String),
    /// An account-shaped container, identified by address and optional label.
    Addressed {
        address: String,
        label: Option<String>,
    },
}

/// Anything whose feature set can be probed: wallets, accounts, and their
/// views all qualify.
pub trait FeatureSource {
    fn feature_ids(&self) -> Vec<FeatureId>;
    fn identity(&self) -> SourceIdentity;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("The `{feature}` feature is not supported by the wallet '{wallet}'")]
    UnsupportedByWallet { feature: FeatureId, wallet: String },
    #[error("The `{feature}` feature is not supported by the address `{address}`{}", .label.as_ref().map(|l| format!(" ({l})")).unwrap_or_default())]
    UnsupportedByAccount {
        feature: FeatureId,
        address: String,
        label: Option<String>,
    },
}

/// Whether `source` exposes `feature`.
pub fn has_feature<S: FeatureSource + ?Sized>(source: &S, feature: &FeatureId) -> bool {
    source.feature_ids().iter().any(|id| id == feature)
}

/// Fail unless `source` exposes `feature`. The error names the container so
/// callers can surface it directly.
pub fn assert_has_feature<S: FeatureSource + ?Sized>(
    source: &S,
    feature: &FeatureId,
) -> Result<(), FeatureError> {
    if has_feature(source, feature) {
        return Ok(());
    }
    Err(match source.identity() {
        SourceIdentity::Named(wallet) => FeatureError::UnsupportedByWallet {
            feature: feature.clone(),
            wallet,
        },
        SourceIdentity::Addressed { address, label } => FeatureError::UnsupportedByAccount {
            feature: feature.clone(),
            address,
            label,
        },
    })
}

impl FeatureSource for dyn Wallet {
    fn feature_ids(&self) -> Vec<FeatureId> {
        self.features().keys().cloned().collect()
    }

    fn identity(&self) -> SourceIdentity {
        SourceIdentity::Named(self.name())
    }
}

impl FeatureSource for WalletAccount {
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
