//! Device identity derivation.
//!
//! Sessions are bound to a stable per-device identifier sent on every
//! request as the `Device-Id` header. The identifier is derived
//! deterministically from stable host signals when possible; when the
//! signal source fails, a previously persisted random identifier is
//! reused, and only if none exists is a fresh one minted and persisted.

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::storage::{keys, Storage};

pub mod signals;

pub use signals::{HostSignals, SignalSource};

/// Stable per-device identifier, computed lazily and memoized for the
/// process lifetime.
pub struct DeviceIdentity {
    source: Arc<dyn SignalSource>,
    storage: Arc<dyn Storage>,
    cached: OnceLock<String>,
}

impl DeviceIdentity {
    pub fn new(source: Arc<dyn SignalSource>, storage: Arc<dyn Storage>) -> Self {
        Self {
            source,
            storage,
            cached: OnceLock::new(),
        }
    }

    /// The device identifier. Infallible: derivation failures resolve to
    /// the persisted fallback, never to an error.
    pub fn id(&self) -> String {
        self.cached.get_or_init(|| self.derive()).clone()
    }

    fn derive(&self) -> String {
        match self.source.stable_signals() {
            Ok(signal_list) => {
                let id = signals::fingerprint(&signal_list);
                debug!(device_id = %id, "derived device identity from stable signals");
                id
            }
            Err(err) => {
                warn!(error = %err, "signal source unavailable, using persisted fallback");
                self.fallback_id()
            }
        }
    }

    /// Reuse a previously persisted random identifier, or mint and persist
    /// a new one.
    fn fallback_id(&self) -> String {
        if let Some(existing) = self.storage.get(keys::DEVICE_ID) {
            if !existing.is_empty() {
                return existing;
            }
        }

        let minted = format!("{:08x}", rand::random::<u32>());
        if let Err(err) = self.storage.set(keys::DEVICE_ID, &minted) {
            warn!(error = %err, "failed to persist fallback device identifier");
        }
        minted
    }
}
