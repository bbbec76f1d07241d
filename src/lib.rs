//! Session and token lifecycle management for API clients.
//!
//! This crate is the authentication core a client application builds on:
//! it derives a stable device identity, tracks the session through its
//! login/refresh/expiry/logout cycle, proactively renews credentials
//! before expiry, and reacts to authorization failures anywhere in the
//! transport by invalidating the session and signalling the router.
//!
//! The view and routing layers stay outside: they call in through
//! [`SessionManager`] (`login`, `logout`, `is_authenticated`,
//! `save_redirect_path`) and observe invalidation through the
//! navigation-event channel.
//!
//! ```no_run
//! use std::sync::Arc;
//! use authkeep::{AuthConfig, LoginCredentials, SessionManager};
//! use authkeep::identity::HostSignals;
//! use authkeep::storage::FileStorage;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let manager = SessionManager::new(
//!     AuthConfig::from_env(),
//!     Arc::new(FileStorage::open_default()?),
//!     Arc::new(HostSignals),
//! )?;
//!
//! if manager.login(&LoginCredentials::new("alice", "secret")).await? {
//!     let destination = manager.post_login_destination();
//!     // hand `destination` to the router
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::AuthConfig;
pub use error::AuthError;
pub use identity::DeviceIdentity;
pub use models::{LoginCredentials, User};
pub use session::{SessionManager, SessionStatus};
pub use transport::{NavigationEvent, TransportGuard};
