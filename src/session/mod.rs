//! Session state, refresh scheduling, and orchestration.

pub mod manager;
pub(crate) mod scheduler;
pub mod state;

pub use manager::SessionManager;
pub use state::{SessionState, SessionStatus};
