//! HTTP transport: outgoing header attachment and incoming response
//! inspection.

pub mod guard;
pub(crate) mod wire;

pub use guard::{NavigationEvent, TransportGuard};
