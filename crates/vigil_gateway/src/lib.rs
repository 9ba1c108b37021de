//! HTTP ingress for Vigil.
//!
//! Schema validation and length checks happen here, before the core sees a
//! request; the triage engine still defends its own preconditions.

mod server;
mod types;

pub use server::GatewayServer;
pub use types::{StatusResponse, SyncBody, SyncResponse};
