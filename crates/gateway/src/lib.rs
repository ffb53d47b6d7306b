//! HTTP gateway for LINE webhooks.
//!
//! Request flow: `POST /webhook` → signature gate on the raw body → decode →
//! sequential dispatch of each event through the responder and the Messaging
//! API client → `200`.

#[cfg(feature = "metrics")]
pub mod metrics_middleware;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    server::{build_gateway_app, build_gateway_state, start_gateway},
    state::GatewayState,
    webhook::{DispatchSummary, dispatch_events},
};
