//! Turns decoded LINE events into replies.
//!
//! Flow: event → reply token check → (text) validation → command table →
//! one `DeliveryRequest::Reply`.

pub mod clock;
pub mod commands;
pub mod reply;

pub use {
    clock::{Clock, FixedClock, SystemClock},
    commands::{CommandTable, Invocation, Resolution, Rule},
    reply::Responder,
};
