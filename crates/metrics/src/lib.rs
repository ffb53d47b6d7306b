//! Metrics for the LINE webhook relay.
//!
//! Everything records through the `metrics` facade. Without an installed
//! recorder the macros are no-ops; the `prometheus` feature installs an
//! exporter whose output the gateway serves on `/metrics`.
//!
//! ```rust,ignore
//! use linebot_metrics::{counter, labels, webhook};
//!
//! counter!(webhook::EVENTS_TOTAL, labels::EVENT_TYPE => "message").increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
