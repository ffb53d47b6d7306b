use std::sync::Arc;

#[cfg(feature = "metrics")]
use linebot_metrics::MetricsHandle;

use {
    linebot_auto_reply::Responder,
    linebot_line::{ChannelCredentials, MessagingApi},
};

/// Read-only state shared by every request.
pub struct GatewayState {
    /// Channel secret and access token, loaded once at startup.
    pub credentials: Arc<ChannelCredentials>,
    pub api: Arc<dyn MessagingApi>,
    pub responder: Responder,
    pub version: String,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn new(
        credentials: Arc<ChannelCredentials>,
        api: Arc<dyn MessagingApi>,
        responder: Responder,
    ) -> Self {
        Self {
            credentials,
            api,
            responder,
            version: env!("CARGO_PKG_VERSION").to_string(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("credentials", &self.credentials)
            .field("responder", &self.responder)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
