use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    anyhow::Context,
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    linebot_auto_reply::{CommandTable, Responder, SystemClock},
    linebot_config::LineBotConfig,
    linebot_line::{ChannelCredentials, LineClient, MessagingApi, redact::mask_token},
    secrecy::ExposeSecret,
    tower_http::trace::TraceLayer,
    tracing::{error, info, warn},
};

#[cfg(feature = "metrics")]
use linebot_metrics::{MetricsHandle, MetricsRecorderConfig, init_metrics};

use crate::{state::GatewayState, webhook::webhook_handler};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let app_state = AppState { gateway: state };

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/webhook", post(webhook_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route("/metrics", get(prometheus_metrics_handler));

    #[cfg(feature = "metrics")]
    let router = router.route_layer(axum::middleware::from_fn(
        crate::metrics_middleware::http_metrics_middleware,
    ));

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Assemble shared state from a validated config.
pub fn build_gateway_state(config: &LineBotConfig) -> anyhow::Result<GatewayState> {
    let report = config.validate();
    for diagnostic in &report.diagnostics {
        match diagnostic.severity {
            linebot_config::Severity::Error => error!(%diagnostic, "config"),
            linebot_config::Severity::Warning => warn!(%diagnostic, "config"),
            linebot_config::Severity::Info => info!(%diagnostic, "config"),
        }
    }
    if report.has_errors() {
        let paths: Vec<&str> = report.errors().map(|d| d.path.as_str()).collect();
        anyhow::bail!("refusing to start: invalid config at {}", paths.join(", "));
    }

    let (token, secret) = config
        .channel
        .credentials()
        .context("channel credentials are not configured")?;
    info!(
        access_token = %mask_token(token.expose_secret()),
        "channel credentials loaded"
    );
    let credentials = Arc::new(ChannelCredentials::from_secrets(token, secret));

    let client = LineClient::with_base_url(
        Arc::clone(&credentials),
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    let api: Arc<dyn MessagingApi> = Arc::new(client);

    let responder = Responder::new(CommandTable::default(), Arc::new(SystemClock))
        .with_max_text_length(config.responder.max_text_length);

    Ok(GatewayState::new(credentials, api, responder))
}

/// Start the webhook gateway and serve until Ctrl-C.
pub async fn start_gateway(config: LineBotConfig) -> anyhow::Result<()> {
    let state = build_gateway_state(&config)?;

    #[cfg(feature = "metrics")]
    let state = {
        let handle: MetricsHandle = init_metrics(MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: vec![("service".into(), "linebot".into())],
        })?;
        state.with_metrics_handle(handle)
    };

    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .with_context(|| format!("invalid bind address `{}`", config.server.address()))?;

    let app = build_gateway_app(Arc::new(state));

    info!(
        %addr,
        api = %config.api.base_url,
        version = env!("CARGO_PKG_VERSION"),
        "linebot gateway listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
    }))
}

#[cfg(feature = "prometheus")]
async fn prometheus_metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    use axum::http::{StatusCode, header};

    match state.gateway.metrics_handle.as_ref() {
        Some(handle) if handle.is_recording() => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not enabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_channel_refuses_to_start() {
        let err = build_gateway_state(&LineBotConfig::default())
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("channel.access_token"), "{err}");
        assert!(err.contains("channel.secret"), "{err}");
    }
}
