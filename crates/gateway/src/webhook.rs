//! `POST /webhook`: verify, decode, dispatch.

use std::sync::Arc;

use {
    axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
    },
    linebot_line::{
        Event, decode,
        redact::mask_id,
        signature::{SIGNATURE_HEADER, verify},
    },
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use linebot_metrics::{counter, dispatch as dispatch_metrics, labels, webhook as webhook_metrics};

use crate::{server::AppState, state::GatewayState};

/// Per-request dispatch tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Absent header reads as empty, which the gate reports as missing.
    let signature = match headers.get(SIGNATURE_HEADER).map(|v| v.to_str()) {
        None => "",
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            return reject(
                StatusCode::UNAUTHORIZED,
                "malformed_signature",
                "signature header is not valid ASCII",
            );
        },
    };

    if let Err(e) = verify(&body, signature, state.gateway.credentials.channel_secret()) {
        return reject(status_from(e.status_code()), e.reason(), &e.to_string());
    }

    let payload = match decode(&body) {
        Ok(payload) => payload,
        Err(e) => return reject(status_from(e.status_code()), e.reason(), &e.to_string()),
    };

    debug!(
        destination = %payload.destination.as_deref().map(mask_id).unwrap_or_default(),
        events = payload.events.len(),
        "webhook verified"
    );

    // Dispatch on its own task: a dropped inbound connection must not cancel
    // replies already in flight.
    let gateway = Arc::clone(&state.gateway);
    let events = payload.events;
    match tokio::spawn(async move { dispatch_events(&gateway, &events).await }).await {
        Ok(summary) => {
            info!(
                delivered = summary.delivered,
                skipped = summary.skipped,
                failed = summary.failed,
                "webhook dispatched"
            );
            (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
        },
        Err(e) => {
            warn!(error = %e, "dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Dispatch events strictly in order. A failed delivery is logged and
/// counted; it never stops later events.
pub async fn dispatch_events(state: &GatewayState, events: &[Event]) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for (index, event) in events.iter().enumerate() {
        let event_type = event.event_type();
        #[cfg(feature = "metrics")]
        counter!(webhook_metrics::EVENTS_TOTAL, labels::EVENT_TYPE => event_label(event)).increment(1);

        if event.is_redelivery() {
            debug!(index, event_type, webhook_event_id = event.webhook_event_id(), "redelivered event");
        }

        let Some(request) = state.responder.respond(event) else {
            summary.skipped += 1;
            continue;
        };

        match state.api.deliver(&request).await {
            Ok(()) => summary.delivered += 1,
            Err(e) => {
                summary.failed += 1;
                #[cfg(feature = "metrics")]
                counter!(dispatch_metrics::FAILURES_TOTAL, labels::ERROR_TYPE => e.kind()).increment(1);
                warn!(
                    index,
                    event_type,
                    webhook_event_id = event.webhook_event_id(),
                    kind = e.kind(),
                    terminal = e.is_terminal(),
                    error = %e,
                    "event delivery failed"
                );
            },
        }
    }
    summary
}

/// Unknown event types collapse to one label to bound cardinality.
#[cfg(feature = "metrics")]
fn event_label(event: &Event) -> &'static str {
    match event {
        Event::Message(_) => "message",
        Event::Follow(_) => "follow",
        Event::Unfollow(_) => "unfollow",
        Event::Join(_) => "join",
        Event::Leave(_) => "leave",
        Event::Postback(_) => "postback",
        Event::Unknown(_) => "unknown",
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

fn reject(status: StatusCode, reason: &'static str, message: &str) -> Response {
    warn!(status = status.as_u16(), reason, "webhook rejected");
    #[cfg(feature = "metrics")]
    counter!(webhook_metrics::REJECTIONS_TOTAL, labels::REASON => reason).increment(1);
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
