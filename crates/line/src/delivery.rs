//! Outbound delivery requests and their client-side limits.

use {serde::Serialize, uuid::Uuid};

use crate::{
    error::{ApiError, Result},
    event::ReplyToken,
    message::OutboundMessage,
};

/// Messages allowed in one reply/push/multicast call.
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;
/// Characters allowed in one text message.
pub const MAX_TEXT_LENGTH: usize = 5000;
/// Recipients allowed in one multicast call.
pub const MAX_MULTICAST_RECIPIENTS: usize = 500;

/// Per-call flags for push and multicast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Deliver without a push notification on the recipient's device.
    pub notification_disabled: bool,
    /// Sent as `X-Line-Retry-Key` so LINE can de-duplicate a caller-driven
    /// retry of the same push. Ignored for replies.
    pub retry_key: Option<Uuid>,
}

impl SendOptions {
    /// Options carrying `retry_key`. Reuse the same key when retrying a send
    /// whose outcome was ambiguous.
    #[must_use]
    pub fn keyed(retry_key: Uuid) -> Self {
        Self {
            retry_key: Some(retry_key),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn silent(mut self) -> Self {
        self.notification_disabled = true;
        self
    }
}

/// An outbound call, addressed one of the three ways LINE supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryRequest {
    Reply {
        reply_token: ReplyToken,
        messages: Vec<OutboundMessage>,
    },
    Push {
        to: String,
        messages: Vec<OutboundMessage>,
        options: SendOptions,
    },
    Multicast {
        to: Vec<String>,
        messages: Vec<OutboundMessage>,
        options: SendOptions,
    },
}

impl DeliveryRequest {
    #[must_use]
    pub fn reply(reply_token: ReplyToken, messages: Vec<OutboundMessage>) -> Self {
        Self::Reply {
            reply_token,
            messages,
        }
    }

    #[must_use]
    pub fn push(to: impl Into<String>, messages: Vec<OutboundMessage>) -> Self {
        Self::Push {
            to: to.into(),
            messages,
            options: SendOptions::default(),
        }
    }

    #[must_use]
    pub fn multicast(to: Vec<String>, messages: Vec<OutboundMessage>) -> Self {
        Self::Multicast {
            to,
            messages,
            options: SendOptions::default(),
        }
    }

    /// Replace the send options; no-op for replies.
    #[must_use]
    pub fn with_options(mut self, new: SendOptions) -> Self {
        match &mut self {
            Self::Push { options, .. } | Self::Multicast { options, .. } => *options = new,
            Self::Reply { .. } => {},
        }
        self
    }

    #[must_use]
    pub fn messages(&self) -> &[OutboundMessage] {
        match self {
            Self::Reply { messages, .. }
            | Self::Push { messages, .. }
            | Self::Multicast { messages, .. } => messages,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::Push { .. } => "push",
            Self::Multicast { .. } => "multicast",
        }
    }

    /// Enforce addressing and message limits before any network I/O.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Reply { reply_token, .. } => {
                if reply_token.as_str().trim().is_empty() {
                    return Err(ApiError::invalid_request("reply token is empty"));
                }
            },
            Self::Push { to, .. } => {
                if to.trim().is_empty() {
                    return Err(ApiError::invalid_request("push recipient is empty"));
                }
            },
            Self::Multicast { to, .. } => {
                if to.is_empty() {
                    return Err(ApiError::invalid_request("multicast has no recipients"));
                }
                if to.len() > MAX_MULTICAST_RECIPIENTS {
                    return Err(ApiError::invalid_request(format!(
                        "multicast has {} recipients, limit is {MAX_MULTICAST_RECIPIENTS}",
                        to.len()
                    )));
                }
                if let Some(index) = to.iter().position(|id| id.trim().is_empty()) {
                    return Err(ApiError::invalid_request(format!(
                        "multicast recipient {index} is empty"
                    )));
                }
            },
        }
        validate_messages(self.messages())
    }
}

/// Check the message list shared by every delivery kind.
pub fn validate_messages(messages: &[OutboundMessage]) -> Result<()> {
    if messages.is_empty() {
        return Err(ApiError::invalid_request("at least one message is required"));
    }
    if messages.len() > MAX_MESSAGES_PER_REQUEST {
        return Err(ApiError::invalid_request(format!(
            "{} messages exceeds the limit of {MAX_MESSAGES_PER_REQUEST}",
            messages.len()
        )));
    }
    for (index, message) in messages.iter().enumerate() {
        if let OutboundMessage::Text { text } = message {
            if text.is_empty() {
                return Err(ApiError::invalid_request(format!(
                    "message {index}: text is empty"
                )));
            }
            let len = text.chars().count();
            if len > MAX_TEXT_LENGTH {
                return Err(ApiError::invalid_request(format!(
                    "message {index}: text has {len} characters, limit is {MAX_TEXT_LENGTH}"
                )));
            }
        }
    }
    Ok(())
}

// ── Wire bodies ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyBody<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PushBody<'a> {
    pub to: &'a str,
    pub messages: &'a [OutboundMessage],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub notification_disabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MulticastBody<'a> {
    pub to: &'a [String],
    pub messages: &'a [OutboundMessage],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub notification_disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(n: usize) -> Vec<OutboundMessage> {
        (0..n).map(|i| OutboundMessage::text(format!("m{i}"))).collect()
    }

    fn is_invalid(result: Result<()>) -> bool {
        matches!(result, Err(ApiError::InvalidRequest { .. }))
    }

    #[test]
    fn message_count_limits() {
        assert!(is_invalid(DeliveryRequest::push("U1", vec![]).validate()));
        assert!(DeliveryRequest::push("U1", texts(1)).validate().is_ok());
        assert!(DeliveryRequest::push("U1", texts(5)).validate().is_ok());
        assert!(is_invalid(DeliveryRequest::push("U1", texts(6)).validate()));
    }

    #[test]
    fn text_length_limits() {
        let at_limit = "あ".repeat(MAX_TEXT_LENGTH);
        assert!(
            DeliveryRequest::push("U1", vec![OutboundMessage::text(at_limit)])
                .validate()
                .is_ok()
        );
        let over = "a".repeat(MAX_TEXT_LENGTH + 1);
        assert!(is_invalid(
            DeliveryRequest::push("U1", vec![OutboundMessage::text(over)]).validate()
        ));
        assert!(is_invalid(
            DeliveryRequest::push("U1", vec![OutboundMessage::text("")]).validate()
        ));
    }

    #[test]
    fn addressing_rules() {
        assert!(is_invalid(
            DeliveryRequest::reply(ReplyToken::new(""), texts(1)).validate()
        ));
        assert!(is_invalid(DeliveryRequest::push("  ", texts(1)).validate()));
        assert!(is_invalid(DeliveryRequest::multicast(vec![], texts(1)).validate()));
        assert!(is_invalid(
            DeliveryRequest::multicast(vec!["U1".into(), String::new()], texts(1)).validate()
        ));
        let too_many = (0..=MAX_MULTICAST_RECIPIENTS).map(|i| format!("U{i}")).collect();
        assert!(is_invalid(DeliveryRequest::multicast(too_many, texts(1)).validate()));
        let at_limit = (0..MAX_MULTICAST_RECIPIENTS).map(|i| format!("U{i}")).collect();
        assert!(DeliveryRequest::multicast(at_limit, texts(1)).validate().is_ok());
    }

    #[test]
    fn push_body_omits_default_notification_flag() {
        let messages = texts(1);
        let body = PushBody {
            to: "U1",
            messages: &messages,
            notification_disabled: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("notificationDisabled").is_none());

        let body = PushBody {
            notification_disabled: true,
            ..body
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["notificationDisabled"], true);
    }

    #[test]
    fn options_do_not_apply_to_replies() {
        let request = DeliveryRequest::reply(ReplyToken::new("rt"), texts(1))
            .with_options(SendOptions::keyed(Uuid::new_v4()).silent());
        assert_eq!(request, DeliveryRequest::reply(ReplyToken::new("rt"), texts(1)));
    }
}
