//! Inbound webhook events.
//!
//! LINE keeps adding event and message types, so both unions carry an explicit
//! catch-all (`Event::Unknown`, `MessageContent::Other`) holding the raw JSON
//! fragment instead of failing on unrecognised input.

use {
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    serde_json::Value,
    tracing::warn,
};

use crate::error::DecodeError;

/// A verified webhook body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    /// Bot user ID the events were sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Events in delivery order.
    pub events: Vec<Event>,
}

/// Decode a webhook body into typed events, preserving order and count.
pub fn decode(raw: &[u8]) -> Result<WebhookPayload, DecodeError> {
    let value: Value = serde_json::from_slice(raw).map_err(DecodeError::InvalidPayload)?;
    let Value::Object(mut top) = value else {
        return Err(DecodeError::schema(format!(
            "top-level value must be an object, got {}",
            json_kind(&value)
        )));
    };

    let destination = match top.remove("destination") {
        None | Some(Value::Null) => None,
        Some(Value::String(destination)) => Some(destination),
        Some(other) => {
            return Err(DecodeError::schema(format!(
                "`destination` must be a string, got {}",
                json_kind(&other)
            )));
        },
    };

    let items = match top.remove("events") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DecodeError::schema(format!(
                "`events` must be an array, got {}",
                json_kind(&other)
            )));
        },
        None => return Err(DecodeError::schema("missing required field `events`")),
    };

    let events = items
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Event::from_value_lossy(index, raw))
        .collect();

    Ok(WebhookPayload {
        destination,
        events,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Events ──────────────────────────────────────────────────────────────────

/// One inbound webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(MessageEvent),
    Follow(FollowEvent),
    Unfollow(UnfollowEvent),
    Join(JoinEvent),
    Leave(LeaveEvent),
    Postback(PostbackEvent),
    Unknown(UnknownEvent),
}

impl Event {
    /// Decode a single event object.
    ///
    /// An element without a string `type`, or with a type this crate does not
    /// model, becomes [`Event::Unknown`]. A known type with missing or
    /// ill-typed required fields is an error.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let Some(kind) = raw.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Ok(Self::Unknown(UnknownEvent {
                event_type: String::new(),
                raw,
            }));
        };
        Ok(match kind.as_str() {
            "message" => Self::Message(serde_json::from_value(raw)?),
            "follow" => Self::Follow(serde_json::from_value(raw)?),
            "unfollow" => Self::Unfollow(serde_json::from_value(raw)?),
            "join" => Self::Join(serde_json::from_value(raw)?),
            "leave" => Self::Leave(serde_json::from_value(raw)?),
            "postback" => Self::Postback(serde_json::from_value(raw)?),
            _ => Self::Unknown(UnknownEvent {
                event_type: kind,
                raw,
            }),
        })
    }

    /// Like [`Event::from_value`], but a known type that fails to decode is
    /// kept as [`Event::Unknown`] so one bad element cannot sink its batch.
    fn from_value_lossy(index: usize, raw: Value) -> Self {
        match Self::from_value(raw.clone()) {
            Ok(event) => event,
            Err(e) => {
                let event_type = raw
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                warn!(index, event_type, error = %e, "undecodable event kept as unknown");
                Self::Unknown(UnknownEvent { event_type, raw })
            },
        }
    }

    /// The wire `type` discriminator.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Follow(_) => "follow",
            Self::Unfollow(_) => "unfollow",
            Self::Join(_) => "join",
            Self::Leave(_) => "leave",
            Self::Postback(_) => "postback",
            Self::Unknown(e) => &e.event_type,
        }
    }

    /// Reply token, for the variants that can carry one.
    #[must_use]
    pub fn reply_token(&self) -> Option<&ReplyToken> {
        match self {
            Self::Message(e) => e.reply_token.as_ref(),
            Self::Follow(e) => e.reply_token.as_ref(),
            Self::Join(e) => e.reply_token.as_ref(),
            Self::Postback(e) => e.reply_token.as_ref(),
            Self::Unfollow(_) | Self::Leave(_) | Self::Unknown(_) => None,
        }
    }

    /// Common fields; `None` for unknown events.
    #[must_use]
    pub fn meta(&self) -> Option<&EventMeta> {
        match self {
            Self::Message(e) => Some(&e.meta),
            Self::Follow(e) => Some(&e.meta),
            Self::Unfollow(e) => Some(&e.meta),
            Self::Join(e) => Some(&e.meta),
            Self::Leave(e) => Some(&e.meta),
            Self::Postback(e) => Some(&e.meta),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<&Source> {
        self.meta().map(|m| &m.source)
    }

    #[must_use]
    pub fn webhook_event_id(&self) -> Option<&str> {
        self.meta().and_then(|m| m.webhook_event_id.as_deref())
    }

    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.meta()
            .and_then(|m| m.delivery_context.as_ref())
            .is_some_and(|c| c.is_redelivery)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(de::Error::custom)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Message(e) => Tagged::new("message", e).serialize(serializer),
            Self::Follow(e) => Tagged::new("follow", e).serialize(serializer),
            Self::Unfollow(e) => Tagged::new("unfollow", e).serialize(serializer),
            Self::Join(e) => Tagged::new("join", e).serialize(serializer),
            Self::Leave(e) => Tagged::new("leave", e).serialize(serializer),
            Self::Postback(e) => Tagged::new("postback", e).serialize(serializer),
            Self::Unknown(e) => e.raw.serialize(serializer),
        }
    }
}

/// Re-attaches the `type` discriminator when encoding a variant body.
#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

impl<'a, T> Tagged<'a, T> {
    fn new(kind: &'a str, body: &'a T) -> Self {
        Self { kind, body }
    }
}

/// Fields shared by every known event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<EventMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_context: Option<DeliveryContext>,
}

/// Channel state when the event was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventMode {
    Active,
    Standby,
    Other(String),
}

impl From<String> for EventMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "standby" => Self::Standby,
            _ => Self::Other(value),
        }
    }
}

impl From<EventMode> for String {
    fn from(mode: EventMode) -> Self {
        match mode {
            EventMode::Active => "active".into(),
            EventMode::Standby => "standby".into(),
            EventMode::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// Where an event originated.
///
/// Source kinds LINE adds later decode to [`Source::Unknown`] with the raw
/// object, like unknown event and message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    User {
        user_id: String,
    },
    Group {
        group_id: String,
        user_id: Option<String>,
    },
    Room {
        room_id: String,
        user_id: Option<String>,
    },
    Unknown {
        source_type: String,
        raw: Value,
    },
}

impl Source {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();
        Ok(match kind.as_str() {
            "user" | "group" | "room" => serde_json::from_value::<KnownSource>(raw)?.into(),
            _ => Self::Unknown {
                source_type: kind,
                raw,
            },
        })
    }

    /// The sending user, when LINE disclosed it.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Group { user_id, .. } | Self::Room { user_id, .. } => user_id.as_deref(),
            Self::Unknown { raw, .. } => raw.get("userId").and_then(Value::as_str),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::User { .. } => "user",
            Self::Group { .. } => "group",
            Self::Room { .. } => "room",
            Self::Unknown { source_type, .. } => source_type,
        }
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(de::Error::custom)
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let known = match self {
            Self::User { user_id } => SourceRef::User { user_id },
            Self::Group { group_id, user_id } => SourceRef::Group {
                group_id,
                user_id: user_id.as_deref(),
            },
            Self::Room { room_id, user_id } => SourceRef::Room {
                room_id,
                user_id: user_id.as_deref(),
            },
            Self::Unknown { raw, .. } => return raw.serialize(serializer),
        };
        known.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum KnownSource {
    User {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
    Room {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
}

impl From<KnownSource> for Source {
    fn from(source: KnownSource) -> Self {
        match source {
            KnownSource::User { user_id } => Self::User { user_id },
            KnownSource::Group { group_id, user_id } => Self::Group { group_id, user_id },
            KnownSource::Room { room_id, user_id } => Self::Room { room_id, user_id },
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SourceRef<'a> {
    User {
        #[serde(rename = "userId")]
        user_id: &'a str,
    },
    Group {
        #[serde(rename = "groupId")]
        group_id: &'a str,
        #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<&'a str>,
    },
    Room {
        #[serde(rename = "roomId")]
        room_id: &'a str,
        #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
        user_id: Option<&'a str>,
    },
}

/// Single-use credential for one reply call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyToken(String);

impl ReplyToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ReplyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReplyToken")
            .field(&crate::redact::mask_token(&self.0))
            .finish()
    }
}

impl From<&str> for ReplyToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<ReplyToken>,
    pub message: MessageContent,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<ReplyToken>,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfollowEvent {
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<ReplyToken>,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveEvent {
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<ReplyToken>,
    pub postback: Postback,
    #[serde(flatten)]
    pub meta: EventMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postback {
    pub data: String,
    /// Date/time picker selections, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// An event type this crate does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownEvent {
    /// Original `type` string; empty when the element had none.
    pub event_type: String,
    pub raw: Value,
}

// ── Message content ─────────────────────────────────────────────────────────

/// Payload of a `message` event.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(TextMessage),
    Sticker(StickerMessage),
    Image(ImageMessage),
    Other(OtherMessage),
}

impl MessageContent {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();
        Ok(match kind.as_str() {
            "text" => Self::Text(serde_json::from_value(raw)?),
            "sticker" => Self::Sticker(serde_json::from_value(raw)?),
            "image" => Self::Image(serde_json::from_value(raw)?),
            _ => Self::Other(OtherMessage {
                raw_type: kind,
                raw,
            }),
        })
    }

    #[must_use]
    pub fn message_type(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Sticker(_) => "sticker",
            Self::Image(_) => "image",
            Self::Other(m) => &m.raw_type,
        }
    }
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(de::Error::custom)
    }
}

impl Serialize for MessageContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(m) => Tagged::new("text", m).serialize(serializer),
            Self::Sticker(m) => Tagged::new("sticker", m).serialize(serializer),
            Self::Image(m) => Tagged::new("image", m).serialize(serializer),
            Self::Other(m) => m.raw.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub package_id: String,
    pub sticker_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content_provider: ContentProvider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentProvider {
    Line,
    External {
        #[serde(
            rename = "originalContentUrl",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        original_content_url: Option<String>,
        #[serde(
            rename = "previewImageUrl",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        preview_image_url: Option<String>,
    },
}

/// A message type this crate does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherMessage {
    pub raw_type: String,
    pub raw: Value,
}
