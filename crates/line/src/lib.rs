//! LINE Messaging API protocol layer.
//!
//! Verifies webhook signatures, decodes webhook bodies into typed events, and
//! delivers reply/push/multicast requests through [`LineClient`].

pub mod client;
pub mod credentials;
pub mod delivery;
pub mod error;
pub mod event;
pub mod message;
pub mod redact;
pub mod signature;

pub use {
    client::{LineClient, MessagingApi, UserProfile},
    credentials::ChannelCredentials,
    delivery::{DeliveryRequest, SendOptions},
    error::{ApiError, DecodeError, Result, VerificationError},
    event::{Event, MessageContent, ReplyToken, Source, WebhookPayload, decode},
    message::OutboundMessage,
    signature::verify,
};
