//! Messaging API client: reply, push, multicast, and profile lookup.
//!
//! The client never retries. A failure after the request may have reached LINE
//! is reported as [`ApiError::AmbiguousFailure`] for push and multicast, since
//! a blind retry there can deliver the same message twice.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
    url::Url,
    uuid::Uuid,
};

#[cfg(feature = "metrics")]
use linebot_metrics::{counter, histogram, labels, line_api as api_metrics};

use crate::{
    credentials::ChannelCredentials,
    delivery::{DeliveryRequest, MulticastBody, PushBody, ReplyBody, SendOptions},
    error::{ApiError, Result},
    event::ReplyToken,
    message::OutboundMessage,
    redact::mask_id,
};

pub const DEFAULT_BASE_URL: &str = "https://api.line.me";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idempotency header LINE honours on push and multicast.
pub const RETRY_KEY_HEADER: &str = "X-Line-Retry-Key";

/// Outbound seam used by the dispatcher; tests substitute a recording fake.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Validate and send one request. At most one HTTP call, never retried.
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()>;

    /// Fetch a user's public profile.
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Error body returned by the Messaging API on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    property: Option<String>,
}

impl ErrorBody {
    fn summary(&self) -> String {
        let details: Vec<String> = self
            .details
            .iter()
            .filter_map(|d| match (&d.property, &d.message) {
                (Some(property), Some(message)) => Some(format!("{property}: {message}")),
                (None, Some(message)) => Some(message.clone()),
                (Some(property), None) => Some(property.clone()),
                (None, None) => None,
            })
            .collect();
        match (self.message.is_empty(), details.is_empty()) {
            (false, true) => self.message.clone(),
            (false, false) => format!("{} ({})", self.message, details.join("; ")),
            (true, false) => details.join("; "),
            (true, true) => String::new(),
        }
    }
}

/// HTTP client for the LINE Messaging API.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<ChannelCredentials>,
}

impl std::fmt::Debug for LineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl LineClient {
    /// Client against the production API with the default timeout.
    pub fn new(credentials: Arc<ChannelCredentials>) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        credentials: Arc<ChannelCredentials>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            ApiError::invalid_request(format!("invalid LINE API base URL `{base_url}`: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::invalid_request(format!(
                "LINE API base URL must be http(s), got `{}`",
                parsed.scheme()
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT))
            .build()
            .map_err(|source| ApiError::Transport {
                context: "building HTTP client".into(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn reply(&self, reply_token: ReplyToken, messages: Vec<OutboundMessage>) -> Result<()> {
        self.deliver(&DeliveryRequest::reply(reply_token, messages))
            .await
    }

    pub async fn push(
        &self,
        to: impl Into<String>,
        messages: Vec<OutboundMessage>,
        options: SendOptions,
    ) -> Result<()> {
        self.deliver(&DeliveryRequest::push(to, messages).with_options(options))
            .await
    }

    pub async fn multicast(
        &self,
        to: Vec<String>,
        messages: Vec<OutboundMessage>,
        options: SendOptions,
    ) -> Result<()> {
        self.deliver(&DeliveryRequest::multicast(to, messages).with_options(options))
            .await
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        api: &'static str,
        path: &str,
        body: &T,
        retry_key: Option<Uuid>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.credentials.access_token())
            .json(body);
        if let Some(key) = retry_key {
            request = request.header(RETRY_KEY_HEADER, key.to_string());
        }
        self.execute(api, request).await
    }

    async fn execute(
        &self,
        api: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let result = match request.send().await {
            Ok(resp) if resp.status().is_success() => Ok(resp),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Err(rejection(api, status, body))
            },
            Err(e) => Err(send_failure(api, e)),
        };

        #[cfg(feature = "metrics")]
        {
            let status = match &result {
                Ok(resp) => resp.status().as_u16().to_string(),
                Err(e) => e
                    .status()
                    .map_or_else(|| e.kind().to_string(), |s| s.to_string()),
            };
            counter!(api_metrics::REQUESTS_TOTAL, labels::API => api, labels::STATUS => status)
                .increment(1);
            histogram!(api_metrics::DURATION_SECONDS, labels::API => api)
                .record(started.elapsed().as_secs_f64());
        }

        match &result {
            Ok(resp) => debug!(api, status = resp.status().as_u16(), "LINE API call succeeded"),
            Err(e) => warn!(api, kind = e.kind(), error = %e, "LINE API call failed"),
        }
        result
    }
}

/// Map a non-2xx response to the error taxonomy.
fn rejection(api: &str, status: u16, body: String) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.summary())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));

    if api == "reply" && status == 400 && message.to_ascii_lowercase().contains("reply token") {
        return ApiError::InvalidToken { message };
    }
    ApiError::Rejected {
        status,
        message,
        body,
    }
}

/// Map a reqwest send error. Only a failure to connect proves nothing reached
/// LINE; anything later is ambiguous for the non-idempotent endpoints.
fn send_failure(api: &'static str, source: reqwest::Error) -> ApiError {
    let nothing_sent = source.is_connect() || source.is_builder();
    let context = format!("{api} request");
    if !nothing_sent && matches!(api, "push" | "multicast") {
        ApiError::AmbiguousFailure { context, source }
    } else {
        ApiError::Transport { context, source }
    }
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
        request.validate()?;

        match request {
            DeliveryRequest::Reply {
                reply_token,
                messages,
            } => {
                debug!(messages = messages.len(), "sending reply");
                let body = ReplyBody {
                    reply_token: reply_token.as_str(),
                    messages,
                };
                self.post_json("reply", "/v2/bot/message/reply", &body, None)
                    .await?;
            },
            DeliveryRequest::Push {
                to,
                messages,
                options,
            } => {
                debug!(to = %mask_id(to), messages = messages.len(), "sending push");
                let body = PushBody {
                    to,
                    messages,
                    notification_disabled: options.notification_disabled,
                };
                self.post_json("push", "/v2/bot/message/push", &body, options.retry_key)
                    .await?;
            },
            DeliveryRequest::Multicast {
                to,
                messages,
                options,
            } => {
                debug!(
                    recipients = to.len(),
                    messages = messages.len(),
                    "sending multicast"
                );
                let body = MulticastBody {
                    to,
                    messages,
                    notification_disabled: options.notification_disabled,
                };
                self.post_json(
                    "multicast",
                    "/v2/bot/message/multicast",
                    &body,
                    options.retry_key,
                )
                .await?;
            },
        }
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
        if user_id.trim().is_empty() {
            return Err(ApiError::invalid_request("user ID is empty"));
        }
        let url = format!(
            "{}/v2/bot/profile/{}",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let request = self
            .http
            .get(url)
            .bearer_auth(self.credentials.access_token());
        let resp = self.execute("profile", request).await?;
        resp.json::<UserProfile>()
            .await
            .map_err(|source| ApiError::UnexpectedResponse {
                context: format!("profile for {}", mask_id(user_id)),
                source,
            })
    }
}
