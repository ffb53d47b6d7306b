/// Why an inbound webhook failed the signature gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    /// The signature header is absent or empty.
    #[error("missing webhook signature")]
    MissingSignature,

    /// The header is present but cannot be a SHA-256 HMAC in base64.
    #[error("malformed webhook signature: {reason}")]
    MalformedSignature { reason: String },

    /// The header is well-formed but does not match the body.
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// The configured channel secret cannot key an HMAC.
    #[error("channel secret cannot be used as an HMAC key")]
    UnusableSecret,
}

impl VerificationError {
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSignature {
            reason: reason.into(),
        }
    }

    /// Inbound HTTP status for this failure.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingSignature => 400,
            Self::MalformedSignature { .. } | Self::SignatureMismatch => 401,
            Self::UnusableSecret => 500,
        }
    }

    /// Metric/log label.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::MalformedSignature { .. } => "malformed_signature",
            Self::SignatureMismatch => "signature_mismatch",
            Self::UnusableSecret => "unusable_secret",
        }
    }
}

/// Failure to turn a verified webhook body into typed events.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not parseable JSON.
    #[error("webhook body is not valid JSON: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// The JSON is well-formed but a required field is missing or ill-typed.
    #[error("webhook payload does not match the expected schema: {message}")]
    SchemaError { message: String },
}

impl DecodeError {
    #[must_use]
    pub fn schema(message: impl std::fmt::Display) -> Self {
        Self::SchemaError {
            message: message.to_string(),
        }
    }

    /// Decode failures are always the sender's fault.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        400
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::SchemaError { .. } => "schema_error",
        }
    }
}

/// Outcome of a failed outbound Messaging API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, TLS, timeout before send).
    #[error("LINE API transport failure: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-2xx status.
    #[error("LINE API rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        body: String,
    },

    /// The request may have reached the provider; delivery state is unknown.
    #[error("LINE API outcome unknown, delivery may have happened: {context}: {source}")]
    AmbiguousFailure {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The reply token is unknown, expired, or already consumed.
    #[error("reply token rejected: {message}")]
    InvalidToken { message: String },

    /// Rejected client-side before any HTTP call was issued.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("unexpected LINE API response: {context}: {source}")]
    UnexpectedResponse {
        context: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    #[must_use]
    pub fn invalid_request(message: impl std::fmt::Display) -> Self {
        Self::InvalidRequest {
            message: message.to_string(),
        }
    }

    /// HTTP status reported by the provider, if it answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::InvalidToken { .. } => Some(400),
            _ => None,
        }
    }

    /// 401/403: the channel access token is wrong or revoked.
    #[must_use]
    pub fn is_credential_fault(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Rejected { status: 429, .. })
    }

    /// Only a 429 may be retried with backoff, and only by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_rate_limited()
    }

    /// Nothing the caller can do will make this exact request succeed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::InvalidToken { .. } | Self::InvalidRequest { .. } => true,
            Self::Rejected { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }

    /// Short label used for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Rejected { .. } => "rejected",
            Self::AmbiguousFailure { .. } => "ambiguous",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::UnexpectedResponse { .. } => "unexpected_response",
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> ApiError {
        ApiError::Rejected {
            status,
            message: "nope".into(),
            body: "{}".into(),
        }
    }

    #[test]
    fn credential_faults() {
        assert!(rejected(401).is_credential_fault());
        assert!(rejected(403).is_credential_fault());
        assert!(!rejected(400).is_credential_fault());
        assert!(!ApiError::invalid_request("x").is_credential_fault());
    }

    #[test]
    fn only_rate_limit_is_retryable() {
        assert!(rejected(429).is_retryable());
        assert!(!rejected(429).is_terminal());
        assert!(!rejected(500).is_retryable());
        assert!(!rejected(400).is_retryable());
    }

    #[test]
    fn terminal_classification() {
        assert!(rejected(400).is_terminal());
        assert!(rejected(404).is_terminal());
        assert!(!rejected(503).is_terminal());
        assert!(
            ApiError::InvalidToken {
                message: "Invalid reply token".into()
            }
            .is_terminal()
        );
        assert!(ApiError::invalid_request("too many messages").is_terminal());
    }

    #[test]
    fn inbound_status_mapping() {
        assert_eq!(VerificationError::MissingSignature.status_code(), 400);
        assert_eq!(VerificationError::malformed("x").status_code(), 401);
        assert_eq!(VerificationError::SignatureMismatch.status_code(), 401);
        assert_eq!(VerificationError::UnusableSecret.status_code(), 500);
        assert_eq!(VerificationError::UnusableSecret.reason(), "unusable_secret");
        assert_eq!(DecodeError::schema("missing events").status_code(), 400);
    }

    #[test]
    fn malformed_signature_message() {
        let err = VerificationError::malformed("not base64");
        assert_eq!(err.to_string(), "malformed webhook signature: not base64");
    }
}
