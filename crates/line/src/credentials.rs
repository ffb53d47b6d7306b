use secrecy::{ExposeSecret, Secret};

/// Channel secret (webhook verification) and access token (outbound calls).
///
/// Loaded once at startup and shared read-only behind an `Arc`.
#[derive(Clone)]
pub struct ChannelCredentials {
    access_token: Secret<String>,
    secret: Secret<String>,
}

impl ChannelCredentials {
    #[must_use]
    pub fn new(access_token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            secret: Secret::new(secret.into()),
        }
    }

    #[must_use]
    pub fn from_secrets(access_token: Secret<String>, secret: Secret<String>) -> Self {
        Self {
            access_token,
            secret,
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn channel_secret(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

impl std::fmt::Debug for ChannelCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCredentials")
            .field("access_token", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
