//! Config schema types.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration (`linebot.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineBotConfig {
    pub server: ServerConfig,
    pub channel: ChannelConfig,
    pub api: ApiConfig,
    pub responder: ResponderConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// LINE channel credentials. Both are required before the gateway starts.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Bearer token for outbound Messaging API calls.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub access_token: Option<Secret<String>>,

    /// Channel secret used to verify webhook signatures.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub secret: Option<Secret<String>>,
}

impl ChannelConfig {
    /// Both values, when present and non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(Secret<String>, Secret<String>)> {
        let token = non_empty(self.access_token.as_ref())?;
        let secret = non_empty(self.secret.as_ref())?;
        Some((token.clone(), secret.clone()))
    }
}

fn non_empty(secret: Option<&Secret<String>>) -> Option<&Secret<String>> {
    secret.filter(|s| !s.expose_secret().trim().is_empty())
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Outbound Messaging API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Total per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.line.me".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Inbound texts longer than this many characters get the invalid-content reply.
    pub max_text_length: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_text_length: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LineBotConfig::default();
        assert_eq!(config.server.address(), "0.0.0.0:3000");
        assert_eq!(config.api.base_url, "https://api.line.me");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.responder.max_text_length, 1000);
        assert!(config.metrics.enabled);
        assert!(config.channel.credentials().is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: LineBotConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [channel]
            access_token = "tok"
            secret = "sec"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        let (token, secret) = config.channel.credentials().unwrap();
        assert_eq!(token.expose_secret(), "tok");
        assert_eq!(secret.expose_secret(), "sec");
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config: LineBotConfig =
            toml::from_str("[channel]\naccess_token = \"  \"\nsecret = \"sec\"\n").unwrap();
        assert!(config.channel.credentials().is_none());
    }

    #[test]
    fn debug_redacts_channel() {
        let config: LineBotConfig =
            toml::from_str("[channel]\naccess_token = \"tok-value\"\nsecret = \"sec-value\"\n")
                .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("tok-value"));
        assert!(!debug.contains("sec-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn serializes_secrets_for_round_trip() {
        let config: LineBotConfig =
            toml::from_str("[channel]\naccess_token = \"tok\"\n").unwrap();
        let out = toml::to_string(&config).unwrap();
        assert!(out.contains("access_token = \"tok\""));
        assert!(!out.contains("secret ="));
    }
}
