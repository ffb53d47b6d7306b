//! Semantic checks on a loaded configuration.

use {secrecy::ExposeSecret, url::Url};

use crate::{env_subst::has_placeholder, schema::LineBotConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "range", "format", "security"
    pub category: &'static str,
    /// Dotted path, e.g. "channel.secret"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.category, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, category: &'static str, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

impl LineBotConfig {
    /// Check the settings the gateway cannot run without.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (path, value) in [
            ("channel.access_token", &self.channel.access_token),
            ("channel.secret", &self.channel.secret),
        ] {
            match value.as_ref().map(|s| s.expose_secret().trim()) {
                None | Some("") => {
                    result.push(Severity::Error, "missing", path, "required but not set");
                },
                Some(v) if has_placeholder(v) => result.push(
                    Severity::Error,
                    "missing",
                    path,
                    "contains an unresolved ${...} placeholder",
                ),
                Some(_) => {},
            }
        }

        if self.server.bind.trim().is_empty() {
            result.push(Severity::Error, "missing", "server.bind", "bind address is empty");
        }
        if self.server.port == 0 {
            result.push(Severity::Error, "range", "server.port", "port must be non-zero");
        }

        if self.api.timeout_secs == 0 {
            result.push(
                Severity::Error,
                "range",
                "api.timeout_secs",
                "outbound calls need a non-zero timeout",
            );
        }
        match Url::parse(&self.api.base_url) {
            Ok(url) if url.scheme() == "https" => {},
            Ok(url) if url.scheme() == "http" => {
                let local = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
                if !local {
                    result.push(
                        Severity::Warning,
                        "security",
                        "api.base_url",
                        "plain http sends the channel access token unencrypted",
                    );
                }
            },
            Ok(url) => result.push(
                Severity::Error,
                "format",
                "api.base_url",
                format!("unsupported scheme `{}`", url.scheme()),
            ),
            Err(e) => result.push(
                Severity::Error,
                "format",
                "api.base_url",
                format!("not a valid URL: {e}"),
            ),
        }

        if self.responder.max_text_length == 0 {
            result.push(
                Severity::Error,
                "range",
                "responder.max_text_length",
                "every text would be refused",
            );
        }

        if !self.metrics.enabled {
            result.push(Severity::Info, "metrics", "metrics.enabled", "metrics collection disabled");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn valid() -> LineBotConfig {
        let mut config = LineBotConfig::default();
        config.channel.access_token = Some(Secret::new("token".into()));
        config.channel.secret = Some(Secret::new("secret".into()));
        config
    }

    fn paths(result: &ValidationResult) -> Vec<&str> {
        result.errors().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn defaults_with_credentials_are_valid() {
        let result = valid().validate();
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.count(Severity::Warning), 0);
    }

    #[test]
    fn missing_credentials_are_errors() {
        let result = LineBotConfig::default().validate();
        assert_eq!(paths(&result), ["channel.access_token", "channel.secret"]);
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let mut config = valid();
        config.channel.secret = Some(Secret::new("${CHANNEL_SECRET}".into()));
        assert_eq!(paths(&config.validate()), ["channel.secret"]);
    }

    #[test]
    fn range_and_format_errors() {
        let mut config = valid();
        config.server.port = 0;
        config.api.timeout_secs = 0;
        config.api.base_url = "ftp://api.line.me".into();
        config.responder.max_text_length = 0;
        assert_eq!(paths(&config.validate()), [
            "server.port",
            "api.timeout_secs",
            "api.base_url",
            "responder.max_text_length",
        ]);
    }

    #[test]
    fn plain_http_warns_unless_local() {
        let mut config = valid();
        config.api.base_url = "http://127.0.0.1:8080".into();
        assert_eq!(config.validate().count(Severity::Warning), 0);

        config.api.base_url = "http://api.example.com".into();
        let result = config.validate();
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }
}
