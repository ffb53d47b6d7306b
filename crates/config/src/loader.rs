use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::LineBotConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "linebot.toml",
    "linebot.yaml",
    "linebot.yml",
    "linebot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<LineBotConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./linebot.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/linebot/linebot.{toml,yaml,yml,json}`
///
/// Returns `LineBotConfig::default()` if no config file is found or the one
/// found cannot be parsed.
pub fn discover_and_load() -> LineBotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    LineBotConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "linebot").map(|d| d.config_dir().to_path_buf())
}

/// Apply process environment overrides on top of a loaded config.
///
/// Recognised: `CHANNEL_ACCESS_TOKEN`, `CHANNEL_SECRET`, `HOST`, `PORT`,
/// `LINE_API_BASE_URL`.
pub fn apply_env_overrides(config: &mut LineBotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

pub(crate) fn apply_env_overrides_with(
    config: &mut LineBotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("CHANNEL_ACCESS_TOKEN") {
        config.channel.access_token = Some(Secret::new(token));
    }
    if let Some(secret) = get("CHANNEL_SECRET") {
        config.channel.secret = Some(Secret::new(secret));
    }
    if let Some(host) = get("HOST") {
        config.server.bind = host;
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(base_url) = get("LINE_API_BASE_URL") {
        config.api.base_url = base_url;
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<LineBotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let toml = write(&dir, "linebot.toml", "[server]\nport = 4000\n");
        let yaml = write(&dir, "linebot.yaml", "server:\n  port: 4001\n");
        let json = write(&dir, "linebot.json", r#"{"server": {"port": 4002}}"#);

        assert_eq!(load_config(&toml).unwrap().server.port, 4000);
        assert_eq!(load_config(&yaml).unwrap().server.port, 4001);
        assert_eq!(load_config(&json).unwrap().server.port, 4002);
    }

    #[test]
    fn rejects_unknown_extension_and_bad_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let ini = write(&dir, "linebot.ini", "port=1");
        assert!(matches!(
            load_config(&ini),
            Err(Error::UnsupportedFormat { .. })
        ));

        let broken = write(&dir, "broken.toml", "[server\nport = ");
        assert!(matches!(load_config(&broken), Err(Error::Parse { .. })));

        assert!(matches!(
            load_config(&dir.path().join("missing.toml")),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn find_in_respects_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "linebot.json", "{}");
        write(&dir, "linebot.yaml", "{}");
        assert_eq!(
            find_in(dir.path()).unwrap(),
            dir.path().join("linebot.yaml")
        );
        assert!(find_in(&dir.path().join("nope")).is_none());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config: LineBotConfig = toml::from_str(
            "[server]\nbind = \"127.0.0.1\"\nport = 4000\n[channel]\naccess_token = \"from-file\"\n",
        )
        .unwrap();
        apply_env_overrides_with(&mut config, |name| match name {
            "CHANNEL_ACCESS_TOKEN" => Some("from-env".into()),
            "CHANNEL_SECRET" => Some("secret-env".into()),
            "PORT" => Some("8080".into()),
            "LINE_API_BASE_URL" => Some("http://127.0.0.1:9999".into()),
            _ => None,
        });

        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9999");
        let (token, secret) = config.channel.credentials().unwrap();
        assert_eq!(token.expose_secret(), "from-env");
        assert_eq!(secret.expose_secret(), "secret-env");
    }

    #[test]
    fn invalid_or_blank_env_values_are_ignored() {
        let mut config = LineBotConfig::default();
        apply_env_overrides_with(&mut config, |name| match name {
            "PORT" => Some("not-a-port".into()),
            "HOST" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind, "0.0.0.0");
    }
}
