use std::{path::Path, str::FromStr, time::Duration};

use crate::gemini::{GeminiClientOption, GeminiKey, GeminiModel};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ASSISTANT_NAME: &str = "◯えもん";
const DEFAULT_USER_NAME: &str = "の▫太くん";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
    #[error("GEMINI_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

/// Settings read once at startup and handed to the components that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: GeminiKey,
    pub model: GeminiModel,
    pub client_option: GeminiClientOption,
    pub assistant_name: String,
    pub user_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.is_empty())
            .map(GeminiKey::new)
            .ok_or(ConfigError::MissingApiKey)?;
        let model = lookup("GEMINI_MODEL")
            .and_then(|model| GeminiModel::from_str(&model).ok())
            .unwrap_or_default();
        let timeout = match lookup("GEMINI_TIMEOUT_SECS") {
            Some(secs) => parse_timeout(&secs)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Ok(Self {
            api_key,
            model,
            client_option: GeminiClientOption {
                proxy: proxy_from(&lookup),
                ca_path: root_ca_from(&lookup),
                timeout,
            },
            assistant_name: lookup("DISPLAY_ASSISTANT")
                .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string()),
            user_name: lookup("DISPLAY_USER").unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        })
    }
}

/// Loads variables from an env file into the process environment.
///
/// Without an explicit path a `.env` in the working directory is used if
/// present. An explicit path that cannot be loaded is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                path: path.display().to_string(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Err(e) => tracing::debug!(error = %e, "no .env file loaded"),
        },
    }
    Ok(())
}

fn parse_timeout(secs: &str) -> Result<Duration, ConfigError> {
    match secs.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(secs.to_string())),
    }
}

fn first_of<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
}

fn root_ca_from<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_of(lookup, &["CA_BUNDLE", "ca_bundle"])
}

fn proxy_from<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_of(
        lookup,
        &["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"],
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn api_keyがなければエラーになる() {
        let result = config_from(&[("GEMINI_MODEL", "gemini-1.5-pro")]);

        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }
    #[test]
    fn 空のapi_keyは設定されていないものとして扱う() {
        let result = config_from(&[("GEMINI_API_KEY", "")]);

        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }
    #[test]
    fn api_keyだけあればデフォルト値で設定を作れる() {
        let config = config_from(&[("GEMINI_API_KEY", "secret")]).unwrap();

        assert_eq!(config.api_key, GeminiKey::new("secret"));
        assert_eq!(config.model, GeminiModel::Gemini15Flash);
        assert_eq!(
            config.client_option,
            GeminiClientOption {
                proxy: None,
                ca_path: None,
                timeout: Duration::from_secs(60),
            }
        );
        assert_eq!(config.assistant_name, "◯えもん");
        assert_eq!(config.user_name, "の▫太くん");
    }
    #[test]
    fn モデルとタイムアウトを環境変数で指定できる() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.model, GeminiModel::Gemini20Flash);
        assert_eq!(config.client_option.timeout, Duration::from_secs(5));
    }
    #[test]
    fn 不正なタイムアウトはエラーになる() {
        for secs in ["0", "abc", "-1"] {
            let result =
                config_from(&[("GEMINI_API_KEY", "secret"), ("GEMINI_TIMEOUT_SECS", secs)]);

            assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));
        }
    }
    #[test]
    fn proxyはhttpsを優先して大文字小文字の両方から読む() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("http_proxy", "http://localhost:3128"),
            ("https_proxy", "http://localhost:8080"),
        ])
        .unwrap();

        assert_eq!(
            config.client_option.proxy.as_deref(),
            Some("http://localhost:8080")
        );
    }
    #[test]
    fn ca_bundleを読み込める() {
        let config =
            config_from(&[("GEMINI_API_KEY", "secret"), ("ca_bundle", "/etc/ca.pem")]).unwrap();

        assert_eq!(config.client_option.ca_path.as_deref(), Some("/etc/ca.pem"));
    }
    #[test]
    fn 表示名を環境変数で変更できる() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("DISPLAY_ASSISTANT", "gemini"),
            ("DISPLAY_USER", "you"),
        ])
        .unwrap();

        assert_eq!(config.assistant_name, "gemini");
        assert_eq!(config.user_name, "you");
    }
    #[test]
    fn 指定したenvファイルが存在しなければエラーになる() {
        let result = load_env_file(Some(Path::new("./this/env/file/does/not/exist.env")));

        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }
}
