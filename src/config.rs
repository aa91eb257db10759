use std::env;

use chrono_tz::Tz;
use url::Url;

use crate::transit::auth::Credentials;
use crate::transit::client::base_url;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How the session obtains its bearer token
#[derive(Debug, Clone)]
pub enum TokenSource {
    Token(String),
    Login(Credentials),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: Url,
    pub token_source: TokenSource,
    pub display_tz: Tz,
    pub listen_address: String,
    pub allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> ConfigResult<Config> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through `lookup`, treating empty values as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Config> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_base = get("TRANSIT_API_BASE").ok_or(ConfigError::Missing("TRANSIT_API_BASE"))?;
        let api_base = base_url(&raw_base)
            .map_err(|e| ConfigError::Invalid("TRANSIT_API_BASE", e.to_string()))?;

        let token_source = match get("TRANSIT_ACCESS_TOKEN") {
            Some(token) => TokenSource::Token(token),
            None => TokenSource::Login(Credentials {
                email: get("TRANSIT_EMAIL").ok_or(ConfigError::Missing(
                    "TRANSIT_ACCESS_TOKEN or TRANSIT_EMAIL",
                ))?,
                password: get("TRANSIT_PASSWORD").ok_or(ConfigError::Missing("TRANSIT_PASSWORD"))?,
                totp_code: get("TRANSIT_TOTP_CODE"),
            }),
        };

        let display_tz = match get("DISPLAY_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| ConfigError::Invalid("DISPLAY_TIMEZONE", e.to_string()))?,
            None => Tz::UTC,
        };

        Ok(Config {
            api_base,
            token_source,
            display_tz,
            listen_address: get("LISTEN_ADDRESS").unwrap_or("127.0.0.1:8080".to_string()),
            allow_origin: get("ALLOW_ORIGIN"),
        })
    }
}

#[cfg(test)]
mod test {

    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ConfigResult<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_token_config() {
        let config = config(&[
            ("TRANSIT_API_BASE", "http://localhost:8000"),
            ("TRANSIT_ACCESS_TOKEN", "abc"),
            ("DISPLAY_TIMEZONE", "Pacific/Auckland"),
        ])
        .unwrap();

        assert_eq!(config.api_base.as_str(), "http://localhost:8000/");
        assert!(matches!(config.token_source, TokenSource::Token(t) if t == "abc"));
        assert_eq!(config.display_tz, Tz::Pacific__Auckland);
        assert_eq!(config.listen_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_login_config() {
        let config = config(&[
            ("TRANSIT_API_BASE", "http://localhost:8000"),
            ("TRANSIT_ACCESS_TOKEN", ""),
            ("TRANSIT_EMAIL", "operator@transit.test"),
            ("TRANSIT_PASSWORD", "secret"),
        ])
        .unwrap();

        match config.token_source {
            TokenSource::Login(credentials) => {
                assert_eq!(credentials.email, "operator@transit.test");
                assert_eq!(credentials.totp_code, None);
            }
            other => panic!("Expected login, got {:?}", other),
        }
        assert_eq!(config.display_tz, Tz::UTC);
    }

    #[test]
    fn test_missing_and_invalid() {
        assert!(matches!(
            config(&[("TRANSIT_ACCESS_TOKEN", "abc")]),
            Err(ConfigError::Missing("TRANSIT_API_BASE"))
        ));
        assert!(matches!(
            config(&[("TRANSIT_API_BASE", "http://localhost:8000")]),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            config(&[
                ("TRANSIT_API_BASE", "http://localhost:8000"),
                ("TRANSIT_ACCESS_TOKEN", "abc"),
                ("DISPLAY_TIMEZONE", "Mars/Olympus"),
            ]),
            Err(ConfigError::Invalid("DISPLAY_TIMEZONE", _))
        ));
    }
}
