use std::net::SocketAddr;

pub const DEFAULT_RPC_LISTEN_ADDR: &str = "0.0.0.0:8103";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub admin_chat_id: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt_secret: String,
    pub telegram: TelegramConfig,
}

impl ServiceConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = present("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret =
            present("ADMIN_JWT_SECRET").ok_or(ConfigError::Missing("ADMIN_JWT_SECRET"))?;
        let listen_addr = present("RPC_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_RPC_LISTEN_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "RPC_LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            database_url,
            listen_addr,
            jwt_secret,
            telegram: TelegramConfig {
                bot_token: present("TELEGRAM_BOT_TOKEN"),
                admin_chat_id: present("TELEGRAM_ADMIN_CHAT_ID"),
                api_base: present("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_optional_vars_are_absent() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pynk"),
            ("ADMIN_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8103".parse().unwrap());
        assert_eq!(config.telegram.bot_token, None);
        assert_eq!(config.telegram.admin_chat_id, None);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_missing_database_url_is_reported() {
        let err = ServiceConfig::from_lookup(lookup(&[("ADMIN_JWT_SECRET", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pynk"),
            ("ADMIN_JWT_SECRET", "secret"),
            ("TELEGRAM_BOT_TOKEN", "  "),
        ]))
        .unwrap();
        assert_eq!(config.telegram.bot_token, None);
    }

    #[test]
    fn test_invalid_listen_addr_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pynk"),
            ("ADMIN_JWT_SECRET", "secret"),
            ("RPC_LISTEN_ADDR", "not an address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RPC_LISTEN_ADDR", .. }));
    }
}
