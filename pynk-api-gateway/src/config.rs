use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8100";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub order_service_endpoint: String,
    pub listen_addr: SocketAddr,
    /// Shared secret accepted in `x-admin-key`. Without it only login tokens
    /// open the admin routes.
    pub admin_api_key: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let order_service_endpoint = present("ORDER_SERVICE_ENDPOINT")
            .ok_or(ConfigError::Missing("ORDER_SERVICE_ENDPOINT"))?;
        if !order_service_endpoint.starts_with("http://")
            && !order_service_endpoint.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                name: "ORDER_SERVICE_ENDPOINT",
                reason: "expected an http:// or https:// URL".into(),
            });
        }
        let listen_addr = present("GATEWAY_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "GATEWAY_LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            order_service_endpoint,
            listen_addr,
            admin_api_key: present("ADMIN_API_KEY"),
        })
    }
}
