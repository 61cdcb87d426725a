use anyhow::{Context, Result};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("HOST").ok().as_deref(),
            std::env::var("PORT").ok().as_deref(),
        )
    }

    fn from_vars(host: Option<&str>, port: Option<&str>) -> Result<Self> {
        let host = host
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or("0.0.0.0")
            .to_string();

        let port = match port.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", p))?,
            None => DEFAULT_PORT,
        };

        Ok(Self { host, port })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::from_vars(None, None).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn port_override() {
        let config = ServerConfig::from_vars(Some("127.0.0.1"), Some("8080")).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(ServerConfig::from_vars(None, Some("http")).is_err());
        assert!(ServerConfig::from_vars(None, Some("70000")).is_err());
    }
}
