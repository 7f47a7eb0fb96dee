use std::path::PathBuf;

pub const PROXY_ENV: &str = "TUBEFETCH_PROXY";
pub const CHUNK_SIZE_ENV: &str = "TUBEFETCH_CHUNK_SIZE";

/// Default read size of one transfer chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Network configuration for connectors.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL, e.g. "socks5://127.0.0.1:1080".
    pub proxy: Option<String>,

    /// Connect timeout in seconds. Reads are never timed out.
    pub connect_timeout: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Some(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub chunk_size: usize,
    pub network: NetworkConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            network: NetworkConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Defaults overridden by `TUBEFETCH_PROXY` and `TUBEFETCH_CHUNK_SIZE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(proxy) = lookup(PROXY_ENV).filter(|p| !p.trim().is_empty()) {
            config.network.proxy = Some(proxy.trim().to_string());
        }

        match lookup(CHUNK_SIZE_ENV).map(|raw| raw.trim().parse::<usize>()) {
            Some(Ok(size)) if size > 0 => config.chunk_size = size,
            Some(_) => tracing::warn!(
                "ignoring invalid {}, using {} bytes",
                CHUNK_SIZE_ENV,
                DEFAULT_CHUNK_SIZE
            ),
            None => {}
        }

        config
    }
}

/// Where the desktop app saves by default.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubefetch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_defaults() {
        let config = FetchConfig::from_lookup(|key| match key {
            PROXY_ENV => Some("socks5://127.0.0.1:1080".to_string()),
            CHUNK_SIZE_ENV => Some("65536".to_string()),
            _ => None,
        });

        assert_eq!(
            config.network.proxy.as_deref(),
            Some("socks5://127.0.0.1:1080")
        );
        assert_eq!(config.chunk_size, 65536);
    }

    #[test]
    fn invalid_chunk_size_keeps_default() {
        let config = FetchConfig::from_lookup(|key| (key == CHUNK_SIZE_ENV).then(|| "0".to_string()));
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.network.proxy.is_none());
    }
}
