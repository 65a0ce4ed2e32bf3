use std::net::SocketAddr;

use clap::Args;

/// Upload limit of the HTTP boundary, in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 16;

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the upload service listens on
    #[arg(long, env = "DIAG_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,
    /// Largest accepted upload, in megabytes
    #[arg(long, env = "DIAG_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_sixteen_megabytes() {
        assert_eq!(ServerConfig::default().max_upload_bytes(), 16 * 1024 * 1024);
    }
}
