//! Environment-driven configuration, read once at startup.

use std::path::PathBuf;
use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port (`DROPLOG_HTTP_PORT`, default 3000).
    pub http_port: u16,
    /// Deadline applied to every store call (`DROPLOG_STORE_TIMEOUT_MS`, default 500).
    pub store_timeout: Duration,
    /// Session lifetime (`DROPLOG_SESSION_TTL_SECS`, default 3600).
    pub session_ttl: Duration,
    /// Interval between expired-session sweeps (`DROPLOG_SESSION_SWEEP_SECS`, default 5).
    pub sweep_interval: Duration,
    /// Optional store snapshot file (`DROPLOG_SNAPSHOT_PATH`); unset disables persistence.
    pub snapshot_path: Option<PathBuf>,
    /// Interval between snapshots when enabled (`DROPLOG_SNAPSHOT_INTERVAL_MS`, default 5000).
    pub snapshot_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            store_timeout: Duration::from_millis(500),
            session_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(5),
            snapshot_path: None,
            snapshot_interval: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            http_port: env_u64("DROPLOG_HTTP_PORT", d.http_port as u64) as u16,
            store_timeout: Duration::from_millis(env_u64(
                "DROPLOG_STORE_TIMEOUT_MS",
                d.store_timeout.as_millis() as u64,
            )),
            session_ttl: Duration::from_secs(env_u64(
                "DROPLOG_SESSION_TTL_SECS",
                d.session_ttl.as_secs(),
            )),
            sweep_interval: Duration::from_secs(env_u64(
                "DROPLOG_SESSION_SWEEP_SECS",
                d.sweep_interval.as_secs(),
            )),
            snapshot_path: std::env::var("DROPLOG_SNAPSHOT_PATH").ok().map(PathBuf::from),
            snapshot_interval: Duration::from_millis(env_u64(
                "DROPLOG_SNAPSHOT_INTERVAL_MS",
                d.snapshot_interval.as_millis() as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert_eq!(c.http_port, 3000);
        assert_eq!(c.store_timeout, Duration::from_millis(500));
        assert!(c.snapshot_path.is_none());
    }
}
