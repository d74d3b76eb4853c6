use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::polling::PollConfig;

pub const DEFAULT_API_URL: &str = "https://ubakalaunitycup.onrender.com/api";
const CACHE_DIR: &str = "unity_cup_terminal";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_min: Duration,
    pub poll_max: Duration,
    pub flash: Duration,
    pub resolved_highlight: Duration,
    pub http_timeout: Option<Duration>,
    pub token_db: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_min: Duration::from_millis(5000),
            poll_max: Duration::from_millis(10000),
            flash: Duration::from_millis(800),
            resolved_highlight: Duration::from_millis(2500),
            http_timeout: None,
            token_db: None,
        }
    }
}

impl ClientConfig {
    /// Reads the `LEAGUE_API_URL`, `POLL_*_MS`, `FLASH_MS`,
    /// `RESOLVED_HIGHLIGHT_MS`, `HTTP_TIMEOUT_SECS` and `TOKEN_DB` variables.
    /// Callers load `.env` files first.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_url = opt_env("LEAGUE_API_URL").unwrap_or(defaults.api_url);
        let poll_min = env_millis("POLL_MIN_MS", 5000).clamp(500, 600_000);
        let poll_max = env_millis("POLL_MAX_MS", 10000).clamp(poll_min, 600_000);
        let flash = env_millis("FLASH_MS", 800).min(10_000);
        let resolved = env_millis("RESOLVED_HIGHLIGHT_MS", 2500).min(60_000);
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let token_db = opt_env("TOKEN_DB").map(PathBuf::from);

        Self {
            api_url,
            poll_min: Duration::from_millis(poll_min),
            poll_max: Duration::from_millis(poll_max),
            flash: Duration::from_millis(flash),
            resolved_highlight: Duration::from_millis(resolved),
            http_timeout,
            token_db,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::jittered(self.poll_min, self.poll_max)
    }

    pub fn token_db_path(&self) -> Option<PathBuf> {
        self.token_db
            .clone()
            .or_else(crate::token_store::default_db_path)
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_millis(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn defaults_match_the_public_site() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.flash, Duration::from_millis(800));
        assert_eq!(config.resolved_highlight, Duration::from_millis(2500));
        assert!(config.http_timeout.is_none());
    }

    #[test]
    fn poll_config_stays_within_bounds() {
        let config = ClientConfig::default().poll_config();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let delay = config.next_delay(&mut rng);
            assert!(delay >= Duration::from_millis(5000));
            assert!(delay < Duration::from_millis(10000));
        }
    }

    #[test]
    fn explicit_token_db_wins() {
        let config = ClientConfig {
            token_db: Some(PathBuf::from("/tmp/tokens.sqlite")),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.token_db_path(),
            Some(PathBuf::from("/tmp/tokens.sqlite"))
        );
    }
}
