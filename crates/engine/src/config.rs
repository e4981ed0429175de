use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use scripthost_core::error::CoreError;
use scripthost_core::profile::Profile;
use scripthost_core::stats::DEFAULT_DIGEST_THRESHOLD;

/// Host configuration shared by every front end.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory scripts are loaded from.
    pub script_dir: PathBuf,
    /// Root directory of the persistent key-value store.
    pub store_dir: PathBuf,
    /// Wall-clock budget for one script execution.
    pub exec_timeout: Duration,
    /// Per-request timeout for bridged HTTP calls.
    pub http_timeout: Duration,
    /// Runs per statistics digest.
    pub digest_threshold: u32,
    /// Profiles switched on before any detection.
    pub preset_profiles: Vec<Profile>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            script_dir: PathBuf::from("scripts"),
            store_dir: PathBuf::from("store"),
            exec_timeout: Duration::from_millis(5000),
            http_timeout: Duration::from_millis(5000),
            digest_threshold: DEFAULT_DIGEST_THRESHOLD,
            preset_profiles: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default   |
    /// |--------------------|-----------|
    /// | `SCRIPT_DIR`       | `scripts` |
    /// | `STORE_DIR`        | `store`   |
    /// | `EXEC_TIMEOUT_MS`  | `5000`    |
    /// | `HTTP_TIMEOUT_MS`  | `5000`    |
    /// | `DIGEST_THRESHOLD` | `50`      |
    /// | `PRESET_PROFILES`  | (empty)   |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let script_dir = std::env::var("SCRIPT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.script_dir);
        let store_dir = std::env::var("STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);

        let exec_timeout = Duration::from_millis(env_parse("EXEC_TIMEOUT_MS", 5000)?);
        let http_timeout = Duration::from_millis(env_parse("HTTP_TIMEOUT_MS", 5000)?);
        let digest_threshold = env_parse("DIGEST_THRESHOLD", DEFAULT_DIGEST_THRESHOLD)?;

        let preset_profiles = match std::env::var("PRESET_PROFILES") {
            Ok(raw) => parse_profiles(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            script_dir,
            store_dir,
            exec_timeout,
            http_timeout,
            digest_threshold,
            preset_profiles,
        })
    }
}

/// Parse a comma-separated profile list such as `http-client,task-fetch`.
pub fn parse_profiles(raw: &str) -> Result<Vec<Profile>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Profile::from_str)
        .collect()
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} must be a valid number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults() {
        let config = HostConfig::default();
        assert_eq!(config.exec_timeout, Duration::from_secs(5));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.digest_threshold, 50);
        assert!(config.preset_profiles.is_empty());
    }

    #[test]
    fn parse_profiles_accepts_list() {
        let profiles = parse_profiles(" http-client , task-fetch,").expect("valid list");
        assert_eq!(profiles, vec![Profile::HttpClient, Profile::TaskFetch]);
        assert!(parse_profiles("").expect("empty list").is_empty());
    }

    #[test]
    fn parse_profiles_rejects_unknown() {
        assert_matches!(parse_profiles("http-client,bogus"), Err(CoreError::Validation(_)));
    }
}
