use std::path::PathBuf;
use std::time::Duration;

/// Default token file, relative to the working directory.
const DEFAULT_TOKEN_FILE: &str = ".portal/token";

/// Default interval between expiry checks, in seconds.
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;

/// Default lookahead window, in seconds: tokens expiring within it are
/// treated as already expired.
const DEFAULT_EXPIRY_LOOKAHEAD_SECS: u64 = 30;

/// Session manager configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where [`FileTokenStore`](crate::store::FileTokenStore) keeps the token.
    pub token_file: PathBuf,
    /// How often the expiry watch re-checks the token.
    pub check_interval: Duration,
    /// How close to expiry a token may get before the session is ended.
    pub expiry_lookahead: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            expiry_lookahead: Duration::from_secs(DEFAULT_EXPIRY_LOOKAHEAD_SECS),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default         |
    /// |---------------------------------|-----------------|
    /// | `PORTAL_TOKEN_FILE`             | `.portal/token` |
    /// | `SESSION_CHECK_INTERVAL_SECS`   | `5`             |
    /// | `SESSION_EXPIRY_LOOKAHEAD_SECS` | `30`            |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let token_file = std::env::var("PORTAL_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE));

        let check_interval_secs = env_secs("SESSION_CHECK_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);

        let lookahead_secs =
            env_secs("SESSION_EXPIRY_LOOKAHEAD_SECS").unwrap_or(DEFAULT_EXPIRY_LOOKAHEAD_SECS);

        Self {
            token_file,
            check_interval: Duration::from_secs(check_interval_secs),
            expiry_lookahead: Duration::from_secs(lookahead_secs),
        }
    }

    /// The lookahead as a signed duration for timestamp arithmetic.
    pub(crate) fn lookahead(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.expiry_lookahead).unwrap_or_else(|_| {
            chrono::Duration::seconds(DEFAULT_EXPIRY_LOOKAHEAD_SECS as i64)
        })
    }
}

fn env_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
