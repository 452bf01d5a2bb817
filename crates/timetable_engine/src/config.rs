use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

/// Immutable portal configuration, injected into every network component at
/// construction. Defaults match the portal's observed tolerances.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Bound on every single network wait; converts a hang into a
    /// classified, retryable failure.
    pub request_timeout: Duration,
    /// Captcha recognition attempts per login attempt.
    pub captcha_attempts: usize,
    pub captcha_retry_delay: Duration,
    /// Full login attempts before giving up.
    pub login_attempts: usize,
    /// Backoff after a server-side captcha rejection.
    pub captcha_backoff: Duration,
    /// Backoff after a transient network condition.
    pub transient_backoff: Duration,
    /// Escalating delays between week-fetch retries; the length bounds the
    /// number of retries.
    pub fetch_retry_delays: Vec<Duration>,
    /// Politeness delay between week iterations.
    pub week_delay: Duration,
}

impl PortalConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            captcha_attempts: 3,
            captcha_retry_delay: Duration::from_secs(1),
            login_attempts: 3,
            captcha_backoff: Duration::from_secs(2),
            transient_backoff: Duration::from_secs(3),
            fetch_retry_delays: vec![Duration::from_secs(2), Duration::from_secs(3)],
            week_delay: Duration::from_millis(500),
        }
    }
}
