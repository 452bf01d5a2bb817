use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use timetable_logging::{sched_debug, sched_info, sched_warn};

use crate::captcha::CaptchaSolver;
use crate::cipher::CredentialCipher;
use crate::config::PortalConfig;

/// Reserved portal status code for a rejected verification code.
const CAPTCHA_REJECTED_CODE: i64 = -2;

/// Authenticated portal session. The login cookies live in the client's
/// cookie store; fetchers reuse the client read-only and the session is
/// never refreshed mid-run.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
}

impl Session {
    fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The portal rejected the account or password. Retrying cannot help.
    #[error("portal rejected credentials: {0}")]
    CredentialRejected(String),
    /// Every login attempt died on captcha recognition or rejection.
    #[error("captcha recognition exhausted after {attempts} login attempts")]
    CaptchaExhausted { attempts: usize },
    /// Every login attempt died on a transient network condition.
    #[error("network failure during login: {0}")]
    Network(String),
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Server verdict on one full login attempt. `CredentialFatal` is carried
/// as an error so it short-circuits the outer retry loop.
#[derive(Debug)]
enum AttemptOutcome {
    Authenticated,
    CaptchaRetryable(String),
    TransientRetryable(String),
}

/// Drives the login protocol: captcha capture with bounded retries, key
/// derivation, credential submission, and response classification.
pub struct SessionAuthenticator {
    config: PortalConfig,
    client: reqwest::Client,
    solver: Arc<dyn CaptchaSolver>,
    cipher: &'static dyn CredentialCipher,
}

impl SessionAuthenticator {
    pub fn new(
        config: PortalConfig,
        solver: Arc<dyn CaptchaSolver>,
        cipher: &'static dyn CredentialCipher,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| AuthError::Client(err.to_string()))?;
        Ok(Self {
            config,
            client,
            solver,
            cipher,
        })
    }

    /// Runs up to `login_attempts` full login attempts. A credential
    /// rejection aborts immediately; retryable classifications back off and
    /// restart with a fresh captcha image.
    pub async fn authenticate(&self, account: &str, password: &str) -> Result<Session, AuthError> {
        let attempts = self.config.login_attempts;
        let mut last_transient: Option<String> = None;
        for attempt in 1..=attempts {
            sched_info!("login attempt {attempt}/{attempts}");
            match self.attempt_login(account, password).await? {
                AttemptOutcome::Authenticated => {
                    sched_info!("login succeeded");
                    return Ok(Session::new(self.client.clone()));
                }
                AttemptOutcome::CaptchaRetryable(reason) => {
                    sched_warn!("login attempt {attempt} failed on captcha: {reason}");
                    last_transient = None;
                    if attempt < attempts {
                        tokio::time::sleep(self.config.captcha_backoff).await;
                    }
                }
                AttemptOutcome::TransientRetryable(reason) => {
                    sched_warn!("login attempt {attempt} failed: {reason}");
                    last_transient = Some(reason);
                    if attempt < attempts {
                        tokio::time::sleep(self.config.transient_backoff).await;
                    }
                }
            }
        }
        match last_transient {
            Some(reason) => Err(AuthError::Network(reason)),
            None => Err(AuthError::CaptchaExhausted { attempts }),
        }
    }

    async fn attempt_login(
        &self,
        account: &str,
        password: &str,
    ) -> Result<AttemptOutcome, AuthError> {
        let code = match self.capture_captcha().await {
            Ok(code) => code,
            // An unreachable captcha endpoint is a network condition, not a
            // recognition problem.
            Err(CaptureError::Network(reason)) => {
                return Ok(AttemptOutcome::TransientRetryable(reason))
            }
            Err(CaptureError::Recognition(reason)) => {
                return Ok(AttemptOutcome::CaptchaRetryable(reason))
            }
        };

        let key = derive_key(&code);
        let payload = match self.cipher.encrypt(password, &key) {
            Ok(payload) => payload,
            // A non-ASCII recognition result blows the 16-byte key contract.
            Err(err) => return Ok(AttemptOutcome::CaptchaRetryable(err.to_string())),
        };

        let url = format!("{}/new/login", self.config.base_url);
        let response = match self
            .client
            .post(&url)
            .form(&[
                ("account", account),
                ("pwd", payload.as_str()),
                ("verifycode", code.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Ok(AttemptOutcome::TransientRetryable(describe_send_error(&err))),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(AttemptOutcome::TransientRetryable(format!(
                "login http status {status}"
            )));
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return Ok(AttemptOutcome::TransientRetryable(format!(
                    "login body unreadable: {err}"
                )))
            }
        };
        classify_login_body(&body)
    }

    /// Captcha capture with bounded retries: a fresh image each attempt,
    /// accepting only exactly-4-character recognition results.
    async fn capture_captcha(&self) -> Result<String, CaptureError> {
        let url = format!("{}/yzm?d=1", self.config.base_url);
        let attempts = self.config.captcha_attempts;
        let mut last = CaptureError::Recognition("no captcha attempts configured".to_string());
        for attempt in 1..=attempts {
            match self.fetch_and_recognize(&url).await {
                Ok(text) if text.chars().count() == 4 => {
                    sched_debug!("captcha recognized as {text:?}");
                    return Ok(text);
                }
                Ok(text) => {
                    last = CaptureError::Recognition(format!(
                        "recognized {} characters, need 4",
                        text.chars().count()
                    ));
                    sched_warn!("captcha attempt {attempt}/{attempts}: {}", last.reason());
                }
                Err(err) => {
                    last = err;
                    sched_warn!("captcha attempt {attempt}/{attempts}: {}", last.reason());
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.captcha_retry_delay).await;
            }
        }
        Err(last)
    }

    async fn fetch_and_recognize(&self, url: &str) -> Result<String, CaptureError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| CaptureError::Network(describe_send_error(&err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Network(format!("captcha http status {status}")));
        }
        let image = response
            .bytes()
            .await
            .map_err(|err| CaptureError::Network(format!("captcha body unreadable: {err}")))?;
        self.solver
            .recognize(&image)
            .map_err(|err| CaptureError::Recognition(err.to_string()))
    }
}

/// Why captcha capture failed: an endpoint problem keeps the login attempt
/// in the transient class, a recognition problem keeps it retryable with a
/// fresh image.
#[derive(Debug)]
enum CaptureError {
    Network(String),
    Recognition(String),
}

impl CaptureError {
    fn reason(&self) -> &str {
        match self {
            CaptureError::Network(reason) | CaptureError::Recognition(reason) => reason,
        }
    }
}

/// Repeats the captcha text until at least 16 characters, then truncates.
/// The portal's login page derives its AES key the same way client-side.
fn derive_key(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut key = String::new();
    while key.chars().count() < 16 {
        key.push_str(code);
    }
    key.chars().take(16).collect()
}

/// The portal only promises "negative code means failure"; the finer
/// classification keys off the human-readable message, preserved exactly
/// as observed against the live portal.
fn classify_login_body(body: &str) -> Result<AttemptOutcome, AuthError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            return Ok(AttemptOutcome::TransientRetryable(format!(
                "login response was not json: {err}"
            )))
        }
    };
    let code = value.get("code").and_then(Value::as_i64).unwrap_or(-1);
    if code >= 0 {
        return Ok(AttemptOutcome::Authenticated);
    }
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if code == CAPTCHA_REJECTED_CODE || message.contains("验证码") {
        return Ok(AttemptOutcome::CaptchaRetryable(message));
    }
    if ["密码", "账号", "用户"].iter().any(|kw| message.contains(kw)) {
        return Err(AuthError::CredentialRejected(message));
    }
    Ok(AttemptOutcome::TransientRetryable(message))
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timeout: {err}")
    } else {
        format!("network: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_captcha_text_repeated_to_sixteen() {
        assert_eq!(derive_key("abcd"), "abcdabcdabcdabcd");
        assert_eq!(derive_key("ab12"), "ab12ab12ab12ab12");
        assert_eq!(derive_key(""), "");
    }

    #[test]
    fn non_negative_code_is_success() {
        let outcome = classify_login_body(r#"{"code":0,"message":"ok"}"#).unwrap();
        assert!(matches!(outcome, AttemptOutcome::Authenticated));
    }

    #[test]
    fn captcha_message_and_reserved_code_are_captcha_retryable() {
        let outcome = classify_login_body(r#"{"code":-1,"message":"验证码错误"}"#).unwrap();
        assert!(matches!(outcome, AttemptOutcome::CaptchaRetryable(_)));
        let outcome = classify_login_body(r#"{"code":-2,"message":""}"#).unwrap();
        assert!(matches!(outcome, AttemptOutcome::CaptchaRetryable(_)));
    }

    #[test]
    fn credential_message_is_fatal() {
        let err = classify_login_body(r#"{"code":-1,"message":"账号或密码错误"}"#).unwrap_err();
        assert!(matches!(err, AuthError::CredentialRejected(_)));
    }

    #[test]
    fn other_negative_codes_are_transient() {
        let outcome = classify_login_body(r#"{"code":-9,"message":"系统繁忙"}"#).unwrap();
        assert!(matches!(outcome, AttemptOutcome::TransientRetryable(_)));
        let outcome = classify_login_body("not json at all").unwrap();
        assert!(matches!(outcome, AttemptOutcome::TransientRetryable(_)));
    }
}
