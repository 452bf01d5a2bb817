use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha recognition failed: {0}")]
    Recognition(String),
}

/// Maps a captcha image to recognized text. The recognition engine itself
/// is an external capability; the authenticator only ever accepts
/// exactly-4-character results and retries otherwise.
pub trait CaptchaSolver: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError>;
}
