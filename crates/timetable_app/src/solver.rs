use std::io::{self, Write};

use timetable_engine::{CaptchaError, CaptchaSolver};

/// Shows the captcha image to the operator and reads the answer from stdin.
/// The OCR engine proper is an external capability; this keeps runs working
/// without one, and the authenticator still enforces the 4-character rule.
pub struct PromptCaptchaSolver;

impl CaptchaSolver for PromptCaptchaSolver {
    fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError> {
        let write_err =
            |err: &dyn std::fmt::Display| CaptchaError::Recognition(format!("captcha image: {err}"));

        let mut file = tempfile::Builder::new()
            .prefix("captcha-")
            .suffix(".png")
            .tempfile()
            .map_err(|err| write_err(&err))?;
        file.write_all(image).map_err(|err| write_err(&err))?;
        file.flush().map_err(|err| write_err(&err))?;
        let (_, path) = file.keep().map_err(|err| write_err(&err))?;

        println!("Captcha image written to {}", path.display());
        print!("Enter the 4 characters: ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .map_err(|err| CaptchaError::Recognition(format!("stdin: {err}")))?;
        Ok(answer.trim().to_string())
    }
}
