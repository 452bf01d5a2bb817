use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One run's worth of configuration, loaded from a RON file and treated as
/// immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Provider id in the static registry, e.g. "gdut".
    pub provider: String,
    /// Term code such as "202501". The "auto" sentinel is resolved by an
    /// external collaborator and is rejected here.
    pub term_code: String,
    pub total_weeks: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_output")]
    pub output_filename: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_output() -> String {
    "semester.ics".to_string()
}

pub fn load(path: &Path) -> Result<RunConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: RunConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &RunConfig) -> Result<()> {
    if config.total_weeks == 0 {
        bail!("total_weeks must be at least 1");
    }
    if config.term_code.eq_ignore_ascii_case("auto") {
        bail!("term_code \"auto\" is not resolved here; set the concrete code, e.g. \"202501\"");
    }
    Ok(())
}

/// Environment variables override the config file's credentials block.
pub fn resolve_credentials(config: &RunConfig) -> Result<(String, String)> {
    let account = std::env::var("TIMETABLE_ACCOUNT")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| config.credentials.as_ref().map(|c| c.account.clone()));
    let password = std::env::var("TIMETABLE_PASSWORD")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| config.credentials.as_ref().map(|c| c.password.clone()));
    match (account, password) {
        (Some(account), Some(password)) if !account.is_empty() && !password.is_empty() => {
            Ok((account, password))
        }
        _ => bail!(
            "no credentials found; set TIMETABLE_ACCOUNT and TIMETABLE_PASSWORD \
             or fill the credentials block in the config file"
        ),
    }
}
