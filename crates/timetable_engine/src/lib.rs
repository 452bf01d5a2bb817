//! Timetable engine: portal IO pipeline, from login to calendar artifact.
mod aggregate;
mod auth;
mod captcha;
mod cipher;
mod config;
mod export;
mod fetch;
mod provider;

pub use aggregate::SemesterAggregator;
pub use auth::{AuthError, Session, SessionAuthenticator};
pub use captcha::{CaptchaError, CaptchaSolver};
pub use cipher::{AesEcbHexCipher, CipherError, CredentialCipher};
pub use config::PortalConfig;
pub use export::{write_calendar, ExportError, ExportOptions, ExportSummary, TimeTable};
pub use fetch::{FailureKind, FetchFailure, ScheduleFetcher, WeekFetchOutcome};
pub use provider::{find_provider, provider_ids, Provider};
