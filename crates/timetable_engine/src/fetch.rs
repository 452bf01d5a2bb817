use std::fmt;

use reqwest::header::REFERER;
use timetable_logging::sched_warn;

use crate::auth::Session;
use crate::config::PortalConfig;

/// Result of trying to obtain one week's schedule payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeekFetchOutcome {
    /// Raw response text, either bare JSON or an HTML-wrapped variant.
    Success(String),
    /// Well-formed response with no content: a week without classes, not
    /// an error.
    Empty,
    /// No usable response after all retries.
    Failure(FetchFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    HttpStatus(u16),
    Timeout,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Retrieves one week's raw schedule response over an authenticated session.
pub struct ScheduleFetcher {
    session: Session,
    config: PortalConfig,
}

impl ScheduleFetcher {
    pub fn new(session: Session, config: PortalConfig) -> Self {
        Self { session, config }
    }

    /// Fetches one week, retrying the priming+data request pair with
    /// escalating delays on any failure.
    pub async fn fetch(&self, term: &str, week: u32) -> WeekFetchOutcome {
        let attempts = self.config.fetch_retry_delays.len() + 1;
        let mut last = FetchFailure {
            kind: FailureKind::Network,
            message: "no fetch attempts made".to_string(),
        };
        for attempt in 0..attempts {
            match self.fetch_pair(term, week).await {
                Ok(text) => {
                    return if text.trim().is_empty() {
                        WeekFetchOutcome::Empty
                    } else {
                        WeekFetchOutcome::Success(text)
                    };
                }
                Err(failure) => {
                    sched_warn!(
                        "week {week} fetch attempt {}/{attempts} failed: {} ({})",
                        attempt + 1,
                        failure.message,
                        failure.kind
                    );
                    if let Some(delay) = self.config.fetch_retry_delays.get(attempt) {
                        tokio::time::sleep(*delay).await;
                    }
                    last = failure;
                }
            }
        }
        WeekFetchOutcome::Failure(last)
    }

    /// A priming request establishes the server-side paging context for the
    /// week; the data request must reference it as its referring page.
    async fn fetch_pair(&self, term: &str, week: u32) -> Result<String, FetchFailure> {
        let priming_url = format!(
            "{}/xsgrkbcx!xskbList.action?xnxqdm={term}&zc={week}",
            self.config.base_url
        );
        let response = self
            .session
            .client()
            .get(&priming_url)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(&response)?;

        let data_url = format!(
            "{}/xsgrkbcx!getKbRq.action?xnxqdm={term}&zc={week}",
            self.config.base_url
        );
        let response = self
            .session
            .client()
            .get(&data_url)
            .header(REFERER, &priming_url)
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(&response)?;

        response.text().await.map_err(|err| FetchFailure {
            kind: FailureKind::Network,
            message: format!("week body unreadable: {err}"),
        })
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), FetchFailure> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchFailure {
            kind: FailureKind::HttpStatus(status.as_u16()),
            message: status.to_string(),
        })
    }
}

fn map_send_error(err: reqwest::Error) -> FetchFailure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchFailure {
        kind,
        message: err.to_string(),
    }
}
