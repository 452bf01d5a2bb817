use timetable_core::{parse_week_schedule, ParseDiagnostic, SemesterReport, SemesterState};
use timetable_logging::{sched_debug, sched_error, sched_info, sched_warn};

use crate::config::PortalConfig;
use crate::fetch::{ScheduleFetcher, WeekFetchOutcome};

/// Orchestrates one term: authenticated fetch, parse, and merge per week,
/// strictly in ascending week order.
pub struct SemesterAggregator {
    fetcher: ScheduleFetcher,
    config: PortalConfig,
}

impl SemesterAggregator {
    pub fn new(fetcher: ScheduleFetcher, config: PortalConfig) -> Self {
        Self { fetcher, config }
    }

    /// Per-week failures are recorded and never abort the run; weeks already
    /// merged survive any later failure.
    pub async fn run(&self, term: &str, total_weeks: u32) -> SemesterReport {
        let mut state = SemesterState::new(total_weeks);
        for week in 1..=total_weeks {
            sched_info!("fetching week {week}/{total_weeks}");
            match self.fetcher.fetch(term, week).await {
                WeekFetchOutcome::Failure(failure) => {
                    sched_error!("week {week} failed: {} ({})", failure.message, failure.kind);
                    state.record_failure(week);
                }
                WeekFetchOutcome::Empty => {
                    sched_info!("week {week}: no classes scheduled");
                }
                WeekFetchOutcome::Success(text) => {
                    let parsed = parse_week_schedule(&text);
                    match parsed.diagnostic {
                        ParseDiagnostic::Clean | ParseDiagnostic::NoContent => {}
                        diagnostic => sched_warn!(
                            "week {week} degraded parse: {diagnostic:?}, {} records dropped",
                            parsed.dropped
                        ),
                    }
                    if parsed.events.is_empty() {
                        sched_warn!("week {week} parsed to zero events");
                    } else {
                        sched_debug!("week {week}: {} events", parsed.events.len());
                    }
                    state.merge_week(parsed.events);
                }
            }
            // Politeness toward the portal's rate limits.
            if week < total_weeks {
                tokio::time::sleep(self.config.week_delay).await;
            }
        }

        let report = state.finish();
        if report.degraded {
            sched_warn!(
                "{} of {} weeks failed to fetch; calendar will be incomplete",
                report.failed_weeks.len(),
                report.total_weeks
            );
        }
        report
    }
}
