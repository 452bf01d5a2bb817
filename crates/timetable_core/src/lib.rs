//! Timetable core: pure domain model, tolerant week parsing, semester merge.
mod event;
mod parse;
mod semester;

pub use event::{CourseEvent, EventKey};
pub use parse::{parse_week_schedule, ParseDiagnostic, WeekParse};
pub use semester::{SemesterReport, SemesterState};
