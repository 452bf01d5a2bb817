use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, NaiveTime};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use timetable_core::CourseEvent;
use timetable_logging::sched_warn;

/// Period code -> (start, end) wall-clock times.
pub type TimeTable = HashMap<String, (NaiveTime, NaiveTime)>;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// TZID stamped on every DTSTART/DTEND.
    pub timezone: String,
    pub output_filename: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timezone: "Asia/Shanghai".to_string(),
            output_filename: "semester.ics".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub event_count: usize,
    /// Events skipped because their period codes are not in the time table.
    pub skipped: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes the merged event list into an RFC 5545 calendar file,
/// written atomically into `output_dir`.
pub fn write_calendar(
    output_dir: &Path,
    events: &[CourseEvent],
    time_table: &TimeTable,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let mut buffer = String::new();
    push_line(&mut buffer, "BEGIN:VCALENDAR");
    push_line(&mut buffer, "VERSION:2.0");
    push_line(&mut buffer, "PRODID:-//timetable//semester harvest//EN");

    let mut event_count = 0;
    let mut skipped = 0;
    for event in events {
        let Some((start, end)) = event_times(event, time_table) else {
            sched_warn!(
                "skipping {:?} on {}: period code {:?} not in time table",
                event.name,
                event.date,
                event.periods
            );
            skipped += 1;
            continue;
        };
        push_line(&mut buffer, "BEGIN:VEVENT");
        push_line(&mut buffer, &format!("UID:{}", event_uid(event)));
        push_line(
            &mut buffer,
            &format!(
                "DTSTART;TZID={}:{}",
                options.timezone,
                format_local(event.date.and_time(start))
            ),
        );
        push_line(
            &mut buffer,
            &format!(
                "DTEND;TZID={}:{}",
                options.timezone,
                format_local(event.date.and_time(end))
            ),
        );
        push_line(&mut buffer, &format!("SUMMARY:{}", escape_text(&event.name)));
        push_line(
            &mut buffer,
            &format!(
                "LOCATION:{}",
                escape_text(&format!("{} {}", event.location, event.teacher))
            ),
        );
        push_line(
            &mut buffer,
            &format!(
                "DESCRIPTION:{}",
                escape_text(&format!("教师: {}\n节次: {}", event.teacher, event.periods))
            ),
        );
        push_line(&mut buffer, "END:VEVENT");
        event_count += 1;
    }
    push_line(&mut buffer, "END:VCALENDAR");

    let output_path = atomic_write(output_dir, &options.output_filename, &buffer)?;
    Ok(ExportSummary {
        event_count,
        skipped,
        output_path,
    })
}

/// Start time comes from the first period slot, end time from the last.
fn event_times(event: &CourseEvent, table: &TimeTable) -> Option<(NaiveTime, NaiveTime)> {
    let start = table.get(event.start_slot()?)?.0;
    let end = table.get(event.end_slot()?)?.1;
    Some((start, end))
}

fn format_local(stamp: NaiveDateTime) -> String {
    stamp.format("%Y%m%dT%H%M%S").to_string()
}

/// Deterministic UID so re-exports replace rather than duplicate events in
/// a subscribed calendar.
fn event_uid(event: &CourseEvent) -> String {
    let mut hasher = Sha256::new();
    for part in [
        event.date.to_string().as_str(),
        &event.periods,
        &event.name,
        &event.teacher,
        &event.location,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    let digest = hasher.finalize();
    format!("{}@timetable", hex::encode(&digest[..12]))
}

/// RFC 5545 TEXT escaping.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push_str("\r\n");
}

/// Write via temp file + rename so a failed export never truncates an
/// existing calendar.
fn atomic_write(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
    }

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    if target.exists() {
        fs::remove_file(&target)?;
    }
    tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;
    Ok(target)
}
