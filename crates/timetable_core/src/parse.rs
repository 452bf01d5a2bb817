use std::collections::HashMap;

use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::event::CourseEvent;

/// Why a week parse produced fewer events than the payload might suggest.
/// Diagnostics are for logging only; they never drive control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseDiagnostic {
    /// Payload decoded and every resolvable record was kept.
    Clean,
    /// Input was empty or whitespace: a valid "no classes" response.
    NoContent,
    /// Neither direct JSON nor the `<p>`-wrapped fallback decoded.
    Unparseable,
    /// Decoded value is not the expected [courses, date-mappings] pair.
    MalformedShape,
    /// The mapping list yielded no usable weekday->date entries, so every
    /// course record was unresolvable.
    EmptyDateMap,
}

/// Outcome of parsing one week's response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekParse {
    pub events: Vec<CourseEvent>,
    pub diagnostic: ParseDiagnostic,
    /// Course records dropped because their weekday did not resolve to a date.
    pub dropped: usize,
}

impl WeekParse {
    fn empty(diagnostic: ParseDiagnostic) -> Self {
        Self {
            events: Vec::new(),
            diagnostic,
            dropped: 0,
        }
    }
}

/// Normalizes one week's raw response into course events. Never fails:
/// every malformed path degrades to an empty event list with a diagnostic.
pub fn parse_week_schedule(raw: &str) -> WeekParse {
    if raw.trim().is_empty() {
        return WeekParse::empty(ParseDiagnostic::NoContent);
    }

    let value = match decode_payload(raw) {
        Some(value) => value,
        None => return WeekParse::empty(ParseDiagnostic::Unparseable),
    };

    let Some((courses, mappings)) = split_shape(&value) else {
        return WeekParse::empty(ParseDiagnostic::MalformedShape);
    };

    let dates = build_date_map(mappings);

    let mut events = Vec::new();
    let mut dropped = 0;
    for record in courses {
        match resolve_record(record, &dates) {
            Some(event) => events.push(event),
            None => dropped += 1,
        }
    }

    let diagnostic = if dates.is_empty() && !courses.is_empty() {
        ParseDiagnostic::EmptyDateMap
    } else {
        ParseDiagnostic::Clean
    };

    WeekParse {
        events,
        diagnostic,
        dropped,
    }
}

/// Direct JSON first; the portal sometimes wraps the same payload in an
/// HTML document whose first `<p>` element holds the JSON text.
fn decode_payload(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }
    let doc = Html::parse_document(raw);
    let selector = Selector::parse("p").ok()?;
    let paragraph = doc.select(&selector).next()?;
    let inner = paragraph.text().collect::<String>().trim().to_string();
    serde_json::from_str(&inner).ok()
}

/// The payload must be an ordered pair: course records, then weekday->date
/// mapping records. Anything else is rejected whole; no partial extraction.
fn split_shape(value: &Value) -> Option<(&Vec<Value>, &Vec<Value>)> {
    let outer = value.as_array()?;
    if outer.len() < 2 {
        return None;
    }
    let courses = outer[0].as_array()?;
    let mappings = outer[1].as_array()?;
    Some((courses, mappings))
}

fn build_date_map(mappings: &[Value]) -> HashMap<String, NaiveDate> {
    let mut dates = HashMap::new();
    for item in mappings {
        let Some(weekday) = field_text(item, "xqmc") else {
            continue;
        };
        let Some(raw_date) = field_text(item, "rq") else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") else {
            continue;
        };
        dates.insert(weekday, date);
    }
    dates
}

/// Records whose weekday is absent or not in the lookup are dropped; that
/// is the tolerance policy, not an error. Missing text fields default to
/// empty strings.
fn resolve_record(record: &Value, dates: &HashMap<String, NaiveDate>) -> Option<CourseEvent> {
    let weekday = field_text(record, "xq")?;
    let date = *dates.get(&weekday)?;
    Some(CourseEvent {
        name: field_text(record, "kcmc").unwrap_or_default(),
        teacher: field_text(record, "teaxms").unwrap_or_default(),
        location: field_text(record, "jxcdmc").unwrap_or_default(),
        periods: field_text(record, "jcdm").unwrap_or_default(),
        date,
    })
}

/// Portal payloads are stringly typed, but numeric weekday fields show up
/// in the wild; accept both.
fn field_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
