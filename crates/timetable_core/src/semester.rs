use std::collections::HashMap;

use crate::event::{CourseEvent, EventKey};

/// Accumulates per-week results over a term. Built empty, mutated once per
/// week in order, then finalized into a read-only [`SemesterReport`].
#[derive(Debug, Default)]
pub struct SemesterState {
    events: HashMap<EventKey, CourseEvent>,
    failed_weeks: Vec<u32>,
    total_weeks: u32,
}

impl SemesterState {
    pub fn new(total_weeks: u32) -> Self {
        Self {
            total_weeks,
            ..Self::default()
        }
    }

    /// Merges one week's events. Identical keys imply identical content in
    /// this domain, so overwrite-on-duplicate is idempotent.
    pub fn merge_week(&mut self, events: Vec<CourseEvent>) {
        for event in events {
            self.events.insert(event.key(), event);
        }
    }

    pub fn record_failure(&mut self, week: u32) {
        self.failed_weeks.push(week);
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn failed_weeks(&self) -> &[u32] {
        &self.failed_weeks
    }

    pub fn finish(self) -> SemesterReport {
        let mut events: Vec<CourseEvent> = self.events.into_values().collect();
        events.sort_by(|a, b| {
            (a.date, &a.periods, &a.name, &a.teacher, &a.location)
                .cmp(&(b.date, &b.periods, &b.name, &b.teacher, &b.location))
        });
        let degraded = self.failed_weeks.len() as u32 * 2 > self.total_weeks;
        SemesterReport {
            events,
            failed_weeks: self.failed_weeks,
            total_weeks: self.total_weeks,
            degraded,
        }
    }
}

/// Read-only outcome of a full term run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterReport {
    /// Events sorted by composite key for deterministic output.
    pub events: Vec<CourseEvent>,
    /// Weeks that produced no usable response, in ascending order.
    pub failed_weeks: Vec<u32>,
    pub total_weeks: u32,
    /// Set when more than half the term failed to fetch. The caller decides
    /// whether partial data is still worth exporting.
    pub degraded: bool,
}
