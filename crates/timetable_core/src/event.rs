use chrono::NaiveDate;

/// One concrete scheduling slot: a course meeting at a location on a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseEvent {
    pub name: String,
    pub teacher: String,
    pub location: String,
    /// Period-code string such as "0102": start slot "01", end slot "02".
    pub periods: String,
    pub date: NaiveDate,
}

/// Composite identity of a scheduling slot. The portal re-reports the same
/// course in overlapping week windows; equal keys collapse to one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub date: NaiveDate,
    pub periods: String,
    pub name: String,
    pub teacher: String,
    pub location: String,
}

impl CourseEvent {
    pub fn key(&self) -> EventKey {
        EventKey {
            date: self.date,
            periods: self.periods.clone(),
            name: self.name.clone(),
            teacher: self.teacher.clone(),
            location: self.location.clone(),
        }
    }

    /// First period slot of the `periods` code ("0102" -> "01").
    pub fn start_slot(&self) -> Option<&str> {
        self.periods.get(..2)
    }

    /// Last period slot of the `periods` code ("0102" -> "02").
    pub fn end_slot(&self) -> Option<&str> {
        self.periods
            .len()
            .checked_sub(2)
            .and_then(|start| self.periods.get(start..))
    }
}
