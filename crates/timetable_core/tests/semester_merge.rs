use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use timetable_core::{CourseEvent, SemesterState};

fn event(name: &str, day: u32, periods: &str) -> CourseEvent {
    CourseEvent {
        name: name.to_string(),
        teacher: "Li".to_string(),
        location: "A101".to_string(),
        periods: periods.to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
    }
}

#[test]
fn duplicate_keys_collapse_across_weeks() {
    let mut state = SemesterState::new(2);
    state.merge_week(vec![event("Math", 3, "0102"), event("English", 4, "0304")]);
    // The portal re-reports Math in the overlapping window of week 2.
    state.merge_week(vec![event("Math", 3, "0102")]);
    assert_eq!(state.event_count(), 2);
}

#[test]
fn merge_is_idempotent_and_order_independent() {
    let week_a = vec![event("Math", 3, "0102"), event("English", 4, "0304")];
    let week_b = vec![event("Math", 3, "0102"), event("Physics", 5, "0506")];

    let mut forward = SemesterState::new(2);
    forward.merge_week(week_a.clone());
    forward.merge_week(week_b.clone());

    let mut backward = SemesterState::new(2);
    backward.merge_week(week_b.clone());
    backward.merge_week(week_a.clone());

    let mut repeated = SemesterState::new(2);
    for _ in 0..3 {
        repeated.merge_week(week_a.clone());
        repeated.merge_week(week_b.clone());
    }

    let forward = forward.finish();
    assert_eq!(forward, backward.finish());
    assert_eq!(forward, repeated.finish());
    assert_eq!(forward.events.len(), 3);
}

#[test]
fn failed_weeks_are_recorded_in_order() {
    let mut state = SemesterState::new(10);
    state.record_failure(3);
    state.record_failure(7);
    assert_eq!(state.failed_weeks(), &[3, 7]);
    let report = state.finish();
    assert_eq!(report.failed_weeks, vec![3, 7]);
    // 2 of 10 weeks lost is well under the completeness threshold.
    assert!(!report.degraded);
}

#[test]
fn degraded_flag_requires_a_strict_majority_of_failures() {
    let mut state = SemesterState::new(10);
    for week in 1..=5 {
        state.record_failure(week);
    }
    // Exactly half is still acceptable.
    assert!(!state.finish().degraded);

    let mut state = SemesterState::new(10);
    for week in 1..=6 {
        state.record_failure(week);
    }
    assert!(state.finish().degraded);
}

#[test]
fn report_events_are_sorted_by_composite_key() {
    let mut state = SemesterState::new(1);
    state.merge_week(vec![
        event("Physics", 5, "0506"),
        event("Math", 3, "0304"),
        event("Math", 3, "0102"),
    ]);
    let report = state.finish();
    let summary: Vec<(String, String)> = report
        .events
        .iter()
        .map(|e| (e.date.to_string(), e.periods.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2025-03-03".to_string(), "0102".to_string()),
            ("2025-03-03".to_string(), "0304".to_string()),
            ("2025-03-05".to_string(), "0506".to_string()),
        ]
    );
}
