#![forbid(unsafe_code)]
mod common;

use common::*;
use garde::model::{
    Assignment, AssignmentStatus, Horizon, PersonalSchedulePattern, ScheduleShiftToken,
    TeamSchedulePattern,
};
use garde::pattern::{token_distance, MAX_TOKEN_DISTANCE};
use garde::{generate_schedule, PatternIndex, RatioPolicy, ScheduleGenerationConfig};
use std::collections::{BTreeMap, BTreeSet};

fn tok(id: &str) -> ScheduleShiftToken {
    ScheduleShiftToken::Shift(shift_id(id))
}

fn day_day_night_off() -> PersonalSchedulePattern {
    PersonalSchedulePattern {
        staff_id: sid("ana"),
        cycle: vec![tok("day"), tok("day"), tok("night"), ScheduleShiftToken::Off],
        anchor: monday(),
    }
}

fn shift_map() -> BTreeMap<garde::ShiftTypeId, garde::ShiftType> {
    [day_shift(), night_shift()]
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect()
}

fn worked(sequence: &[Option<&str>]) -> Vec<Assignment> {
    sequence
        .iter()
        .enumerate()
        .filter_map(|(i, shift)| {
            shift.map(|s| {
                Assignment::scheduled(
                    sid("ana"),
                    monday() + chrono::Duration::days(i as i64),
                    shift_id(s),
                )
            })
        })
        .collect()
}

#[test]
fn phase_follows_anchor_in_both_directions() {
    let pattern = day_day_night_off();
    assert_eq!(pattern.token_on(monday()), Some(&tok("day")));
    assert_eq!(pattern.token_on(d(2025, 3, 5)), Some(&tok("night")));
    assert_eq!(pattern.token_on(d(2025, 3, 7)), Some(&tok("day")));
    // la veille de l'ancre est la dernière case du cycle
    assert_eq!(pattern.token_on(d(2025, 3, 2)), Some(&ScheduleShiftToken::Off));
}

#[test]
fn exact_sequence_has_no_divergence() {
    let personal = vec![day_day_night_off()];
    let index = PatternIndex::build(&personal, &[]);
    let horizon = Horizon::new(monday(), d(2025, 3, 6));
    let assignments = worked(&[Some("day"), Some("day"), Some("night"), None]);

    assert_eq!(
        index.divergence(&sid("ana"), &horizon, &assignments, &shift_map()),
        Some(0)
    );
}

#[test]
fn skipped_day_diverges() {
    let personal = vec![day_day_night_off()];
    let index = PatternIndex::build(&personal, &[]);
    let horizon = Horizon::new(monday(), d(2025, 3, 6));
    let assignments = worked(&[Some("day"), None, Some("night"), None]);

    let divergence = index
        .divergence(&sid("ana"), &horizon, &assignments, &shift_map())
        .unwrap();
    assert!(divergence > 0);
    assert_eq!(divergence, MAX_TOKEN_DISTANCE);
}

#[test]
fn cancelled_assignments_do_not_count() {
    let personal = vec![day_day_night_off()];
    let index = PatternIndex::build(&personal, &[]);
    let horizon = Horizon::new(monday(), d(2025, 3, 6));
    let mut assignments = worked(&[Some("day"), Some("day"), Some("night"), None]);
    assignments[1].status = AssignmentStatus::Cancelled;

    assert_eq!(
        index.divergence(&sid("ana"), &horizon, &assignments, &shift_map()),
        Some(MAX_TOKEN_DISTANCE)
    );
}

#[test]
fn distance_grows_with_shift_class_gap() {
    let shifts = shift_map();
    let day = &shifts[&shift_id("day")];
    let night = &shifts[&shift_id("night")];
    assert_eq!(token_distance(&tok("day"), Some(day), &shifts), 0);
    assert_eq!(token_distance(&tok("day"), Some(night), &shifts), 3);
    assert_eq!(token_distance(&ScheduleShiftToken::Off, None, &shifts), 0);
    assert_eq!(token_distance(&ScheduleShiftToken::Off, Some(day), &shifts), 3);
    assert_eq!(token_distance(&tok("day"), None, &shifts), 3);
}

#[test]
fn personal_pattern_overrides_team() {
    let team = vec![TeamSchedulePattern {
        id: "blue".into(),
        cycle: vec![ScheduleShiftToken::Off],
        anchor: monday(),
        members: BTreeSet::from([sid("ana"), sid("ben")]),
    }];
    let personal = vec![day_day_night_off()];
    let index = PatternIndex::build(&personal, &team);

    assert_eq!(index.expected(&sid("ana"), monday()), Some(&tok("day")));
    assert_eq!(index.expected(&sid("ben"), monday()), Some(&ScheduleShiftToken::Off));
    assert!(!index.has_pattern(&sid("cleo")));
}

#[test]
fn generator_follows_rotations() {
    let mut req = request(4, vec![day_shift().with_min_staff(1)], &["ana", "ben"]);
    req.personal_patterns = vec![
        PersonalSchedulePattern {
            staff_id: sid("ana"),
            cycle: vec![tok("day"), ScheduleShiftToken::Off],
            anchor: monday(),
        },
        PersonalSchedulePattern {
            staff_id: sid("ben"),
            cycle: vec![ScheduleShiftToken::Off, tok("day")],
            anchor: monday(),
        },
    ];

    let outcome = generate_schedule(&req, &ScheduleGenerationConfig::default(), &RatioPolicy::standard());
    assert!(outcome.is_completed());

    let by_day: Vec<&str> = outcome.assignments.iter().map(|a| a.staff_id.as_str()).collect();
    assert_eq!(by_day, ["ana", "ben", "ana", "ben"]);
    for summary in &outcome.summary {
        assert_eq!(summary.pattern_divergence, Some(0));
    }
}
