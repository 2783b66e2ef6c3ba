#![forbid(unsafe_code)]
mod common;

use common::*;
use garde::model::{DayOffRequest, DemandEntry, ScheduleRequest, StaffSchedulingProfile};
use garde::{audit_assignments, generate_schedule, RatioPolicy, ScheduleGenerationConfig};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const NAMES: [&str; 6] = ["ana", "ben", "cleo", "dan", "eve", "fred"];

#[derive(Debug, Clone)]
struct Scenario {
    days: i64,
    staff: usize,
    demand: Vec<u32>,
    census: Vec<Option<u32>>,
    skilled: Vec<bool>,
    off: Vec<Option<i64>>,
    night_skill: bool,
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (
        1i64..=8,
        1usize..=6,
        prop::collection::vec(0u32..=3, 16),
        prop::collection::vec(prop::option::of(0u32..=12), 16),
        prop::collection::vec(any::<bool>(), 6),
        prop::collection::vec(prop::option::of(0i64..8), 6),
        any::<bool>(),
    )
        .prop_map(|(days, staff, demand, census, skilled, off, night_skill)| Scenario {
            days,
            staff,
            demand,
            census,
            skilled,
            off,
            night_skill,
        })
}

fn build(s: &Scenario) -> ScheduleRequest {
    let mut night = night_shift();
    if s.night_skill {
        night.required_skills.insert("critical-care".into());
    }
    let mut req = request(s.days, vec![day_shift(), night], &NAMES[..s.staff]);
    req.unit_type = "step-down".into();
    for (i, staff) in req.staff.iter_mut().enumerate() {
        if s.skilled[i] {
            staff.skills.insert("critical-care".into());
        }
    }
    for (i, off) in s.off.iter().enumerate().take(s.staff) {
        if let Some(day) = off.filter(|day| *day < s.days) {
            let mut profile = StaffSchedulingProfile::new(sid(NAMES[i]), 4, 2, 11);
            profile.requested_off.push(DayOffRequest {
                date: monday() + chrono::Duration::days(day),
                mandatory: true,
            });
            req.profiles.push(profile);
        }
    }
    for day in 0..s.days {
        for (k, shift) in ["day", "night"].iter().enumerate() {
            let slot = usize::try_from(day).unwrap() * 2 + k;
            req.demand.push(DemandEntry {
                date: monday() + chrono::Duration::days(day),
                shift: shift_id(shift),
                required_staff: Some(s.demand[slot]),
                patient_census: s.census[slot],
            });
        }
    }
    req
}

fn longest_run(dates: &BTreeSet<chrono::NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<chrono::NaiveDate> = None;
    for date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(*date) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(*date);
    }
    best
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hard_constraints_always_hold(s in scenario()) {
        let req = build(&s);
        let config = ScheduleGenerationConfig::default();
        let outcome = generate_schedule(&req, &config, &RatioPolicy::standard());

        prop_assert!(outcome.is_completed());
        prop_assert_eq!(outcome.report.len(), usize::try_from(s.days).unwrap() * 2);
        prop_assert!(audit_assignments(&req, &outcome.assignments, &config).is_empty());

        let mut worked: BTreeMap<&str, BTreeSet<chrono::NaiveDate>> = BTreeMap::new();
        let mut nights: BTreeMap<&str, BTreeSet<chrono::NaiveDate>> = BTreeMap::new();
        for a in &outcome.assignments {
            let profile = req.find_profile(&a.staff_id);
            prop_assert!(!profile.is_some_and(|p| p.is_mandatory_off(a.date)));
            worked.entry(a.staff_id.as_str()).or_default().insert(a.date);
            if a.shift.as_str() == "night" {
                nights.entry(a.staff_id.as_str()).or_default().insert(a.date);
            }
        }
        for (staff, dates) in &worked {
            let max = req
                .find_profile(&sid(staff))
                .map(|p| p.max_consecutive_shifts)
                .unwrap_or(config.default_max_consecutive_shifts);
            prop_assert!(longest_run(dates) <= max);
        }
        for (staff, dates) in &nights {
            let max = req
                .find_profile(&sid(staff))
                .map(|p| p.max_consecutive_nights)
                .unwrap_or(config.default_max_consecutive_nights);
            prop_assert!(longest_run(dates) <= max);
        }

        for step in &outcome.report {
            prop_assert!(step.chosen.len() <= usize::try_from(step.required).unwrap());
            prop_assert!(step.eligible <= step.candidates_considered);
        }
    }

    #[test]
    fn generation_is_deterministic(s in scenario()) {
        let req = build(&s);
        let config = ScheduleGenerationConfig::default();
        let first = generate_schedule(&req, &config, &RatioPolicy::standard());
        let second = generate_schedule(&req, &config, &RatioPolicy::standard());
        prop_assert_eq!(first, second);
    }
}
