#![forbid(unsafe_code)]
mod common;

use common::*;
use garde::io::{import_staff_csv, write_assignments_csv, write_report_csv};
use garde::model::{Assignment, AssignmentStatus, Role, ScheduleRequest};
use garde::storage::{JsonFile, Storage};
use garde::{generate_schedule, RatioPolicy, ScheduleGenerationConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn assignments_csv_layout() {
    let mut float = Assignment::scheduled(sid("ben"), monday(), shift_id("night"));
    float.status = AssignmentStatus::Confirmed;
    float.notes = Some("float pool".into());
    let assignments = vec![
        Assignment::scheduled(sid("ana"), monday(), shift_id("day")),
        float,
    ];

    let mut out = Vec::new();
    write_assignments_csv(&mut out, &assignments).unwrap();
    let csv = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(csv.trim_end(), @r"
    date,shift,staff_id,status,notes
    2025-03-03,day,ana,scheduled,
    2025-03-03,night,ben,confirmed,float pool
    ");
}

#[test]
fn report_csv_layout() {
    let req = request(1, vec![day_shift().with_min_staff(1)], &["ana"]);
    let outcome = generate_schedule(&req, &ScheduleGenerationConfig::default(), &RatioPolicy::standard());

    let mut out = Vec::new();
    write_report_csv(&mut out, &outcome.report).unwrap();
    let csv = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(csv.trim_end(), @r"
    sequence,date,shift,outcome,required,candidates,eligible,chosen,violated,relaxed
    0,2025-03-03,day,filled,1,1,1,ana,,
    ");
}

#[test]
fn staff_import_parses_optional_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("staff.csv");
    fs::write(
        &path,
        "id,display_name,role,unit,skills,seniority_years,max_hours,min_hours\n\
         n-01,Ana,rn,5A, telemetry ; iv ,7,,60\n\
         n-02,Ben,cna,5A\n",
    )
    .unwrap();

    let staff = import_staff_csv(&path).unwrap();
    assert_eq!(staff.len(), 2);
    assert_eq!(staff[0].role, Role::RegisteredNurse);
    assert_eq!(
        staff[0].skills.iter().map(String::as_str).collect::<Vec<_>>(),
        ["iv", "telemetry"]
    );
    assert_eq!(staff[0].seniority_years, 7);
    assert_eq!(staff[0].max_hours, None);
    assert_eq!(staff[0].min_hours, Some(60));
    assert_eq!(staff[1].role, Role::NursingAssistant);
    assert!(staff[1].skills.is_empty());
}

#[test]
fn staff_import_rejects_bad_numbers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("staff.csv");
    fs::write(
        &path,
        "id,display_name,role,unit,skills,seniority_years\nn-01,Ana,rn,5A,,lots\n",
    )
    .unwrap();

    let err = import_staff_csv(&path).unwrap_err();
    assert!(err.to_string().contains("seniority_years"));
}

#[test]
fn json_file_roundtrip_is_atomic() {
    let dir = tempdir().unwrap();
    let file = JsonFile::open(dir.path().join("request.json"));
    assert!(!file.exists());

    let req = request(2, vec![day_shift(), night_shift()], &["ana", "ben"]);
    file.save(&req).unwrap();
    let loaded: ScheduleRequest = file.load().unwrap();
    assert_eq!(loaded.staff, req.staff);
    assert_eq!(loaded.shift_types, req.shift_types);

    // pas de fichier temporaire résiduel
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
