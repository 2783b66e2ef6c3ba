#![allow(dead_code)]
use chrono::{NaiveDate, NaiveTime};
use garde::model::{
    DemandEntry, Horizon, Role, ScheduleRequest, ShiftClass, ShiftType, ShiftTypeId, Staff,
    StaffId,
};

pub const UNIT: &str = "5A";

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Lundi 3 mars 2025.
pub fn monday() -> NaiveDate {
    d(2025, 3, 3)
}

pub fn day_shift() -> ShiftType {
    ShiftType::new("day", ShiftClass::Day, t(7, 0), t(19, 0)).unwrap()
}

pub fn night_shift() -> ShiftType {
    ShiftType::new("night", ShiftClass::Night, t(19, 0), t(7, 0)).unwrap()
}

pub fn nurse(id: &str) -> Staff {
    Staff::new(StaffId::new(id), id.to_uppercase(), Role::RegisteredNurse, UNIT)
}

pub fn sid(id: &str) -> StaffId {
    StaffId::new(id)
}

pub fn shift_id(id: &str) -> ShiftTypeId {
    ShiftTypeId::new(id)
}

/// Requête de `days` jours à partir du lundi, unité médecine-chirurgie.
pub fn request(days: i64, shift_types: Vec<ShiftType>, staff: &[&str]) -> ScheduleRequest {
    let start = monday();
    let end = start + chrono::Duration::days(days - 1);
    let mut req = ScheduleRequest::new(Horizon::new(start, end), UNIT, "medical-surgical");
    req.shift_types = shift_types;
    req.staff = staff.iter().map(|id| nurse(id)).collect();
    req
}

pub fn demand(date: NaiveDate, shift: &str, required: u32) -> DemandEntry {
    DemandEntry {
        date,
        shift: shift_id(shift),
        required_staff: Some(required),
        patient_census: None,
    }
}
