use crate::model::ShiftType;
use chrono::Timelike;

const DAY_SECONDS: i32 = 24 * 60 * 60;

pub(crate) fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Deux postes se chevauchent-ils, y compris la queue d'une nuit sur le
/// poste du lendemain ?
pub(super) fn shift_types_overlap(a: &ShiftType, b: &ShiftType) -> bool {
    let (a_start, a_end) = bounds_seconds(a);
    let (b_start, b_end) = bounds_seconds(b);
    [-DAY_SECONDS, 0, DAY_SECONDS]
        .iter()
        .any(|shift| overlaps(a_start, a_end, b_start + shift, b_end + shift))
}

fn bounds_seconds(shift: &ShiftType) -> (i32, i32) {
    let start = shift.start.num_seconds_from_midnight() as i32;
    let mut end = shift.end.num_seconds_from_midnight() as i32;
    if shift.end <= shift.start {
        end += DAY_SECONDS;
    }
    (start, end)
}
