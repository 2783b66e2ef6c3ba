use super::types::StaffSummary;
use super::validate::PreparedRequest;
use crate::model::{is_weekend, Assignment, AssignmentStatus, ShiftClass};

/// Bilan par soignant de l'unité, trié par identifiant.
pub(super) fn summarize(prepared: &PreparedRequest<'_>, assignments: &[Assignment]) -> Vec<StaffSummary> {
    let request = prepared.request;
    let mut staff: Vec<_> = request
        .staff
        .iter()
        .filter(|s| s.unit == request.unit)
        .collect();
    staff.sort_by(|a, b| a.id.cmp(&b.id));

    staff
        .into_iter()
        .map(|member| {
            let mut shifts = 0u32;
            let mut minutes = 0i64;
            let mut nights = 0u32;
            let mut weekend_shifts = 0u32;
            for assignment in assignments
                .iter()
                .filter(|a| a.staff_id == member.id && a.status != AssignmentStatus::Cancelled)
            {
                let Some(shift) = prepared.shift_types.get(&assignment.shift) else {
                    continue;
                };
                shifts += 1;
                minutes += shift.duration_minutes();
                if shift.class == ShiftClass::Night {
                    nights += 1;
                }
                if is_weekend(assignment.date) {
                    weekend_shifts += 1;
                }
            }
            StaffSummary {
                staff_id: member.id.clone(),
                shifts,
                hours: minutes as f64 / 60.0,
                nights,
                weekend_shifts,
                below_min_hours: member
                    .min_hours
                    .is_some_and(|min| minutes < i64::from(min) * 60),
                pattern_divergence: prepared.patterns.divergence(
                    &member.id,
                    &request.horizon,
                    assignments,
                    &prepared.shift_types,
                ),
            }
        })
        .collect()
}
