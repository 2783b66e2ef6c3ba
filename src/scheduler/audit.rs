use super::types::{Conflict, ConflictKind, SlotKey};
use super::util;
use crate::config::ScheduleGenerationConfig;
use crate::constraints::WorkedShift;
use crate::model::{Assignment, AssignmentStatus, ScheduleRequest};
use chrono::Duration;
use std::collections::BTreeSet;

/// Vérifie a posteriori un jeu d'affectations : chevauchements, repos,
/// compétences, doublons et dates hors horizon. L'historique de la requête
/// compte pour le repos mais n'est jamais signalé seul.
pub fn audit_assignments(
    request: &ScheduleRequest,
    assignments: &[Assignment],
    config: &ScheduleGenerationConfig,
) -> Vec<Conflict> {
    let mut out = Vec::new();
    let active: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| a.status != AssignmentStatus::Cancelled)
        .collect();

    let mut seen = BTreeSet::new();
    for a in &active {
        let conflict = |kind| Conflict {
            staff_id: a.staff_id.clone(),
            slot_a: SlotKey::of(a),
            slot_b: None,
            kind,
        };
        if !request.horizon.contains(a.date) {
            out.push(conflict(ConflictKind::OutsideHorizon));
        }
        if !seen.insert((&a.staff_id, a.date, &a.shift)) {
            out.push(conflict(ConflictKind::DoubleAssignment));
        }
        let (Some(staff), Some(shift)) = (request.find_staff(&a.staff_id), request.find_shift_type(&a.shift)) else {
            out.push(conflict(ConflictKind::UnknownReference));
            continue;
        };
        let role_ok = shift.required_roles.is_empty() || shift.required_roles.contains(&staff.role);
        let skills_ok = shift.required_skills.is_subset(&staff.skills);
        if !role_ok || !skills_ok {
            out.push(conflict(ConflictKind::SkillMismatch));
        }
    }

    for staff in &request.staff {
        let min_rest = request
            .find_profile(&staff.id)
            .map(|p| p.min_rest_hours)
            .unwrap_or(config.legal_min_rest_hours);
        let min_rest = Duration::hours(i64::from(min_rest));

        let history = request
            .history
            .iter()
            .filter(|a| a.status != AssignmentStatus::Cancelled)
            .map(|a| (a, true));
        let mut shifts: Vec<(&Assignment, bool, WorkedShift)> = history
            .chain(active.iter().map(|a| (*a, false)))
            .filter(|(a, _)| a.staff_id == staff.id)
            .filter_map(|(a, past)| {
                let shift = request.find_shift_type(&a.shift)?;
                Some((a, past, WorkedShift::new(a.date, shift)))
            })
            .collect();
        shifts.sort_by_key(|(_, _, w)| w.start);

        for (idx, (a, a_past, wa)) in shifts.iter().enumerate() {
            for (b, b_past, wb) in shifts.iter().skip(idx + 1) {
                if *a_past && *b_past {
                    continue;
                }
                if a.date == b.date && a.shift == b.shift {
                    continue;
                }
                let kind = if util::overlaps(wa.start, wa.end, wb.start, wb.end) {
                    ConflictKind::Overlap
                } else if wb.start - wa.end < min_rest {
                    ConflictKind::RestViolation
                } else {
                    continue;
                };
                out.push(Conflict {
                    staff_id: staff.id.clone(),
                    slot_a: SlotKey::of(a),
                    slot_b: Some(SlotKey::of(b)),
                    kind,
                });
            }
        }
    }

    out
}
