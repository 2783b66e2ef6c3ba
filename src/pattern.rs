//! Rotations individuelles et d'équipe.
//!
//! Une rotation est un cycle de jetons ancré sur une date : le jeton attendu
//! à la date `d` est `cycle[(d - anchor) mod len]`, y compris avant l'ancre.

use crate::model::{
    Assignment, AssignmentStatus, Horizon, PersonalSchedulePattern, ScheduleShiftToken, ShiftType,
    ShiftTypeId, StaffId, TeamSchedulePattern,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Distance maximale entre deux jetons (repos attendu mais poste travaillé).
pub const MAX_TOKEN_DISTANCE: u32 = 3;

impl PersonalSchedulePattern {
    pub fn token_on(&self, date: NaiveDate) -> Option<&ScheduleShiftToken> {
        cycle_token(&self.cycle, self.anchor, date)
    }
}

impl TeamSchedulePattern {
    pub fn token_on(&self, date: NaiveDate) -> Option<&ScheduleShiftToken> {
        cycle_token(&self.cycle, self.anchor, date)
    }
}

fn cycle_token(
    cycle: &[ScheduleShiftToken],
    anchor: NaiveDate,
    date: NaiveDate,
) -> Option<&ScheduleShiftToken> {
    if cycle.is_empty() {
        return None;
    }
    let len = i64::try_from(cycle.len()).ok()?;
    let phase = date.signed_duration_since(anchor).num_days().rem_euclid(len);
    cycle.get(usize::try_from(phase).ok()?)
}

/// Distance entre le jeton attendu et le poste réellement tenu (`None` = repos).
///
/// 0 pour un jeton identique, 1 pour un autre poste de même classe, puis +1 par
/// cran de classe (jour → soir → nuit). Repos contre poste : distance maximale.
pub fn token_distance(
    expected: &ScheduleShiftToken,
    actual: Option<&ShiftType>,
    shift_types: &BTreeMap<ShiftTypeId, ShiftType>,
) -> u32 {
    match (expected, actual) {
        (ScheduleShiftToken::Off, None) => 0,
        (ScheduleShiftToken::Off, Some(_)) | (ScheduleShiftToken::Shift(_), None) => {
            MAX_TOKEN_DISTANCE
        }
        (ScheduleShiftToken::Shift(want), Some(got)) => {
            if want == &got.id {
                return 0;
            }
            match shift_types.get(want) {
                Some(want) => {
                    let gap = want.class.ordinal().abs_diff(got.class.ordinal());
                    (1 + gap).min(MAX_TOKEN_DISTANCE)
                }
                None => MAX_TOKEN_DISTANCE,
            }
        }
    }
}

#[derive(Debug, Clone)]
enum PatternSource<'a> {
    Personal(&'a PersonalSchedulePattern),
    Team(&'a TeamSchedulePattern),
}

/// Index soignant → rotation applicable. La rotation individuelle l'emporte
/// sur celle de l'équipe.
#[derive(Debug, Clone, Default)]
pub struct PatternIndex<'a> {
    by_staff: BTreeMap<StaffId, PatternSource<'a>>,
}

impl<'a> PatternIndex<'a> {
    pub fn build(personal: &'a [PersonalSchedulePattern], teams: &'a [TeamSchedulePattern]) -> Self {
        let mut by_staff = BTreeMap::new();
        for team in teams {
            for member in &team.members {
                by_staff
                    .entry(member.clone())
                    .or_insert(PatternSource::Team(team));
            }
        }
        for pattern in personal {
            by_staff.insert(pattern.staff_id.clone(), PatternSource::Personal(pattern));
        }
        Self { by_staff }
    }

    pub fn has_pattern(&self, staff: &StaffId) -> bool {
        self.by_staff.contains_key(staff)
    }

    pub fn expected(&self, staff: &StaffId, date: NaiveDate) -> Option<&'a ScheduleShiftToken> {
        match *self.by_staff.get(staff)? {
            PatternSource::Personal(p) => p.token_on(date),
            PatternSource::Team(t) => t.token_on(date),
        }
    }

    /// Divergence cumulée entre la rotation et les affectations d'un soignant
    /// sur l'horizon. `None` si le soignant n'a pas de rotation.
    pub fn divergence(
        &self,
        staff: &StaffId,
        horizon: &Horizon,
        assignments: &[Assignment],
        shift_types: &BTreeMap<ShiftTypeId, ShiftType>,
    ) -> Option<u32> {
        if !self.has_pattern(staff) {
            return None;
        }
        let mut total = 0u32;
        for date in horizon.days() {
            let Some(expected) = self.expected(staff, date) else {
                continue;
            };
            let worked: Vec<&ShiftType> = assignments
                .iter()
                .filter(|a| {
                    &a.staff_id == staff
                        && a.date == date
                        && a.status != AssignmentStatus::Cancelled
                })
                .filter_map(|a| shift_types.get(&a.shift))
                .collect();
            total += match worked.as_slice() {
                [] => token_distance(expected, None, shift_types),
                many => many
                    .iter()
                    .map(|s| token_distance(expected, Some(s), shift_types))
                    .min()
                    .unwrap_or(0),
            };
        }
        Some(total)
    }
}
