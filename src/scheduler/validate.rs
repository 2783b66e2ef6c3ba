use super::{util, ConfigurationError};
use crate::config::ScheduleGenerationConfig;
use crate::model::{
    DemandEntry, ScheduleRequest, ScheduleShiftToken, ShiftType, ShiftTypeId, StaffId,
    StaffSchedulingProfile,
};
use crate::pattern::PatternIndex;
use crate::ratio::RatioPolicy;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Requête validée et indexée pour un run.
#[derive(Debug)]
pub(super) struct PreparedRequest<'a> {
    pub request: &'a ScheduleRequest,
    pub shift_types: BTreeMap<ShiftTypeId, ShiftType>,
    pub profiles: BTreeMap<StaffId, StaffSchedulingProfile>,
    pub patterns: PatternIndex<'a>,
    pub demand: BTreeMap<(NaiveDate, ShiftTypeId), &'a DemandEntry>,
}

pub(super) fn prepare<'a>(
    request: &'a ScheduleRequest,
    config: &ScheduleGenerationConfig,
    policy: &RatioPolicy,
) -> Result<PreparedRequest<'a>, ConfigurationError> {
    let horizon = request.horizon;
    if horizon.end < horizon.start {
        return Err(ConfigurationError::InvalidHorizon {
            start: horizon.start,
            end: horizon.end,
        });
    }

    policy.validate()?;
    if !policy.knows(&request.unit_type) {
        return Err(ConfigurationError::UnknownUnitType(request.unit_type.clone()));
    }

    let shift_types = validate_shift_types(&request.shift_types)?;

    let mut staff_ids = BTreeSet::new();
    for staff in &request.staff {
        if !staff_ids.insert(&staff.id) {
            return Err(ConfigurationError::DuplicateStaff(staff.id.to_string()));
        }
    }
    let known_staff = |id: &StaffId| -> Result<(), ConfigurationError> {
        if staff_ids.contains(id) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownStaff(id.to_string()))
        }
    };
    let known_shift = |id: &ShiftTypeId| -> Result<(), ConfigurationError> {
        if shift_types.contains_key(id) {
            Ok(())
        } else {
            Err(ConfigurationError::UnknownShiftType(id.to_string()))
        }
    };
    let known_tokens = |cycle: &[ScheduleShiftToken]| -> Result<(), ConfigurationError> {
        cycle.iter().try_for_each(|token| match token {
            ScheduleShiftToken::Shift(id) => known_shift(id),
            ScheduleShiftToken::Off => Ok(()),
        })
    };

    let mut profiles = BTreeMap::new();
    for profile in &request.profiles {
        known_staff(&profile.staff_id)?;
        if profile.min_rest_hours < config.legal_min_rest_hours {
            return Err(ConfigurationError::RestBelowLegalFloor {
                staff: profile.staff_id.to_string(),
                hours: profile.min_rest_hours,
                floor: config.legal_min_rest_hours,
            });
        }
        profiles.insert(profile.staff_id.clone(), profile.clone());
    }
    for staff in &request.staff {
        profiles.entry(staff.id.clone()).or_insert_with(|| {
            StaffSchedulingProfile::new(
                staff.id.clone(),
                config.default_max_consecutive_shifts,
                config.default_max_consecutive_nights,
                config.legal_min_rest_hours,
            )
        });
    }

    for pattern in &request.personal_patterns {
        known_staff(&pattern.staff_id)?;
        if pattern.cycle.is_empty() {
            return Err(ConfigurationError::EmptyPattern(pattern.staff_id.to_string()));
        }
        known_tokens(&pattern.cycle)?;
    }
    for team in &request.team_patterns {
        if team.cycle.is_empty() {
            return Err(ConfigurationError::EmptyPattern(team.id.clone()));
        }
        known_tokens(&team.cycle)?;
        team.members.iter().try_for_each(known_staff)?;
    }

    let mut demand = BTreeMap::new();
    for entry in &request.demand {
        known_shift(&entry.shift)?;
        if !horizon.contains(entry.date) {
            return Err(ConfigurationError::DemandOutsideHorizon {
                date: entry.date,
                shift: entry.shift.to_string(),
            });
        }
        demand.insert((entry.date, entry.shift.clone()), entry);
    }

    for past in &request.history {
        known_staff(&past.staff_id)?;
        known_shift(&past.shift)?;
        if past.date >= horizon.start {
            return Err(ConfigurationError::HistoryInsideHorizon {
                staff: past.staff_id.to_string(),
                date: past.date,
            });
        }
    }

    let patterns = PatternIndex::build(&request.personal_patterns, &request.team_patterns);

    Ok(PreparedRequest {
        request,
        shift_types,
        profiles,
        patterns,
        demand,
    })
}

fn validate_shift_types(
    shift_types: &[ShiftType],
) -> Result<BTreeMap<ShiftTypeId, ShiftType>, ConfigurationError> {
    if shift_types.is_empty() {
        return Err(ConfigurationError::NoShiftTypes);
    }
    let mut by_id = BTreeMap::new();
    for shift in shift_types {
        if shift.start == shift.end {
            return Err(ConfigurationError::InvalidShiftType {
                shift: shift.id.to_string(),
                reason: "start and end cannot be equal".to_string(),
            });
        }
        if by_id.insert(shift.id.clone(), shift.clone()).is_some() {
            return Err(ConfigurationError::DuplicateShiftType(shift.id.to_string()));
        }
    }
    for (i, a) in shift_types.iter().enumerate() {
        for b in shift_types.iter().skip(i + 1) {
            if a.allow_overlap || b.allow_overlap {
                continue;
            }
            if util::shift_types_overlap(a, b) {
                return Err(ConfigurationError::OverlappingShiftTypes {
                    a: a.id.to_string(),
                    b: b.id.to_string(),
                });
            }
        }
    }
    Ok(by_id)
}
