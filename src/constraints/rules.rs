//! Règles soignantes. Chaque règle renvoie `None` si elle est respectée, sinon
//! un motif et une amplitude (l'amplitude est pondérée par le moteur).

use super::context::{CandidateContext, SlotContext};
use crate::pattern;
use crate::ratio::RatioError;
use crate::scheduler::util;
use crate::model::ShiftClass;
use chrono::Duration;

pub(super) type Breach = Option<(String, f64)>;

pub(super) fn rest_period(ctx: &CandidateContext<'_>) -> Breach {
    let min_rest = Duration::hours(i64::from(ctx.profile.min_rest_hours));
    let (start, end) = ctx.window;

    for worked in ctx.ledger.shifts_for(&ctx.staff.id) {
        if util::overlaps(worked.start, worked.end, start, end) {
            return Some((
                format!("overlaps {} on {}", worked.shift, worked.date),
                1.0,
            ));
        }
        let gap = if worked.end <= start {
            start - worked.end
        } else {
            worked.start - end
        };
        if gap < min_rest {
            let missing = (min_rest - gap).num_minutes() as f64 / 60.0;
            return Some((
                format!(
                    "{}h{:02} rest next to {} on {} (minimum {}h)",
                    gap.num_hours(),
                    gap.num_minutes() % 60,
                    worked.shift,
                    worked.date,
                    ctx.profile.min_rest_hours
                ),
                missing,
            ));
        }
    }
    None
}

pub(super) fn max_consecutive_shifts(ctx: &CandidateContext<'_>) -> Breach {
    let run = ctx
        .ledger
        .consecutive_days_before(&ctx.staff.id, ctx.date, false)
        + 1;
    let max = ctx.profile.max_consecutive_shifts;
    (run > max).then(|| {
        (
            format!("{run} consecutive working days (maximum {max})"),
            f64::from(run - max),
        )
    })
}

pub(super) fn max_consecutive_nights(ctx: &CandidateContext<'_>) -> Breach {
    if ctx.shift.class != ShiftClass::Night {
        return None;
    }
    let run = ctx
        .ledger
        .consecutive_days_before(&ctx.staff.id, ctx.date, true)
        + 1;
    let max = ctx.profile.max_consecutive_nights;
    (run > max).then(|| {
        (
            format!("{run} consecutive nights (maximum {max})"),
            f64::from(run - max),
        )
    })
}

pub(super) fn skill_match(ctx: &CandidateContext<'_>) -> Breach {
    let shift = ctx.shift;
    if !shift.required_roles.is_empty() && !shift.required_roles.contains(&ctx.staff.role) {
        return Some((
            format!("role {} not allowed on {}", ctx.staff.role.label(), shift.id),
            1.0,
        ));
    }
    let missing: Vec<&str> = shift
        .required_skills
        .iter()
        .filter(|skill| !ctx.staff.skills.contains(*skill))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        None
    } else {
        Some((format!("missing skills: {}", missing.join(", ")), missing.len() as f64))
    }
}

pub(super) fn max_hours(ctx: &CandidateContext<'_>) -> Breach {
    let max = ctx.staff.max_hours?;
    let total = ctx.ledger.worked_minutes(&ctx.staff.id) + ctx.shift.duration_minutes();
    let cap = i64::from(max) * 60;
    (total > cap).then(|| {
        (
            format!("{:.1}h over the {max}h cap", (total - cap) as f64 / 60.0),
            (total - cap) as f64 / 60.0,
        )
    })
}

pub(super) fn requested_off(ctx: &CandidateContext<'_>) -> Breach {
    ctx.profile
        .is_advisory_off(ctx.date)
        .then(|| (format!("day off requested on {}", ctx.date), 1.0))
}

pub(super) fn pattern_adherence(ctx: &CandidateContext<'_>) -> Breach {
    let expected = ctx.expected?;
    let distance = pattern::token_distance(expected, Some(ctx.shift), ctx.shift_types);
    (distance > 0).then(|| {
        (
            format!("diverges from rotation by {distance}"),
            f64::from(distance),
        )
    })
}

pub(super) fn fairness(ctx: &CandidateContext<'_>) -> Breach {
    if !ctx.undesirable {
        return None;
    }
    let count = f64::from(ctx.ledger.undesirable_count(&ctx.staff.id)) + 1.0;
    let deviation = count - ctx.undesirable_mean;
    (deviation > 0.0).then(|| {
        (
            format!("{count} undesirable shifts vs mean {:.2}", ctx.undesirable_mean),
            deviation * deviation,
        )
    })
}

pub(super) fn ratio(ctx: &SlotContext<'_>) -> Result<Breach, RatioError> {
    let Some(census) = ctx.patient_census else {
        return Ok(None);
    };
    let result = ctx
        .policy
        .evaluate(ctx.unit_type, ctx.class, ctx.assigned, census)?;
    Ok((!result.satisfied).then(|| {
        (
            format!(
                "{} staff for {census} patients, {} required",
                result.actual, result.required
            ),
            f64::from(result.deficit),
        )
    }))
}
