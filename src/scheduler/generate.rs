use super::types::{
    ChosenCandidate, FailureReason, GenerationOutcome, RunControl, RunStatus,
    ScheduleGenerationStepReport, SlotOutcome,
};
use super::validate::{self, PreparedRequest};
use super::{summary, ScheduleGenerator};
use crate::constraints::{
    Assessment, CandidateContext, ConstraintEngine, ConstraintKind, ConstraintOverride,
    OverrideAction, PenaltyItem, ScheduleLedger, Severity, SlotContext, Verdict, WorkedShift,
    INTERNAL_ERROR,
};
use crate::model::{
    is_weekend, Assignment, AssignmentStatus, DemandEntry, ScheduleRequest, ShiftClass,
    ShiftType, ShiftTypeId, Staff,
};
use crate::ratio::{RatioError, RatioPolicy};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// États d'un run, tracés au niveau `trace`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GenerationState {
    Initialized,
    GeneratingDay(NaiveDate),
    GeneratingShift(NaiveDate, ShiftTypeId),
    Committed(NaiveDate, ShiftTypeId),
    Unfilled(NaiveDate, ShiftTypeId),
    Completed,
    Failed,
}

struct Eligible<'a> {
    staff: &'a Staff,
    penalty: f64,
    breakdown: Vec<PenaltyItem>,
    worked_minutes: i64,
}

/// Effectif requis d'un créneau : la demande (ou le minimum du poste), relevée
/// par l'exigence du ratio quand un recensement est fourni.
fn required_headcount(
    engine: &ConstraintEngine,
    policy: &RatioPolicy,
    unit_type: &str,
    shift: &ShiftType,
    demand: Option<&DemandEntry>,
) -> Result<u32, RatioError> {
    let base = demand
        .and_then(|d| d.required_staff)
        .unwrap_or(shift.min_staff);
    let ratio = match demand.and_then(|d| d.patient_census) {
        Some(census) if engine.is_enabled(ConstraintKind::Ratio) => {
            policy.required(unit_type, shift.class, census)?
        }
        _ => 0,
    };
    Ok(base.max(ratio))
}

struct Run<'a> {
    generator: &'a ScheduleGenerator,
    prepared: PreparedRequest<'a>,
    unit_staff: Vec<&'a Staff>,
    override_eligible: bool,
    ledger: ScheduleLedger,
    assignments: Vec<Assignment>,
    report: Vec<ScheduleGenerationStepReport>,
    state: GenerationState,
}

pub(super) fn run(
    generator: &ScheduleGenerator,
    request: &ScheduleRequest,
    control: &RunControl,
) -> GenerationOutcome {
    let started = Instant::now();
    let budget = control.budget().or_else(|| {
        generator
            .config()
            .time_budget_ms
            .map(Duration::from_millis)
    });
    let mut overrides: Vec<ConstraintOverride> = generator.engine().overrides().to_vec();

    let prepared = match validate::prepare(request, generator.config(), generator.policy()) {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(unit = %request.unit, error = %err, "schedule request rejected");
            return GenerationOutcome::failed(
                FailureReason::Configuration(err),
                Vec::new(),
                Vec::new(),
                overrides,
            );
        }
    };

    let override_eligible = generator.engine().is_enabled(ConstraintKind::Ratio)
        && generator.config().ratio_override_units.contains(&request.unit);
    if override_eligible {
        overrides.push(ConstraintOverride {
            constraint: ConstraintKind::Ratio.name().to_string(),
            action: OverrideAction::RatioRelaxable,
            reason: format!("unit {} listed in ratio_override_units", request.unit),
        });
    }

    let mut ledger = ScheduleLedger::new();
    for past in request
        .history
        .iter()
        .filter(|a| a.status != AssignmentStatus::Cancelled)
    {
        if let Some(shift) = prepared.shift_types.get(&past.shift) {
            ledger.record_history(&past.staff_id, WorkedShift::new(past.date, shift));
        }
    }

    let unit_staff: Vec<&Staff> = request
        .staff
        .iter()
        .filter(|s| s.unit == request.unit)
        .collect();

    info!(
        unit = %request.unit,
        days = request.horizon.len_days(),
        shifts = request.shift_types.len(),
        staff = unit_staff.len(),
        "schedule generation started"
    );

    let mut run = Run {
        generator,
        prepared,
        unit_staff,
        override_eligible,
        ledger,
        assignments: Vec::new(),
        report: Vec::new(),
        state: GenerationState::Initialized,
    };
    trace!(state = ?run.state);

    for date in request.horizon.days() {
        run.transition(GenerationState::GeneratingDay(date));
        for shift in &request.shift_types {
            let interruption = if control.is_cancelled() {
                Some(FailureReason::Cancelled)
            } else if budget.is_some_and(|b| started.elapsed() >= b) {
                Some(FailureReason::Timeout)
            } else {
                None
            };
            if let Some(reason) = interruption {
                return run.interrupt(reason, overrides);
            }

            run.transition(GenerationState::GeneratingShift(date, shift.id.clone()));
            let step = run.fill_slot(date, shift);
            control.notify(&step);
            let next = if step.outcome == SlotOutcome::Unfilled {
                GenerationState::Unfilled(date, shift.id.clone())
            } else {
                GenerationState::Committed(date, shift.id.clone())
            };
            run.report.push(step);
            run.transition(next);
        }
    }

    run.transition(GenerationState::Completed);
    let summary = summary::summarize(&run.prepared, &run.assignments);
    let unfilled = run
        .report
        .iter()
        .filter(|step| step.shortfall() > 0)
        .count();
    info!(
        unit = %request.unit,
        assignments = run.assignments.len(),
        slots = run.report.len(),
        understaffed_slots = unfilled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "schedule generation completed"
    );

    GenerationOutcome {
        status: RunStatus::Completed,
        assignments: run.assignments,
        report: run.report,
        overrides,
        summary,
    }
}

impl<'a> Run<'a> {
    fn transition(&mut self, next: GenerationState) {
        trace!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    fn interrupt(
        mut self,
        reason: FailureReason,
        overrides: Vec<ConstraintOverride>,
    ) -> GenerationOutcome {
        self.transition(GenerationState::Failed);
        warn!(
            unit = %self.prepared.request.unit,
            ?reason,
            completed_slots = self.report.len(),
            "schedule generation interrupted"
        );
        let assignments = if self.generator.config().best_effort {
            self.assignments
        } else {
            Vec::new()
        };
        GenerationOutcome::failed(reason, assignments, self.report, overrides)
    }

    fn is_undesirable(&self, date: NaiveDate, shift: &ShiftType) -> bool {
        let fairness = self.generator.config().fairness;
        (fairness.nights && shift.class == ShiftClass::Night)
            || (fairness.weekends && is_weekend(date))
    }

    fn fill_slot(&mut self, date: NaiveDate, shift: &ShiftType) -> ScheduleGenerationStepReport {
        let request = self.prepared.request;
        let generator = self.generator;
        let engine = generator.engine();
        let policy = generator.policy();

        let demand = self.prepared.demand.get(&(date, shift.id.clone())).copied();
        let census = demand.and_then(|d| d.patient_census);
        let mut violated = Vec::new();
        let mut relaxed = Vec::new();
        let required = match required_headcount(engine, policy, &request.unit_type, shift, demand) {
            Ok(required) => required,
            Err(err) => {
                warn!(%date, shift = %shift.id, error = %err, "ratio requirement unavailable");
                violated.push(INTERNAL_ERROR.to_string());
                demand
                    .and_then(|d| d.required_staff)
                    .unwrap_or(shift.min_staff)
            }
        };

        let window = shift.window_on(date);
        let undesirable = self.is_undesirable(date, shift);
        let undesirable_mean = self
            .ledger
            .undesirable_mean(self.unit_staff.iter().map(|s| &s.id));

        let pool: Vec<&'a Staff> = self
            .unit_staff
            .iter()
            .copied()
            .filter(|staff| {
                let mandatory_off = self
                    .prepared
                    .profiles
                    .get(&staff.id)
                    .is_some_and(|p| p.is_mandatory_off(date));
                !mandatory_off && !self.ledger.overlaps(&staff.id, window.0, window.1)
            })
            .collect();

        let mut rejected: BTreeMap<String, u32> = BTreeMap::new();
        let mut eligible: Vec<Eligible<'a>> = Vec::new();

        for &staff in &pool {
            let Some(profile) = self.prepared.profiles.get(&staff.id) else {
                continue;
            };
            let ctx = CandidateContext {
                staff,
                profile,
                shift,
                date,
                window,
                ledger: &self.ledger,
                expected: self.prepared.patterns.expected(&staff.id, date),
                shift_types: &self.prepared.shift_types,
                undesirable,
                undesirable_mean,
            };
            let assessment = engine.assess(&ctx);
            match assessment {
                Assessment::Eligible { penalty, ref breakdown } => eligible.push(Eligible {
                    staff,
                    penalty,
                    breakdown: breakdown.clone(),
                    worked_minutes: self.ledger.worked_minutes(&staff.id),
                }),
                Assessment::Rejected { constraint, ref reason } => {
                    debug!(staff = %staff.id, %date, shift = %shift.id, constraint = constraint.name(), %reason, "candidate rejected");
                    if let Some(label) = assessment.rejection_label() {
                        *rejected.entry(label.to_string()).or_default() += 1;
                    }
                }
            }
        }

        eligible.sort_by(|a, b| {
            a.penalty
                .total_cmp(&b.penalty)
                .then(a.worked_minutes.cmp(&b.worked_minutes))
                .then_with(|| a.staff.id.cmp(&b.staff.id))
        });

        let eligible_count = eligible.len();
        let take = usize::try_from(required).unwrap_or(usize::MAX);
        let mut chosen = Vec::new();
        let mut soft_breaches = BTreeSet::new();
        let mut softened_breaches = BTreeSet::new();
        for pick in eligible.into_iter().take(take) {
            for item in &pick.breakdown {
                // une règle dure assouplie reste signalée comme relâchée
                if item.constraint.default_severity() == Severity::Hard {
                    softened_breaches.insert(item.constraint.name());
                } else {
                    soft_breaches.insert(item.constraint.name());
                }
            }
            self.ledger
                .record(&pick.staff.id, WorkedShift::new(date, shift), undesirable);
            self.assignments
                .push(Assignment::scheduled(pick.staff.id.clone(), date, shift.id.clone()));
            chosen.push(ChosenCandidate {
                staff_id: pick.staff.id.clone(),
                penalty: pick.penalty,
            });
        }

        let assigned = u32::try_from(chosen.len()).unwrap_or(u32::MAX);
        violated.extend(soft_breaches.into_iter().map(String::from));
        relaxed.extend(softened_breaches.into_iter().map(String::from));
        let ratio = census.and_then(|census| {
            policy
                .evaluate(&request.unit_type, shift.class, assigned, census)
                .ok()
        });
        if census.is_some() {
            let slot = SlotContext {
                unit_type: &request.unit_type,
                class: shift.class,
                assigned,
                patient_census: census,
                policy,
                override_eligible: self.override_eligible,
            };
            if let Some(Verdict::Violated { severity, reason, .. }) = engine.check_slot(&slot) {
                let name = ConstraintKind::Ratio.name().to_string();
                match severity {
                    Severity::Soft => relaxed.push(name),
                    Severity::Hard => violated.push(name),
                }
                debug!(%date, shift = %shift.id, %reason, ?severity, "ratio not met");
            }
        }

        let outcome = if assigned >= required {
            SlotOutcome::Filled
        } else if assigned == 0 {
            SlotOutcome::Unfilled
        } else {
            SlotOutcome::PartiallyFilled
        };
        if outcome != SlotOutcome::Filled {
            warn!(%date, shift = %shift.id, required, assigned, candidates = pool.len(), "slot understaffed");
        } else {
            debug!(%date, shift = %shift.id, required, assigned, candidates = pool.len(), "slot filled");
        }

        ScheduleGenerationStepReport {
            sequence: self.report.len(),
            date,
            shift: shift.id.clone(),
            outcome,
            required,
            candidates_considered: pool.len(),
            eligible: eligible_count,
            chosen,
            rejected,
            violated,
            relaxed,
            ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstraintSetting, ScheduleGenerationConfig};
    use chrono::NaiveTime;

    fn night() -> ShiftType {
        ShiftType::new(
            "night",
            ShiftClass::Night,
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn census(patients: u32) -> DemandEntry {
        DemandEntry {
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            shift: ShiftTypeId::new("night"),
            required_staff: Some(1),
            patient_census: Some(patients),
        }
    }

    #[test]
    fn ratio_raises_the_headcount() {
        let engine = ConstraintEngine::from_config(&ScheduleGenerationConfig::default()).unwrap();
        let policy = RatioPolicy::standard();
        let demand = census(5);
        assert_eq!(
            required_headcount(&engine, &policy, "icu", &night(), Some(&demand)),
            Ok(3)
        );
        assert_eq!(required_headcount(&engine, &policy, "icu", &night(), None), Ok(0));
    }

    #[test]
    fn unknown_unit_is_not_read_as_zero() {
        let engine = ConstraintEngine::from_config(&ScheduleGenerationConfig::default()).unwrap();
        let demand = census(5);
        assert_eq!(
            required_headcount(&engine, &RatioPolicy::standard(), "burn-unit", &night(), Some(&demand)),
            Err(RatioError::UnknownUnitType("burn-unit".into()))
        );
    }

    #[test]
    fn disabled_ratio_keeps_the_demand() {
        let config = ScheduleGenerationConfig::default()
            .with_constraint("ratio", ConstraintSetting::disabled(Some("pilot ward")));
        let engine = ConstraintEngine::from_config(&config).unwrap();
        let demand = census(5);
        assert_eq!(
            required_headcount(&engine, &RatioPolicy::standard(), "burn-unit", &night(), Some(&demand)),
            Ok(1)
        );
    }
}
