use crate::constraints::ConstraintOverride;
use crate::model::{Assignment, ShiftTypeId, StaffId};
use crate::ratio::{RatioError, RatioResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Configuration ou requête incohérente : toujours levée avant toute affectation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigurationError {
    #[error("unknown unit type: {0}")]
    UnknownUnitType(String),
    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),
    #[error("invalid weight {weight} for constraint {constraint}: weights must be finite and >= 0")]
    NegativeWeight { constraint: String, weight: f64 },
    #[error("constraint {constraint} cannot take the requested severity")]
    InvalidSeverity { constraint: String },
    #[error("hard constraint {0} disabled or softened without an override_reason")]
    UnauditedOverride(String),
    #[error("invalid horizon: end {end} is before start {start}")]
    InvalidHorizon { start: NaiveDate, end: NaiveDate },
    #[error("request defines no shift types")]
    NoShiftTypes,
    #[error("invalid shift type {shift}: {reason}")]
    InvalidShiftType { shift: String, reason: String },
    #[error("shift types {a} and {b} overlap and neither allows it")]
    OverlappingShiftTypes { a: String, b: String },
    #[error("unknown shift type: {0}")]
    UnknownShiftType(String),
    #[error("demand for {shift} on {date} is outside the horizon")]
    DemandOutsideHorizon { date: NaiveDate, shift: String },
    #[error("duplicate staff id: {0}")]
    DuplicateStaff(String),
    #[error("duplicate shift type id: {0}")]
    DuplicateShiftType(String),
    #[error("unknown staff id: {0}")]
    UnknownStaff(String),
    #[error("history entry for {staff} on {date} falls inside the horizon")]
    HistoryInsideHorizon { staff: String, date: NaiveDate },
    #[error("empty rotation pattern for {0}")]
    EmptyPattern(String),
    #[error("minimum rest of {hours}h for {staff} is below the legal floor of {floor}h")]
    RestBelowLegalFloor { staff: String, hours: u32, floor: u32 },
    #[error("invalid ratio policy: {0}")]
    InvalidRatioPolicy(String),
}

impl From<RatioError> for ConfigurationError {
    fn from(err: RatioError) -> Self {
        match err {
            RatioError::UnknownUnitType(unit) => ConfigurationError::UnknownUnitType(unit),
            other => ConfigurationError::InvalidRatioPolicy(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Configuration(ConfigurationError),
    Timeout,
    Cancelled,
    /// Le thread d'un run parallèle s'est arrêté sans résultat.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    Failed(FailureReason),
}

/// Appelé après chaque créneau, avant le suivant.
pub type SlotObserver = Arc<dyn Fn(&ScheduleGenerationStepReport) + Send + Sync>;

/// Contrôle coopératif d'un run : drapeau d'annulation et budget horaire,
/// vérifiés avant chaque créneau.
///
/// Un observateur optionnel reçoit chaque entrée du journal dès qu'elle est
/// produite ; il peut lever le drapeau d'annulation pour arrêter le run au
/// créneau suivant.
#[derive(Clone, Default)]
pub struct RunControl {
    cancel: Option<Arc<AtomicBool>>,
    budget: Option<Duration>,
    observer: Option<SlotObserver>,
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("cancel", &self.cancel)
            .field("budget", &self.budget)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ScheduleGenerationStepReport) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub(crate) fn notify(&self, step: &ScheduleGenerationStepReport) {
        if let Some(observer) = &self.observer {
            observer(step);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotOutcome {
    Filled,
    PartiallyFilled,
    Unfilled,
}

impl SlotOutcome {
    pub fn label(self) -> &'static str {
        match self {
            SlotOutcome::Filled => "filled",
            SlotOutcome::PartiallyFilled => "partially-filled",
            SlotOutcome::Unfilled => "unfilled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenCandidate {
    pub staff_id: StaffId,
    pub penalty: f64,
}

/// Entrée du journal de génération : une par (jour, poste), même en échec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleGenerationStepReport {
    pub sequence: usize,
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
    pub outcome: SlotOutcome,
    pub required: u32,
    pub candidates_considered: usize,
    pub eligible: usize,
    pub chosen: Vec<ChosenCandidate>,
    /// Candidats écartés, par règle dure.
    pub rejected: BTreeMap<String, u32>,
    pub violated: Vec<String>,
    pub relaxed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioResult>,
}

impl ScheduleGenerationStepReport {
    pub fn shortfall(&self) -> u32 {
        let assigned = u32::try_from(self.chosen.len()).unwrap_or(u32::MAX);
        self.required.saturating_sub(assigned)
    }

    /// Écart de ratio toléré (unité en dérogation).
    pub fn is_ratio_relaxed(&self) -> bool {
        self.relaxed.iter().any(|name| name == "ratio")
    }
}

/// Sous-effectif signalable : une donnée du rapport, jamais une erreur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingShortfall {
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
    pub required: u32,
    pub assigned: u32,
    pub deficit: u32,
    pub ratio_deficit: Option<u32>,
    pub relaxed: bool,
}

/// Bilan par soignant sur l'horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffSummary {
    pub staff_id: StaffId,
    pub shifts: u32,
    pub hours: f64,
    pub nights: u32,
    pub weekend_shifts: u32,
    pub below_min_hours: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_divergence: Option<u32>,
}

/// Résultat d'une génération
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub status: RunStatus,
    pub assignments: Vec<Assignment>,
    pub report: Vec<ScheduleGenerationStepReport>,
    #[serde(default)]
    pub overrides: Vec<ConstraintOverride>,
    #[serde(default)]
    pub summary: Vec<StaffSummary>,
}

impl GenerationOutcome {
    pub(crate) fn failed(
        reason: FailureReason,
        assignments: Vec<Assignment>,
        report: Vec<ScheduleGenerationStepReport>,
        overrides: Vec<ConstraintOverride>,
    ) -> Self {
        Self {
            status: RunStatus::Failed(reason),
            assignments,
            report,
            overrides,
            summary: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn shortfalls(&self) -> Vec<StaffingShortfall> {
        self.report
            .iter()
            .filter(|step| step.shortfall() > 0 || step.ratio.is_some_and(|r| !r.satisfied))
            .map(|step| StaffingShortfall {
                date: step.date,
                shift: step.shift.clone(),
                required: step.required,
                assigned: step.required - step.shortfall(),
                deficit: step.shortfall(),
                ratio_deficit: step.ratio.map(|r| r.deficit).filter(|d| *d > 0),
                relaxed: step.is_ratio_relaxed(),
            })
            .collect()
    }

    pub fn assignments_for<'a>(&'a self, staff: &'a StaffId) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| &a.staff_id == staff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    Overlap,
    DoubleAssignment,
    RestViolation,
    SkillMismatch,
    OutsideHorizon,
    UnknownReference,
}

impl ConflictKind {
    pub fn label(self) -> &'static str {
        match self {
            ConflictKind::Overlap => "overlap",
            ConflictKind::DoubleAssignment => "double",
            ConflictKind::RestViolation => "rest",
            ConflictKind::SkillMismatch => "skill",
            ConflictKind::OutsideHorizon => "horizon",
            ConflictKind::UnknownReference => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
}

impl SlotKey {
    pub fn of(assignment: &Assignment) -> Self {
        Self {
            date: assignment.date,
            shift: assignment.shift.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub staff_id: StaffId,
    pub slot_a: SlotKey,
    pub slot_b: Option<SlotKey>,
    pub kind: ConflictKind,
}
