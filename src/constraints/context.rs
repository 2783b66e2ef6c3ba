use crate::model::{
    ScheduleShiftToken, ShiftClass, ShiftType, ShiftTypeId, Staff, StaffId,
    StaffSchedulingProfile,
};
use crate::ratio::RatioPolicy;
use crate::scheduler::util;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

/// Poste effectivement tenu (historique ou affectation du run en cours).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkedShift {
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
    pub class: ShiftClass,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WorkedShift {
    pub fn new(date: NaiveDate, shift: &ShiftType) -> Self {
        let (start, end) = shift.window_on(date);
        Self {
            date,
            shift: shift.id.clone(),
            class: shift.class,
            start,
            end,
        }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// État cumulé d'un run : postes par soignant (ordre chronologique), minutes
/// travaillées sur l'horizon, nombre de postes pénibles.
#[derive(Debug, Clone, Default)]
pub struct ScheduleLedger {
    shifts: BTreeMap<StaffId, Vec<WorkedShift>>,
    minutes: BTreeMap<StaffId, i64>,
    undesirable: BTreeMap<StaffId, u32>,
}

impl ScheduleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poste antérieur à l'horizon : compte pour le repos, pas pour les heures.
    pub fn record_history(&mut self, staff: &StaffId, worked: WorkedShift) {
        self.insert_sorted(staff, worked);
    }

    pub fn record(&mut self, staff: &StaffId, worked: WorkedShift, undesirable: bool) {
        *self.minutes.entry(staff.clone()).or_default() += worked.minutes();
        if undesirable {
            *self.undesirable.entry(staff.clone()).or_default() += 1;
        }
        self.insert_sorted(staff, worked);
    }

    fn insert_sorted(&mut self, staff: &StaffId, worked: WorkedShift) {
        let list = self.shifts.entry(staff.clone()).or_default();
        let pos = list.partition_point(|w| w.start <= worked.start);
        list.insert(pos, worked);
    }

    pub fn shifts_for(&self, staff: &StaffId) -> &[WorkedShift] {
        self.shifts.get(staff).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn worked_minutes(&self, staff: &StaffId) -> i64 {
        self.minutes.get(staff).copied().unwrap_or(0)
    }

    pub fn undesirable_count(&self, staff: &StaffId) -> u32 {
        self.undesirable.get(staff).copied().unwrap_or(0)
    }

    /// Moyenne des postes pénibles sur `staff`.
    pub fn undesirable_mean<'s, I>(&self, staff: I) -> f64
    where
        I: IntoIterator<Item = &'s StaffId>,
    {
        let (sum, n) = staff
            .into_iter()
            .fold((0u64, 0u64), |(sum, n), id| {
                (sum + u64::from(self.undesirable_count(id)), n + 1)
            });
        if n == 0 {
            0.0
        } else {
            sum as f64 / n as f64
        }
    }

    pub fn overlaps(&self, staff: &StaffId, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.shifts_for(staff)
            .iter()
            .any(|w| util::overlaps(w.start, w.end, start, end))
    }

    /// Jours travaillés consécutifs juste avant `date` (les nuits seules si
    /// `nights_only`). Un poste compte pour sa date de début.
    pub fn consecutive_days_before(&self, staff: &StaffId, date: NaiveDate, nights_only: bool) -> u32 {
        let worked: BTreeSet<NaiveDate> = self
            .shifts_for(staff)
            .iter()
            .filter(|w| !nights_only || w.class == ShiftClass::Night)
            .map(|w| w.date)
            .collect();
        let mut run = 0u32;
        let mut day = date.pred_opt();
        while let Some(d) = day {
            if !worked.contains(&d) {
                break;
            }
            run += 1;
            day = d.pred_opt();
        }
        run
    }
}

/// Contexte d'évaluation d'un candidat pour un créneau.
#[derive(Debug, Clone)]
pub struct CandidateContext<'a> {
    pub staff: &'a Staff,
    pub profile: &'a StaffSchedulingProfile,
    pub shift: &'a ShiftType,
    pub date: NaiveDate,
    pub window: (NaiveDateTime, NaiveDateTime),
    pub ledger: &'a ScheduleLedger,
    pub expected: Option<&'a ScheduleShiftToken>,
    pub shift_types: &'a BTreeMap<ShiftTypeId, ShiftType>,
    /// Le créneau est pénible (nuit, week-end) selon la configuration.
    pub undesirable: bool,
    pub undesirable_mean: f64,
}

/// Contexte d'évaluation d'un créneau une fois l'effectif retenu.
#[derive(Debug, Clone)]
pub struct SlotContext<'a> {
    pub unit_type: &'a str,
    pub class: ShiftClass,
    pub assigned: u32,
    pub patient_census: Option<u32>,
    pub policy: &'a RatioPolicy,
    pub override_eligible: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum EvaluationContext<'a> {
    Candidate(&'a CandidateContext<'a>),
    Slot(&'a SlotContext<'a>),
}
