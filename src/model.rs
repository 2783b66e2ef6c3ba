use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Identifiant fort pour Staff
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(String);

impl StaffId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rôle professionnel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    RegisteredNurse,
    LicensedPracticalNurse,
    NursingAssistant,
    ChargeNurse,
    Custom(String),
}

impl Role {
    /// Parse les libellés courts utilisés dans les CSV (`rn`, `lpn`, `cna`, `charge`).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rn" | "registered-nurse" => Role::RegisteredNurse,
            "lpn" | "licensed-practical-nurse" => Role::LicensedPracticalNurse,
            "cna" | "na" | "nursing-assistant" => Role::NursingAssistant,
            "charge" | "charge-nurse" => Role::ChargeNurse,
            other => Role::Custom(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Role::RegisteredNurse => "rn",
            Role::LicensedPracticalNurse => "lpn",
            Role::NursingAssistant => "cna",
            Role::ChargeNurse => "charge",
            Role::Custom(s) => s.as_str(),
        }
    }
}

/// Soignant planifiable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    pub unit: String,
    #[serde(default)]
    pub seniority_years: u32,
    /// Plafond d'heures sur l'horizon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hours: Option<u32>,
    /// Objectif minimal d'heures sur l'horizon (diagnostic uniquement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hours: Option<u32>,
}

impl Staff {
    pub fn new<D: Into<String>, U: Into<String>>(
        id: StaffId,
        display_name: D,
        role: Role,
        unit: U,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            skills: BTreeSet::new(),
            unit: unit.into(),
            seniority_years: 0,
            max_hours: None,
            min_hours: None,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills.extend(skills.into_iter().map(Into::into));
        self
    }
}

/// Classification d'un poste
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftClass {
    Day,
    Evening,
    Night,
}

impl ShiftClass {
    pub fn ordinal(self) -> u32 {
        match self {
            ShiftClass::Day => 0,
            ShiftClass::Evening => 1,
            ShiftClass::Night => 2,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "jour" => Some(ShiftClass::Day),
            "evening" | "soir" => Some(ShiftClass::Evening),
            "night" | "nuit" => Some(ShiftClass::Night),
            _ => None,
        }
    }
}

/// Identifiant fort pour ShiftType
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftTypeId(String);

impl ShiftTypeId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShiftTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Poste de travail nommé (heures locales de l'unité)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftType {
    pub id: ShiftTypeId,
    pub name: String,
    pub class: ShiftClass,
    pub start: NaiveTime,
    /// `end <= start` : le poste se termine le lendemain.
    pub end: NaiveTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_skills: BTreeSet<String>,
    /// Autorise explicitement le chevauchement avec un autre poste du même jour.
    #[serde(default)]
    pub allow_overlap: bool,
    /// Effectif par défaut quand aucune demande n'est fournie pour le créneau.
    #[serde(default)]
    pub min_staff: u32,
}

impl ShiftType {
    /// Crée un poste en validant que sa durée est non nulle.
    pub fn new<S: AsRef<str>>(
        id: S,
        class: ShiftClass,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Self, String> {
        if start == end {
            return Err("shift start and end cannot be equal".to_string());
        }
        Ok(Self {
            id: ShiftTypeId::new(&id),
            name: id.as_ref().to_string(),
            class,
            start,
            end,
            required_roles: Vec::new(),
            required_skills: BTreeSet::new(),
            allow_overlap: false,
            min_staff: 0,
        })
    }

    pub fn with_min_staff(mut self, min_staff: u32) -> Self {
        self.min_staff = min_staff;
        self
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        let raw = (self.end - self.start).num_minutes();
        if self.crosses_midnight() {
            raw + 24 * 60
        } else {
            raw
        }
    }

    /// Fenêtre [début, fin) du poste démarrant à `date`.
    pub fn window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = NaiveDateTime::new(date, self.start);
        (start, start + Duration::minutes(self.duration_minutes()))
    }
}

/// Case d'un cycle de rotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleShiftToken {
    Shift(ShiftTypeId),
    Off,
}

/// Rotation individuelle, alignée sur `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalSchedulePattern {
    pub staff_id: StaffId,
    pub cycle: Vec<ScheduleShiftToken>,
    pub anchor: NaiveDate,
}

/// Rotation partagée par une équipe (tous les membres avancent ensemble).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSchedulePattern {
    pub id: String,
    pub cycle: Vec<ScheduleShiftToken>,
    pub anchor: NaiveDate,
    pub members: BTreeSet<StaffId>,
}

/// Demande de repos sur une journée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOffRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub mandatory: bool,
}

/// Limites et préférences d'un soignant pour l'horizon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSchedulingProfile {
    pub staff_id: StaffId,
    pub max_consecutive_shifts: u32,
    pub max_consecutive_nights: u32,
    pub min_rest_hours: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_off: Vec<DayOffRequest>,
}

impl StaffSchedulingProfile {
    pub fn new(
        staff_id: StaffId,
        max_consecutive_shifts: u32,
        max_consecutive_nights: u32,
        min_rest_hours: u32,
    ) -> Self {
        Self {
            staff_id,
            max_consecutive_shifts,
            max_consecutive_nights,
            min_rest_hours,
            requested_off: Vec::new(),
        }
    }

    pub fn is_mandatory_off(&self, date: NaiveDate) -> bool {
        self.requested_off
            .iter()
            .any(|r| r.mandatory && r.date == date)
    }

    pub fn is_advisory_off(&self, date: NaiveDate) -> bool {
        self.requested_off
            .iter()
            .any(|r| !r.mandatory && r.date == date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Scheduled => "scheduled",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }
}

/// Affectation (soignant, date, poste)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Assignment {
    pub fn scheduled(staff_id: StaffId, date: NaiveDate, shift: ShiftTypeId) -> Self {
        Self {
            staff_id,
            date,
            shift,
            status: AssignmentStatus::Scheduled,
            notes: None,
        }
    }
}

/// Horizon de planification, bornes incluses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Horizon {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Nombre de jours (0 si l'horizon est inversé).
    pub fn len_days(&self) -> usize {
        let days = (self.end - self.start).num_days() + 1;
        usize::try_from(days).unwrap_or(0)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len_days())
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Demande pour un créneau (date, poste).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandEntry {
    pub date: NaiveDate,
    pub shift: ShiftTypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_staff: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_census: Option<u32>,
}

/// Entrée complète d'une génération
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub horizon: Horizon,
    pub unit: String,
    /// Clé de la table de ratios (ex. `icu`, `medical-surgical`).
    pub unit_type: String,
    /// Ordre déclaré = ordre de traitement dans la journée.
    pub shift_types: Vec<ShiftType>,
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub profiles: Vec<StaffSchedulingProfile>,
    #[serde(default)]
    pub personal_patterns: Vec<PersonalSchedulePattern>,
    #[serde(default)]
    pub team_patterns: Vec<TeamSchedulePattern>,
    #[serde(default)]
    pub demand: Vec<DemandEntry>,
    /// Affectations antérieures à l'horizon (repos et jours consécutifs).
    #[serde(default)]
    pub history: Vec<Assignment>,
}

impl ScheduleRequest {
    pub fn new<U: Into<String>, T: Into<String>>(horizon: Horizon, unit: U, unit_type: T) -> Self {
        Self {
            horizon,
            unit: unit.into(),
            unit_type: unit_type.into(),
            shift_types: Vec::new(),
            staff: Vec::new(),
            profiles: Vec::new(),
            personal_patterns: Vec::new(),
            team_patterns: Vec::new(),
            demand: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn find_staff<'a>(&'a self, id: &StaffId) -> Option<&'a Staff> {
        self.staff.iter().find(|s| &s.id == id)
    }
    pub fn find_shift_type<'a>(&'a self, id: &ShiftTypeId) -> Option<&'a ShiftType> {
        self.shift_types.iter().find(|s| &s.id == id)
    }
    pub fn find_profile<'a>(&'a self, id: &StaffId) -> Option<&'a StaffSchedulingProfile> {
        self.profiles.iter().find(|p| &p.staff_id == id)
    }
    pub fn find_demand<'a>(&'a self, date: NaiveDate, shift: &ShiftTypeId) -> Option<&'a DemandEntry> {
        self.demand
            .iter()
            .find(|d| d.date == date && &d.shift == shift)
    }
}
