#![forbid(unsafe_code)]
//! Garde : génération de plannings infirmiers (sans BD).
//!
//! - Génération jour par jour, poste par poste, déterministe.
//! - Contraintes dures (repos, compétences, jours consécutifs, ratio) et
//!   souples (rotations, équité, demandes de repos).
//! - Ratios patients / infirmier par type d'unité.
//! - Journal d'audit d'une entrée par créneau, y compris en sous-effectif.
//! - Stockage fichiers (JSON/CSV) uniquement côté CLI.

pub mod config;
pub mod constraints;
pub mod io;
pub mod model;
pub mod pattern;
pub mod ratio;
pub mod scheduler;
pub mod storage;

pub use config::{ConstraintSetting, FairnessTargets, ScheduleGenerationConfig};
pub use constraints::{
    Constraint, ConstraintEngine, ConstraintKind, ConstraintOverride, Severity, Verdict,
};
pub use model::{
    Assignment, AssignmentStatus, DayOffRequest, DemandEntry, Horizon, PersonalSchedulePattern,
    Role, ScheduleRequest, ScheduleShiftToken, ShiftClass, ShiftType, ShiftTypeId, Staff, StaffId,
    StaffSchedulingProfile, TeamSchedulePattern,
};
pub use pattern::PatternIndex;
pub use ratio::{evaluate_ratio, RatioError, RatioPolicy, RatioResult, RoundingRule, UnitRatio};
pub use scheduler::{
    audit_assignments, generate_schedule, ConfigurationError, GenerationOutcome, RunControl,
    RunStatus, ScheduleGenerationStepReport, ScheduleGenerator, SlotOutcome, StaffingShortfall,
};
pub use storage::{JsonFile, Storage};
