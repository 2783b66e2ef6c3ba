//! Moteur de contraintes : registre fermé de règles dures et souples.
//!
//! Les règles dures sont évaluées d'abord et éliminent le candidat à la
//! première violation ; les pénalités souples des survivants sont pondérées
//! puis sommées (plus bas = meilleur).

mod context;
mod rules;

pub use context::{CandidateContext, EvaluationContext, ScheduleLedger, SlotContext, WorkedShift};

use crate::config::ScheduleGenerationConfig;
use crate::scheduler::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Motif des violations levées par une règle défaillante.
pub const INTERNAL_ERROR: &str = "internal-error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hard,
    Soft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Satisfied,
    Violated {
        severity: Severity,
        reason: String,
        penalty: f64,
    },
}

impl Verdict {
    pub fn is_hard_violation(&self) -> bool {
        matches!(
            self,
            Verdict::Violated {
                severity: Severity::Hard,
                ..
            }
        )
    }

    fn internal_error() -> Self {
        Verdict::Violated {
            severity: Severity::Hard,
            reason: INTERNAL_ERROR.to_string(),
            penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    RestPeriod,
    SkillMatch,
    MaxConsecutiveShifts,
    MaxConsecutiveNights,
    MaxHours,
    RequestedOff,
    PatternAdherence,
    Fairness,
    Ratio,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 9] = [
        ConstraintKind::RestPeriod,
        ConstraintKind::SkillMatch,
        ConstraintKind::MaxConsecutiveShifts,
        ConstraintKind::MaxConsecutiveNights,
        ConstraintKind::MaxHours,
        ConstraintKind::RequestedOff,
        ConstraintKind::PatternAdherence,
        ConstraintKind::Fairness,
        ConstraintKind::Ratio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConstraintKind::RestPeriod => "rest-period",
            ConstraintKind::SkillMatch => "skill-match",
            ConstraintKind::MaxConsecutiveShifts => "max-consecutive-shifts",
            ConstraintKind::MaxConsecutiveNights => "max-consecutive-nights",
            ConstraintKind::MaxHours => "max-hours",
            ConstraintKind::RequestedOff => "requested-off",
            ConstraintKind::PatternAdherence => "pattern-adherence",
            ConstraintKind::Fairness => "fairness",
            ConstraintKind::Ratio => "ratio",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn default_severity(self) -> Severity {
        match self {
            ConstraintKind::RequestedOff
            | ConstraintKind::PatternAdherence
            | ConstraintKind::Fairness => Severity::Soft,
            _ => Severity::Hard,
        }
    }

    /// Règles dures qu'une configuration peut rendre souples.
    pub fn can_soften(self) -> bool {
        matches!(
            self,
            ConstraintKind::MaxConsecutiveShifts
                | ConstraintKind::MaxConsecutiveNights
                | ConstraintKind::MaxHours
        )
    }

    pub fn default_weight(self) -> f64 {
        match self {
            ConstraintKind::RequestedOff => 5.0,
            ConstraintKind::MaxConsecutiveShifts
            | ConstraintKind::MaxConsecutiveNights
            | ConstraintKind::MaxHours
            | ConstraintKind::Ratio => 10.0,
            _ => 1.0,
        }
    }

    /// Seul le ratio s'évalue au niveau du créneau.
    pub fn is_slot_scoped(self) -> bool {
        self == ConstraintKind::Ratio
    }
}

/// Contrainte enregistrée (type, sévérité et poids résolus).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub severity: Severity,
    pub weight: f64,
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Évalue la règle ; une règle hors de son périmètre est satisfaite.
    pub fn evaluate(&self, ctx: EvaluationContext<'_>) -> Verdict {
        let breach = match (self.kind, ctx) {
            (ConstraintKind::Ratio, EvaluationContext::Slot(slot)) => match rules::ratio(slot) {
                Ok(breach) => breach,
                Err(_) => return Verdict::internal_error(),
            },
            (_, EvaluationContext::Slot(_)) | (ConstraintKind::Ratio, _) => None,
            (ConstraintKind::RestPeriod, EvaluationContext::Candidate(c)) => rules::rest_period(c),
            (ConstraintKind::SkillMatch, EvaluationContext::Candidate(c)) => rules::skill_match(c),
            (ConstraintKind::MaxConsecutiveShifts, EvaluationContext::Candidate(c)) => {
                rules::max_consecutive_shifts(c)
            }
            (ConstraintKind::MaxConsecutiveNights, EvaluationContext::Candidate(c)) => {
                rules::max_consecutive_nights(c)
            }
            (ConstraintKind::MaxHours, EvaluationContext::Candidate(c)) => rules::max_hours(c),
            (ConstraintKind::RequestedOff, EvaluationContext::Candidate(c)) => {
                rules::requested_off(c)
            }
            (ConstraintKind::PatternAdherence, EvaluationContext::Candidate(c)) => {
                rules::pattern_adherence(c)
            }
            (ConstraintKind::Fairness, EvaluationContext::Candidate(c)) => rules::fairness(c),
        };

        let severity = match ctx {
            EvaluationContext::Slot(slot) if slot.override_eligible => Severity::Soft,
            _ => self.severity,
        };

        match breach {
            None => Verdict::Satisfied,
            Some((reason, magnitude)) => Verdict::Violated {
                severity,
                reason,
                penalty: magnitude * self.weight,
            },
        }
    }
}

/// Exécute une évaluation en isolant les paniques et les pénalités non finies.
pub(crate) fn guarded<F>(evaluate: F) -> Verdict
where
    F: FnOnce() -> Verdict,
{
    match panic::catch_unwind(AssertUnwindSafe(evaluate)) {
        Ok(Verdict::Violated { penalty, .. }) if !penalty.is_finite() => Verdict::internal_error(),
        Ok(verdict) => verdict,
        Err(_) => Verdict::internal_error(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideAction {
    Disabled,
    Softened,
    RatioRelaxable,
}

/// Trace d'une dérogation explicite à une règle dure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintOverride {
    pub constraint: String,
    pub action: OverrideAction,
    pub reason: String,
}

/// Pénalité souple d'un candidat, par règle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PenaltyItem {
    pub constraint: ConstraintKind,
    pub penalty: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Eligible {
        penalty: f64,
        breakdown: Vec<PenaltyItem>,
    },
    Rejected {
        constraint: ConstraintKind,
        reason: String,
    },
}

impl Assessment {
    /// Libellé de rejet : le nom de la règle, ou `internal-error`.
    pub fn rejection_label(&self) -> Option<&str> {
        match self {
            Assessment::Rejected { reason, .. } if reason == INTERNAL_ERROR => Some(INTERNAL_ERROR),
            Assessment::Rejected { constraint, .. } => Some(constraint.name()),
            Assessment::Eligible { .. } => None,
        }
    }
}

/// Registre des contraintes actives, construit une fois puis partagé en lecture.
#[derive(Debug, Clone)]
pub struct ConstraintEngine {
    constraints: Vec<Constraint>,
    overrides: Vec<ConstraintOverride>,
}

impl ConstraintEngine {
    /// Construit le registre ; toute incohérence de configuration échoue ici,
    /// jamais pendant l'évaluation.
    pub fn from_config(config: &ScheduleGenerationConfig) -> Result<Self, ConfigurationError> {
        if let Some(unknown) = config
            .constraints
            .keys()
            .find(|name| ConstraintKind::from_name(name).is_none())
        {
            return Err(ConfigurationError::UnknownConstraint(unknown.clone()));
        }

        let mut constraints = Vec::new();
        let mut overrides = Vec::new();

        for kind in ConstraintKind::ALL {
            let setting = config.setting(kind.name()).cloned().unwrap_or_default();

            let weight = setting.weight.unwrap_or_else(|| kind.default_weight());
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigurationError::NegativeWeight {
                    constraint: kind.name().to_string(),
                    weight,
                });
            }

            let default_severity = kind.default_severity();
            let severity = setting.severity.unwrap_or(default_severity);
            let softened = default_severity == Severity::Hard && severity == Severity::Soft;
            let hardened = default_severity == Severity::Soft && severity == Severity::Hard;
            if hardened || (softened && !kind.can_soften()) {
                return Err(ConfigurationError::InvalidSeverity {
                    constraint: kind.name().to_string(),
                });
            }

            let enabled = setting.enabled.unwrap_or(true);
            let disabled_hard = default_severity == Severity::Hard && !enabled;
            if disabled_hard || softened {
                let reason = setting
                    .override_reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| ConfigurationError::UnauditedOverride(kind.name().to_string()))?;
                let action = if disabled_hard {
                    OverrideAction::Disabled
                } else {
                    OverrideAction::Softened
                };
                warn!(constraint = kind.name(), ?action, %reason, "hard constraint overridden");
                overrides.push(ConstraintOverride {
                    constraint: kind.name().to_string(),
                    action,
                    reason,
                });
            }

            if enabled {
                constraints.push(Constraint {
                    kind,
                    severity,
                    weight,
                });
            }
        }

        Ok(Self {
            constraints,
            overrides,
        })
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn overrides(&self) -> &[ConstraintOverride] {
        &self.overrides
    }

    pub fn get(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.kind == kind)
    }

    pub fn is_enabled(&self, kind: ConstraintKind) -> bool {
        self.get(kind).is_some()
    }

    /// Filtre dur puis score souple d'un candidat.
    pub fn assess(&self, ctx: &CandidateContext<'_>) -> Assessment {
        let candidate = EvaluationContext::Candidate(ctx);
        let hard = self
            .constraints
            .iter()
            .filter(|c| c.severity == Severity::Hard && !c.kind.is_slot_scoped());
        for constraint in hard {
            let verdict = guarded(|| constraint.evaluate(candidate));
            if let Verdict::Violated {
                severity: Severity::Hard,
                reason,
                ..
            } = verdict
            {
                return Assessment::Rejected {
                    constraint: constraint.kind,
                    reason,
                };
            }
        }

        let mut penalty = 0.0;
        let mut breakdown = Vec::new();
        let soft = self
            .constraints
            .iter()
            .filter(|c| c.severity == Severity::Soft && !c.kind.is_slot_scoped());
        for constraint in soft {
            match guarded(|| constraint.evaluate(candidate)) {
                Verdict::Satisfied => {}
                Verdict::Violated {
                    severity: Severity::Hard,
                    reason,
                    ..
                } => {
                    return Assessment::Rejected {
                        constraint: constraint.kind,
                        reason,
                    };
                }
                Verdict::Violated {
                    penalty: p,
                    ..
                } => {
                    penalty += p;
                    breakdown.push(PenaltyItem {
                        constraint: constraint.kind,
                        penalty: p,
                    });
                }
            }
        }

        Assessment::Eligible { penalty, breakdown }
    }

    /// Vérifie le créneau (ratio) ; `None` si la règle est désactivée.
    pub fn check_slot(&self, ctx: &SlotContext<'_>) -> Option<Verdict> {
        let constraint = self.get(ConstraintKind::Ratio)?;
        Some(guarded(|| constraint.evaluate(EvaluationContext::Slot(ctx))))
    }
}
