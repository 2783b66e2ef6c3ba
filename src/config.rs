use crate::constraints::Severity;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Réglage d'une contrainte nommée. Les champs absents gardent la valeur par
/// défaut de la contrainte.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintSetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Justification obligatoire pour désactiver ou assouplir une contrainte dure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl ConstraintSetting {
    pub fn weight(weight: f64) -> Self {
        Self {
            weight: Some(weight),
            ..Self::default()
        }
    }

    pub fn disabled<S: Into<String>>(reason: Option<S>) -> Self {
        Self {
            enabled: Some(false),
            override_reason: reason.map(Into::into),
            ..Self::default()
        }
    }

    pub fn soft<S: Into<String>>(reason: S) -> Self {
        Self {
            severity: Some(Severity::Soft),
            override_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Postes jugés pénibles pour l'équité.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessTargets {
    #[serde(default = "yes")]
    pub nights: bool,
    #[serde(default = "yes")]
    pub weekends: bool,
}

fn yes() -> bool {
    true
}

impl Default for FairnessTargets {
    fn default() -> Self {
        Self {
            nights: true,
            weekends: true,
        }
    }
}

/// Paramètres d'une génération
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleGenerationConfig {
    /// Réglages par nom de contrainte (`rest-period`, `fairness`, ...).
    pub constraints: BTreeMap<String, ConstraintSetting>,
    pub legal_min_rest_hours: u32,
    pub default_max_consecutive_shifts: u32,
    pub default_max_consecutive_nights: u32,
    pub fairness: FairnessTargets,
    /// Unités dont le ratio peut être assoupli (sous-effectif signalé comme relâché).
    pub ratio_override_units: BTreeSet<String>,
    /// Conserve les affectations partielles en cas d'annulation ou de dépassement.
    pub best_effort: bool,
    pub time_budget_ms: Option<u64>,
}

impl Default for ScheduleGenerationConfig {
    fn default() -> Self {
        Self {
            constraints: BTreeMap::new(),
            legal_min_rest_hours: 11,
            default_max_consecutive_shifts: 5,
            default_max_consecutive_nights: 3,
            fairness: FairnessTargets::default(),
            ratio_override_units: BTreeSet::new(),
            best_effort: false,
            time_budget_ms: None,
        }
    }
}

impl ScheduleGenerationConfig {
    pub fn with_constraint<S: Into<String>>(mut self, name: S, setting: ConstraintSetting) -> Self {
        self.constraints.insert(name.into(), setting);
        self
    }

    pub fn with_ratio_override<S: Into<String>>(mut self, unit: S) -> Self {
        self.ratio_override_units.insert(unit.into());
        self
    }

    pub fn setting(&self, name: &str) -> Option<&ConstraintSetting> {
        self.constraints.get(name)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
