//! Ratios patients / infirmier par type d'unité.
//!
//! L'effectif requis est `census / plafond` arrondi selon [`RoundingRule`].
//! Une unité inconnue est une erreur, jamais une valeur par défaut.

use crate::model::ShiftClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatioError {
    #[error("unknown unit type: {0}")]
    UnknownUnitType(String),
    #[error("invalid ratio for unit type {unit_type}: patients per nurse must be > 0")]
    ZeroCeiling { unit_type: String },
}

/// Règle d'arrondi de l'effectif requis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingRule {
    /// Arrondi supérieur : jamais de sous-effectif.
    #[default]
    Ceiling,
    /// Arrondi au plus proche, la demie montant.
    Nearest,
}

impl RoundingRule {
    fn apply(self, census: u32, per_nurse: u32) -> u32 {
        let census = u64::from(census);
        let per_nurse = u64::from(per_nurse);
        let required = match self {
            RoundingRule::Ceiling => census.div_ceil(per_nurse),
            RoundingRule::Nearest => (2 * census + per_nurse) / (2 * per_nurse),
        };
        u32::try_from(required).unwrap_or(u32::MAX)
    }
}

/// Plafonds patients par infirmier pour une unité, par classe de poste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRatio {
    pub day: u32,
    pub evening: u32,
    pub night: u32,
}

impl UnitRatio {
    pub fn uniform(patients_per_nurse: u32) -> Self {
        Self {
            day: patients_per_nurse,
            evening: patients_per_nurse,
            night: patients_per_nurse,
        }
    }

    pub fn for_class(&self, class: ShiftClass) -> u32 {
        match class {
            ShiftClass::Day => self.day,
            ShiftClass::Evening => self.evening,
            ShiftClass::Night => self.night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioResult {
    pub required: u32,
    pub actual: u32,
    pub satisfied: bool,
    pub deficit: u32,
    pub surplus: u32,
}

/// Table des ratios (type d'unité → plafonds) et règle d'arrondi.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatioPolicy {
    #[serde(default)]
    pub rounding: RoundingRule,
    pub units: BTreeMap<String, UnitRatio>,
}

impl RatioPolicy {
    pub fn new(rounding: RoundingRule) -> Self {
        Self {
            rounding,
            units: BTreeMap::new(),
        }
    }

    /// Table usuelle (plafonds de type réglementaire, identiques jour/nuit).
    pub fn standard() -> Self {
        Self::new(RoundingRule::Ceiling)
            .with_unit("icu", UnitRatio::uniform(2))
            .with_unit("labor-delivery", UnitRatio::uniform(2))
            .with_unit("step-down", UnitRatio::uniform(3))
            .with_unit("emergency", UnitRatio::uniform(4))
            .with_unit("pediatrics", UnitRatio::uniform(4))
            .with_unit("medical-surgical", UnitRatio::uniform(5))
            .with_unit("psychiatric", UnitRatio::uniform(6))
    }

    pub fn with_unit<S: Into<String>>(mut self, unit_type: S, ratio: UnitRatio) -> Self {
        self.units.insert(unit_type.into(), ratio);
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingRule) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn validate(&self) -> Result<(), RatioError> {
        for (unit_type, ratio) in &self.units {
            if ratio.day == 0 || ratio.evening == 0 || ratio.night == 0 {
                return Err(RatioError::ZeroCeiling {
                    unit_type: unit_type.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn knows(&self, unit_type: &str) -> bool {
        self.units.contains_key(unit_type)
    }

    /// Effectif requis pour `census` patients.
    pub fn required(
        &self,
        unit_type: &str,
        class: ShiftClass,
        patient_census: u32,
    ) -> Result<u32, RatioError> {
        let ratio = self
            .units
            .get(unit_type)
            .ok_or_else(|| RatioError::UnknownUnitType(unit_type.to_string()))?;
        let per_nurse = ratio.for_class(class);
        if per_nurse == 0 {
            return Err(RatioError::ZeroCeiling {
                unit_type: unit_type.to_string(),
            });
        }
        Ok(self.rounding.apply(patient_census, per_nurse))
    }

    pub fn evaluate(
        &self,
        unit_type: &str,
        class: ShiftClass,
        assigned_staff: u32,
        patient_census: u32,
    ) -> Result<RatioResult, RatioError> {
        let required = self.required(unit_type, class, patient_census)?;
        Ok(RatioResult {
            required,
            actual: assigned_staff,
            satisfied: assigned_staff >= required,
            deficit: required.saturating_sub(assigned_staff),
            surplus: assigned_staff.saturating_sub(required),
        })
    }
}

/// Évaluation autonome (« et si ? ») d'un niveau d'effectif.
pub fn evaluate_ratio(
    policy: &RatioPolicy,
    unit_type: &str,
    class: ShiftClass,
    staff_count: u32,
    patient_census: u32,
) -> Result<RatioResult, RatioError> {
    policy.evaluate(unit_type, class, staff_count, patient_census)
}
