mod audit;
mod generate;
mod summary;
mod types;
pub(crate) mod util;
mod validate;

pub use audit::audit_assignments;
pub use types::{
    ChosenCandidate, ConfigurationError, Conflict, ConflictKind, FailureReason,
    GenerationOutcome, RunControl, RunStatus, ScheduleGenerationStepReport, SlotKey,
    SlotObserver, SlotOutcome, StaffSummary, StaffingShortfall,
};

use crate::config::ScheduleGenerationConfig;
use crate::constraints::ConstraintEngine;
use crate::model::ScheduleRequest;
use crate::ratio::RatioPolicy;
use std::num::NonZeroUsize;
use std::thread;

/// Générateur : configuration, table de ratios et registre de contraintes
/// figés à la construction. Sans état entre deux runs, partageable entre threads.
#[derive(Debug, Clone)]
pub struct ScheduleGenerator {
    config: ScheduleGenerationConfig,
    policy: RatioPolicy,
    engine: ConstraintEngine,
}

impl ScheduleGenerator {
    pub fn new(
        config: ScheduleGenerationConfig,
        policy: RatioPolicy,
    ) -> Result<Self, ConfigurationError> {
        policy.validate()?;
        let engine = ConstraintEngine::from_config(&config)?;
        Ok(Self {
            config,
            policy,
            engine,
        })
    }

    pub fn config(&self) -> &ScheduleGenerationConfig {
        &self.config
    }
    pub fn policy(&self) -> &RatioPolicy {
        &self.policy
    }
    pub fn engine(&self) -> &ConstraintEngine {
        &self.engine
    }

    pub fn generate(&self, request: &ScheduleRequest, control: &RunControl) -> GenerationOutcome {
        generate::run(self, request, control)
    }

    /// Runs indépendants en parallèle ; résultats dans l'ordre des requêtes.
    ///
    /// Les requêtes sont traitées par lots de la taille du parallélisme
    /// disponible : jamais plus de threads vivants que de cœurs.
    pub fn generate_many(&self, requests: &[ScheduleRequest]) -> Vec<GenerationOutcome> {
        let width = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        let mut outcomes = Vec::with_capacity(requests.len());
        for batch in requests.chunks(width) {
            thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|request| scope.spawn(move || self.generate(request, &RunControl::default())))
                    .collect();
                outcomes.extend(handles.into_iter().map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        GenerationOutcome::failed(
                            FailureReason::Aborted,
                            Vec::new(),
                            Vec::new(),
                            self.engine.overrides().to_vec(),
                        )
                    })
                }));
            });
        }
        outcomes
    }
}

/// Point d'entrée unique : valide, génère et replie toute erreur de
/// configuration dans un statut `Failed`.
pub fn generate_schedule(
    request: &ScheduleRequest,
    config: &ScheduleGenerationConfig,
    policy: &RatioPolicy,
) -> GenerationOutcome {
    match ScheduleGenerator::new(config.clone(), policy.clone()) {
        Ok(generator) => generator.generate(request, &RunControl::default()),
        Err(err) => {
            tracing::warn!(error = %err, "generator configuration rejected");
            GenerationOutcome::failed(
                FailureReason::Configuration(err),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            )
        }
    }
}
