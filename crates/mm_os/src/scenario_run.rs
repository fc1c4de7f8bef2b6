#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::path::Path;

use mm_engines::classify::classify;
use mm_engines::emitter::{ScenarioGenerator, ScenarioPlanner};
use mm_kernel_contracts::dimension::Dimension;
use mm_kernel_contracts::scenario::{ResponseLabel, ScenarioRecord};
use mm_kernel_contracts::{ContractViolation, Validate};
use mm_storage::fingerprint::scenario_fingerprint;
use mm_storage::scenario_log::{read_scenario_log, ScenarioLogWriter};
use mm_storage::StorageError;
use tracing::{debug, info, warn};

use crate::decision_maker::DecisionMaker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioRunConfig {
    pub dimensions: Vec<Dimension>,
    pub scenario_count: u64,
    pub seed: u64,
    pub checkpoint_every: u64,
}

impl ScenarioRunConfig {
    pub fn mvp_v1() -> Self {
        Self {
            dimensions: Dimension::STUDY.to_vec(),
            scenario_count: 3,
            seed: 123,
            checkpoint_every: 100,
        }
    }
}

impl Validate for ScenarioRunConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.dimensions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_run_config.dimensions",
                reason: "must not be empty",
            });
        }
        let distinct: BTreeSet<_> = self.dimensions.iter().collect();
        if distinct.len() != self.dimensions.len() {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_run_config.dimensions",
                reason: "must not contain duplicates",
            });
        }
        if self.checkpoint_every == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_run_config.checkpoint_every",
                reason: "must be >= 1",
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid run: {0}")]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("scenario {index} in the existing log does not match the regenerated scenario")]
    ResumeMismatch { index: u64 },
    #[error("existing log holds {logged} scenarios but the run asks for {requested}")]
    ResumeOverrun { logged: u64, requested: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub generated: u64,
    /// Scenarios taken over from an existing log without asking again.
    pub resumed: u64,
    pub decided: u64,
    pub failed_decisions: u64,
    pub case_one: u64,
    pub case_two: u64,
    pub unparseable: u64,
}

impl RunSummary {
    fn count_label(&mut self, label: ResponseLabel) {
        match label {
            ResponseLabel::CaseOne => self.case_one += 1,
            ResponseLabel::CaseTwo => self.case_two += 1,
            ResponseLabel::Unparseable => self.unparseable += 1,
        }
    }
}

/// Sequential generate, ask and record loop for one seeded run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    config: ScenarioRunConfig,
    planner: ScenarioPlanner,
}

impl ScenarioRun {
    pub fn new(config: ScenarioRunConfig) -> Result<Self, RunError> {
        config.validate()?;
        let planner = ScenarioPlanner::new(config.dimensions.clone())?;
        Ok(Self { config, planner })
    }

    pub fn config(&self) -> &ScenarioRunConfig {
        &self.config
    }

    pub fn generator(&self) -> ScenarioGenerator {
        ScenarioGenerator::new(self.config.seed, self.planner.clone())
    }

    pub fn execute<D>(
        &self,
        decision_maker: &D,
        log: &mut ScenarioLogWriter,
    ) -> Result<RunSummary, RunError>
    where
        D: DecisionMaker + ?Sized,
    {
        self.resume(decision_maker, &[], log)
    }

    /// Continues a run whose first `logged.len()` scenarios are already in `log`.
    ///
    /// Each logged scenario must fingerprint-match its regenerated counterpart.
    /// Those are not sent to the decision-maker again.
    pub fn resume<D>(
        &self,
        decision_maker: &D,
        logged: &[ScenarioRecord],
        log: &mut ScenarioLogWriter,
    ) -> Result<RunSummary, RunError>
    where
        D: DecisionMaker + ?Sized,
    {
        let requested = self.config.scenario_count;
        let logged_count = logged.len() as u64;
        if logged_count > requested {
            return Err(RunError::ResumeOverrun {
                logged: logged_count,
                requested,
            });
        }
        info!(
            seed = self.config.seed,
            scenarios = requested,
            resumed = logged_count,
            "scenario run started"
        );

        let mut generator = self.generator();
        let mut summary = RunSummary::default();
        for index in 0..requested {
            let mut record = generator.next_record()?;
            summary.generated += 1;

            if let Some(prior) = logged.get(index as usize) {
                if scenario_fingerprint(&record)? != scenario_fingerprint(prior)? {
                    return Err(RunError::ResumeMismatch { index });
                }
                let label = classify(prior.chat_response.as_deref());
                summary.resumed += 1;
                summary.count_label(label);
                continue;
            }

            match decision_maker.respond(&record.system_text, &record.user_text()) {
                Ok(text) => {
                    summary.decided += 1;
                    record.chat_response = Some(text);
                }
                Err(err) => {
                    summary.failed_decisions += 1;
                    warn!(scenario_index = index, error = %err, "decision-maker gave no response");
                }
            }
            let label = classify(record.chat_response.as_deref());
            record.label = Some(label);
            summary.count_label(label);
            debug!(
                scenario_index = index,
                dimension = %record.scenario_dimension,
                label = label.as_i8(),
                "scenario recorded"
            );
            log.append(&record)?;

            if log.unflushed() >= self.config.checkpoint_every {
                log.checkpoint()?;
                info!(scenario_index = index, "checkpoint");
            }
        }
        log.checkpoint()?;
        info!(
            generated = summary.generated,
            resumed = summary.resumed,
            failed_decisions = summary.failed_decisions,
            unparseable = summary.unparseable,
            "scenario run finished"
        );
        Ok(summary)
    }
}

/// Opens `path` for a resumable run.
///
/// Returns the intact leading records and a writer positioned after them.
/// Anything after the first unreadable line (a torn final write) is discarded.
pub fn open_resumable_log(
    path: impl AsRef<Path>,
) -> Result<(Vec<ScenarioRecord>, ScenarioLogWriter), RunError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok((Vec::new(), ScenarioLogWriter::create(path)?));
    }
    let mut prefix = Vec::new();
    let lines = read_scenario_log(path)?;
    let total = lines.len();
    for line in lines {
        match line {
            Ok(record) => prefix.push(record),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    kept = prefix.len(),
                    discarded = total - prefix.len(),
                    error = %err,
                    "truncating scenario log at first unreadable line"
                );
                break;
            }
        }
    }
    let mut writer = ScenarioLogWriter::create(path)?;
    for record in &prefix {
        writer.append(record)?;
    }
    writer.checkpoint()?;
    Ok((prefix, writer))
}
