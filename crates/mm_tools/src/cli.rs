#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueHint};
use mm_engines::conjoint::ConjointEncoderConfig;
use mm_engines::decision::{DecisionClient, DecisionError, DecisionProviderConfig, ProviderKind};
use mm_engines::emitter::{ScenarioGenerator, ScenarioPlanner};
use mm_kernel_contracts::dimension::Dimension;
use mm_kernel_contracts::ContractViolation;
use mm_os::conjoint_batch::ConjointBatchConverter;
use mm_os::scenario_run::{open_resumable_log, RunError, ScenarioRun, ScenarioRunConfig};
use mm_storage::conjoint_csv::ConjointCsvWriter;
use mm_storage::scenario_log::{read_scenario_log, ScenarioLogWriter};
use mm_storage::StorageError;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

#[derive(Debug, Parser)]
#[command(
    name = "moral_machine",
    version,
    about = "Trolley-dilemma scenario generator and conjoint encoder"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate unanswered scenarios into a JSON Lines log
    Generate(GenerateArgs),
    /// Generate scenarios, ask the decision-maker, and log the answers
    Run(RunArgs),
    /// Convert an answered scenario log into the conjoint CSV
    Encode(EncodeArgs),
}

#[derive(Debug, Args)]
pub struct ScenarioArgs {
    /// Seed of the scenario stream
    #[arg(long, default_value_t = 123)]
    pub seed: u64,

    /// Number of scenarios
    #[arg(long, default_value_t = 3)]
    pub count: u64,

    /// Comma-separated dimensions (default: all but random)
    #[arg(long, value_delimiter = ',')]
    pub dimensions: Vec<Dimension>,

    /// Scenario log to write
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
}

impl ScenarioArgs {
    fn dimensions(&self) -> Vec<Dimension> {
        if self.dimensions.is_empty() {
            Dimension::STUDY.to_vec()
        } else {
            self.dimensions.clone()
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Flush the log every N scenarios
    #[arg(long, default_value_t = 100)]
    pub checkpoint_every: u64,

    /// Continue an interrupted run recorded in `--out`
    #[arg(long)]
    pub resume: bool,

    /// Overrides MM_PROVIDER (openai | anthropic)
    #[arg(long)]
    pub provider: Option<String>,

    /// Overrides MM_MODEL
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Answered scenario log
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Conjoint CSV to write
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
}

pub fn execute(cli: Cli) -> Result<String, ToolError> {
    match cli.command {
        Command::Generate(args) => generate(&args.scenario),
        Command::Run(args) => {
            let provider = provider_config(&args, |key| std::env::var(key).ok());
            let client = DecisionClient::from_config(provider)?;
            run(&args, &client)
        }
        Command::Encode(args) => encode(&args.input, &args.out),
    }
}

fn generate(args: &ScenarioArgs) -> Result<String, ToolError> {
    let planner = ScenarioPlanner::new(args.dimensions())?;
    let mut log = ScenarioLogWriter::create(&args.out)?;
    for record in ScenarioGenerator::new(args.seed, planner).take(args.count as usize) {
        log.append(&record?)?;
    }
    log.checkpoint()?;
    info!(scenarios = log.appended(), path = %args.out.display(), "scenarios generated");
    Ok(format!(
        "wrote {} scenarios to {}",
        log.appended(),
        args.out.display()
    ))
}

/// Provider settings from `lookup` (the environment in production), with CLI overrides.
pub fn provider_config<F>(args: &RunArgs, lookup: F) -> DecisionProviderConfig
where
    F: Fn(&str) -> Option<String>,
{
    DecisionProviderConfig::from_lookup(|key| match key {
        "MM_PROVIDER" if args.provider.is_some() => args.provider.clone(),
        "MM_MODEL" if args.model.is_some() => args.model.clone(),
        _ => lookup(key),
    })
}

pub fn run<D>(args: &RunArgs, decision_maker: &D) -> Result<String, ToolError>
where
    D: mm_os::decision_maker::DecisionMaker + ?Sized,
{
    let config = ScenarioRunConfig {
        dimensions: args.scenario.dimensions(),
        scenario_count: args.scenario.count,
        seed: args.scenario.seed,
        checkpoint_every: args.checkpoint_every,
    };
    let run = ScenarioRun::new(config)?;
    let summary = if args.resume {
        let (logged, mut log) = open_resumable_log(&args.scenario.out)?;
        run.resume(decision_maker, &logged, &mut log)?
    } else {
        let mut log = ScenarioLogWriter::create(&args.scenario.out)?;
        run.execute(decision_maker, &mut log)?
    };
    Ok(format!(
        "scenarios={} resumed={} failed_decisions={} case_1={} case_2={} unparseable={}",
        summary.generated,
        summary.resumed,
        summary.failed_decisions,
        summary.case_one,
        summary.case_two,
        summary.unparseable
    ))
}

fn encode(input: &Path, out: &Path) -> Result<String, ToolError> {
    let lines = read_scenario_log(input)?;
    let batch = ConjointBatchConverter::new(ConjointEncoderConfig::mvp_v1()).convert_lines(lines);
    let mut csv = ConjointCsvWriter::create(out)?;
    csv.write_rows(&batch.rows)?;
    csv.flush()?;
    Ok(format!(
        "rows={} retained={} dropped={} failures={}",
        batch.rows.len(),
        batch.retained,
        batch.dropped,
        batch.failures.len()
    ))
}
