#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fs;
use std::io::Write;

use mm_engines::decision::DecisionError;
use mm_kernel_contracts::scenario::ResponseLabel;
use mm_kernel_contracts::Validate;
use mm_os::decision_maker::DecisionMaker;
use mm_os::scenario_run::{open_resumable_log, RunError, ScenarioRun, ScenarioRunConfig};
use mm_storage::scenario_log::{read_scenario_log, ScenarioLogWriter};
use tempfile::tempdir;

/// Answers by call number: even calls pick case 1, odd calls case 2, every fifth is noise.
struct ScriptedDecisionMaker {
    calls: Cell<u64>,
}

impl ScriptedDecisionMaker {
    fn new() -> Self {
        Self { calls: Cell::new(0) }
    }
}

impl DecisionMaker for ScriptedDecisionMaker {
    fn respond(&self, _system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        assert!(user_prompt.starts_with("Case 1.\n"));
        Ok(match (n % 5, n % 2) {
            (4, _) => "I cannot decide.".to_string(),
            (_, 0) => "Case 1".to_string(),
            _ => "case 2".to_string(),
        })
    }
}

struct UnreachableDecisionMaker;

impl DecisionMaker for UnreachableDecisionMaker {
    fn respond(&self, _: &str, _: &str) -> Result<String, DecisionError> {
        Err(DecisionError::HttpStatus {
            provider: "test",
            status: 503,
        })
    }
}

fn config(count: u64, seed: u64) -> ScenarioRunConfig {
    ScenarioRunConfig {
        scenario_count: count,
        seed,
        ..ScenarioRunConfig::mvp_v1()
    }
}

#[test]
fn at_run_io_01_same_seed_same_log() {
    let dir = tempdir().unwrap();
    let run = ScenarioRun::new(config(25, 9)).unwrap();
    for name in ["a.jsonl", "b.jsonl"] {
        let mut log = ScenarioLogWriter::create(dir.path().join(name)).unwrap();
        run.execute(&ScriptedDecisionMaker::new(), &mut log).unwrap();
    }
    let a = fs::read(dir.path().join("a.jsonl")).unwrap();
    let b = fs::read(dir.path().join("b.jsonl")).unwrap();
    assert_eq!(a, b);
    assert_eq!(String::from_utf8(a).unwrap().lines().count(), 25);
}

#[test]
fn at_run_io_02_failed_decisions_are_recorded_unparseable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    let summary = ScenarioRun::new(config(6, 1))
        .unwrap()
        .execute(&UnreachableDecisionMaker, &mut log)
        .unwrap();
    assert_eq!(summary.generated, 6);
    assert_eq!(summary.failed_decisions, 6);
    assert_eq!(summary.decided, 0);
    assert_eq!(summary.unparseable, 6);

    for r in read_scenario_log(&path).unwrap() {
        let r = r.unwrap();
        assert!(r.chat_response.is_none());
        assert_eq!(r.label, Some(ResponseLabel::Unparseable));
    }
}

#[test]
fn at_run_io_03_resume_skips_logged_scenarios_and_matches_full_run() {
    let dir = tempdir().unwrap();
    let full = dir.path().join("full.jsonl");
    let mut log = ScenarioLogWriter::create(&full).unwrap();
    ScenarioRun::new(config(10, 42))
        .unwrap()
        .execute(&ScriptedDecisionMaker::new(), &mut log)
        .unwrap();
    drop(log);

    let partial = dir.path().join("partial.jsonl");
    let mut log = ScenarioLogWriter::create(&partial).unwrap();
    let first = ScriptedDecisionMaker::new();
    ScenarioRun::new(config(4, 42))
        .unwrap()
        .execute(&first, &mut log)
        .unwrap();
    drop(log);

    let (logged, mut log) = open_resumable_log(&partial).unwrap();
    assert_eq!(logged.len(), 4);
    let second = ScriptedDecisionMaker::new();
    second.calls.set(first.calls.get());
    let summary = ScenarioRun::new(config(10, 42))
        .unwrap()
        .resume(&second, &logged, &mut log)
        .unwrap();
    assert_eq!(summary.resumed, 4);
    assert_eq!(summary.generated, 10);
    assert_eq!(second.calls.get() - first.calls.get(), 6);
    assert_eq!(
        summary.case_one + summary.case_two + summary.unparseable,
        10
    );
    drop(log);

    assert_eq!(fs::read(&full).unwrap(), fs::read(&partial).unwrap());
}

#[test]
fn at_run_io_04_resume_with_other_seed_is_a_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    ScenarioRun::new(config(3, 1))
        .unwrap()
        .execute(&ScriptedDecisionMaker::new(), &mut log)
        .unwrap();
    drop(log);

    let (logged, mut log) = open_resumable_log(&path).unwrap();
    let out = ScenarioRun::new(config(5, 2))
        .unwrap()
        .resume(&ScriptedDecisionMaker::new(), &logged, &mut log);
    assert!(matches!(out, Err(RunError::ResumeMismatch { index: 0 })));
}

#[test]
fn at_run_io_05_torn_tail_is_discarded_on_resume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    ScenarioRun::new(config(3, 5))
        .unwrap()
        .execute(&ScriptedDecisionMaker::new(), &mut log)
        .unwrap();
    drop(log);
    let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(b"{\"scenario_dimen").unwrap();
    drop(f);

    let (logged, mut log) = open_resumable_log(&path).unwrap();
    assert_eq!(logged.len(), 3);
    let summary = ScenarioRun::new(config(5, 5))
        .unwrap()
        .resume(&ScriptedDecisionMaker::new(), &logged, &mut log)
        .unwrap();
    assert_eq!(summary.resumed, 3);
    drop(log);
    let lines = read_scenario_log(&path).unwrap();
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|l| l.is_ok()));
}

#[test]
fn at_run_io_06_overrun_log_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    ScenarioRun::new(config(4, 5))
        .unwrap()
        .execute(&ScriptedDecisionMaker::new(), &mut log)
        .unwrap();
    drop(log);
    let (logged, mut log) = open_resumable_log(&path).unwrap();
    let out = ScenarioRun::new(config(2, 5))
        .unwrap()
        .resume(&ScriptedDecisionMaker::new(), &logged, &mut log);
    assert!(matches!(
        out,
        Err(RunError::ResumeOverrun {
            logged: 4,
            requested: 2
        })
    ));
}

#[test]
fn at_run_io_07_checkpoints_leave_nothing_buffered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    let cfg = ScenarioRunConfig {
        checkpoint_every: 2,
        ..config(5, 3)
    };
    ScenarioRun::new(cfg)
        .unwrap()
        .execute(&ScriptedDecisionMaker::new(), &mut log)
        .unwrap();
    assert_eq!(log.unflushed(), 0);
    assert_eq!(log.appended(), 5);
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 5);
}

#[test]
fn at_run_io_08_default_seed_123_run_end_to_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    let run = ScenarioRun::new(ScenarioRunConfig::mvp_v1()).unwrap();
    let summary = run.execute(&ScriptedDecisionMaker::new(), &mut log).unwrap();
    assert_eq!(summary.generated, 3);
    assert_eq!(summary.decided, 3);
    assert_eq!((summary.case_one, summary.case_two), (2, 1));

    let expected: Vec<_> = run.generator().take(3).collect::<Result<_, _>>().unwrap();
    let logged: Vec<_> = read_scenario_log(&path)
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    for (r, e) in logged.iter().zip(&expected) {
        assert!(r.validate().is_ok());
        assert_eq!(&r.without_response(), e);
    }
    assert_eq!(logged[0].label, Some(ResponseLabel::CaseOne));
    assert_eq!(logged[1].label, Some(ResponseLabel::CaseTwo));
}

struct VerboseDecisionMaker;

impl DecisionMaker for VerboseDecisionMaker {
    fn respond(&self, _: &str, _: &str) -> Result<String, DecisionError> {
        Ok(format!("Case 1. {}", "reasoning ".repeat(7_000)))
    }
}

#[test]
fn at_run_io_09_long_replies_are_kept_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.jsonl");
    let mut log = ScenarioLogWriter::create(&path).unwrap();
    let summary = ScenarioRun::new(config(2, 11))
        .unwrap()
        .execute(&VerboseDecisionMaker, &mut log)
        .unwrap();
    assert_eq!(summary.case_one, 2);
    drop(log);

    for r in read_scenario_log(&path).unwrap() {
        let r = r.unwrap();
        let reply = r.chat_response.unwrap();
        assert!(reply.len() > 65_536);
        assert!(reply.starts_with("Case 1. reasoning"));
        assert_eq!(r.label, Some(ResponseLabel::CaseOne));
    }
}
