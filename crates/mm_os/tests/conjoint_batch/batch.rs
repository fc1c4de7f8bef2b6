#![forbid(unsafe_code)]

use std::cell::Cell;

use mm_engines::conjoint::ConjointEncoderConfig;
use mm_engines::decision::DecisionError;
use mm_engines::emitter::{ScenarioGenerator, ScenarioPlanner};
use mm_kernel_contracts::character::CharacterMultiset;
use mm_kernel_contracts::conjoint::CONJOINT_COLUMNS;
use mm_kernel_contracts::dimension::Dimension;
use mm_kernel_contracts::scenario::{ResponseLabel, ScenarioRecord};
use mm_kernel_contracts::ContractViolation;
use mm_os::conjoint_batch::{convert_records, BatchRecordError, ConjointBatchConverter};
use mm_os::decision_maker::DecisionMaker;
use mm_os::scenario_run::{ScenarioRun, ScenarioRunConfig};
use mm_storage::conjoint_csv::ConjointCsvWriter;
use mm_storage::scenario_log::{read_scenario_log, ScenarioLogWriter};
use mm_storage::StorageError;
use tempfile::tempdir;

fn scenarios(n: usize) -> Vec<ScenarioRecord> {
    let planner = ScenarioPlanner::new(Dimension::STUDY.to_vec()).unwrap();
    ScenarioGenerator::new(5, planner)
        .take(n)
        .collect::<Result<_, _>>()
        .unwrap()
}

fn answered(mut r: ScenarioRecord, response: Option<&str>, label: Option<ResponseLabel>) -> ScenarioRecord {
    r.chat_response = response.map(str::to_string);
    r.label = label;
    r
}

#[test]
fn at_batch_01_drops_unparseable_and_unanswered() {
    let s = scenarios(4);
    let records = vec![
        answered(s[0].clone(), Some("Case 1"), Some(ResponseLabel::CaseOne)),
        answered(s[1].clone(), Some("case 1 or case 2"), None),
        answered(s[2].clone(), None, Some(ResponseLabel::Unparseable)),
        answered(s[3].clone(), Some("Case 2"), None),
    ];
    let batch = convert_records(records);
    assert!(batch.failures.is_empty());
    assert_eq!(batch.retained, 2);
    assert_eq!(batch.dropped, 2);
    let ids: Vec<_> = batch.rows.iter().map(|r| r.response_id.as_str()).collect();
    assert_eq!(
        ids,
        ["res_00000000_1", "res_00000000_2", "res_00000001_1", "res_00000001_2"]
    );
    assert_eq!((batch.rows[0].saved, batch.rows[1].saved), (0, 1));
    assert_eq!((batch.rows[2].saved, batch.rows[3].saved), (1, 0));
    for pair in batch.rows.chunks(2) {
        assert_eq!((pair[0].left_hand, pair[1].left_hand), (1, 0));
        assert_eq!(pair[0].diff_number_of_characters, pair[1].diff_number_of_characters);
    }
}

#[test]
fn at_batch_02_record_failures_do_not_abort() {
    let s = scenarios(3);
    let mut broken = answered(s[1].clone(), Some("Case 1"), Some(ResponseLabel::CaseOne));
    broken.count_dict_1 = CharacterMultiset::new();
    let lines = vec![
        Ok(answered(s[0].clone(), Some("Case 2"), Some(ResponseLabel::CaseTwo))),
        Err(StorageError::InvalidRecord {
            line: 2,
            violation: ContractViolation::MissingField { field: "label" },
        }),
        Ok(broken),
        Ok(answered(s[2].clone(), Some("Case 1"), Some(ResponseLabel::CaseOne))),
    ];
    let batch = ConjointBatchConverter::new(ConjointEncoderConfig::mvp_v1()).convert_lines(lines);
    assert_eq!(batch.failures.len(), 2);
    assert_eq!(batch.failures[0].0, 1);
    assert!(matches!(batch.failures[0].1, BatchRecordError::Read(_)));
    assert_eq!(batch.failures[1].0, 2);
    assert!(matches!(batch.failures[1].1, BatchRecordError::Encode(_)));
    assert_eq!(batch.rows.len(), 4);
    assert_eq!(batch.rows[2].response_id, "res_00000002_1");
}

struct Alternating(Cell<u32>);

impl DecisionMaker for Alternating {
    fn respond(&self, _: &str, _: &str) -> Result<String, DecisionError> {
        let n = self.0.get();
        self.0.set(n + 1);
        match n % 3 {
            0 => Ok("Case 1.".to_string()),
            1 => Ok("I would choose case 2".to_string()),
            _ => Err(DecisionError::Transport {
                provider: "test",
                kind: "timeout",
            }),
        }
    }
}

#[test]
fn at_batch_03_log_to_csv_end_to_end() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("s.jsonl");
    let csv_path = dir.path().join("conjoint.csv");
    let cfg = ScenarioRunConfig {
        scenario_count: 30,
        ..ScenarioRunConfig::mvp_v1()
    };
    let mut log = ScenarioLogWriter::create(&log_path).unwrap();
    let summary = ScenarioRun::new(cfg)
        .unwrap()
        .execute(&Alternating(Cell::new(0)), &mut log)
        .unwrap();
    drop(log);

    let batch = ConjointBatchConverter::new(ConjointEncoderConfig::mvp_v1())
        .convert_lines(read_scenario_log(&log_path).unwrap());
    assert!(batch.failures.is_empty());
    assert_eq!(batch.retained as u64, summary.case_one + summary.case_two);
    assert_eq!(batch.dropped as u64, summary.unparseable);

    let mut csv = ConjointCsvWriter::create(&csv_path).unwrap();
    csv.write_rows(&batch.rows).unwrap();
    csv.flush().unwrap();
    drop(csv);

    let text = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 2 * batch.retained);
    assert_eq!(lines[0], CONJOINT_COLUMNS.join(","));
    for pair in batch.rows.chunks(2) {
        assert_eq!(pair[0].saved + pair[1].saved, 1);
        assert_eq!(pair[0].scenario_type, pair[1].scenario_type);
    }
}

#[test]
fn at_batch_04_stored_labels_are_reclassified_from_the_reply() {
    let s = scenarios(3);
    let records = vec![
        answered(s[0].clone(), Some("Case 1"), Some(ResponseLabel::CaseTwo)),
        answered(s[1].clone(), Some("no idea"), Some(ResponseLabel::CaseOne)),
        answered(s[2].clone(), Some("case2"), Some(ResponseLabel::Unparseable)),
    ];
    let batch = convert_records(records);
    assert!(batch.failures.is_empty());
    assert_eq!((batch.retained, batch.dropped), (2, 1));
    assert_eq!(batch.rows.len(), 4);
    assert_eq!((batch.rows[0].saved, batch.rows[1].saved), (0, 1));
    assert_eq!((batch.rows[2].saved, batch.rows[3].saved), (1, 0));
    assert_eq!(batch.rows[2].response_id, "res_00000001_1");
}
