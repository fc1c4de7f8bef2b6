#![forbid(unsafe_code)]

use std::fs;
use std::io::Write;

use mm_kernel_contracts::character::{CharacterMultiset, CharacterType};
use mm_kernel_contracts::dimension::{Dimension, GroupType};
use mm_kernel_contracts::scenario::{ResponseLabel, ScenarioContext, ScenarioRecord, TrafficSignal};
use mm_storage::scenario_log::{read_scenario_log, ScenarioLogWriter};
use mm_storage::StorageError;
use tempfile::tempdir;

fn record(dim: Dimension, in_car: bool) -> ScenarioRecord {
    let signals = if in_car {
        [TrafficSignal::NotApplicable, TrafficSignal::Green]
    } else {
        [TrafficSignal::Red, TrafficSignal::Green]
    };
    ScenarioRecord::v1(
        dim,
        ScenarioContext::v1(in_car, false, true, signals).unwrap(),
        dim.group_types(),
        CharacterMultiset::from_characters([CharacterType::Boy, CharacterType::Boy]),
        CharacterMultiset::from_characters([CharacterType::ElderlyMan]),
        "system".to_string(),
        "Case 1.\nfirst\n".to_string(),
        "Case 2.\nsecond\n".to_string(),
    )
    .unwrap()
}

#[test]
fn at_log_io_01_write_then_read_preserves_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenarios.jsonl");
    let mut answered = record(Dimension::Age, true);
    answered.chat_response = Some("Case 2".to_string());
    answered.label = Some(ResponseLabel::CaseTwo);
    let records = vec![record(Dimension::Age, false), answered];

    let mut w = ScenarioLogWriter::create(&path).unwrap();
    for r in &records {
        w.append(r).unwrap();
    }
    w.checkpoint().unwrap();
    assert_eq!(w.appended(), 2);
    assert_eq!(w.unflushed(), 0);

    let read: Vec<_> = read_scenario_log(&path)
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read, records);
}

#[test]
fn at_log_io_02_lines_use_interchange_field_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenarios.jsonl");
    let mut w = ScenarioLogWriter::create(&path).unwrap();
    w.append(&record(Dimension::Age, false)).unwrap();
    w.checkpoint().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1);
    let v: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(v["scenario_dimension"], "age");
    assert_eq!(v["is_in_car"], false);
    assert_eq!(v["is_law"], true);
    assert_eq!(v["traffic_light_pattern"], serde_json::json!(["red", "green"]));
    assert_eq!(
        v["scenario_dimension_group_type"],
        serde_json::json!([GroupType::Younger.as_str(), GroupType::Older.as_str()])
    );
    assert_eq!(v["count_dict_1"]["boy"], 2);
    assert_eq!(v["count_dict_2"]["elderly man"], 1);
}

#[test]
fn at_log_io_03_malformed_line_fails_only_that_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenarios.jsonl");
    let mut w = ScenarioLogWriter::create(&path).unwrap();
    w.append(&record(Dimension::Age, false)).unwrap();
    w.checkpoint().unwrap();
    drop(w);

    let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(f, "{{\"scenario_dimension\": \"age\"").unwrap();
    writeln!(
        f,
        "{{\"scenario_dimension\":\"age\",\"is_in_car\":false,\"is_interventionism\":true,\
         \"is_law\":false,\"traffic_light_pattern\":[\"NA\",\"NA\"],\
         \"scenario_dimension_group_type\":[\"younger\",\"older\"],\
         \"count_dict_1\":{{\"wizard\":1}},\"count_dict_2\":{{\"man\":1}}}}"
    )
    .unwrap();
    drop(f);

    let mut w = ScenarioLogWriter::append_to(&path).unwrap();
    w.append(&record(Dimension::Fitness, true)).unwrap();
    w.checkpoint().unwrap();

    let out = read_scenario_log(&path).unwrap();
    assert_eq!(out.len(), 4);
    assert!(out[0].is_ok());
    assert!(matches!(out[1], Err(StorageError::MalformedLine { line: 2, .. })));
    assert!(matches!(out[2], Err(StorageError::MalformedLine { line: 3, .. })));
    assert_eq!(
        out[3].as_ref().unwrap().scenario_dimension,
        Dimension::Fitness
    );
}

#[test]
fn at_log_io_04_invalid_record_is_a_line_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenarios.jsonl");
    fs::write(
        &path,
        "{\"scenario_dimension\":\"age\",\"is_in_car\":false,\"is_interventionism\":true,\
         \"is_law\":true,\"traffic_light_pattern\":[\"red\",\"red\"],\
         \"scenario_dimension_group_type\":[\"younger\",\"older\"],\
         \"count_dict_1\":{\"boy\":1},\"count_dict_2\":{\"man\":1}}\n",
    )
    .unwrap();
    let out = read_scenario_log(&path).unwrap();
    assert!(matches!(out[0], Err(StorageError::InvalidRecord { line: 1, .. })));
}

#[test]
fn at_log_io_05_missing_file_is_a_whole_log_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        read_scenario_log(dir.path().join("absent.jsonl")),
        Err(StorageError::Io { .. })
    ));
}

#[test]
fn at_log_io_06_directory_is_a_whole_log_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        read_scenario_log(dir.path()),
        Err(StorageError::NotAFile { .. })
    ));
}
