#![forbid(unsafe_code)]

use std::fs;

use mm_kernel_contracts::character::{CharacterMultiset, CharacterType};
use mm_kernel_contracts::conjoint::{ConjointRow, CONJOINT_COLUMNS};
use mm_storage::conjoint_csv::ConjointCsvWriter;
use tempfile::tempdir;

fn row(id: &str, saved: u8, left_hand: u8) -> ConjointRow {
    ConjointRow {
        response_id: id.to_string(),
        extended_session_id: "chatbot_extended".to_string(),
        user_id: "chatbot".to_string(),
        scenario_order: 0,
        intervention: 1,
        ped_ped: 1,
        barrier: 0,
        crossing_signal: 2,
        attribute_level: "Young",
        scenario_type_strict: "Age",
        scenario_type: "Age",
        default_choice: None,
        non_default_choice: None,
        default_choice_is_omission: None,
        number_of_characters: 3,
        diff_number_of_characters: 1,
        saved,
        template: "desktop".to_string(),
        description_shown: 1,
        left_hand,
        user_country3: "JPN".to_string(),
        character_counts: CharacterMultiset::from_characters([
            CharacterType::Boy,
            CharacterType::Girl,
            CharacterType::Cat,
        ]),
    }
}

#[test]
fn at_csv_io_01_exact_header() {
    let mut w = ConjointCsvWriter::from_writer(Vec::new()).unwrap();
    w.flush().unwrap();
    let bytes = w.into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(
        text,
        "ResponseID,ExtendedSessionID,UserID,ScenarioOrder,Intervention,PedPed,Barrier,\
CrossingSignal,AttributeLevel,ScenarioTypeStrict,ScenarioType,DefaultChoice,NonDefaultChoice,\
DefaultChoiceIsOmission,NumberOfCharacters,DiffNumberOFCharacters,Saved,Template,\
DescriptionShown,LeftHand,UserCountry3,Man,Woman,Pregnant,Stroller,OldMan,OldWoman,Boy,Girl,\
Homeless,LargeWoman,LargeMan,Criminal,MaleExecutive,FemaleExecutive,FemaleAthlete,\
MaleAthlete,FemaleDoctor,MaleDoctor,Dog,Cat\n"
    );
}

#[test]
fn at_csv_io_02_rows_follow_header_with_empty_optional_cells() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conjoint.csv");
    let mut w = ConjointCsvWriter::create(&path).unwrap();
    w.write_rows(&[row("res_00000000_1", 0, 1), row("res_00000000_2", 1, 0)])
        .unwrap();
    assert_eq!(w.rows(), 2);
    w.flush().unwrap();
    drop(w);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].split(',').count(), CONJOINT_COLUMNS.len());
    let cells: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(cells.len(), CONJOINT_COLUMNS.len());
    assert_eq!(cells[0], "res_00000000_1");
    assert_eq!(&cells[11..14], &["", "", ""]);
    assert_eq!(cells[15], "1");
    assert_eq!(cells[19], "1");
    let boy = CONJOINT_COLUMNS.iter().position(|c| *c == "Boy").unwrap();
    assert_eq!(cells[boy], "1");
    assert_eq!(cells[CONJOINT_COLUMNS.len() - 1], "1");
    assert_eq!(cells[21], "0");
    assert!(lines[2].starts_with("res_00000000_2,"));
}

#[test]
fn at_csv_io_03_invalid_row_is_refused() {
    let mut w = ConjointCsvWriter::from_writer(Vec::new()).unwrap();
    let mut bad = row("res_00000000_1", 0, 1);
    bad.number_of_characters = 9;
    assert!(w.write_row(&bad).is_err());
    assert_eq!(w.rows(), 0);
}
