#![forbid(unsafe_code)]

use crate::character::{CharacterMultiset, CharacterType, CHARACTER_COUNT};
use crate::{ContractViolation, Validate};

pub const IDENTITY_COLUMN_COUNT: usize = 21;
pub const CONJOINT_COLUMN_COUNT: usize = IDENTITY_COLUMN_COUNT + CHARACTER_COUNT;

/// Output column order consumed by downstream choice-model tooling. Reproduced verbatim,
/// including the `DiffNumberOFCharacters` spelling.
pub const CONJOINT_COLUMNS: [&str; CONJOINT_COLUMN_COUNT] = [
    "ResponseID",
    "ExtendedSessionID",
    "UserID",
    "ScenarioOrder",
    "Intervention",
    "PedPed",
    "Barrier",
    "CrossingSignal",
    "AttributeLevel",
    "ScenarioTypeStrict",
    "ScenarioType",
    "DefaultChoice",
    "NonDefaultChoice",
    "DefaultChoiceIsOmission",
    "NumberOfCharacters",
    "DiffNumberOFCharacters",
    "Saved",
    "Template",
    "DescriptionShown",
    "LeftHand",
    "UserCountry3",
    "Man",
    "Woman",
    "Pregnant",
    "Stroller",
    "OldMan",
    "OldWoman",
    "Boy",
    "Girl",
    "Homeless",
    "LargeWoman",
    "LargeMan",
    "Criminal",
    "MaleExecutive",
    "FemaleExecutive",
    "FemaleAthlete",
    "MaleAthlete",
    "FemaleDoctor",
    "MaleDoctor",
    "Dog",
    "Cat",
];

/// One encoded branch of one retained scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjointRow {
    pub response_id: String,
    pub extended_session_id: String,
    pub user_id: String,
    pub scenario_order: u32,
    pub intervention: u8,
    pub ped_ped: u8,
    pub barrier: u8,
    pub crossing_signal: u8,
    pub attribute_level: &'static str,
    pub scenario_type_strict: &'static str,
    pub scenario_type: &'static str,
    pub default_choice: Option<String>,
    pub non_default_choice: Option<String>,
    pub default_choice_is_omission: Option<u8>,
    pub number_of_characters: u32,
    pub diff_number_of_characters: u32,
    pub saved: u8,
    pub template: String,
    pub description_shown: u8,
    pub left_hand: u8,
    pub user_country3: String,
    pub character_counts: CharacterMultiset,
}

impl ConjointRow {
    /// Cell values in [`CONJOINT_COLUMNS`] order. Absent optional cells are empty.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(CONJOINT_COLUMN_COUNT);
        cells.push(self.response_id.clone());
        cells.push(self.extended_session_id.clone());
        cells.push(self.user_id.clone());
        cells.push(self.scenario_order.to_string());
        cells.push(self.intervention.to_string());
        cells.push(self.ped_ped.to_string());
        cells.push(self.barrier.to_string());
        cells.push(self.crossing_signal.to_string());
        cells.push(self.attribute_level.to_string());
        cells.push(self.scenario_type_strict.to_string());
        cells.push(self.scenario_type.to_string());
        cells.push(self.default_choice.clone().unwrap_or_default());
        cells.push(self.non_default_choice.clone().unwrap_or_default());
        cells.push(
            self.default_choice_is_omission
                .map(|v| v.to_string())
                .unwrap_or_default(),
        );
        cells.push(self.number_of_characters.to_string());
        cells.push(self.diff_number_of_characters.to_string());
        cells.push(self.saved.to_string());
        cells.push(self.template.clone());
        cells.push(self.description_shown.to_string());
        cells.push(self.left_hand.to_string());
        cells.push(self.user_country3.clone());
        for c in CharacterType::ALL {
            cells.push(self.character_counts.count(c).to_string());
        }
        cells
    }
}

impl Validate for ConjointRow {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.response_id.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "conjoint_row.response_id",
                reason: "must not be empty",
            });
        }
        for (field, v) in [
            ("conjoint_row.intervention", self.intervention),
            ("conjoint_row.ped_ped", self.ped_ped),
            ("conjoint_row.barrier", self.barrier),
            ("conjoint_row.saved", self.saved),
            ("conjoint_row.left_hand", self.left_hand),
        ] {
            if v > 1 {
                return Err(ContractViolation::InvalidRange {
                    field,
                    min: 0.0,
                    max: 1.0,
                    got: f64::from(v),
                });
            }
        }
        if self.barrier == 1 && self.ped_ped == 1 {
            return Err(ContractViolation::InvalidValue {
                field: "conjoint_row.barrier",
                reason: "must be 0 for pedestrian-vs-pedestrian rows",
            });
        }
        if self.barrier == 1 && self.crossing_signal != 0 {
            return Err(ContractViolation::InvalidValue {
                field: "conjoint_row.crossing_signal",
                reason: "must be 0 when barrier is 1",
            });
        }
        if self.crossing_signal > 2 {
            return Err(ContractViolation::InvalidRange {
                field: "conjoint_row.crossing_signal",
                min: 0.0,
                max: 2.0,
                got: f64::from(self.crossing_signal),
            });
        }
        if self.number_of_characters != self.character_counts.total() {
            return Err(ContractViolation::InvalidValue {
                field: "conjoint_row.number_of_characters",
                reason: "must equal the sum of the character count columns",
            });
        }
        Ok(())
    }
}
