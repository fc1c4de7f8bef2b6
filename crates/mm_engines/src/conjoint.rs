#![forbid(unsafe_code)]

use mm_kernel_contracts::conjoint::ConjointRow;
use mm_kernel_contracts::dimension::{Dimension, GroupType};
use mm_kernel_contracts::scenario::{Branch, ScenarioRecord};
use mm_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, thiserror::Error)]
pub enum ConjointError {
    #[error("scenario record has no label")]
    Unlabeled,
    #[error("scenario record is unparseable and cannot be encoded")]
    Unparseable,
    #[error("no attribute level for group type {group} under dimension {dimension}")]
    UnknownAttributeLevel {
        dimension: Dimension,
        group: GroupType,
    },
    #[error("invalid scenario record: {0}")]
    Contract(#[from] ContractViolation),
}

/// Session metadata stamped on every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjointEncoderConfig {
    pub extended_session_id: String,
    pub user_id: String,
    pub scenario_order: u32,
    pub template: String,
    pub description_shown: u8,
    pub user_country3: String,
}

impl ConjointEncoderConfig {
    pub fn mvp_v1() -> Self {
        Self {
            extended_session_id: "chatbot_extended".to_string(),
            user_id: "chatbot".to_string(),
            scenario_order: 0,
            template: "desktop".to_string(),
            description_shown: 1,
            user_country3: "JPN".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConjointEncoder {
    config: ConjointEncoderConfig,
}

impl ConjointEncoder {
    pub fn new(config: ConjointEncoderConfig) -> Self {
        Self { config }
    }

    /// Encodes the `index`-th retained scenario into its (branch A, branch B) rows.
    pub fn encode(
        &self,
        index: usize,
        record: &ScenarioRecord,
    ) -> Result<[ConjointRow; 2], ConjointError> {
        record.validate()?;
        let label = record.label.ok_or(ConjointError::Unlabeled)?;
        let chosen = label.chosen_branch().ok_or(ConjointError::Unparseable)?;

        let ctx = &record.context;
        let total_a = record.count_dict_1.total();
        let total_b = record.count_dict_2.total();
        let diff = total_a.abs_diff(total_b);
        let ped_ped = u8::from(!ctx.is_in_car);

        let mut rows = [Branch::A, Branch::B].map(|branch| {
            let barrier = match branch {
                Branch::A => 1 - ped_ped,
                Branch::B => 0,
            };
            let crossing_signal = if barrier == 1 {
                0
            } else {
                ctx.signal(branch).conjoint_code()
            };
            let intervention = match branch {
                Branch::A => ctx.is_interventionism,
                Branch::B => !ctx.is_interventionism,
            };
            let members = *record.branch(branch);
            ConjointRow {
                response_id: format!("res_{index:08}_{}", branch.index() + 1),
                extended_session_id: self.config.extended_session_id.clone(),
                user_id: self.config.user_id.clone(),
                scenario_order: self.config.scenario_order,
                intervention: u8::from(intervention),
                ped_ped,
                barrier,
                crossing_signal,
                attribute_level: "",
                scenario_type_strict: record.scenario_dimension.conjoint_scenario_type(),
                scenario_type: record.scenario_dimension.conjoint_scenario_type(),
                default_choice: None,
                non_default_choice: None,
                default_choice_is_omission: None,
                number_of_characters: members.total(),
                diff_number_of_characters: diff,
                saved: u8::from(chosen != branch),
                template: self.config.template.clone(),
                description_shown: self.config.description_shown,
                left_hand: u8::from(branch == Branch::A),
                user_country3: self.config.user_country3.clone(),
                character_counts: members,
            }
        });

        for (row, branch) in rows.iter_mut().zip([Branch::A, Branch::B]) {
            let group = record.group_type(branch);
            row.attribute_level = record
                .scenario_dimension
                .attribute_level(group)
                .ok_or(ConjointError::UnknownAttributeLevel {
                    dimension: record.scenario_dimension,
                    group,
                })?;
            row.validate()?;
        }

        debug_assert_eq!(rows[0].saved + rows[1].saved, 1);
        Ok(rows)
    }
}
