#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::character::CharacterMultiset;
use crate::dimension::{Dimension, GroupType};
use crate::{ContractViolation, Validate};

/// Traffic-signal state shown to a pedestrian branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficSignal {
    #[serde(rename = "NA")]
    NotApplicable,
    #[serde(rename = "green")]
    Green,
    #[serde(rename = "red")]
    Red,
}

impl TrafficSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "NA",
            Self::Green => "green",
            Self::Red => "red",
        }
    }

    /// `CrossingSignal` code in conjoint output.
    pub fn conjoint_code(self) -> u8 {
        match self {
            Self::NotApplicable => 0,
            Self::Green => 1,
            Self::Red => 2,
        }
    }
}

impl fmt::Display for TrafficSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch a choice or a slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    A,
    B,
}

impl Branch {
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Structural flags of one scenario.
///
/// With `is_in_car`, branch A is always the car occupants and branch B the
/// pedestrians; otherwise both branches are pedestrian groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioContext {
    pub is_in_car: bool,
    pub is_interventionism: bool,
    pub is_law: bool,
    /// Signal for (branch A, branch B).
    pub traffic_light_pattern: [TrafficSignal; 2],
}

impl ScenarioContext {
    pub fn v1(
        is_in_car: bool,
        is_interventionism: bool,
        is_law: bool,
        traffic_light_pattern: [TrafficSignal; 2],
    ) -> Result<Self, ContractViolation> {
        let c = Self {
            is_in_car,
            is_interventionism,
            is_law,
            traffic_light_pattern,
        };
        c.validate()?;
        Ok(c)
    }

    pub fn signal(&self, branch: Branch) -> TrafficSignal {
        self.traffic_light_pattern[branch.index()]
    }
}

impl Validate for ScenarioContext {
    fn validate(&self) -> Result<(), ContractViolation> {
        let [a, b] = self.traffic_light_pattern;
        let na = TrafficSignal::NotApplicable;
        if !self.is_law {
            if a != na || b != na {
                return Err(ContractViolation::InvalidValue {
                    field: "scenario_context.traffic_light_pattern",
                    reason: "must be [NA, NA] when is_law is false",
                });
            }
            return Ok(());
        }
        if self.is_in_car {
            if a != na || b == na {
                return Err(ContractViolation::InvalidValue {
                    field: "scenario_context.traffic_light_pattern",
                    reason: "in-car framing must be [NA, green|red] when is_law is true",
                });
            }
        } else if a == na || b == na || a == b {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_context.traffic_light_pattern",
                reason: "pedestrian framing must be a permutation of [green, red] when is_law is true",
            });
        }
        Ok(())
    }
}

/// Classified choice of the decision-maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum ResponseLabel {
    /// Case 1 chosen; branch A dies, branch B is spared.
    CaseOne,
    /// Case 2 chosen; branch B dies, branch A is spared.
    CaseTwo,
    Unparseable,
}

impl ResponseLabel {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::CaseOne => 0,
            Self::CaseTwo => 1,
            Self::Unparseable => -1,
        }
    }

    /// Branch named by the chosen case, if any.
    pub fn chosen_branch(self) -> Option<Branch> {
        match self {
            Self::CaseOne => Some(Branch::A),
            Self::CaseTwo => Some(Branch::B),
            Self::Unparseable => None,
        }
    }
}

impl From<ResponseLabel> for i8 {
    fn from(l: ResponseLabel) -> Self {
        l.as_i8()
    }
}

impl TryFrom<i8> for ResponseLabel {
    type Error = ContractViolation;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::CaseOne),
            1 => Ok(Self::CaseTwo),
            -1 => Ok(Self::Unparseable),
            _ => Err(ContractViolation::InvalidValue {
                field: "label",
                reason: "must be -1, 0 or 1",
            }),
        }
    }
}

/// One generated scenario, in the record interchange shape.
///
/// Rendered text is optional on input so that minimal interchange records
/// (as produced by other tooling) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub scenario_dimension: Dimension,
    #[serde(flatten)]
    pub context: ScenarioContext,
    /// Group-type labels for (branch A, branch B), post-swap.
    pub scenario_dimension_group_type: [GroupType; 2],
    pub count_dict_1: CharacterMultiset,
    pub count_dict_2: CharacterMultiset,
    #[serde(default)]
    pub system_text: String,
    #[serde(default)]
    pub case_1_text: String,
    #[serde(default)]
    pub case_2_text: String,
    #[serde(default)]
    pub chat_response: Option<String>,
    #[serde(default)]
    pub label: Option<ResponseLabel>,
}

impl ScenarioRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        scenario_dimension: Dimension,
        context: ScenarioContext,
        scenario_dimension_group_type: [GroupType; 2],
        count_dict_1: CharacterMultiset,
        count_dict_2: CharacterMultiset,
        system_text: String,
        case_1_text: String,
        case_2_text: String,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            scenario_dimension,
            context,
            scenario_dimension_group_type,
            count_dict_1,
            count_dict_2,
            system_text,
            case_1_text,
            case_2_text,
            chat_response: None,
            label: None,
        };
        r.validate()?;
        Ok(r)
    }

    pub fn branch(&self, branch: Branch) -> &CharacterMultiset {
        match branch {
            Branch::A => &self.count_dict_1,
            Branch::B => &self.count_dict_2,
        }
    }

    pub fn group_type(&self, branch: Branch) -> GroupType {
        self.scenario_dimension_group_type[branch.index()]
    }

    /// User prompt sent to the decision-maker.
    pub fn user_text(&self) -> String {
        format!("{}\n{}", self.case_1_text, self.case_2_text)
    }

    /// Copy with response and label cleared, for comparisons that ignore the external call.
    pub fn without_response(&self) -> Self {
        Self {
            chat_response: None,
            label: None,
            ..self.clone()
        }
    }
}

impl Validate for ScenarioRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.context.validate()?;
        self.count_dict_1.validate()?;
        self.count_dict_2.validate()?;
        let [ga, gb] = self.scenario_dimension_group_type;
        let [da, db] = self.scenario_dimension.group_types();
        if !((ga == da && gb == db) || (ga == db && gb == da)) {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_record.scenario_dimension_group_type",
                reason: "must be the dimension's group-type pair, optionally swapped",
            });
        }
        if !self.context.is_in_car && (ga, gb) != (da, db) {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_record.scenario_dimension_group_type",
                reason: "pedestrian framing is never swapped",
            });
        }
        Ok(())
    }
}
