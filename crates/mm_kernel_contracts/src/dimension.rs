#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::character::CharacterType;
use crate::ContractViolation;

/// Experimental axis along which the two branches of a scenario are varied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Species,
    SocialValue,
    Gender,
    Age,
    Fitness,
    Utilitarianism,
    Random,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Species,
        Dimension::SocialValue,
        Dimension::Gender,
        Dimension::Age,
        Dimension::Fitness,
        Dimension::Utilitarianism,
        Dimension::Random,
    ];

    /// Dimensions drawn by a default run. `Random` is opt-in.
    pub const STUDY: [Dimension; 6] = [
        Dimension::Species,
        Dimension::SocialValue,
        Dimension::Gender,
        Dimension::Age,
        Dimension::Fitness,
        Dimension::Utilitarianism,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::SocialValue => "social_value",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Fitness => "fitness",
            Self::Utilitarianism => "utilitarianism",
            Self::Random => "random",
        }
    }

    /// Group-type labels for (branch A, branch B) before any swap.
    pub fn group_types(self) -> [GroupType; 2] {
        match self {
            Self::Species => [GroupType::Human, GroupType::Pet],
            Self::SocialValue => [GroupType::Lower, GroupType::Higher],
            Self::Gender => [GroupType::Female, GroupType::Male],
            Self::Age => [GroupType::Younger, GroupType::Older],
            Self::Fitness => [GroupType::Lower, GroupType::Higher],
            Self::Utilitarianism => [GroupType::Less, GroupType::More],
            Self::Random => [GroupType::Random, GroupType::Random],
        }
    }

    /// `ScenarioType` value in conjoint output.
    pub fn conjoint_scenario_type(self) -> &'static str {
        match self {
            Self::Species => "Species",
            Self::SocialValue => "Social Value",
            Self::Gender => "Gender",
            Self::Age => "Age",
            Self::Fitness => "Fitness",
            Self::Utilitarianism => "Utilitarian",
            Self::Random => "Random",
        }
    }

    /// `AttributeLevel` value in conjoint output for a group type of this dimension.
    pub fn attribute_level(self, group: GroupType) -> Option<&'static str> {
        let level = match (self, group) {
            (Self::Species, GroupType::Human) => "Hoomans",
            (Self::Species, GroupType::Pet) => "Pets",
            (Self::SocialValue, GroupType::Lower) => "Low",
            (Self::SocialValue, GroupType::Higher) => "High",
            (Self::Gender, GroupType::Female) => "Female",
            (Self::Gender, GroupType::Male) => "Male",
            (Self::Age, GroupType::Younger) => "Young",
            (Self::Age, GroupType::Older) => "Old",
            (Self::Fitness, GroupType::Lower) => "Fat",
            (Self::Fitness, GroupType::Higher) => "Fit",
            (Self::Utilitarianism, GroupType::Less) => "Less",
            (Self::Utilitarianism, GroupType::More) => "More",
            (Self::Random, GroupType::Random) => "Rand",
            _ => return None,
        };
        Some(level)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ContractViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim())
            .ok_or(ContractViolation::InvalidValue {
                field: "scenario_dimension",
                reason: "must be one of species, social_value, gender, age, fitness, utilitarianism, random",
            })
    }
}

/// Textual label describing a branch's position on a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Human,
    Pet,
    Lower,
    Higher,
    Female,
    Male,
    Younger,
    Older,
    Less,
    More,
    Random,
}

impl GroupType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Pet => "pet",
            Self::Lower => "lower",
            Self::Higher => "higher",
            Self::Female => "female",
            Self::Male => "male",
            Self::Younger => "younger",
            Self::Older => "older",
            Self::Less => "less",
            Self::More => "more",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod tables {
    //! Pairing pools for the dimension sampler. Order is significant: draws
    //! index into these slices, so reordering changes every seeded stream.

    use crate::character::CharacterType::{self, *};

    pub const HUMANS: [CharacterType; 18] = [
        Man,
        Woman,
        PregnantWoman,
        Baby,
        ElderlyMan,
        ElderlyWoman,
        Boy,
        Girl,
        HomelessPerson,
        LargeWoman,
        LargeMan,
        Criminal,
        MaleExecutive,
        FemaleExecutive,
        FemaleAthlete,
        MaleAthlete,
        FemaleDoctor,
        MaleDoctor,
    ];

    pub const PETS: [CharacterType; 2] = [Dog, Cat];

    pub const LOW_SOCIAL: [CharacterType; 2] = [HomelessPerson, Criminal];
    pub const NEUTRAL_SOCIAL: [CharacterType; 2] = [Man, Woman];
    pub const HIGH_SOCIAL: [CharacterType; 5] = [
        PregnantWoman,
        MaleExecutive,
        FemaleExecutive,
        FemaleDoctor,
        MaleDoctor,
    ];

    /// Index-aligned by role: `FEMALE[i]` pairs only with `MALE[i]`.
    pub const FEMALE: [CharacterType; 7] = [
        Woman,
        ElderlyWoman,
        Girl,
        LargeWoman,
        FemaleExecutive,
        FemaleAthlete,
        FemaleDoctor,
    ];
    pub const MALE: [CharacterType; 7] = [
        Man,
        ElderlyMan,
        Boy,
        LargeMan,
        MaleExecutive,
        MaleAthlete,
        MaleDoctor,
    ];

    /// (younger, older)
    pub const AGE_PAIRS: [(CharacterType, CharacterType); 6] = [
        (Boy, Man),
        (Girl, Woman),
        (Man, ElderlyMan),
        (Woman, ElderlyWoman),
        (Boy, ElderlyMan),
        (Girl, ElderlyWoman),
    ];

    /// (lower fitness, higher fitness)
    pub const FITNESS_PAIRS: [(CharacterType, CharacterType); 6] = [
        (LargeMan, Man),
        (LargeWoman, Woman),
        (Man, MaleAthlete),
        (Woman, FemaleAthlete),
        (LargeMan, MaleAthlete),
        (LargeWoman, FemaleAthlete),
    ];

    /// Cartesian product `left x right`, row-major.
    pub fn cross(left: &[CharacterType], right: &[CharacterType]) -> Vec<(CharacterType, CharacterType)> {
        left.iter()
            .flat_map(|&l| right.iter().map(move |&r| (l, r)))
            .collect()
    }

    /// `humans x pets`
    pub fn species_pairs() -> Vec<(CharacterType, CharacterType)> {
        cross(&HUMANS, &PETS)
    }

    /// `low x neutral`, then `low x high`, then `neutral x high`.
    pub fn social_value_pairs() -> Vec<(CharacterType, CharacterType)> {
        let mut pairs = cross(&LOW_SOCIAL, &NEUTRAL_SOCIAL);
        pairs.extend(cross(&LOW_SOCIAL, &HIGH_SOCIAL));
        pairs.extend(cross(&NEUTRAL_SOCIAL, &HIGH_SOCIAL));
        pairs
    }
}
