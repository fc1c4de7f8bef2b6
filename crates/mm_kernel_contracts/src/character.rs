#![forbid(unsafe_code)]

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ContractViolation, Validate};

/// Upper bound on the number of characters in one branch of a scenario.
pub const MAX_BRANCH_CHARACTERS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Human,
    Pet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialValueClass {
    Low,
    Neutral,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Female,
    Male,
}

/// The fixed catalog of characters that can appear in a scenario.
///
/// Declaration order is the catalog order. It pins the iteration order of
/// [`CharacterMultiset`], the order of fragments in rendered text, and the
/// order of the per-character count columns in conjoint output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharacterType {
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
    Dog,
    Cat,
}

pub const CHARACTER_COUNT: usize = 20;

impl CharacterType {
    pub const ALL: [CharacterType; CHARACTER_COUNT] = [
        CharacterType::Man,
        CharacterType::Woman,
        CharacterType::PregnantWoman,
        CharacterType::Baby,
        CharacterType::ElderlyMan,
        CharacterType::ElderlyWoman,
        CharacterType::Boy,
        CharacterType::Girl,
        CharacterType::HomelessPerson,
        CharacterType::LargeWoman,
        CharacterType::LargeMan,
        CharacterType::Criminal,
        CharacterType::MaleExecutive,
        CharacterType::FemaleExecutive,
        CharacterType::FemaleAthlete,
        CharacterType::MaleAthlete,
        CharacterType::FemaleDoctor,
        CharacterType::MaleDoctor,
        CharacterType::Dog,
        CharacterType::Cat,
    ];

    pub fn catalog_index(self) -> usize {
        self as usize
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Man => "man",
            Self::Woman => "woman",
            Self::PregnantWoman => "pregnant woman",
            Self::Baby => "baby",
            Self::ElderlyMan => "elderly man",
            Self::ElderlyWoman => "elderly woman",
            Self::Boy => "boy",
            Self::Girl => "girl",
            Self::HomelessPerson => "homeless person",
            Self::LargeWoman => "large woman",
            Self::LargeMan => "large man",
            Self::Criminal => "criminal",
            Self::MaleExecutive => "male executive",
            Self::FemaleExecutive => "female executive",
            Self::FemaleAthlete => "female athlete",
            Self::MaleAthlete => "male athlete",
            Self::FemaleDoctor => "female doctor",
            Self::MaleDoctor => "male doctor",
            Self::Dog => "dog",
            Self::Cat => "cat",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Self::Man => "men",
            Self::Woman => "women",
            Self::PregnantWoman => "pregnant women",
            Self::Baby => "babies",
            Self::ElderlyMan => "elderly men",
            Self::ElderlyWoman => "elderly women",
            Self::Boy => "boys",
            Self::Girl => "girls",
            Self::HomelessPerson => "homeless persons",
            Self::LargeWoman => "large women",
            Self::LargeMan => "large men",
            Self::Criminal => "criminals",
            Self::MaleExecutive => "male executives",
            Self::FemaleExecutive => "female executives",
            Self::FemaleAthlete => "female athletes",
            Self::MaleAthlete => "male athletes",
            Self::FemaleDoctor => "female doctors",
            Self::MaleDoctor => "male doctors",
            Self::Dog => "dogs",
            Self::Cat => "cats",
        }
    }

    /// Surface form for `count` characters of this type.
    pub fn surface_form(self, count: u32) -> &'static str {
        if count > 1 {
            self.plural()
        } else {
            self.singular()
        }
    }

    /// Column name used in conjoint output.
    pub fn conjoint_column(self) -> &'static str {
        match self {
            Self::Man => "Man",
            Self::Woman => "Woman",
            Self::PregnantWoman => "Pregnant",
            Self::Baby => "Stroller",
            Self::ElderlyMan => "OldMan",
            Self::ElderlyWoman => "OldWoman",
            Self::Boy => "Boy",
            Self::Girl => "Girl",
            Self::HomelessPerson => "Homeless",
            Self::LargeWoman => "LargeWoman",
            Self::LargeMan => "LargeMan",
            Self::Criminal => "Criminal",
            Self::MaleExecutive => "MaleExecutive",
            Self::FemaleExecutive => "FemaleExecutive",
            Self::FemaleAthlete => "FemaleAthlete",
            Self::MaleAthlete => "MaleAthlete",
            Self::FemaleDoctor => "FemaleDoctor",
            Self::MaleDoctor => "MaleDoctor",
            Self::Dog => "Dog",
            Self::Cat => "Cat",
        }
    }

    pub fn from_singular(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.singular() == name)
    }

    pub fn species(self) -> Species {
        match self {
            Self::Dog | Self::Cat => Species::Pet,
            _ => Species::Human,
        }
    }

    /// Social-value tag. Characters outside the social-value pairing pools are untagged.
    pub fn social_value(self) -> Option<SocialValueClass> {
        match self {
            Self::HomelessPerson | Self::Criminal => Some(SocialValueClass::Low),
            Self::Man | Self::Woman => Some(SocialValueClass::Neutral),
            Self::PregnantWoman
            | Self::MaleExecutive
            | Self::FemaleExecutive
            | Self::FemaleDoctor
            | Self::MaleDoctor => Some(SocialValueClass::High),
            _ => None,
        }
    }

    pub fn gender(self) -> Option<Gender> {
        match self {
            Self::Woman
            | Self::PregnantWoman
            | Self::ElderlyWoman
            | Self::Girl
            | Self::LargeWoman
            | Self::FemaleExecutive
            | Self::FemaleAthlete
            | Self::FemaleDoctor => Some(Gender::Female),
            Self::Man
            | Self::ElderlyMan
            | Self::Boy
            | Self::LargeMan
            | Self::MaleExecutive
            | Self::MaleAthlete
            | Self::MaleDoctor => Some(Gender::Male),
            Self::Baby | Self::HomelessPerson | Self::Criminal | Self::Dog | Self::Cat => None,
        }
    }
}

impl fmt::Display for CharacterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Count of each character type in one branch of a scenario.
///
/// Iteration, serialization and rendering always follow catalog order,
/// independent of the order in which characters were inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharacterMultiset {
    counts: [u32; CHARACTER_COUNT],
}

impl CharacterMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_characters<I>(characters: I) -> Self
    where
        I: IntoIterator<Item = CharacterType>,
    {
        let mut m = Self::new();
        for c in characters {
            m.insert(c);
        }
        m
    }

    pub fn insert(&mut self, character: CharacterType) {
        self.counts[character.catalog_index()] += 1;
    }

    pub fn set_count(&mut self, character: CharacterType, count: u32) {
        self.counts[character.catalog_index()] = count;
    }

    pub fn count(&self, character: CharacterType) -> u32 {
        self.counts[character.catalog_index()]
    }

    /// Sum of all counts, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.counts.iter().fold(0u32, |acc, &n| acc.saturating_add(n))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of distinct character types present.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Present characters with their counts, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (CharacterType, u32)> + '_ {
        CharacterType::ALL
            .iter()
            .copied()
            .zip(self.counts.iter().copied())
            .filter(|(_, n)| *n > 0)
    }
}

impl FromIterator<CharacterType> for CharacterMultiset {
    fn from_iter<T: IntoIterator<Item = CharacterType>>(iter: T) -> Self {
        Self::from_characters(iter)
    }
}

impl Validate for CharacterMultiset {
    fn validate(&self) -> Result<(), ContractViolation> {
        let total = self.total();
        if total == 0 || total > MAX_BRANCH_CHARACTERS {
            return Err(ContractViolation::InvalidRange {
                field: "character_multiset.total",
                min: 1.0,
                max: f64::from(MAX_BRANCH_CHARACTERS),
                got: f64::from(total),
            });
        }
        Ok(())
    }
}

impl Serialize for CharacterMultiset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.distinct()))?;
        for (character, count) in self.iter() {
            map.serialize_entry(character.singular(), &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CharacterMultiset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountDictVisitor;

        impl<'de> Visitor<'de> for CountDictVisitor {
            type Value = CharacterMultiset;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping from character name to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut m = CharacterMultiset::new();
                while let Some((name, count)) = access.next_entry::<String, u32>()? {
                    let character = CharacterType::from_singular(&name).ok_or_else(|| {
                        de::Error::custom(format!("unknown character type: {name}"))
                    })?;
                    let merged = m
                        .count(character)
                        .checked_add(count)
                        .filter(|n| *n <= MAX_BRANCH_CHARACTERS)
                        .ok_or_else(|| {
                            de::Error::custom(format!(
                                "count for {name} exceeds {MAX_BRANCH_CHARACTERS}"
                            ))
                        })?;
                    m.set_count(character, merged);
                }
                Ok(m)
            }
        }

        deserializer.deserialize_map(CountDictVisitor)
    }
}
