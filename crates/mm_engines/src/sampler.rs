#![forbid(unsafe_code)]

use mm_kernel_contracts::character::{CharacterMultiset, CharacterType, MAX_BRANCH_CHARACTERS};
use mm_kernel_contracts::dimension::tables;
use mm_kernel_contracts::dimension::{Dimension, GroupType};
use rand::Rng;

/// Maximum number of pairs drawn for a paired dimension.
const MAX_PAIRS: usize = MAX_BRANCH_CHARACTERS as usize;

/// The two comparison groups drawn for one scenario, before any swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledBranches {
    pub branch_a: CharacterMultiset,
    pub branch_b: CharacterMultiset,
    /// Group-type labels for (branch A, branch B).
    pub group_types: [GroupType; 2],
}

impl SampledBranches {
    pub fn swapped(self) -> Self {
        let [ga, gb] = self.group_types;
        Self {
            branch_a: self.branch_b,
            branch_b: self.branch_a,
            group_types: [gb, ga],
        }
    }
}

/// Draws the two branches of a scenario under a dimension's pairing rule.
///
/// All draws are with replacement. The number and order of draws per
/// dimension is fixed, so a seeded stream yields the same branches on every
/// run.
#[derive(Debug, Clone)]
pub struct DimensionSampler {
    species_pairs: Vec<(CharacterType, CharacterType)>,
    social_value_pairs: Vec<(CharacterType, CharacterType)>,
}

impl Default for DimensionSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl DimensionSampler {
    pub fn new() -> Self {
        Self {
            species_pairs: tables::species_pairs(),
            social_value_pairs: tables::social_value_pairs(),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, dimension: Dimension) -> SampledBranches {
        let (branch_a, branch_b) = match dimension {
            Dimension::Species => draw_pairs(rng, &self.species_pairs),
            Dimension::SocialValue => draw_pairs(rng, &self.social_value_pairs),
            Dimension::Gender => {
                let n = draw_count(rng, MAX_PAIRS);
                let mut a = CharacterMultiset::new();
                let mut b = CharacterMultiset::new();
                for _ in 0..n {
                    let i = rng.gen_range(0..tables::FEMALE.len());
                    a.insert(tables::FEMALE[i]);
                    b.insert(tables::MALE[i]);
                }
                (a, b)
            }
            Dimension::Age => draw_pairs(rng, &tables::AGE_PAIRS),
            Dimension::Fitness => draw_pairs(rng, &tables::FITNESS_PAIRS),
            Dimension::Utilitarianism => {
                let n = draw_count(rng, MAX_PAIRS - 1);
                let mut a = CharacterMultiset::new();
                for _ in 0..n {
                    a.insert(choose(rng, &CharacterType::ALL));
                }
                let mut b = a;
                let extra = draw_count(rng, MAX_PAIRS - n);
                for _ in 0..extra {
                    b.insert(choose(rng, &CharacterType::ALL));
                }
                (a, b)
            }
            Dimension::Random => {
                let a = draw_independent(rng);
                let b = draw_independent(rng);
                (a, b)
            }
        };

        assert!(
            (1..=MAX_BRANCH_CHARACTERS).contains(&branch_a.total())
                && (1..=MAX_BRANCH_CHARACTERS).contains(&branch_b.total()),
            "sampler produced an out-of-range branch for {dimension}"
        );

        SampledBranches {
            branch_a,
            branch_b,
            group_types: dimension.group_types(),
        }
    }
}

/// Uniform draw from `1..=max`.
fn draw_count<R: Rng + ?Sized>(rng: &mut R, max: usize) -> usize {
    rng.gen_range(1..=max)
}

pub(crate) fn choose<R: Rng + ?Sized, T: Copy>(rng: &mut R, pool: &[T]) -> T {
    assert!(!pool.is_empty(), "sampling pool must not be empty");
    pool[rng.gen_range(0..pool.len())]
}

fn draw_pairs<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[(CharacterType, CharacterType)],
) -> (CharacterMultiset, CharacterMultiset) {
    let n = draw_count(rng, MAX_PAIRS);
    let mut a = CharacterMultiset::new();
    let mut b = CharacterMultiset::new();
    for _ in 0..n {
        let (left, right) = choose(rng, pool);
        a.insert(left);
        b.insert(right);
    }
    (a, b)
}

fn draw_independent<R: Rng + ?Sized>(rng: &mut R) -> CharacterMultiset {
    let n = draw_count(rng, MAX_PAIRS);
    let mut m = CharacterMultiset::new();
    for _ in 0..n {
        m.insert(choose(rng, &CharacterType::ALL));
    }
    m
}
