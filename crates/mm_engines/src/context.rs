#![forbid(unsafe_code)]

use mm_kernel_contracts::scenario::{ScenarioContext, TrafficSignal};
use mm_kernel_contracts::ContractViolation;
use rand::Rng;

use crate::sampler::SampledBranches;

/// The three structural booleans of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScenarioFlags {
    pub is_in_car: bool,
    pub is_interventionism: bool,
    pub is_law: bool,
}

impl ScenarioFlags {
    pub fn new(is_in_car: bool, is_interventionism: bool, is_law: bool) -> Self {
        Self {
            is_in_car,
            is_interventionism,
            is_law,
        }
    }
}

/// Decides signals and the in-car swap for a sampled scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioContextBuilder;

impl ScenarioContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Draw order: the signal permutation (only when `is_law`), then, for the
    /// in-car framing only, the swap coin. The swap coin is drawn whether or
    /// not `is_law` is set.
    pub fn build<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        flags: ScenarioFlags,
        branches: SampledBranches,
    ) -> Result<(ScenarioContext, SampledBranches), ContractViolation> {
        let na = TrafficSignal::NotApplicable;
        if flags.is_in_car {
            let pattern = if flags.is_law {
                let [_, pedestrians] = draw_signal_permutation(rng);
                [na, pedestrians]
            } else {
                [na, na]
            };
            // Which side the barrier outcome falls on is randomized; the
            // signals stay positional (occupants first).
            let branches = if rng.gen::<f64>() < 0.5 {
                branches.swapped()
            } else {
                branches
            };
            let context = ScenarioContext::v1(
                true,
                flags.is_interventionism,
                flags.is_law,
                pattern,
            )?;
            Ok((context, branches))
        } else {
            let pattern = if flags.is_law {
                draw_signal_permutation(rng)
            } else {
                [na, na]
            };
            let context = ScenarioContext::v1(
                false,
                flags.is_interventionism,
                flags.is_law,
                pattern,
            )?;
            Ok((context, branches))
        }
    }
}

fn draw_signal_permutation<R: Rng + ?Sized>(rng: &mut R) -> [TrafficSignal; 2] {
    if rng.gen_bool(0.5) {
        [TrafficSignal::Green, TrafficSignal::Red]
    } else {
        [TrafficSignal::Red, TrafficSignal::Green]
    }
}
