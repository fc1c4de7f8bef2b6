#![forbid(unsafe_code)]

use mm_kernel_contracts::dimension::Dimension;
use mm_kernel_contracts::scenario::ScenarioRecord;
use mm_kernel_contracts::ContractViolation;
use rand::Rng;

use crate::context::{ScenarioContextBuilder, ScenarioFlags};
use crate::render::NarrativeRenderer;
use crate::sampler::{choose, DimensionSampler};
use crate::stream::{self, ScenarioRng};

/// Dimension and structural flags chosen for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScenarioPlan {
    pub dimension: Dimension,
    pub flags: ScenarioFlags,
}

/// Draws a [`ScenarioPlan`] per scenario from the configured dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlanner {
    dimensions: Vec<Dimension>,
}

impl ScenarioPlanner {
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, ContractViolation> {
        if dimensions.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "scenario_planner.dimensions",
                reason: "must not be empty",
            });
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Draw order: dimension, interventionism, in-car, law.
    pub fn next_plan<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioPlan {
        let dimension = choose(rng, &self.dimensions);
        let is_interventionism = choose(rng, &[true, false]);
        let is_in_car = choose(rng, &[true, false]);
        let is_law = choose(rng, &[true, false]);
        ScenarioPlan {
            dimension,
            flags: ScenarioFlags::new(is_in_car, is_interventionism, is_law),
        }
    }
}

/// Sampler, context builder and renderer run back to back on one stream.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEmitter {
    sampler: DimensionSampler,
    context_builder: ScenarioContextBuilder,
    renderer: NarrativeRenderer,
}

impl ScenarioEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        plan: ScenarioPlan,
    ) -> Result<ScenarioRecord, ContractViolation> {
        let sampled = self.sampler.sample(rng, plan.dimension);
        let (context, branches) = self.context_builder.build(rng, plan.flags, sampled)?;
        let rendered = self
            .renderer
            .render(&branches.branch_a, &branches.branch_b, &context);
        ScenarioRecord::v1(
            plan.dimension,
            context,
            branches.group_types,
            branches.branch_a,
            branches.branch_b,
            rendered.system_text,
            rendered.case_1_text,
            rendered.case_2_text,
        )
    }
}

/// Produces the scenario sequence of one seeded run, in order.
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    rng: ScenarioRng,
    planner: ScenarioPlanner,
    emitter: ScenarioEmitter,
    emitted: u64,
}

impl ScenarioGenerator {
    pub fn new(seed: u64, planner: ScenarioPlanner) -> Self {
        Self::with_rng(stream::seeded(seed), planner)
    }

    pub fn with_rng(rng: ScenarioRng, planner: ScenarioPlanner) -> Self {
        Self {
            rng,
            planner,
            emitter: ScenarioEmitter::new(),
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn next_record(&mut self) -> Result<ScenarioRecord, ContractViolation> {
        let plan = self.planner.next_plan(&mut self.rng);
        let record = self.emitter.emit(&mut self.rng, plan)?;
        self.emitted += 1;
        Ok(record)
    }

    /// Emits a record for an explicit plan, continuing the same stream.
    pub fn next_record_for(&mut self, plan: ScenarioPlan) -> Result<ScenarioRecord, ContractViolation> {
        let record = self.emitter.emit(&mut self.rng, plan)?;
        self.emitted += 1;
        Ok(record)
    }
}

impl Iterator for ScenarioGenerator {
    type Item = Result<ScenarioRecord, ContractViolation>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_record())
    }
}
