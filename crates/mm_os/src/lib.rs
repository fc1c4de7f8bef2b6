#![forbid(unsafe_code)]

pub mod conjoint_batch;
pub mod decision_maker;
pub mod scenario_run;
