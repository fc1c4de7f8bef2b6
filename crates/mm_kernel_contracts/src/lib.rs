#![forbid(unsafe_code)]

pub mod character;
pub mod common;
pub mod conjoint;
pub mod dimension;
pub mod scenario;

pub use common::{ContractViolation, Validate};
