#![forbid(unsafe_code)]

pub mod cli;
pub mod tracing_init;
