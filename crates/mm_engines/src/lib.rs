#![forbid(unsafe_code)]

pub mod classify;
pub mod conjoint;
pub mod context;
pub mod decision;
pub mod emitter;
pub mod render;
pub mod sampler;
pub mod stream;
