// src/exec/mod.rs

//! Run execution layer.
//!
//! [`backend`] provides the `PipelineBackend` trait and the concrete
//! `RealPipelineBackend` that the runtime uses in production, and which
//! tests can replace with a fake implementation.

pub mod backend;

pub use backend::{outcome_of, PipelineBackend, RealPipelineBackend};
