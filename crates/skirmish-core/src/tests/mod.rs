//! Crate-level scenario tests.
//!
//! - `determinism.rs`: the same source always produces the same combat
//! - `integration.rs`: end-to-end combats through the orchestrator
//! - `helpers.rs`: record factories and combat setup shared by unit tests

mod determinism;
pub(crate) mod helpers;
mod integration;
