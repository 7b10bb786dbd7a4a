//! Infrastructure layer: job registry and runner, port adapters.
//!
//! - `jobs`: job store, runner and reaper
//! - `adapters`: in-memory ports, logging remover, seed data

pub mod adapters;
pub mod jobs;

mod integration_tests;
