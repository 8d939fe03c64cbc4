//! Integration test module
//!
//! Spawns the gateway on a loopback port and drives it over HTTP.

pub mod common;
pub mod pipeline_tests;
