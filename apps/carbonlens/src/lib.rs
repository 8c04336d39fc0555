//! # carbonlens
//!
//! Application layer over `carbonlens-core`: HTTP API, CLI, configuration,
//! the enhanced (service-assisted) engine and the activity log.

pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod store;
