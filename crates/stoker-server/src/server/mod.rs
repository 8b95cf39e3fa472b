//! Server internals: configuration, HTTP service, and telemetry.

pub mod config;
pub mod service;
pub mod telemetry;
