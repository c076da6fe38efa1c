//! Core library for the Recruit Flow outreach service: sequence compilation,
//! enrollment lifecycle management, and the HTTP surface the dashboard talks
//! to.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
