//! Core modules: persistence, auditing, configuration and shared primitives.
//!
//! Every engine component builds on these; none of them know about scenarios.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod report;
pub mod schemas;
pub mod store;
pub mod time;
