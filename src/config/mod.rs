//! Configuration module
//!
//! Table defaults (page size, selection policy, export, logging) loaded
//! from TOML.

pub mod config;
