//! Utility helpers: platform paths and tracing setup

pub mod app_paths;
pub mod logging;
