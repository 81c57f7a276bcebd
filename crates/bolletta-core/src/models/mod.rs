//! Data models and configuration.

pub mod bill;
pub mod config;
