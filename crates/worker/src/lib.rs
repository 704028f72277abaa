//! Worker process: activity adapters, workflow definitions, and cron jobs
//! for the hosting control plane's durable runtime.

pub mod activities;
pub mod config;
pub mod cron;
pub mod workflows;
