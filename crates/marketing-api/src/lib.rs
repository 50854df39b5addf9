//! HTTP surface for the marketing agents.

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod routes;
pub mod state;
