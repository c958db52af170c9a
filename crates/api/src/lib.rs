//! HTTP API: leaderboard reads, manual recalculation and event membership.

pub mod app;
pub mod config;
pub mod middleware;
