//! Infrastructure layer: document stores, run locks, the aggregation runner,
//! the daily scheduler and environment configuration.

pub mod aggregation;
pub mod config;
pub mod lifecycle;
pub mod lock;
pub mod scheduler;
pub mod store;
