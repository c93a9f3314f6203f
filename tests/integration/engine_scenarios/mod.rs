//! Engine scenarios, organized by the part of the system they exercise.

pub mod common;
pub mod container_engine;
pub mod database;
pub mod load_balancer;
pub mod properties;
pub mod retry;
