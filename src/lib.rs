//! Crossbuild assessor library main entry point.

pub mod analyze;
pub mod common;
pub mod db;
pub mod prioritize;
pub mod store;
