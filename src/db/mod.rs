//! Annotation store construction and introspection tools.

pub mod check;
pub mod create;
