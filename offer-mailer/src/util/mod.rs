//! Utility modules.

pub mod headers;
