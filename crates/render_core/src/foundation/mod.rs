//! Foundation module - Core utilities and types
//!
//! - Math types and bounding volumes
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
