//! # Core Engine Module
//!
//! Shared configuration types used by the engine root and the scene manager.

pub mod config;

pub use config::{
    ApplicationConfig,
    CameraConfig,
    EngineConfig,
    RenderQueueConfig,
};
pub use crate::config::{Config, ConfigError, ConfigFormat};
