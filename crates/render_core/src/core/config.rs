//! # Unified Configuration
//!
//! Settings for the engine root, default camera parameters and the render
//! queue, grouped under [`ApplicationConfig`]. Raw angle values are
//! interpreted through [`EngineConfig::angle_unit`] and converted to
//! radians when handed to the scene.

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::math::{AngleUnit, Radian, Vec3};
use crate::render::render_queue::{RenderQueueGroupId, DEFAULT_PRIORITY};
use crate::scene::camera::ProjectionType;

/// # Engine Configuration
///
/// Core behavior: logging, backend selection and angle interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Name of the render system to create from the registry
    pub render_system: String,
    /// Unit raw angles are given in
    pub angle_unit: AngleUnit,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            render_system: crate::render::render_system::RecordingRenderSystem::NAME.to_string(),
            angle_unit: AngleUnit::Degrees,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Select a render system by registry name
    pub fn with_render_system(mut self, name: impl Into<String>) -> Self {
        self.render_system = name.into();
        self
    }

    /// Set the unit raw angles are read in
    pub const fn with_angle_unit(mut self, unit: AngleUnit) -> Self {
        self.angle_unit = unit;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Camera Defaults
///
/// Applied to every camera the scene manager creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view, in the engine's angle unit
    pub fov_y: f32,
    /// Near clip distance
    pub near_clip: f32,
    /// Far clip distance
    pub far_clip: f32,
    /// Width / height
    pub aspect_ratio: f32,
    /// Projection type
    pub projection: ProjectionType,
    /// Fixed yaw axis, `None` for free yaw around the local Y axis
    pub fixed_yaw_axis: Option<[f32; 3]>,
}

impl CameraConfig {
    /// Vertical field of view converted with `unit`
    pub fn fov_y_radians(&self, unit: AngleUnit) -> Radian {
        unit.to_radians(self.fov_y)
    }

    /// Fixed yaw axis as a vector
    pub fn fixed_yaw_axis_vec(&self) -> Option<Vec3> {
        self.fixed_yaw_axis.map(|[x, y, z]| Vec3::new(x, y, z))
    }

    /// Check clip distances and aspect ratio
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near_clip <= 0.0 {
            return Err(ConfigError::Invalid(format!("near_clip must be > 0, got {}", self.near_clip)));
        }
        if self.far_clip <= self.near_clip {
            return Err(ConfigError::Invalid(format!(
                "far_clip ({}) must be greater than near_clip ({})",
                self.far_clip, self.near_clip
            )));
        }
        if self.aspect_ratio <= 0.0 {
            return Err(ConfigError::Invalid(format!("aspect_ratio must be > 0, got {}", self.aspect_ratio)));
        }
        if self.fov_y <= 0.0 {
            return Err(ConfigError::Invalid(format!("fov_y must be > 0, got {}", self.fov_y)));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: 45.0,
            near_clip: 100.0,
            far_clip: 100_000.0,
            aspect_ratio: 1.333_333_3,
            projection: ProjectionType::Perspective,
            fixed_yaw_axis: Some([0.0, 1.0, 0.0]),
        }
    }
}

/// # Render Queue Defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderQueueConfig {
    /// Group used when a renderable does not name one
    pub default_group: RenderQueueGroupId,
    /// Priority used when a renderable does not name one
    pub default_priority: u16,
}

impl Default for RenderQueueConfig {
    fn default() -> Self {
        Self {
            default_group: RenderQueueGroupId::Main,
            default_priority: DEFAULT_PRIORITY,
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Camera defaults
    pub camera: CameraConfig,
    /// Render queue defaults
    pub render_queue: RenderQueueConfig,
}

impl ApplicationConfig {
    /// Create a configuration with defaults and the given render system
    pub fn new(render_system: impl Into<String>) -> Self {
        Self {
            engine: EngineConfig::new().with_render_system(render_system),
            ..Self::default()
        }
    }
}

impl Config for ApplicationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.render_system.is_empty() {
            return Err(ConfigError::Invalid("render_system cannot be empty".to_string()));
        }
        self.camera.validate()
    }
}
