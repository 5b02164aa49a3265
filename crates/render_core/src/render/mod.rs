//! # Rendering Core
//!
//! Everything between a culled scene and the backend:
//!
//! - [`renderable`]: the capability trait drawable objects implement
//! - [`render_queue`]: group / priority / material sorting of one frame's renderables
//! - [`render_system`]: the backend facade consuming the sorted queue, plus the backend registry
//! - [`render_target`]: surfaces, viewports, listeners and frame statistics

pub mod render_queue;
pub mod render_system;
pub mod render_target;
pub mod renderable;

pub use render_queue::{RenderPriorityGroup, RenderQueue, RenderQueueGroup, RenderQueueGroupId, DEFAULT_PRIORITY};
pub use render_system::{
    ClipSpace, ProjectionMaker, RecordingRenderSystem, RenderCommand, RenderSystem, RenderSystemRegistry,
    SharedProjectionMaker,
};
pub use render_target::{
    FrameStats, ListenerId, RenderTarget, RenderTargetListener, StatFlags, Viewport, ViewportRenderer,
};
pub use renderable::{
    Material, MaterialId, OperationType, RenderOperation, Renderable, RenderableKey, RenderableSource,
    SceneBlendType, SimpleRenderable,
};

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// No backend registered under the requested name
    ///
    /// Carries the requested name and the names that are registered.
    #[error("Unknown render system '{name}', available: {available:?}")]
    UnknownRenderSystem {
        /// Requested name
        name: String,
        /// Registered names
        available: Vec<String>,
    },

    /// No render target with this name
    #[error("Render target not found: {0}")]
    TargetNotFound(String),

    /// A render target with this name already exists
    #[error("Render target already exists: {0}")]
    DuplicateTarget(String),

    /// Two viewports on one target cannot share a z-order
    #[error("Viewport with z-order {0} already exists")]
    DuplicateViewport(i32),

    /// No viewport with this z-order
    #[error("Viewport with z-order {0} not found")]
    ViewportNotFound(i32),

    /// Relative viewport rectangle must lie within 0..1
    #[error("Invalid viewport rectangle: {0}")]
    InvalidViewport(String),

    /// Scene data referenced by a viewport is missing
    #[error("Scene error: {0}")]
    Scene(#[from] crate::scene::SceneError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
