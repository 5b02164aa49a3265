//! Scene management
//!
//! ## Architecture
//!
//! ```text
//! NodeGraph (transforms, top-down)
//!      ↓
//! Camera (view + frustum, lazily cached)
//!      ↓
//! SceneManager (culling → RenderQueue → RenderSystem)
//! ```
//!
//! The scene manager owns nodes, cameras and scene objects, and drives the
//! per-frame flow: update transforms, sync cameras to their nodes, cull
//! objects into the render queue, sort transparents and hand the queue to
//! the render system.

pub mod camera;
pub mod node;
pub mod scene_manager;

#[cfg(test)]
mod tests;

pub use camera::{Camera, CameraId, FrustumPlane, ProjectionType, SceneDetailLevel, Visibility};
pub use node::{NodeGraph, NodeId, TransformNode, TransformSpace};
pub use scene_manager::{SceneManager, SceneObject, SceneRenderer};

use crate::render::renderable::RenderableKey;

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Node handle does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Camera handle does not refer to a live camera
    #[error("Camera not found: {0:?}")]
    CameraNotFound(CameraId),

    /// Object handle does not refer to a live scene object
    #[error("Scene object not found: {0:?}")]
    ObjectNotFound(RenderableKey),

    /// Name already used by another node or camera
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Reparenting would make a node its own ancestor
    #[error("Cannot make {child:?} a child of {parent:?}: it is an ancestor")]
    HierarchyCycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },

    /// Node is not a child of the given parent
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Node that was not its child
        child: NodeId,
    },

    /// Camera parameter out of range
    #[error("Invalid camera parameter: {0}")]
    InvalidCameraParameter(String),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
