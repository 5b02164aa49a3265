//! # Render Core
//!
//! Scene graph, camera culling and render queue core of a frame-stepped
//! renderer.
//!
//! ## Features
//!
//! - **Node graph**: hierarchical transforms with lazily derived world state
//! - **Cameras**: perspective and orthographic projection, frustum culling, tracking
//! - **Render queue**: queue groups, priorities and material batching, transparents sorted back to front
//! - **Render targets**: viewports, listeners and frame statistics
//! - **Pluggable backends**: render systems selected by name from a registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut root = Root::new(ApplicationConfig::default(), &RenderSystemRegistry::with_defaults())?;
//!
//!     let scene = root.scene_manager_mut();
//!     let camera = scene.create_camera("main")?;
//!     let node = scene.nodes_mut().create_node("cube")?;
//!     scene.nodes_mut().set_position(node, Vec3::new(0.0, 0.0, -500.0))?;
//!     let material = Arc::new(Material::new(MaterialId(1), "cube"));
//!     let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(50.0, 50.0, 50.0));
//!     let cube = scene.add_object(Box::new(SimpleRenderable::new(material, RenderOperation::triangles(36), bounds)));
//!     scene.attach_object(cube, node)?;
//!
//!     root.create_render_target("window", 1280, 720)?
//!         .add_viewport(camera, 0, 0.0, 0.0, 1.0, 1.0)?;
//!     root.render_one_frame()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use engine::{EngineError, EngineResult, FrameEvent, FrameListener, FrameListenerId, Root};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        EngineError, FrameEvent, FrameListener, Root,
        core::config::ApplicationConfig,
        foundation::math::{Aabb, Degree, Mat4, Quat, Radian, Sphere, Vec3},
        render::{
            ClipSpace, Material, MaterialId, ProjectionMaker, RenderOperation, RenderQueueGroupId, RenderSystem,
            RenderSystemRegistry, RenderTarget, Renderable, SceneBlendType, SimpleRenderable, Viewport,
        },
        scene::{Camera, CameraId, NodeId, ProjectionType, SceneManager, TransformSpace},
    };
}
