//! Render system facade
//!
//! [`RenderSystem`] is the boundary between the scene core and a graphics
//! backend: the scene manager walks the sorted render queue and issues state
//! changes and draw calls through it. Backends are chosen by name from a
//! [`RenderSystemRegistry`] populated with explicit factory functions.
//!
//! [`RecordingRenderSystem`] is a headless backend that records every call,
//! used by tests and by tools that only need the draw order.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::foundation::math::{Mat4, Radian};
use crate::render::render_target::Viewport;
use crate::render::renderable::{Material, MaterialId, RenderOperation};
use crate::render::{RenderError, RenderResult};
use crate::scene::camera::SceneDetailLevel;

/// Depth range convention of a backend's clip space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipSpace {
    /// Depth maps to -1..1 (OpenGL)
    #[default]
    NegativeOneToOne,
    /// Depth maps to 0..1 (Vulkan, Direct3D)
    ZeroToOne,
}

impl ClipSpace {
    /// Right-handed perspective projection looking down -Z
    pub fn perspective(self, fov_y: Radian, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y.value() * 0.5).tan();
        let range = near - far;

        let mut m = Mat4::zeros();
        m[(0, 0)] = f / aspect;
        m[(1, 1)] = f;
        m[(3, 2)] = -1.0;
        match self {
            Self::NegativeOneToOne => {
                m[(2, 2)] = (far + near) / range;
                m[(2, 3)] = 2.0 * far * near / range;
            }
            Self::ZeroToOne => {
                m[(2, 2)] = far / range;
                m[(2, 3)] = far * near / range;
            }
        }
        m
    }
}

/// Builds perspective matrices for cameras
///
/// Cameras hold one of these instead of a concrete depth convention so a
/// backend can hand out its own projection rules.
pub trait ProjectionMaker: fmt::Debug + Send + Sync {
    /// Perspective matrix for the given vertical field of view and clip planes
    fn make_projection_matrix(&self, fov_y: Radian, aspect: f32, near: f32, far: f32) -> Mat4;
}

impl ProjectionMaker for ClipSpace {
    fn make_projection_matrix(&self, fov_y: Radian, aspect: f32, near: f32, far: f32) -> Mat4 {
        self.perspective(fov_y, aspect, near, far)
    }
}

/// Shared handle to a projection maker
pub type SharedProjectionMaker = Arc<dyn ProjectionMaker>;

/// Backend interface consumed by the scene manager
pub trait RenderSystem {
    /// Registry name of this backend
    fn name(&self) -> &str;

    /// Clip-space convention for projection matrices
    fn clip_space(&self) -> ClipSpace;

    /// Projection rules handed to cameras created for this backend
    fn projection_maker(&self) -> SharedProjectionMaker {
        Arc::new(self.clip_space())
    }

    /// Start rendering a viewport
    fn begin_frame(&mut self);

    /// Finish rendering a viewport
    fn end_frame(&mut self);

    /// Bind the output rectangle
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Set the world to view transform
    fn set_view_matrix(&mut self, view: &Mat4);

    /// Set the view to clip transform
    fn set_projection_matrix(&mut self, projection: &Mat4);

    /// Set the world matrices for the next draw
    fn set_world_matrices(&mut self, matrices: &[Mat4]);

    /// Bind a material
    fn set_material(&mut self, material: &Material);

    /// Choose points, wireframe or solid rasterisation
    fn set_rasterisation_mode(&mut self, level: SceneDetailLevel);

    /// Draw geometry
    fn render(&mut self, operation: &RenderOperation);

    /// Reset the face and vertex counters
    fn begin_geometry_count(&mut self);

    /// Faces drawn since the last [`Self::begin_geometry_count`]
    fn face_count(&self) -> usize;

    /// Vertices drawn since the last [`Self::begin_geometry_count`]
    fn vertex_count(&self) -> usize;

    /// Downcast to the concrete backend
    fn as_any(&self) -> &dyn Any;
}

/// A call recorded by [`RecordingRenderSystem`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// `begin_frame`
    BeginFrame,
    /// `end_frame`
    EndFrame,
    /// `set_viewport`
    SetViewport {
        /// Viewport z-order
        z_order: i32,
        /// Pixel rectangle `(left, top, width, height)`
        rect: (i32, i32, i32, i32),
    },
    /// `set_view_matrix`
    SetViewMatrix(Mat4),
    /// `set_projection_matrix`
    SetProjectionMatrix(Mat4),
    /// `set_world_matrices`
    SetWorldMatrices(Vec<Mat4>),
    /// `set_material`
    SetMaterial(MaterialId),
    /// `set_rasterisation_mode`
    SetRasterisationMode(SceneDetailLevel),
    /// `render`
    Render(RenderOperation),
}

/// Headless backend recording every call
#[derive(Debug, Default)]
pub struct RecordingRenderSystem {
    clip_space: ClipSpace,
    projection_maker: Option<SharedProjectionMaker>,
    commands: Vec<RenderCommand>,
    faces: usize,
    vertices: usize,
}

impl RecordingRenderSystem {
    /// Registry name
    pub const NAME: &'static str = "recording";

    /// Create a recorder using OpenGL-style clip space
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different clip-space convention
    pub const fn with_clip_space(mut self, clip_space: ClipSpace) -> Self {
        self.clip_space = clip_space;
        self
    }

    /// Hand cameras a custom projection instead of the clip-space default
    pub fn with_projection_maker(mut self, projection_maker: SharedProjectionMaker) -> Self {
        self.projection_maker = Some(projection_maker);
        self
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Drain the recorded commands
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Materials bound, in order
    pub fn material_sequence(&self) -> Vec<MaterialId> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RenderCommand::SetMaterial(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl RenderSystem for RecordingRenderSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn clip_space(&self) -> ClipSpace {
        self.clip_space
    }

    fn projection_maker(&self) -> SharedProjectionMaker {
        match &self.projection_maker {
            Some(maker) => Arc::clone(maker),
            None => Arc::new(self.clip_space),
        }
    }

    fn begin_frame(&mut self) {
        self.commands.push(RenderCommand::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.commands.push(RenderCommand::EndFrame);
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(RenderCommand::SetViewport {
            z_order: viewport.z_order(),
            rect: viewport.actual_rect(),
        });
    }

    fn set_view_matrix(&mut self, view: &Mat4) {
        self.commands.push(RenderCommand::SetViewMatrix(*view));
    }

    fn set_projection_matrix(&mut self, projection: &Mat4) {
        self.commands.push(RenderCommand::SetProjectionMatrix(*projection));
    }

    fn set_world_matrices(&mut self, matrices: &[Mat4]) {
        self.commands.push(RenderCommand::SetWorldMatrices(matrices.to_vec()));
    }

    fn set_material(&mut self, material: &Material) {
        self.commands.push(RenderCommand::SetMaterial(material.id));
    }

    fn set_rasterisation_mode(&mut self, level: SceneDetailLevel) {
        self.commands.push(RenderCommand::SetRasterisationMode(level));
    }

    fn render(&mut self, operation: &RenderOperation) {
        self.faces += operation.primitive_count();
        self.vertices += operation.vertex_count;
        self.commands.push(RenderCommand::Render(*operation));
    }

    fn begin_geometry_count(&mut self) {
        self.faces = 0;
        self.vertices = 0;
    }

    fn face_count(&self) -> usize {
        self.faces
    }

    fn vertex_count(&self) -> usize {
        self.vertices
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type RenderSystemFactory = Box<dyn Fn() -> Box<dyn RenderSystem>>;

/// Backends available by name
#[derive(Default)]
pub struct RenderSystemRegistry {
    factories: BTreeMap<String, RenderSystemFactory>,
}

impl std::fmt::Debug for RenderSystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSystemRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RenderSystemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RecordingRenderSystem::NAME, || Box::new(RecordingRenderSystem::new()));
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn RenderSystem> + 'static,
    {
        let name = name.into();
        log::debug!("Registering render system '{}'", name);
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            log::warn!("Render system '{}' was already registered and has been replaced", name);
        }
    }

    /// Instantiate a backend by name
    pub fn create(&self, name: &str) -> RenderResult<Box<dyn RenderSystem>> {
        let factory = self.factories.get(name).ok_or_else(|| RenderError::UnknownRenderSystem {
            name: name.to_string(),
            available: self.factories.keys().cloned().collect(),
        })?;
        log::info!("Creating render system '{}'", name);
        Ok(factory())
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
