//! Renderable abstraction
//!
//! Anything the render queue can sort and the render system can draw
//! implements [`Renderable`]. The queue itself never owns renderables: it
//! stores [`RenderableKey`]s and resolves them through a
//! [`RenderableSource`] when it needs to look at them again.

use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{Aabb, Mat4, Point3, Vec3};
use crate::scene::camera::{Camera, SceneDetailLevel};

new_key_type! {
    /// Handle to a renderable held by a scene or a standalone slot map
    pub struct RenderableKey;
}

/// Material identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// How a material's output is combined with the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneBlendType {
    /// Overwrite
    #[default]
    Replace,
    /// Blend using the source alpha
    TransparentAlpha,
    /// Blend using the source colour
    TransparentColour,
    /// Additive
    Add,
    /// Multiplicative
    Modulate,
}

/// Surface description relevant to sorting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Unique id, used as the opaque bucket key
    pub id: MaterialId,
    /// Material name
    pub name: String,
    /// Blending mode
    pub scene_blend: SceneBlendType,
}

impl Material {
    /// Create an opaque material
    pub fn new(id: MaterialId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            scene_blend: SceneBlendType::Replace,
        }
    }

    /// Set the blend mode
    pub const fn with_scene_blend(mut self, blend: SceneBlendType) -> Self {
        self.scene_blend = blend;
        self
    }

    /// Whether the material blends with what is already drawn
    pub const fn is_transparent(&self) -> bool {
        !matches!(self.scene_blend, SceneBlendType::Replace)
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationType {
    /// Individual points
    PointList,
    /// Pairs of vertices
    LineList,
    /// Connected line segments
    LineStrip,
    /// Triples of vertices
    #[default]
    TriangleList,
    /// Each vertex after the first two forms a triangle
    TriangleStrip,
    /// Triangles sharing the first vertex
    TriangleFan,
}

/// Geometry to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOperation {
    /// Primitive topology
    pub operation_type: OperationType,
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of indices, 0 for non-indexed geometry
    pub index_count: usize,
}

impl RenderOperation {
    /// Non-indexed triangle list
    pub const fn triangles(vertex_count: usize) -> Self {
        Self {
            operation_type: OperationType::TriangleList,
            vertex_count,
            index_count: 0,
        }
    }

    /// Indexed geometry
    pub const fn indexed(operation_type: OperationType, vertex_count: usize, index_count: usize) -> Self {
        Self { operation_type, vertex_count, index_count }
    }

    /// Number of primitives this operation draws
    pub const fn primitive_count(&self) -> usize {
        let count = if self.index_count > 0 { self.index_count } else { self.vertex_count };
        match self.operation_type {
            OperationType::PointList => count,
            OperationType::LineList => count / 2,
            OperationType::LineStrip => count.saturating_sub(1),
            OperationType::TriangleList => count / 3,
            OperationType::TriangleStrip | OperationType::TriangleFan => count.saturating_sub(2),
        }
    }
}

/// A drawable object
pub trait Renderable {
    /// Material used to draw this object
    fn material(&self) -> &Material;

    /// Geometry to draw
    fn render_operation(&self) -> RenderOperation;

    /// Append the world matrices of this object to `out`
    fn world_transforms(&self, out: &mut Vec<Mat4>);

    /// Number of matrices [`Self::world_transforms`] appends; > 1 for blended geometry
    fn num_world_transforms(&self) -> usize {
        1
    }

    /// Squared distance from the camera, used to sort transparent objects
    fn squared_view_depth(&self, camera: &Camera) -> f32;

    /// Bounding box in object space; `None` is never culled
    fn local_bounds(&self) -> Option<Aabb> {
        None
    }

    /// Draw with an identity projection (screen-space geometry)
    fn use_identity_projection(&self) -> bool {
        false
    }

    /// Draw with an identity view
    fn use_identity_view(&self) -> bool {
        false
    }

    /// Highest rasterisation detail for this object; the camera's level still caps it
    fn render_detail(&self) -> SceneDetailLevel {
        SceneDetailLevel::Solid
    }

    /// Receive the world transform of the node the object is attached to
    fn notify_world_transform(&mut self, _transform: &Mat4) {}
}

/// Resolve queue keys back to renderables
pub trait RenderableSource {
    /// Look up a renderable
    fn renderable(&self, key: RenderableKey) -> Option<&dyn Renderable>;
}

impl RenderableSource for SlotMap<RenderableKey, Box<dyn Renderable>> {
    fn renderable(&self, key: RenderableKey) -> Option<&dyn Renderable> {
        self.get(key).map(|boxed| -> &dyn Renderable { boxed.as_ref() })
    }
}

/// A renderable with a single world transform and a fixed bounding box
#[derive(Debug, Clone)]
pub struct SimpleRenderable {
    material: Arc<Material>,
    operation: RenderOperation,
    world_transform: Mat4,
    bounds: Aabb,
    detail: SceneDetailLevel,
}

impl SimpleRenderable {
    /// Create a renderable at the origin
    pub fn new(material: Arc<Material>, operation: RenderOperation, bounds: Aabb) -> Self {
        Self {
            material,
            operation,
            world_transform: Mat4::identity(),
            bounds,
            detail: SceneDetailLevel::Solid,
        }
    }

    /// Cap the rasterisation detail of this renderable
    pub fn with_render_detail(mut self, detail: SceneDetailLevel) -> Self {
        self.detail = detail;
        self
    }

    /// Place the renderable with a world transform
    pub fn with_world_transform(mut self, transform: Mat4) -> Self {
        self.world_transform = transform;
        self
    }

    /// Current world transform
    pub const fn world_transform(&self) -> &Mat4 {
        &self.world_transform
    }

    /// Shared material handle
    pub fn material_handle(&self) -> &Arc<Material> {
        &self.material
    }

    /// World-space center of the bounding box
    pub fn world_center(&self) -> Vec3 {
        self.world_transform.transform_point(&Point3::from(self.bounds.center())).coords
    }
}

impl Renderable for SimpleRenderable {
    fn material(&self) -> &Material {
        &self.material
    }

    fn render_operation(&self) -> RenderOperation {
        self.operation
    }

    fn world_transforms(&self, out: &mut Vec<Mat4>) {
        out.push(self.world_transform);
    }

    fn squared_view_depth(&self, camera: &Camera) -> f32 {
        (self.world_center() - camera.derived_position()).norm_squared()
    }

    fn local_bounds(&self) -> Option<Aabb> {
        Some(self.bounds)
    }

    fn render_detail(&self) -> SceneDetailLevel {
        self.detail
    }

    fn notify_world_transform(&mut self, transform: &Mat4) {
        self.world_transform = *transform;
    }
}
