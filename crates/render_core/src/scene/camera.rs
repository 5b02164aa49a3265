//! # Camera
//!
//! A viewpoint with a pose, projection parameters and six frustum planes.
//!
//! ## Caching
//! Two caches are kept independently:
//! - the **frustum cache**: projection matrix and the per-plane coefficient
//!   pairs, rebuilt after any fov / aspect / near / far / projection change;
//! - the **view cache**: derived pose, view matrix and the six world-space
//!   planes, rebuilt after any pose change (own or parent's) and after any
//!   frustum change, since the planes depend on both.
//!
//! Both live in `Cell`s so read accessors can refresh them lazily through
//! `&self`.
//!
//! ## Conventions
//! The camera looks down its local -Z axis with +Y up. Frustum planes face
//! inwards: a point is inside when its distance to every plane is >= 0.

use std::cell::Cell;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::foundation::math::{
    constants::PI, quat_from_angle_axis, quat_from_axes, Aabb, Mat3, Mat4, Plane, PlaneSide, Quat, Radian,
    Sphere, Vec3,
};
use crate::render::render_system::{ClipSpace, SharedProjectionMaker};
use crate::scene::node::NodeId;
use crate::scene::{SceneError, SceneResult};

new_key_type! {
    /// Handle to a camera owned by the scene manager
    pub struct CameraId;
}

/// Projection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionType {
    /// Perspective projection
    #[default]
    Perspective,
    /// Orthographic projection with extents derived from the field of view
    Orthographic,
}

/// How geometry seen by this camera is rasterised
///
/// Levels are ordered from least to most detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SceneDetailLevel {
    /// Vertices only
    Points,
    /// Edges only
    Wireframe,
    /// Filled polygons
    #[default]
    Solid,
}

/// The six frustum planes, in the order visibility tests check them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumPlane {
    /// Near clip plane
    Near = 0,
    /// Far clip plane
    Far = 1,
    /// Left side
    Left = 2,
    /// Right side
    Right = 3,
    /// Top side
    Top = 4,
    /// Bottom side
    Bottom = 5,
}

impl FrustumPlane {
    /// All planes in test order
    pub const ALL: [Self; 6] = [Self::Near, Self::Far, Self::Left, Self::Right, Self::Top, Self::Bottom];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Result of a visibility test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Inside or intersecting the frustum
    Visible,
    /// Entirely outside the given plane
    Culled(FrustumPlane),
}

impl Visibility {
    /// Whether the shape is visible
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }

    /// Plane that culled the shape, if any
    pub const fn culled_by(self) -> Option<FrustumPlane> {
        match self {
            Self::Visible => None,
            Self::Culled(plane) => Some(plane),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FrustumCache {
    projection: Mat4,
    coeff_left: [f32; 2],
    coeff_right: [f32; 2],
    coeff_bottom: [f32; 2],
    coeff_top: [f32; 2],
}

#[derive(Debug, Clone, Copy)]
struct ViewCache {
    position: Vec3,
    orientation: Quat,
    view: Mat4,
    planes: [Plane; 6],
}

/// A scene camera
#[derive(Debug)]
pub struct Camera {
    name: String,
    position: Vec3,
    orientation: Quat,
    fov_y: Radian,
    near: f32,
    far: f32,
    aspect: f32,
    projection_type: ProjectionType,
    detail_level: SceneDetailLevel,
    yaw_fixed: bool,
    yaw_fixed_axis: Vec3,
    auto_track: Option<(NodeId, Vec3)>,
    parent_node: Option<NodeId>,
    parent_pose: Option<(Vec3, Quat)>,
    lod_bias: f32,
    lod_bias_inv: f32,
    rendered_faces: usize,
    projection_maker: SharedProjectionMaker,

    frustum: Cell<Option<FrustumCache>>,
    view: Cell<Option<ViewCache>>,
}

impl Camera {
    /// Create a camera at the origin looking down -Z
    ///
    /// Defaults: 45 degree vertical fov, near 100, far 100000, aspect 1.33,
    /// perspective, yaw fixed to +Y.
    pub fn new(name: impl Into<String>, clip_space: ClipSpace) -> Self {
        Self::with_projection_maker(name, Arc::new(clip_space))
    }

    /// Create a camera whose perspective matrix comes from `projection_maker`
    pub fn with_projection_maker(name: impl Into<String>, projection_maker: SharedProjectionMaker) -> Self {
        Self {
            name: name.into(),
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            fov_y: Radian(PI / 4.0),
            near: 100.0,
            far: 100_000.0,
            aspect: 1.333_333_3,
            projection_type: ProjectionType::Perspective,
            detail_level: SceneDetailLevel::Solid,
            yaw_fixed: true,
            yaw_fixed_axis: Vec3::y(),
            auto_track: None,
            parent_node: None,
            parent_pose: None,
            lod_bias: 1.0,
            lod_bias_inv: 1.0,
            rendered_faces: 0,
            projection_maker,
            frustum: Cell::new(None),
            view: Cell::new(None),
        }
    }

    /// Camera name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn invalidate_view(&self) {
        self.view.set(None);
    }

    fn invalidate_frustum(&self) {
        self.frustum.set(None);
        self.view.set(None);
    }

    /// Whether the view cache needs rebuilding
    pub fn is_view_dirty(&self) -> bool {
        self.view.get().is_none()
    }

    /// Whether the frustum cache needs rebuilding
    pub fn is_frustum_dirty(&self) -> bool {
        self.frustum.get().is_none()
    }

    /// Position relative to the parent node (or world, when unattached)
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Set the position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate_view();
    }

    /// Move by `delta` in parent space
    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        self.invalidate_view();
    }

    /// Move by `delta` along the camera's own axes
    pub fn move_relative(&mut self, delta: Vec3) {
        self.position += self.orientation * delta;
        self.invalidate_view();
    }

    /// Orientation relative to the parent node
    pub const fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Set the orientation
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
        self.invalidate_view();
    }

    /// Point the camera along `direction`, given in world space
    ///
    /// A zero vector is ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if direction == Vec3::zeros() {
            log::trace!("Camera '{}': ignoring zero direction", self.name);
            return;
        }

        // Camera looks down -Z, so local Z points away from the direction
        let z_adjust = -direction.normalize();
        let x_axis = self.yaw_fixed_axis.cross(&z_adjust);

        let world_orientation = if self.yaw_fixed && x_axis.norm_squared() > f32::EPSILON {
            let x_axis = x_axis.normalize();
            let y_axis = z_adjust.cross(&x_axis).normalize();
            quat_from_axes(&x_axis, &y_axis, &z_adjust)
        } else {
            let derived = self.derived_orientation();
            let current_z = derived * Vec3::z();
            let rotation = if approx::relative_eq!(-z_adjust, current_z, epsilon = 1e-6) {
                // 180 degree turn: yaw around the current up axis
                quat_from_angle_axis(Radian(PI), &(derived * Vec3::y()))
            } else {
                Quat::rotation_between(&current_z, &z_adjust)
                    .unwrap_or_else(|| quat_from_angle_axis(Radian(PI), &(derived * Vec3::y())))
            };
            rotation * derived
        };

        // Store relative to the parent
        self.orientation = match self.parent_pose {
            Some((_, parent_orientation)) => parent_orientation.inverse() * world_orientation,
            None => world_orientation,
        };
        self.invalidate_view();
    }

    /// Point the camera at a world-space target
    pub fn look_at(&mut self, target: Vec3) {
        let direction = target - self.derived_position();
        self.set_direction(direction);
    }

    /// Rotate around the yaw axis: the fixed axis if enabled, else local Y
    pub fn yaw(&mut self, angle: Radian) {
        let axis = if self.yaw_fixed {
            self.yaw_fixed_axis
        } else {
            self.orientation * Vec3::y()
        };
        self.rotate_axis(&axis, angle);
    }

    /// Rotate around the local X axis
    pub fn pitch(&mut self, angle: Radian) {
        let axis = self.orientation * Vec3::x();
        self.rotate_axis(&axis, angle);
    }

    /// Rotate around the local Z axis
    pub fn roll(&mut self, angle: Radian) {
        let axis = self.orientation * Vec3::z();
        self.rotate_axis(&axis, angle);
    }

    /// Rotate around an arbitrary axis
    pub fn rotate_axis(&mut self, axis: &Vec3, angle: Radian) {
        self.rotate(quat_from_angle_axis(angle, axis));
    }

    /// Apply `rotation` after the current orientation
    pub fn rotate(&mut self, rotation: Quat) {
        self.orientation = rotation * self.orientation;
        self.invalidate_view();
    }

    /// Enable or disable yawing around a fixed axis
    pub fn set_fixed_yaw_axis(&mut self, enabled: bool, axis: Vec3) {
        self.yaw_fixed = enabled;
        self.yaw_fixed_axis = axis;
    }

    /// Fixed yaw axis, if enabled
    pub fn fixed_yaw_axis(&self) -> Option<Vec3> {
        self.yaw_fixed.then_some(self.yaw_fixed_axis)
    }

    /// Direction the camera faces, relative to its parent
    pub fn direction(&self) -> Vec3 {
        self.orientation * -Vec3::z()
    }

    /// Up vector, relative to its parent
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::y()
    }

    /// Right vector, relative to its parent
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::x()
    }

    /// Node the camera is attached to
    pub const fn parent_node(&self) -> Option<NodeId> {
        self.parent_node
    }

    /// Attach to (or detach from) a node; the pose arrives via [`Self::sync_parent`]
    pub fn set_parent_node(&mut self, node: Option<NodeId>) {
        self.parent_node = node;
        if node.is_none() {
            self.parent_pose = None;
        }
        self.invalidate_view();
    }

    /// Feed the parent's derived pose; the view is only invalidated if it moved
    pub fn sync_parent(&mut self, position: Vec3, orientation: Quat) {
        if self.parent_pose != Some((position, orientation)) {
            self.parent_pose = Some((position, orientation));
            self.invalidate_view();
        }
    }

    /// Track a node, looking at its derived position plus `offset`; `None` disables tracking
    pub fn set_auto_tracking(&mut self, target: Option<(NodeId, Vec3)>) {
        self.auto_track = target;
    }

    /// Current auto-track target and offset
    pub const fn auto_tracking(&self) -> Option<(NodeId, Vec3)> {
        self.auto_track
    }

    /// Re-aim at the tracked target, given its derived position
    pub fn auto_track(&mut self, target_position: Vec3) {
        if let Some((_, offset)) = self.auto_track {
            self.look_at(target_position + offset);
        }
    }

    /// Vertical field of view
    pub const fn fov_y(&self) -> Radian {
        self.fov_y
    }

    /// Set the vertical field of view
    pub fn set_fov_y(&mut self, fov: Radian) {
        self.fov_y = fov;
        self.invalidate_frustum();
    }

    /// Near clip distance
    pub const fn near_clip_distance(&self) -> f32 {
        self.near
    }

    /// Set the near clip distance; must be positive
    pub fn set_near_clip_distance(&mut self, near: f32) -> SceneResult<()> {
        if near <= 0.0 {
            return Err(SceneError::InvalidCameraParameter(format!(
                "near clip distance must be greater than zero, got {near}"
            )));
        }
        self.near = near;
        self.invalidate_frustum();
        Ok(())
    }

    /// Far clip distance
    pub const fn far_clip_distance(&self) -> f32 {
        self.far
    }

    /// Set the far clip distance
    pub fn set_far_clip_distance(&mut self, far: f32) {
        self.far = far;
        self.invalidate_frustum();
    }

    /// Width / height of the view
    pub const fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Set width / height
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.invalidate_frustum();
    }

    /// Projection type
    pub const fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    /// Switch projection type
    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.invalidate_frustum();
    }

    /// Source of the perspective matrix
    pub fn projection_maker(&self) -> &SharedProjectionMaker {
        &self.projection_maker
    }

    /// Replace the source of the perspective matrix
    pub fn set_projection_maker(&mut self, projection_maker: SharedProjectionMaker) {
        self.projection_maker = projection_maker;
        self.invalidate_frustum();
    }

    /// Rasterisation detail
    pub const fn detail_level(&self) -> SceneDetailLevel {
        self.detail_level
    }

    /// Set rasterisation detail
    pub fn set_detail_level(&mut self, level: SceneDetailLevel) {
        self.detail_level = level;
    }

    /// Level-of-detail bias; > 1 favours higher detail
    pub const fn lod_bias(&self) -> f32 {
        self.lod_bias
    }

    /// `1 / lod_bias`
    pub const fn lod_bias_inverse(&self) -> f32 {
        self.lod_bias_inv
    }

    /// Set the level-of-detail bias; must be positive
    pub fn set_lod_bias(&mut self, factor: f32) -> SceneResult<()> {
        if factor <= 0.0 {
            return Err(SceneError::InvalidCameraParameter(format!("LOD bias must be > 0, got {factor}")));
        }
        self.lod_bias = factor;
        self.lod_bias_inv = 1.0 / factor;
        Ok(())
    }

    /// Faces rendered through this camera last frame
    pub const fn rendered_faces(&self) -> usize {
        self.rendered_faces
    }

    /// Record the faces rendered this frame
    pub fn notify_rendered_faces(&mut self, faces: usize) {
        self.rendered_faces = faces;
    }

    fn update_frustum(&self) -> FrustumCache {
        if let Some(cache) = self.frustum.get() {
            return cache;
        }

        let theta_y = self.fov_y.value() * 0.5;
        let (projection, vp_top, vp_right) = match self.projection_type {
            ProjectionType::Perspective => {
                let tan_y = theta_y.tan();
                let tan_x = tan_y * self.aspect;
                let projection =
                    self.projection_maker.make_projection_matrix(self.fov_y, self.aspect, self.near, self.far);
                (projection, tan_y * self.near, tan_x * self.near)
            }
            ProjectionType::Orthographic => {
                let sin_y = theta_y.sin();
                let sin_x = (theta_y * self.aspect).sin();
                let w = 1.0 / (sin_x * self.near);
                let h = 1.0 / (sin_y * self.near);
                let q = 1.0 / (self.far - self.near);
                let mut projection = Mat4::zeros();
                projection[(0, 0)] = w;
                projection[(1, 1)] = h;
                projection[(2, 2)] = -q;
                projection[(3, 3)] = 1.0;
                (projection, sin_y * self.near, sin_x * self.near)
            }
        };

        // Symmetric frustum: left = -right, bottom = -top
        let n = self.near;
        let inv_side = 1.0 / n.hypot(vp_right);
        let inv_vert = 1.0 / n.hypot(vp_top);
        let cache = FrustumCache {
            projection,
            coeff_left: [n * inv_side, vp_right * inv_side],
            coeff_right: [-n * inv_side, vp_right * inv_side],
            coeff_bottom: [n * inv_vert, vp_top * inv_vert],
            coeff_top: [-n * inv_vert, vp_top * inv_vert],
        };
        self.frustum.set(Some(cache));
        cache
    }

    fn update_view(&self) -> ViewCache {
        if let Some(cache) = self.view.get() {
            return cache;
        }

        let (position, orientation) = match self.parent_pose {
            Some((parent_position, parent_orientation)) => {
                (parent_orientation * self.position + parent_position, parent_orientation * self.orientation)
            }
            None => (self.position, self.orientation),
        };

        let rotation: Mat3 = *orientation.to_rotation_matrix().matrix();
        let x_axis: Vec3 = rotation.column(0).into_owned();
        let y_axis: Vec3 = rotation.column(1).into_owned();
        let rotation_t = rotation.transpose();
        let translation = -(rotation_t * position);

        let mut view = Mat4::identity();
        view.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
        view.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);

        let frustum = self.update_frustum();
        let direction = orientation * -Vec3::z();
        let dir_dot_pos = direction.dot(&position);
        let side_plane = |coeff: [f32; 2], axis: &Vec3| {
            let normal = axis * coeff[0] + direction * coeff[1];
            Plane::from_point(normal, &position)
        };

        let mut planes = [Plane::default(); 6];
        planes[FrustumPlane::Near.index()] = Plane::new(direction, -(dir_dot_pos + self.near));
        planes[FrustumPlane::Far.index()] = Plane::new(-direction, dir_dot_pos + self.far);
        planes[FrustumPlane::Left.index()] = side_plane(frustum.coeff_left, &x_axis);
        planes[FrustumPlane::Right.index()] = side_plane(frustum.coeff_right, &x_axis);
        planes[FrustumPlane::Top.index()] = side_plane(frustum.coeff_top, &y_axis);
        planes[FrustumPlane::Bottom.index()] = side_plane(frustum.coeff_bottom, &y_axis);

        let cache = ViewCache { position, orientation, view, planes };
        self.view.set(Some(cache));
        cache
    }

    /// World-space position, composed with the parent pose when attached
    pub fn derived_position(&self) -> Vec3 {
        self.update_view().position
    }

    /// World-space orientation
    pub fn derived_orientation(&self) -> Quat {
        self.update_view().orientation
    }

    /// World-space viewing direction
    pub fn derived_direction(&self) -> Vec3 {
        self.derived_orientation() * -Vec3::z()
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        self.update_view().view
    }

    /// View to clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        self.update_frustum().projection
    }

    /// One world-space frustum plane
    pub fn frustum_plane(&self, plane: FrustumPlane) -> Plane {
        self.update_view().planes[plane.index()]
    }

    /// All six frustum planes, indexed by [`FrustumPlane`]
    pub fn frustum_planes(&self) -> [Plane; 6] {
        self.update_view().planes
    }

    /// Test a world-space box
    ///
    /// The box is culled only when all eight corners lie strictly on the
    /// negative side of a single plane, so boxes near frustum edges may be
    /// reported visible.
    pub fn is_box_visible(&self, bounds: &Aabb) -> Visibility {
        let planes = self.frustum_planes();
        let corners = bounds.corners();
        for plane in FrustumPlane::ALL {
            let p = &planes[plane.index()];
            if corners.iter().all(|corner| p.side(corner) == PlaneSide::Negative) {
                return Visibility::Culled(plane);
            }
        }
        Visibility::Visible
    }

    /// Test a world-space sphere
    pub fn is_sphere_visible(&self, sphere: &Sphere) -> Visibility {
        let planes = self.frustum_planes();
        for plane in FrustumPlane::ALL {
            if planes[plane.index()].distance(&sphere.center) < -sphere.radius {
                return Visibility::Culled(plane);
            }
        }
        Visibility::Visible
    }

    /// Test a world-space point
    pub fn is_point_visible(&self, point: &Vec3) -> Visibility {
        let planes = self.frustum_planes();
        for plane in FrustumPlane::ALL {
            if planes[plane.index()].side(point) == PlaneSide::Negative {
                return Visibility::Culled(plane);
            }
        }
        Visibility::Visible
    }
}
