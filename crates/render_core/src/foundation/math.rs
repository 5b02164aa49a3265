//! Math utilities and types
//!
//! Provides the vector, quaternion and matrix aliases used by the scene graph,
//! plus strongly typed angles. All angles are radians internally; the
//! [`AngleUnit`] setting only applies where raw numbers enter the engine
//! (configuration files, user-facing APIs taking plain `f32`).

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};
use serde::{Deserialize, Serialize};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Radian(pub f32);

/// Angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Degree(pub f32);

impl Radian {
    /// Raw value in radians
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Value converted to degrees
    pub fn to_degrees(self) -> f32 {
        self.0.to_degrees()
    }
}

impl Degree {
    /// Raw value in degrees
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl From<Degree> for Radian {
    fn from(d: Degree) -> Self {
        Self(d.0.to_radians())
    }
}

impl From<Radian> for Degree {
    fn from(r: Radian) -> Self {
        Self(r.0.to_degrees())
    }
}

impl std::ops::Mul<f32> for Radian {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self(self.0 * rhs)
    }
}

impl std::ops::Neg for Radian {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Unit in which raw angle values are interpreted at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    /// Raw values are degrees
    #[default]
    Degrees,
    /// Raw values are radians
    Radians,
}

impl AngleUnit {
    /// Interpret a raw value in this unit
    pub fn to_radians(self, value: f32) -> Radian {
        match self {
            Self::Degrees => Degree(value).into(),
            Self::Radians => Radian(value),
        }
    }

    /// Express an angle as a raw value in this unit
    pub fn from_radians(self, angle: Radian) -> f32 {
        match self {
            Self::Degrees => angle.to_degrees(),
            Self::Radians => angle.value(),
        }
    }
}

/// Position, orientation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Orientation quaternion
    pub orientation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from all three components
    pub const fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        Self { position, orientation, scale }
    }

    /// Convert to a transformation matrix (T * R * S)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.orientation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.position + self.orientation * self.scale.component_mul(point)
    }

    /// Combine this (parent) transform with a child transform expressed in its space
    pub fn combine(&self, child: &Self) -> Self {
        Self {
            position: self.transform_point(&child.position),
            orientation: self.orientation * child.orientation,
            scale: self.scale.component_mul(&child.scale),
        }
    }
}

/// Which side of a plane a point lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// On the plane
    NoSide,
    /// The half space the normal points into
    Positive,
    /// The other half space
    Negative,
}

/// Plane `normal . p + d = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Plane normal
    pub normal: Vec3,
    /// Signed constant term
    pub d: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self { normal: Vec3::zeros(), d: 0.0 }
    }
}

impl Plane {
    /// Create a plane from normal and constant
    pub const fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Create the plane with the given normal passing through `point`
    pub fn from_point(normal: Vec3, point: &Vec3) -> Self {
        Self { normal, d: -normal.dot(point) }
    }

    /// Pseudo-distance to `point`; a true distance when the normal is unit length
    pub fn distance(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Side of the plane `point` lies on
    pub fn side(&self, point: &Vec3) -> PlaneSide {
        let distance = self.distance(point);
        if distance < 0.0 {
            PlaneSide::Negative
        } else if distance > 0.0 {
            PlaneSide::Positive
        } else {
            PlaneSide::NoSide
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new box from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half size of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// All eight corners
    ///
    /// Ordering: the four `min.z` corners counter-clockwise from `min`, then
    /// the four `max.z` corners counter-clockwise from `max`.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            lo,
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            hi,
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
        ]
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Smallest box containing both
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Transform all corners by `matrix` and re-fit an axis-aligned box around them
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut corners = self.corners().into_iter().map(|c| {
            matrix.transform_point(&Point3::from(c)).coords
        });
        // corners() always yields eight points
        let first = corners.next().unwrap_or_else(Vec3::zeros);
        let (min, max) = corners.fold((first, first), |(min, max), c| (min.inf(&c), max.sup(&c)));
        Self { min, max }
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center in world space
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Create a sphere
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Unit X axis
    pub fn unit_x() -> super::Vec3 {
        super::Vec3::x()
    }

    /// Unit Y axis
    pub fn unit_y() -> super::Vec3 {
        super::Vec3::y()
    }

    /// Unit Z axis
    pub fn unit_z() -> super::Vec3 {
        super::Vec3::z()
    }
}

/// Build a unit quaternion from three orthonormal local axes
pub fn quat_from_axes(x_axis: &Vec3, y_axis: &Vec3, z_axis: &Vec3) -> Quat {
    let rotation = nalgebra::Rotation3::from_matrix_unchecked(Mat3::from_columns(&[*x_axis, *y_axis, *z_axis]));
    Quat::from_rotation_matrix(&rotation)
}

/// Rotation of `angle` around `axis`; the axis does not need to be normalized
pub fn quat_from_angle_axis(angle: Radian, axis: &Vec3) -> Quat {
    Quat::from_axis_angle(&Unit::new_normalize(*axis), angle.value())
}
