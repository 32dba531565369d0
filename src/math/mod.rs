pub mod aabb;
pub mod intersect_3d;
pub mod polygon_2d;
pub mod tolerance;

pub use aabb::Aabb;
pub use tolerance::ToleranceConfig;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Threshold used when validating geometry constructors (zero vectors,
/// non-positive radii). Algorithms take their tolerances from
/// [`ToleranceConfig`] instead.
pub const TOLERANCE: f64 = 1e-10;

/// Returns a unit vector perpendicular to `v`.
#[must_use]
pub fn any_perpendicular(v: &Vector3) -> Vector3 {
    let candidate = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&candidate).normalize()
}
