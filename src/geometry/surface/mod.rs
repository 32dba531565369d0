mod cone;
mod cylinder;
mod plane;
mod sphere;
mod torus;

pub use cone::Cone;
pub use cylinder::Cylinder;
pub use plane::Plane;
pub use sphere::Sphere;
pub use torus::Torus;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// Parameter domain for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// Start of the U parameter range.
    pub u_min: f64,
    /// End of the U parameter range.
    pub u_max: f64,
    /// Start of the V parameter range.
    pub v_min: f64,
    /// End of the V parameter range.
    pub v_max: f64,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }
}

/// Point and partial derivatives of a surface at one `(u, v)`.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDerivatives {
    /// Position.
    pub point: Point3,
    /// First partial derivative in `u`.
    pub du: Vector3,
    /// First partial derivative in `v`.
    pub dv: Vector3,
    /// Second partial derivative in `u`.
    pub duu: Vector3,
    /// Mixed second partial derivative.
    pub duv: Vector3,
    /// Second partial derivative in `v`.
    pub dvv: Vector3,
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface {
    /// Evaluates the point and partial derivatives up to second order.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-periodic parameter is out of range.
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives>;

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;

    /// Parameters of the surface point closest to `point`.
    ///
    /// Periodic parameters are returned in `[0, period)`.
    fn inverse(&self, point: &Point3) -> (f64, f64);

    /// Signed distance from `point` to the surface, positive on the side
    /// the natural normal points to.
    fn signed_distance(&self, point: &Point3) -> f64;

    /// Period of the `u` parameter, if it wraps.
    fn u_period(&self) -> Option<f64> {
        None
    }

    /// Period of the `v` parameter, if it wraps.
    fn v_period(&self) -> Option<f64> {
        None
    }

    /// Evaluates the surface at parameters `(u, v)`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-periodic parameter is out of range.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        Ok(self.derivatives(u, v)?.point)
    }

    /// Computes the unit natural normal `du x dv` at `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the normal is degenerate.
    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let d = self.derivatives(u, v)?;
        let n = d.du.cross(&d.dv);
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }
}

/// The closed set of surface families a face can carry.
#[derive(Debug, Clone)]
pub enum SurfaceGeom {
    /// A planar surface.
    Plane(Plane),
    /// A cylindrical surface.
    Cylinder(Cylinder),
    /// A conical surface.
    Cone(Cone),
    /// A spherical surface.
    Sphere(Sphere),
    /// A toroidal surface.
    Torus(Torus),
}

macro_rules! dispatch {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            SurfaceGeom::Plane($s) => $body,
            SurfaceGeom::Cylinder($s) => $body,
            SurfaceGeom::Cone($s) => $body,
            SurfaceGeom::Sphere($s) => $body,
            SurfaceGeom::Torus($s) => $body,
        }
    };
}

impl Surface for SurfaceGeom {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        dispatch!(self, s => s.derivatives(u, v))
    }

    fn domain(&self) -> SurfaceDomain {
        dispatch!(self, s => s.domain())
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        dispatch!(self, s => s.inverse(point))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        dispatch!(self, s => s.signed_distance(point))
    }

    fn u_period(&self) -> Option<f64> {
        dispatch!(self, s => s.u_period())
    }

    fn v_period(&self) -> Option<f64> {
        dispatch!(self, s => s.v_period())
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        dispatch!(self, s => s.normal(u, v))
    }
}

impl SurfaceGeom {
    /// Returns the plane when this surface is planar.
    #[must_use]
    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            Self::Plane(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` if either parameter wraps.
    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.u_period().is_some() || self.v_period().is_some()
    }

    /// Returns `true` if both surfaces describe the same point set within
    /// `tol` (orientation is ignored).
    #[must_use]
    pub fn same_domain(&self, other: &SurfaceGeom, tol: f64) -> bool {
        match (self, other) {
            (Self::Plane(a), Self::Plane(b)) => {
                a.plane_normal().cross(b.plane_normal()).norm() < 1e-9
                    && b.signed_distance(a.origin()).abs() <= tol
            }
            (Self::Cylinder(a), Self::Cylinder(b)) => {
                (a.radius() - b.radius()).abs() <= tol
                    && a.axis().cross(b.axis()).norm() < 1e-9
                    && (a.center() - b.center()).cross(a.axis()).norm() <= tol
            }
            (Self::Sphere(a), Self::Sphere(b)) => {
                (a.radius() - b.radius()).abs() <= tol && (a.center() - b.center()).norm() <= tol
            }
            _ => false,
        }
    }
}

/// Normalizes an axis and a reference direction and checks they are
/// perpendicular. Returns `(axis, ref_dir)`.
pub(crate) fn orthonormal_frame(axis: Vector3, ref_dir: Vector3) -> Result<(Vector3, Vector3)> {
    let axis_len = axis.norm();
    if axis_len < TOLERANCE {
        return Err(GeometryError::ZeroVector.into());
    }
    let axis = axis / axis_len;

    let ref_len = ref_dir.norm();
    if ref_len < TOLERANCE {
        return Err(GeometryError::ZeroVector.into());
    }
    let ref_dir = ref_dir / ref_len;

    if axis.dot(&ref_dir).abs() > 1e-9 {
        return Err(GeometryError::Degenerate(
            "reference direction must be perpendicular to axis".into(),
        )
        .into());
    }
    Ok((axis, ref_dir))
}

/// Rejects a non-periodic parameter outside `[min, max]`.
pub(crate) fn check_range(parameter: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    let slack = 1e-9 * (max - min).abs().clamp(1.0, 1e6);
    if value.is_nan() || value < min - slack || value > max + slack {
        return Err(GeometryError::ParameterOutOfRange {
            parameter,
            value,
            min,
            max,
        }
        .into());
    }
    Ok(())
}
