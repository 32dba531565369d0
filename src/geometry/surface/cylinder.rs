use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{orthonormal_frame, Surface, SurfaceDerivatives, SurfaceDomain};

/// A cylindrical surface in 3D space.
///
/// `P(u, v) = center + radius * (cos(u) * ref_dir + sin(u) * binormal) + v * axis`
/// where `binormal = axis x ref_dir`. The natural normal points away from
/// the axis.
#[derive(Debug, Clone)]
pub struct Cylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cylinder radius must be positive".into()).into(),
            );
        }
        let (axis, ref_dir) = orthonormal_frame(axis, ref_dir)?;
        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
        })
    }

    /// Returns the center point on the axis.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the reference direction (u=0).
    #[must_use]
    pub fn ref_dir(&self) -> &Vector3 {
        &self.ref_dir
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Cylinder {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        let (s, c) = u.sin_cos();
        let radial = self.ref_dir * c + self.binormal() * s;
        let tangent = self.binormal() * c - self.ref_dir * s;
        Ok(SurfaceDerivatives {
            point: self.center + radial * self.radius + self.axis * v,
            du: tangent * self.radius,
            dv: self.axis,
            duu: -radial * self.radius,
            duv: Vector3::zeros(),
            dvv: Vector3::zeros(),
        })
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, f64::NEG_INFINITY, f64::INFINITY)
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.center;
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        (u.rem_euclid(TAU), dp.dot(&self.axis))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        let dp = point - self.center;
        let radial = dp - self.axis * dp.dot(&self.axis);
        radial.norm() - self.radius
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn z_cylinder(radius: f64) -> Cylinder {
        Cylinder::new(Point3::origin(), radius, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn evaluate_and_inverse() {
        let c = z_cylinder(2.0);
        let p = c.evaluate(FRAC_PI_2, 3.0).unwrap();
        assert!((p - Point3::new(0.0, 2.0, 3.0)).norm() < 1e-12);
        let (u, v) = c.inverse(&p);
        assert!((u - FRAC_PI_2).abs() < 1e-12);
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn natural_normal_points_outward() {
        let c = z_cylinder(1.0);
        let n = c.normal(0.0, 0.0).unwrap();
        assert!((n - Vector3::x()).norm() < 1e-12);
    }

    #[test]
    fn signed_distance_inside_is_negative() {
        let c = z_cylinder(1.0);
        assert!((c.signed_distance(&Point3::new(0.5, 0.0, 7.0)) + 0.5).abs() < 1e-12);
        assert!((c.signed_distance(&Point3::new(0.0, 3.0, -1.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_u_is_non_negative() {
        let c = z_cylinder(1.0);
        let (u, _) = c.inverse(&Point3::new(0.0, -1.0, 0.0));
        assert!((u - 1.5 * std::f64::consts::PI).abs() < 1e-12);
    }
}
