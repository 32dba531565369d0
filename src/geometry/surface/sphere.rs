use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{check_range, orthonormal_frame, Surface, SurfaceDerivatives, SurfaceDomain};

/// A spherical surface in 3D space.
///
/// `P(u, v) = center + r * (cos(v) * (cos(u) * ref_dir + sin(u) * binormal) + sin(v) * axis)`
///
/// `u` is the longitude (periodic) and `v` the latitude in `[-pi/2, pi/2]`.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(center: Point3, radius: f64, axis: Vector3, ref_dir: Vector3) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("sphere radius must be positive".into()).into(),
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

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Sphere {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        check_range("v", v, -FRAC_PI_2, FRAC_PI_2)?;
        let r = self.radius;
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        let radial = self.ref_dir * cu + self.binormal() * su;
        let tangent = self.binormal() * cu - self.ref_dir * su;
        Ok(SurfaceDerivatives {
            point: self.center + (radial * cv + self.axis * sv) * r,
            du: tangent * (r * cv),
            dv: (self.axis * cv - radial * sv) * r,
            duu: -radial * (r * cv),
            duv: -tangent * (r * sv),
            dvv: -(radial * cv + self.axis * sv) * r,
        })
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.center;
        let len = dp.norm();
        if len < TOLERANCE {
            return (0.0, 0.0);
        }
        let u = dp.dot(&self.binormal()).atan2(dp.dot(&self.ref_dir));
        let v = (dp.dot(&self.axis) / len).clamp(-1.0, 1.0).asin();
        (u.rem_euclid(TAU), v)
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.center).norm() - self.radius
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let p = self.evaluate(u, v)?;
        let n = p - self.center;
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit_sphere() -> Sphere {
        Sphere::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn north_pole() {
        let s = unit_sphere();
        let p = s.evaluate(0.3, FRAC_PI_2).unwrap();
        assert!((p - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
        assert!((s.normal(0.3, FRAC_PI_2).unwrap() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn latitude_outside_range_is_undefined() {
        assert!(unit_sphere().evaluate(0.0, 2.0).is_err());
    }

    #[test]
    fn natural_normal_agrees_with_radial() {
        let s = unit_sphere();
        let d = s.derivatives(1.1, 0.4).unwrap();
        let n = d.du.cross(&d.dv).normalize();
        assert!((n - (d.point - Point3::origin())).norm() < 1e-9);
    }
}
