use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3};

use super::{check_range, orthonormal_frame, Surface, SurfaceDerivatives, SurfaceDomain};

/// A conical surface in 3D space.
///
/// `P(u, v) = apex + v * (cos(alpha) * axis + sin(alpha) * (cos(u) * ref_dir + sin(u) * binormal))`
/// where `binormal = axis x ref_dir` and `alpha` is the half-angle.
///
/// `v >= 0` is the distance from the apex along the generator; evaluating
/// below the apex is undefined.
#[derive(Debug, Clone)]
pub struct Cone {
    apex: Point3,
    axis: Vector3,
    half_angle: f64,
    ref_dir: Vector3,
}

impl Cone {
    /// Creates a new cone.
    ///
    /// # Errors
    ///
    /// Returns an error if the half-angle is outside `(0, pi/2)`, the axis is
    /// zero-length, or the reference direction is not perpendicular to the axis.
    pub fn new(apex: Point3, axis: Vector3, half_angle: f64, ref_dir: Vector3) -> Result<Self> {
        if half_angle <= 1e-9 || half_angle >= FRAC_PI_2 - 1e-9 {
            return Err(GeometryError::Degenerate(
                "cone half-angle must be in (0, pi/2)".into(),
            )
            .into());
        }
        let (axis, ref_dir) = orthonormal_frame(axis, ref_dir)?;
        Ok(Self {
            apex,
            axis,
            half_angle,
            ref_dir,
        })
    }

    /// Returns the apex point.
    #[must_use]
    pub fn apex(&self) -> &Point3 {
        &self.apex
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the half-angle in radians.
    #[must_use]
    pub fn half_angle(&self) -> f64 {
        self.half_angle
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Cone {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        check_range("v", v, 0.0, f64::INFINITY)?;
        let (s, c) = u.sin_cos();
        let (sa, ca) = self.half_angle.sin_cos();
        let radial = self.ref_dir * c + self.binormal() * s;
        let tangent = self.binormal() * c - self.ref_dir * s;
        let generator = self.axis * ca + radial * sa;
        Ok(SurfaceDerivatives {
            point: self.apex + generator * v,
            du: tangent * (v * sa),
            dv: generator,
            duu: -radial * (v * sa),
            duv: tangent * sa,
            dvv: Vector3::zeros(),
        })
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, 0.0, f64::INFINITY)
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.apex;
        let h = dp.dot(&self.axis);
        let x = dp.dot(&self.ref_dir);
        let y = dp.dot(&self.binormal());
        let r = x.hypot(y);
        let (sa, ca) = self.half_angle.sin_cos();
        (y.atan2(x).rem_euclid(TAU), (r * sa + h * ca).max(0.0))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        let dp = point - self.apex;
        let h = dp.dot(&self.axis);
        let r = (dp - self.axis * h).norm();
        let (sa, ca) = self.half_angle.sin_cos();
        r * ca - h * sa
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }
}
