use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{orthonormal_frame, Surface, SurfaceDerivatives, SurfaceDomain};

/// A toroidal surface in 3D space.
///
/// `P(u, v) = center + (R + r*cos(v)) * (cos(u)*ref_dir + sin(u)*binormal) + r*sin(v)*axis`
/// where `binormal = axis x ref_dir`. Both parameters are periodic.
#[derive(Debug, Clone)]
pub struct Torus {
    center: Point3,
    major_radius: f64,
    minor_radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Torus {
    /// Creates a new torus.
    ///
    /// # Errors
    ///
    /// Returns an error if either radius is non-positive, minor >= major,
    /// axis is zero-length, or the reference direction is not perpendicular to the axis.
    pub fn new(
        center: Point3,
        major_radius: f64,
        minor_radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
    ) -> Result<Self> {
        if major_radius < TOLERANCE || minor_radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("torus radii must be positive".into()).into(),
            );
        }
        if minor_radius >= major_radius {
            return Err(GeometryError::Degenerate(
                "torus minor radius must be less than major radius".into(),
            )
            .into());
        }
        let (axis, ref_dir) = orthonormal_frame(axis, ref_dir)?;
        Ok(Self {
            center,
            major_radius,
            minor_radius,
            axis,
            ref_dir,
        })
    }

    /// Returns the center of the torus.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the major radius (center to tube center).
    #[must_use]
    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    /// Returns the minor radius (tube radius).
    #[must_use]
    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }
}

impl Surface for Torus {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        let big_r = self.major_radius;
        let r = self.minor_radius;
        let radial = self.ref_dir * cu + self.binormal() * su;
        let tangent = self.binormal() * cu - self.ref_dir * su;
        let rho = big_r + r * cv;
        Ok(SurfaceDerivatives {
            point: self.center + radial * rho + self.axis * (r * sv),
            du: tangent * rho,
            dv: (self.axis * cv - radial * sv) * r,
            duu: -radial * rho,
            duv: -tangent * (r * sv),
            dvv: -(radial * cv + self.axis * sv) * r,
        })
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, 0.0, TAU)
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let dp = point - self.center;
        let h = dp.dot(&self.axis);
        let x = dp.dot(&self.ref_dir);
        let y = dp.dot(&self.binormal());
        let u = y.atan2(x);
        let v = h.atan2(x.hypot(y) - self.major_radius);
        (u.rem_euclid(TAU), v.rem_euclid(TAU))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        let dp = point - self.center;
        let h = dp.dot(&self.axis);
        let rho = (dp - self.axis * h).norm();
        (rho - self.major_radius).hypot(h) - self.minor_radius
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn v_period(&self) -> Option<f64> {
        Some(TAU)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn torus() -> Torus {
        Torus::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn inverse_round_trips() {
        let t = torus();
        for &(u, v) in &[(0.5, 0.5), (3.0, 5.0), (6.0, 2.0)] {
            let p = t.evaluate(u, v).unwrap();
            let (iu, iv) = t.inverse(&p);
            assert!((iu - u).abs() < 1e-9 && (iv - v).abs() < 1e-9);
            assert!(t.signed_distance(&p).abs() < 1e-12);
        }
    }

    #[test]
    fn both_directions_are_periodic() {
        let t = torus();
        assert!(t.u_period().is_some() && t.v_period().is_some());
        let a = t.evaluate(1.0, 1.0).unwrap();
        let b = t.evaluate(1.0 + TAU, 1.0 - TAU).unwrap();
        assert!((a - b).norm() < 1e-9);
    }

    #[test]
    fn outer_equator_normal_is_radial() {
        let n = torus().normal(0.0, 0.0).unwrap();
        assert!((n - Vector3::x()).norm() < 1e-12);
    }
}
