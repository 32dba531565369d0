use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDerivatives, CurveDomain};

/// A full ellipse in 3D space.
///
/// `P(t) = center + a * cos(t) * major_dir + b * sin(t) * minor_dir`
/// where `minor_dir = normal x major_dir`.
#[derive(Debug, Clone)]
pub struct Ellipse {
    center: Point3,
    semi_major: f64,
    semi_minor: f64,
    normal: Vector3,
    major_dir: Vector3,
}

impl Ellipse {
    /// Creates a new ellipse.
    ///
    /// # Errors
    ///
    /// Returns an error if either axis length is non-positive, the normal is
    /// zero-length, or the major direction is not perpendicular to the normal.
    pub fn new(
        center: Point3,
        semi_major: f64,
        semi_minor: f64,
        normal: Vector3,
        major_dir: Vector3,
    ) -> Result<Self> {
        if semi_major < TOLERANCE || semi_minor < TOLERANCE {
            return Err(
                GeometryError::Degenerate("ellipse axes must be positive".into()).into(),
            );
        }

        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / normal_len;

        let major_len = major_dir.norm();
        if major_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let major_dir = major_dir / major_len;

        if normal.dot(&major_dir).abs() > 1e-9 {
            return Err(GeometryError::Degenerate(
                "major direction must be perpendicular to normal".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            semi_major,
            semi_minor,
            normal,
            major_dir,
        })
    }

    /// Returns the center of the ellipse.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the semi-major axis length.
    #[must_use]
    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    /// Returns the semi-minor axis length.
    #[must_use]
    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    /// Returns the normal vector of the ellipse plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    fn minor_dir(&self) -> Vector3 {
        self.normal.cross(&self.major_dir)
    }
}

impl Curve for Ellipse {
    fn derivatives(&self, t: f64) -> Result<CurveDerivatives> {
        let (s, c) = t.sin_cos();
        let x = self.major_dir * self.semi_major;
        let y = self.minor_dir() * self.semi_minor;
        Ok(CurveDerivatives {
            point: self.center + x * c + y * s,
            d1: y * c - x * s,
            d2: -(x * c + y * s),
        })
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, TAU)
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn parameter_of(&self, point: &Point3) -> f64 {
        let d = point - self.center;
        let mut t = (d.dot(&self.minor_dir()) / self.semi_minor)
            .atan2(d.dot(&self.major_dir) / self.semi_major);
        // Newton on g(t) = (P(t) - point) . P'(t)
        for _ in 0..16 {
            let Ok(der) = self.derivatives(t) else { break };
            let diff = der.point - point;
            let g = diff.dot(&der.d1);
            let dg = der.d1.norm_squared() + diff.dot(&der.d2);
            if dg.abs() < 1e-15 {
                break;
            }
            let step = g / dg;
            t -= step;
            if step.abs() < 1e-14 {
                break;
            }
        }
        t.rem_euclid(TAU)
    }

    fn period(&self) -> Option<f64> {
        Some(TAU)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn xy_ellipse() -> Ellipse {
        Ellipse::new(Point3::origin(), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap()
    }

    #[test]
    fn axes_endpoints() {
        let e = xy_ellipse();
        assert!((e.evaluate(0.0).unwrap() - Point3::new(3.0, 0.0, 0.0)).norm() < 1e-12);
        let top = e.evaluate(std::f64::consts::FRAC_PI_2).unwrap();
        assert!((top - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn parameter_of_recovers_samples() {
        let e = xy_ellipse();
        for &t in &[0.2, 1.3, 2.9, 4.4, 6.0] {
            let p = e.evaluate(t).unwrap();
            assert!((e.parameter_of(&p) - t).abs() < 1e-9, "t = {t}");
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let e = xy_ellipse();
        let h = 1e-6;
        let d = e.derivatives(0.7).unwrap();
        let fd = (e.evaluate(0.7 + h).unwrap() - e.evaluate(0.7 - h).unwrap()) / (2.0 * h);
        assert!((d.d1 - fd).norm() < 1e-6);
    }
}
