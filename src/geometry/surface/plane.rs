use crate::error::{GeometryError, Result};
use crate::math::{any_perpendicular, Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDerivatives, SurfaceDomain};

/// An infinite plane in 3D space.
///
/// Defined by an origin point, and two orthogonal direction vectors
/// (`u_dir`, `v_dir`). The normal is `u_dir x v_dir`.
///
/// Parametric form: `P(u, v) = origin + u * u_dir + v * v_dir`.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl Plane {
    /// Creates a new plane from an origin and two direction vectors.
    ///
    /// `v_dir` is re-orthogonalized against `u_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vectors are zero-length
    /// or parallel (degenerate plane).
    pub fn new(origin: Point3, u_dir: Vector3, v_dir: Vector3) -> Result<Self> {
        let u_len = u_dir.norm();
        if u_len < TOLERANCE || v_dir.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let u_dir = u_dir / u_len;

        let normal = u_dir.cross(&v_dir);
        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(
                GeometryError::Degenerate("plane directions are parallel".into()).into(),
            );
        }
        let normal = normal / normal_len;

        Ok(Self {
            origin,
            u_dir,
            v_dir: normal.cross(&u_dir),
            normal,
        })
    }

    /// Creates a plane from an origin and a normal vector.
    ///
    /// The U and V directions are computed automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;
        let u_dir = any_perpendicular(&normal);
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            origin,
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the U direction.
    #[must_use]
    pub fn u_dir(&self) -> &Vector3 {
        &self.u_dir
    }

    /// Returns the V direction.
    #[must_use]
    pub fn v_dir(&self) -> &Vector3 {
        &self.v_dir
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }
}

impl Surface for Plane {
    fn derivatives(&self, u: f64, v: f64) -> Result<SurfaceDerivatives> {
        Ok(SurfaceDerivatives {
            point: self.origin + self.u_dir * u + self.v_dir * v,
            du: self.u_dir,
            dv: self.v_dir,
            duu: Vector3::zeros(),
            duv: Vector3::zeros(),
            dvv: Vector3::zeros(),
        })
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )
    }

    fn inverse(&self, point: &Point3) -> (f64, f64) {
        let d = point - self.origin;
        (d.dot(&self.u_dir), d.dot(&self.v_dir))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    fn normal(&self, _u: f64, _v: f64) -> Result<Vector3> {
        Ok(self.normal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_normal_builds_right_handed_frame() {
        let pl = Plane::from_normal(Point3::origin(), Vector3::new(0.0, 0.0, 2.0)).unwrap();
        let n = pl.u_dir().cross(pl.v_dir());
        assert!((n - Vector3::z()).norm() < 1e-12);
        assert!((pl.normal(3.0, -1.0).unwrap() - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn inverse_round_trips() {
        let pl = Plane::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::x(),
            Vector3::new(0.3, 1.0, 0.0),
        )
        .unwrap();
        let p = pl.evaluate(0.25, -4.0).unwrap();
        let (u, v) = pl.inverse(&p);
        assert!((u - 0.25).abs() < 1e-12);
        assert!((v + 4.0).abs() < 1e-12);
    }

    #[test]
    fn signed_distance_follows_normal() {
        let pl = Plane::from_normal(Point3::new(0.0, 0.0, 1.0), Vector3::z()).unwrap();
        assert!((pl.signed_distance(&Point3::new(5.0, 5.0, 3.0)) - 2.0).abs() < 1e-12);
        assert!((pl.signed_distance(&Point3::origin()) + 1.0).abs() < 1e-12);
    }
}
