use crate::geometry::surface::Plane;

use super::{Point3, ToleranceConfig, Vector3};

/// Relationship between two planes.
#[derive(Debug)]
pub enum PlanePairRelation {
    /// Planes intersect along a line.
    IntersectionLine {
        origin: Point3,
        direction: Vector3,
    },
    /// Planes are parallel but not coincident.
    Parallel { distance: f64 },
    /// Planes are the same (coincident).
    Coincident,
}

/// Computes the intersection of two planes.
///
/// Returns an [`IntersectionLine`](PlanePairRelation::IntersectionLine) with a
/// unit-length `direction` when the planes cross, [`Parallel`](PlanePairRelation::Parallel)
/// when they don't, or [`Coincident`](PlanePairRelation::Coincident) when they overlap.
#[must_use]
pub fn plane_plane_intersect(a: &Plane, b: &Plane, tol: &ToleranceConfig) -> PlanePairRelation {
    let na = a.plane_normal();
    let nb = b.plane_normal();

    let dir = na.cross(nb);
    let dir_len = dir.norm();

    if dir_len < tol.angular.max(1e-12) {
        let dist = (b.origin() - a.origin()).dot(na).abs();
        if dist <= tol.confusion {
            PlanePairRelation::Coincident
        } else {
            PlanePairRelation::Parallel { distance: dist }
        }
    } else {
        let dir = dir / dir_len;

        // p = oa + s * na + t * nb satisfies both plane equations when
        // s + t (na.nb) = 0 and s (na.nb) + t = nb.(ob - oa).
        let d2 = nb.dot(&(b.origin() - a.origin()));
        let dot_nn = na.dot(nb);
        let denom = 1.0 - dot_nn * dot_nn;
        let s = -dot_nn * d2 / denom;
        let t = d2 / denom;

        PlanePairRelation::IntersectionLine {
            origin: a.origin() + na * s + nb * t,
            direction: dir,
        }
    }
}

/// Relationship of a line with a plane.
#[derive(Debug)]
pub enum LinePlaneRelation {
    /// Line intersects the plane at a single point.
    Point { point: Point3, t: f64 },
    /// Line is parallel to the plane (does not intersect).
    Parallel,
    /// Line lies entirely on the plane.
    OnPlane,
}

/// Computes the intersection of a line `origin + t * dir` with a plane.
///
/// `dir` is expected to be a unit vector.
#[must_use]
pub fn line_plane_intersect(
    origin: &Point3,
    dir: &Vector3,
    plane: &Plane,
    tol: &ToleranceConfig,
) -> LinePlaneRelation {
    let normal = plane.plane_normal();
    let denom = normal.dot(dir);
    let numer = normal.dot(&(plane.origin() - origin));

    if denom.abs() < tol.angular.max(1e-12) {
        if numer.abs() <= tol.confusion {
            LinePlaneRelation::OnPlane
        } else {
            LinePlaneRelation::Parallel
        }
    } else {
        let t = numer / denom;
        LinePlaneRelation::Point {
            point: origin + dir * t,
            t,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn plane(origin: Point3, normal: Vector3) -> Plane {
        Plane::from_normal(origin, normal).unwrap()
    }

    #[test]
    fn perpendicular_planes_meet_in_a_line() {
        let tol = ToleranceConfig::default();
        let a = plane(Point3::origin(), Vector3::z());
        let b = plane(Point3::new(0.5, 0.0, 0.0), Vector3::x());
        match plane_plane_intersect(&a, &b, &tol) {
            PlanePairRelation::IntersectionLine { origin, direction } => {
                assert!(origin.z.abs() < 1e-12);
                assert!((origin.x - 0.5).abs() < 1e-12);
                assert!(direction.cross(&Vector3::y()).norm() < 1e-12);
            }
            other => panic!("expected a line, got {other:?}"),
        }
    }

    #[test]
    fn offset_parallel_planes() {
        let tol = ToleranceConfig::default();
        let a = plane(Point3::origin(), Vector3::z());
        let b = plane(Point3::new(0.0, 0.0, 2.0), -Vector3::z());
        assert!(matches!(
            plane_plane_intersect(&a, &b, &tol),
            PlanePairRelation::Parallel { distance } if (distance - 2.0).abs() < 1e-12
        ));
    }

    #[test]
    fn coincident_planes_with_flipped_normal() {
        let tol = ToleranceConfig::default();
        let a = plane(Point3::origin(), Vector3::z());
        let b = plane(Point3::new(3.0, 1.0, 0.0), -Vector3::z());
        assert!(matches!(
            plane_plane_intersect(&a, &b, &tol),
            PlanePairRelation::Coincident
        ));
    }

    #[test]
    fn line_hits_plane() {
        let tol = ToleranceConfig::default();
        let pl = plane(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let r = line_plane_intersect(&Point3::origin(), &Vector3::z(), &pl, &tol);
        assert!(matches!(r, LinePlaneRelation::Point { t, .. } if (t - 1.0).abs() < 1e-12));
        let r = line_plane_intersect(&Point3::origin(), &Vector3::x(), &pl, &tol);
        assert!(matches!(r, LinePlaneRelation::Parallel));
    }
}
