use crate::geometry::curve::{Curve, CurveGeom, Line};
use crate::geometry::surface::{Surface, SurfaceGeom};
use crate::math::{Point3, ToleranceConfig};
use crate::operations::boolean::report::Diagnostic;

use super::roots::{bracketed_root, minimize};
use super::{dedup_points, densify, sort_by_parameter, IntersectResult, Locus, Param};

/// Intersects the part of `curve` over `range` with an unbounded surface.
///
/// # Errors
///
/// Returns [`Diagnostic::Undetermined`] if a bracketed root does not
/// converge.
pub fn intersect_curve_surface(
    curve: &CurveGeom,
    range: (f64, f64),
    surface: &SurfaceGeom,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> IntersectResult {
    if let CurveGeom::Line(line) = curve {
        if let Some(loci) = line_hits(line, range, surface, tolerance, tol) {
            return Ok(loci);
        }
    }
    sampled_hits(curve, range, surface, tolerance, tol)
}

/// Analytic intersection of a line segment with a plane, cylinder, sphere
/// or cone. Returns `None` for surfaces without a closed form.
#[must_use]
pub fn line_hits(
    line: &Line,
    range: (f64, f64),
    surface: &SurfaceGeom,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Option<Vec<Locus>> {
    let (lo, hi) = (range.0.min(range.1), range.0.max(range.1));
    let origin = *line.origin();
    let dir = *line.direction();

    // Coefficients of a t^2 + b t + c = 0 in the surface's implicit form.
    let (a, b, c) = match surface {
        SurfaceGeom::Plane(plane) => {
            let n = plane.plane_normal();
            let denom = n.dot(&dir);
            let numer = n.dot(&(origin - plane.origin()));
            if denom.abs() < tol.angular.max(1e-12) {
                return Some(if numer.abs() <= tolerance {
                    vec![Locus::Coincident {
                        first: Some((lo, hi)),
                        second: None,
                    }]
                } else {
                    Vec::new()
                });
            }
            (0.0, denom, numer)
        }
        SurfaceGeom::Cylinder(cyl) => {
            let axis = cyl.axis();
            let dp = origin - cyl.center();
            let dp_perp = dp - axis * dp.dot(axis);
            let dir_perp = dir - axis * dir.dot(axis);
            if dir_perp.norm() < tol.angular.max(1e-12) {
                let on = (dp_perp.norm() - cyl.radius()).abs() <= tolerance;
                return Some(if on {
                    vec![Locus::Coincident {
                        first: Some((lo, hi)),
                        second: None,
                    }]
                } else {
                    Vec::new()
                });
            }
            let r = cyl.radius();
            (
                dir_perp.dot(&dir_perp),
                2.0 * dp_perp.dot(&dir_perp),
                dp_perp.dot(&dp_perp) - r * r,
            )
        }
        SurfaceGeom::Sphere(sph) => {
            let dp = origin - sph.center();
            let r = sph.radius();
            (1.0, 2.0 * dp.dot(&dir), dp.dot(&dp) - r * r)
        }
        SurfaceGeom::Cone(cone) => {
            let axis = cone.axis();
            let cos2 = cone.half_angle().cos().powi(2);
            let dp = origin - cone.apex();
            let d_a = dir.dot(axis);
            let dp_a = dp.dot(axis);
            (
                d_a * d_a - cos2,
                2.0 * (d_a * dp_a - dp.dot(&dir) * cos2),
                dp_a * dp_a - dp.dot(&dp) * cos2,
            )
        }
        SurfaceGeom::Torus(_) => return None,
    };

    let at = |t: f64| origin + dir * t;
    let on_surface = |t: f64| surface.signed_distance(&at(t)).abs() <= tolerance;

    // A generator of a cone through its apex zeroes every coefficient.
    if a.abs() < 1e-14 && b.abs() < 1e-14 {
        return Some(if on_surface(lo) && on_surface(hi) && on_surface(0.5 * (lo + hi)) {
            vec![Locus::Coincident {
                first: Some((lo, hi)),
                second: None,
            }]
        } else {
            Vec::new()
        });
    }

    let mut hits: Vec<(f64, bool)> = Vec::new();
    if a.abs() < 1e-14 {
        hits.push((-c / b, false));
    } else {
        let vertex = -b / (2.0 * a);
        let disc = b * b - 4.0 * a * c;
        if on_surface(vertex) {
            hits.push((vertex, true));
        } else if disc > 0.0 {
            let root = disc.sqrt();
            hits.push(((-b - root) / (2.0 * a), false));
            hits.push(((-b + root) / (2.0 * a), false));
        }
    }

    let mut loci = Vec::new();
    for (t, tangent) in hits {
        if t < lo - tolerance || t > hi + tolerance {
            continue;
        }
        let t = t.clamp(lo, hi);
        let point = at(t);
        // Only the nappe the cone parametrization covers.
        if let SurfaceGeom::Cone(cone) = surface {
            if (point - cone.apex()).dot(cone.axis()) < -tolerance {
                continue;
            }
        }
        let (u, v) = surface.inverse(&point);
        loci.push(Locus::Point {
            point,
            first: Param::Curve(t),
            second: Param::Surface(u, v),
            tangent,
        });
    }
    sort_by_parameter(&mut loci);
    Some(loci)
}

/// Sign of a sample, zero inside the tolerance band.
fn band_sign(value: f64, tolerance: f64) -> i8 {
    if value.abs() <= tolerance {
        0
    } else if value < 0.0 {
        -1
    } else {
        1
    }
}

fn sampled_hits(
    curve: &CurveGeom,
    range: (f64, f64),
    surface: &SurfaceGeom,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> IntersectResult {
    let (lo, hi) = (range.0.min(range.1), range.0.max(range.1));
    let eval = |t: f64| curve.evaluate(t).ok();
    let f = |t: f64| eval(t).map_or(f64::NAN, |p| surface.signed_distance(&p));

    let params = densify(&curve.sample_params(lo, hi, tol.deflection));
    let values: Vec<f64> = params.iter().map(|&t| f(t)).collect();
    let signs: Vec<i8> = values.iter().map(|&v| band_sign(v, tolerance)).collect();
    let n = params.len();

    let mut loci = Vec::new();
    let push_point = |t: f64, tangent: bool, loci: &mut Vec<Locus>| {
        if let Some(point) = eval(t) {
            let (u, v) = surface.inverse(&point);
            loci.push(Locus::Point {
                point,
                first: Param::Curve(t),
                second: Param::Surface(u, v),
                tangent,
            });
        }
    };
    let undetermined = |t: f64| Diagnostic::Undetermined {
        near: eval(t).unwrap_or_else(Point3::origin),
        iterations: tol.max_iterations,
    };

    let mut i = 0;
    while i < n {
        if signs[i] == 0 {
            let start = i;
            while i + 1 < n && signs[i + 1] == 0 {
                i += 1;
            }
            let end = i;
            let run_length: f64 = params[start..=end]
                .windows(2)
                .filter_map(|w| Some((eval(w[1])? - eval(w[0])?).norm()))
                .sum();
            if end > start && run_length > tolerance {
                loci.push(Locus::Coincident {
                    first: Some((params[start], params[end])),
                    second: None,
                });
            } else {
                let left = start.checked_sub(1);
                let right = (end + 1 < n).then_some(end + 1);
                let a = left.map_or(params[start], |k| params[k]);
                let b = right.map_or(params[end], |k| params[k]);
                match (left, right) {
                    (Some(l), Some(r)) if signs[l] != signs[r] => {
                        let t = bracketed_root(f, a, b, tolerance * 1e-3, tol)
                            .ok_or_else(|| undetermined(params[start]))?;
                        push_point(t, false, &mut loci);
                    }
                    (Some(_), Some(_)) => {
                        let (t, _) = minimize(|t| f(t).abs(), a, b, tol);
                        push_point(t, true, &mut loci);
                    }
                    _ => {
                        let (t, _) = minimize(|t| f(t).abs(), a, b, tol);
                        push_point(t, false, &mut loci);
                    }
                }
            }
            i += 1;
            continue;
        }

        if i + 1 < n && signs[i + 1] != 0 && signs[i + 1] != signs[i] {
            let t = bracketed_root(f, params[i], params[i + 1], tolerance * 1e-3, tol)
                .ok_or_else(|| undetermined(params[i]))?;
            push_point(t, false, &mut loci);
        }

        // A dip between samples can touch or cross the surface unseen.
        if i > 0
            && i + 1 < n
            && signs[i - 1] == signs[i]
            && signs[i + 1] == signs[i]
            && values[i].abs() < values[i - 1].abs()
            && values[i].abs() <= values[i + 1].abs()
        {
            let (a, b) = (params[i - 1], params[i + 1]);
            let (t_min, residual) = minimize(|t| f(t) * f64::from(signs[i]), a, b, tol);
            if residual.abs() <= tolerance {
                push_point(t_min, true, &mut loci);
            } else if residual < 0.0 {
                for (x, y) in [(a, t_min), (t_min, b)] {
                    let t = bracketed_root(f, x, y, tolerance * 1e-3, tol)
                        .ok_or_else(|| undetermined(t_min))?;
                    push_point(t, false, &mut loci);
                }
            }
        }
        i += 1;
    }

    sort_by_parameter(&mut loci);
    dedup_points(&mut loci, tolerance);
    Ok(loci)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Circle;
    use crate::geometry::surface::{Cone, Cylinder, Plane, Sphere, Torus};
    use crate::math::Vector3;
    use std::f64::consts::TAU;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn points(loci: &[Locus]) -> Vec<(Point3, bool)> {
        loci.iter()
            .filter_map(|l| match l {
                Locus::Point { point, tangent, .. } => Some((*point, *tangent)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn line_through_sphere_gives_two_hits() {
        let tol = ToleranceConfig::default();
        let sph = SurfaceGeom::Sphere(Sphere::new(p(0.0, 0.0, 0.0), 5.0, Vector3::z(), Vector3::x()).unwrap());
        let line = Line::new(p(-10.0, 0.0, 0.0), Vector3::x()).unwrap();
        let hits = points(&line_hits(&line, (0.0, 20.0), &sph, 1e-7, &tol).unwrap());
        assert_eq!(hits.len(), 2);
        assert!((hits[0].0.x + 5.0).abs() < 1e-9);
        assert!((hits[1].0.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn grazing_line_is_a_tangent_hit() {
        let tol = ToleranceConfig::default();
        let sph = SurfaceGeom::Sphere(Sphere::new(p(0.0, 0.0, 0.0), 5.0, Vector3::z(), Vector3::x()).unwrap());
        let line = Line::new(p(-10.0, 5.0, 0.0), Vector3::x()).unwrap();
        let hits = points(&line_hits(&line, (0.0, 20.0), &sph, 1e-7, &tol).unwrap());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].1);
    }

    #[test]
    fn hits_outside_the_range_are_dropped() {
        let tol = ToleranceConfig::default();
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.0, 0.0, 3.0), Vector3::z()).unwrap());
        let line = Line::new(p(0.0, 0.0, 0.0), Vector3::z()).unwrap();
        assert!(line_hits(&line, (0.0, 2.0), &plane, 1e-7, &tol).unwrap().is_empty());
        assert_eq!(line_hits(&line, (0.0, 4.0), &plane, 1e-7, &tol).unwrap().len(), 1);
    }

    #[test]
    fn line_in_plane_is_coincident() {
        let tol = ToleranceConfig::default();
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.0, 0.0, 1.0), Vector3::z()).unwrap());
        let line = Line::new(p(0.0, 0.0, 1.0), Vector3::x()).unwrap();
        let loci = line_hits(&line, (0.0, 1.0), &plane, 1e-7, &tol).unwrap();
        assert!(matches!(
            loci.as_slice(),
            [Locus::Coincident { first: Some((a, b)), second: None }]
                if a.abs() < 1e-12 && (b - 1.0).abs() < 1e-12
        ));
    }

    #[test]
    fn line_along_cylinder_is_coincident() {
        let tol = ToleranceConfig::default();
        let cyl = SurfaceGeom::Cylinder(Cylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let seam = Line::new(p(1.0, 0.0, 0.0), Vector3::z()).unwrap();
        let loci = line_hits(&seam, (0.0, 2.0), &cyl, 1e-7, &tol).unwrap();
        assert!(matches!(loci[..], [Locus::Coincident { .. }]));
    }

    #[test]
    fn line_meets_one_cone_nappe() {
        let tol = ToleranceConfig::default();
        let cone = SurfaceGeom::Cone(
            Cone::new(p(0.0, 0.0, 0.0), Vector3::z(), std::f64::consts::FRAC_PI_4, Vector3::x()).unwrap(),
        );
        // The horizontal line at z = 1 crosses the upper nappe twice.
        let line = Line::new(p(-5.0, 0.0, 1.0), Vector3::x()).unwrap();
        let hits = points(&line_hits(&line, (0.0, 10.0), &cone, 1e-7, &tol).unwrap());
        assert_eq!(hits.len(), 2);
        // The vertical line through x = 1 hits only the upper nappe.
        let line = Line::new(p(1.0, 0.0, -5.0), Vector3::z()).unwrap();
        let hits = points(&line_hits(&line, (0.0, 10.0), &cone, 1e-7, &tol).unwrap());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].0.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn circle_crosses_a_plane_twice() {
        let tol = ToleranceConfig::default();
        let circle = CurveGeom::Circle(Circle::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.5, 0.0, 0.0), Vector3::x()).unwrap());
        let loci = intersect_curve_surface(&circle, (0.0, TAU), &plane, 1e-7, &tol).unwrap();
        let hits = points(&loci);
        assert_eq!(hits.len(), 2);
        for (q, tangent) in hits {
            assert!((q.x - 0.5).abs() < 1e-7);
            assert!(!tangent);
        }
    }

    #[test]
    fn exhausted_iterations_leave_the_crossing_undetermined() {
        let tol = ToleranceConfig {
            max_iterations: 1,
            ..ToleranceConfig::default()
        };
        let circle = CurveGeom::Circle(Circle::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.3, 0.0, 0.0), Vector3::x()).unwrap());
        let result = intersect_curve_surface(&circle, (0.0, TAU), &plane, 1e-7, &tol);
        assert!(matches!(result, Err(Diagnostic::Undetermined { iterations: 1, .. })));
    }

    #[test]
    fn circle_touching_a_plane_is_tangent() {
        let tol = ToleranceConfig::default();
        let circle = CurveGeom::Circle(Circle::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.0, 1.0, 0.0), Vector3::y()).unwrap());
        let hits = points(&intersect_curve_surface(&circle, (0.0, TAU), &plane, 1e-7, &tol).unwrap());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].1);
        assert!((hits[0].0.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn circle_on_its_cylinder_is_coincident() {
        let tol = ToleranceConfig::default();
        let circle = CurveGeom::Circle(Circle::new(p(0.0, 0.0, 1.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let cyl = SurfaceGeom::Cylinder(Cylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let loci = intersect_curve_surface(&circle, (0.0, TAU), &cyl, 1e-7, &tol).unwrap();
        assert_eq!(loci.len(), 1);
        assert!(matches!(loci[0], Locus::Coincident { first: Some(_), .. }));
    }

    #[test]
    fn line_through_a_torus_is_sampled() {
        let tol = ToleranceConfig::default();
        let torus = SurfaceGeom::Torus(
            Torus::new(p(0.0, 0.0, 0.0), 3.0, 1.0, Vector3::z(), Vector3::x()).unwrap(),
        );
        let line = CurveGeom::Line(Line::new(p(-5.0, 0.0, 0.0), Vector3::x()).unwrap());
        let hits = points(&intersect_curve_surface(&line, (0.0, 10.0), &torus, 1e-7, &tol).unwrap());
        let mut xs: Vec<f64> = hits.iter().map(|(q, _)| q.x).collect();
        xs.sort_by(f64::total_cmp);
        assert_eq!(xs.len(), 4);
        for (x, expected) in xs.iter().zip([-4.0, -2.0, 2.0, 4.0]) {
            assert!((x - expected).abs() < 1e-6, "x = {x}");
        }
    }
}
