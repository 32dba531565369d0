use crate::geometry::curve::{Curve, CurveGeom, Line};
use crate::math::{Point3, ToleranceConfig, Vector3};

use super::{dedup_points, densify, sort_by_parameter, IntersectResult, Locus, Param};

/// Intersects `a` over `range_a` with `b` over `range_b`.
///
/// Coincident stretches come back as one interval per stretch, with the
/// parameters on `b` listed in the order matching the ends on `a`.
///
/// # Errors
///
/// Never fails for line pairs; sampled pairs report candidates whose
/// refinement did not converge as isolated points at the best estimate.
pub fn intersect_curves(
    a: &CurveGeom,
    range_a: (f64, f64),
    b: &CurveGeom,
    range_b: (f64, f64),
    tolerance: f64,
    tol: &ToleranceConfig,
) -> IntersectResult {
    let range_a = ordered(range_a);
    let range_b = ordered(range_b);
    if let (CurveGeom::Line(la), CurveGeom::Line(lb)) = (a, b) {
        return Ok(line_line(la, range_a, lb, range_b, tolerance, tol));
    }
    Ok(sampled(a, range_a, b, range_b, tolerance, tol))
}

fn ordered(r: (f64, f64)) -> (f64, f64) {
    (r.0.min(r.1), r.0.max(r.1))
}

fn line_line(
    la: &Line,
    (a0, a1): (f64, f64),
    lb: &Line,
    (b0, b1): (f64, f64),
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Vec<Locus> {
    let (oa, da) = (*la.origin(), *la.direction());
    let (ob, db) = (*lb.origin(), *lb.direction());
    let on_b = |s: f64| (oa + da * s - ob).dot(&db);

    if da.cross(&db).norm() < tol.angular.max(1e-12) {
        if (ob - oa).cross(&da).norm() > tolerance {
            return Vec::new();
        }
        let on_a = |t: f64| (ob + db * t - oa).dot(&da);
        let (p, q) = (on_a(b0), on_a(b1));
        let lo = a0.max(p.min(q));
        let hi = a1.min(p.max(q));
        if hi < lo - tolerance {
            return Vec::new();
        }
        if hi - lo <= tolerance {
            let s = 0.5 * (lo + hi);
            return vec![Locus::Point {
                point: oa + da * s,
                first: Param::Curve(s),
                second: Param::Curve(on_b(s).clamp(b0, b1)),
                tangent: true,
            }];
        }
        return vec![Locus::Coincident {
            first: Some((lo, hi)),
            second: Some((on_b(lo), on_b(hi))),
        }];
    }

    // Closest points of the two infinite lines.
    let w0 = oa - ob;
    let cos = da.dot(&db);
    let (d, e) = (da.dot(&w0), db.dot(&w0));
    let denom = 1.0 - cos * cos;
    let s = (cos * e - d) / denom;
    let t = (e - cos * d) / denom;
    let (pa, pb) = (oa + da * s, ob + db * t);
    let inside = |x: f64, lo: f64, hi: f64| x >= lo - tolerance && x <= hi + tolerance;
    if (pa - pb).norm() > tolerance || !inside(s, a0, a1) || !inside(t, b0, b1) {
        return Vec::new();
    }
    vec![Locus::Point {
        point: Point3::from((pa.coords + pb.coords) * 0.5),
        first: Param::Curve(s.clamp(a0, a1)),
        second: Param::Curve(t.clamp(b0, b1)),
        tangent: false,
    }]
}

/// Closest points of segments `[p0, p1]` and `[q0, q1]` as fractions along
/// each, with their distance.
fn segment_closest(p0: &Point3, p1: &Point3, q0: &Point3, q1: &Point3) -> (f64, f64, f64) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);
    let (s, t) = if a <= f64::EPSILON && e <= f64::EPSILON {
        (0.0, 0.0)
    } else if a <= f64::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= f64::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > f64::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    let dist = ((p0 + d1 * s) - (q0 + d2 * t)).norm();
    (s, t, dist)
}

/// Gauss-Newton on `a(s) - b(t)` from `(s, t)`, clamped to the ranges.
fn refine(
    a: &CurveGeom,
    range_a: (f64, f64),
    b: &CurveGeom,
    range_b: (f64, f64),
    (mut s, mut t): (f64, f64),
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Option<(f64, f64, Point3, bool)> {
    let mut parallel = false;
    for _ in 0..tol.max_iterations {
        let (Ok(ea), Ok(eb)) = (a.derivatives(s), b.derivatives(t)) else {
            return None;
        };
        let f: Vector3 = ea.point - eb.point;
        let (ja, jb) = (ea.d1, -eb.d1);
        let m00 = ja.dot(&ja);
        let m01 = ja.dot(&jb);
        let m11 = jb.dot(&jb);
        let det = m00 * m11 - m01 * m01;
        parallel = det <= 1e-12 * m00 * m11;
        if f.norm() <= tolerance * 1e-3 || parallel {
            break;
        }
        let (g0, g1) = (ja.dot(&f), jb.dot(&f));
        let ds = -(m11 * g0 - m01 * g1) / det;
        let dt = -(m00 * g1 - m01 * g0) / det;
        s = (s + ds).clamp(range_a.0, range_a.1);
        t = (t + dt).clamp(range_b.0, range_b.1);
        if ds.abs() + dt.abs() <= tol.parametric {
            break;
        }
    }
    let pa = a.evaluate(s).ok()?;
    let pb = b.evaluate(t).ok()?;
    ((pa - pb).norm() <= tolerance).then(|| {
        (s, t, Point3::from((pa.coords + pb.coords) * 0.5), parallel)
    })
}

fn sampled(
    a: &CurveGeom,
    range_a: (f64, f64),
    b: &CurveGeom,
    range_b: (f64, f64),
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Vec<Locus> {
    let sa = densify(&a.sample_params(range_a.0, range_a.1, tol.deflection));
    let sb = densify(&b.sample_params(range_b.0, range_b.1, tol.deflection));
    let pa: Vec<Option<Point3>> = sa.iter().map(|&t| a.evaluate(t).ok()).collect();
    let pb: Vec<Option<Point3>> = sb.iter().map(|&t| b.evaluate(t).ok()).collect();

    let mut loci = coincident_runs(a, &sa, &pa, b, range_b, tolerance, tol);

    let reach = tolerance + 2.0 * tol.deflection;
    for i in 0..sa.len().saturating_sub(1) {
        let (Some(p0), Some(p1)) = (pa[i], pa[i + 1]) else {
            continue;
        };
        for j in 0..sb.len().saturating_sub(1) {
            let (Some(q0), Some(q1)) = (pb[j], pb[j + 1]) else {
                continue;
            };
            let (u, v, dist) = segment_closest(&p0, &p1, &q0, &q1);
            if dist > reach {
                continue;
            }
            let guess = (
                sa[i] + (sa[i + 1] - sa[i]) * u,
                sb[j] + (sb[j + 1] - sb[j]) * v,
            );
            if let Some((s, t, point, tangent)) =
                refine(a, range_a, b, range_b, guess, tolerance, tol)
            {
                loci.push(Locus::Point {
                    point,
                    first: Param::Curve(s),
                    second: Param::Curve(t),
                    tangent,
                });
            }
        }
    }
    sort_by_parameter(&mut loci);
    dedup_points(&mut loci, tolerance);
    loci
}

/// Stretches of `a` lying on `b`, one interval per run of close samples.
fn coincident_runs(
    a: &CurveGeom,
    sa: &[f64],
    pa: &[Option<Point3>],
    b: &CurveGeom,
    range_b: (f64, f64),
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Vec<Locus> {
    let project = |p: &Point3| -> Option<(f64, f64)> {
        let t = b
            .parameter_in_range(p, range_b.0, range_b.1)
            .clamp(range_b.0, range_b.1);
        let q = b.evaluate(t).ok()?;
        Some((t, (q - p).norm()))
    };
    let close_at = |s: f64| {
        a.evaluate(s)
            .ok()
            .and_then(|p| project(&p))
            .is_some_and(|(_, d)| d <= tolerance)
    };
    let close: Vec<bool> = pa
        .iter()
        .map(|p| p.and_then(|p| project(&p)).is_some_and(|(_, d)| d <= tolerance))
        .collect();

    // Moves a run end from a close sample toward a far one.
    let settle = |mut inside: f64, mut outside: f64| {
        for _ in 0..tol.max_iterations {
            if (outside - inside).abs() <= tol.parametric {
                break;
            }
            let mid = 0.5 * (inside + outside);
            if close_at(mid) {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside
    };

    let mut loci = Vec::new();
    let mut i = 0;
    while i < close.len() {
        if !close[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i + 1 < close.len() && close[i + 1] {
            i += 1;
        }
        let end = i;
        i += 1;
        if end == start || !close_at(0.5 * (sa[start] + sa[start + 1])) {
            continue;
        }
        let s0 = if start > 0 { settle(sa[start], sa[start - 1]) } else { sa[start] };
        let s1 = if end + 1 < sa.len() { settle(sa[end], sa[end + 1]) } else { sa[end] };
        let (Ok(p0), Ok(p1)) = (a.evaluate(s0), a.evaluate(s1)) else {
            continue;
        };
        let length: f64 = sa[start..=end]
            .windows(2)
            .filter_map(|w| Some((a.evaluate(w[1]).ok()? - a.evaluate(w[0]).ok()?).norm()))
            .sum();
        if length <= tolerance {
            continue;
        }
        let (Some((t0, _)), Some((t1, _))) = (project(&p0), project(&p1)) else {
            continue;
        };
        loci.push(Locus::Coincident {
            first: Some((s0, s1)),
            second: Some((t0, t1)),
        });
    }
    loci
}
