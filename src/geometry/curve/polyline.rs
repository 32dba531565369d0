use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3};

use super::{Curve, CurveDerivatives, CurveDomain};

/// A piecewise-linear curve through an ordered list of points.
///
/// The parameter of vertex `i` is `i`, so the domain is `[0, n - 1]`.
/// Intersection curves between curved surfaces are carried as polylines
/// whose vertices lie on both surfaces.
#[derive(Debug, Clone)]
pub struct Polyline {
    points: Vec<Point3>,
}

impl Polyline {
    /// Creates a polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two points are given.
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        if points.len() < 2 {
            return Err(
                GeometryError::Degenerate("polyline needs at least two points".into()).into(),
            );
        }
        Ok(Self { points })
    }

    /// Returns the vertices.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[allow(clippy::cast_precision_loss)]
    fn last_param(&self) -> f64 {
        (self.points.len() - 1) as f64
    }

    /// Returns `t0`, every vertex parameter strictly between, and `t1`.
    #[must_use]
    pub fn breakpoints_between(&self, t0: f64, t1: f64) -> Vec<f64> {
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let mut out = vec![t0];
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let inner: Vec<f64> = ((lo.floor().max(0.0) as usize)..self.points.len())
            .map(|i| i as f64)
            .filter(|&t| t > lo + 1e-9 && t < hi - 1e-9)
            .collect();
        if t0 <= t1 {
            out.extend(inner);
        } else {
            out.extend(inner.into_iter().rev());
        }
        out.push(t1);
        out
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn segment_of(&self, t: f64) -> usize {
        let max_seg = self.points.len() - 2;
        (t.max(0.0).floor() as usize).min(max_seg)
    }
}

impl Curve for Polyline {
    fn derivatives(&self, t: f64) -> Result<CurveDerivatives> {
        self.domain().check(t)?;
        let i = self.segment_of(t);
        #[allow(clippy::cast_precision_loss)]
        let local = t - i as f64;
        let a = self.points[i];
        let b = self.points[i + 1];
        Ok(CurveDerivatives {
            point: a + (b - a) * local,
            d1: b - a,
            d2: Vector3::zeros(),
        })
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, self.last_param())
    }

    fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => self.points.len() > 2 && (a - b).norm() < 1e-12,
            _ => false,
        }
    }

    fn parameter_of(&self, point: &Point3) -> f64 {
        let mut best = (f64::INFINITY, 0.0);
        for i in 0..self.points.len() - 1 {
            let a = self.points[i];
            let ab = self.points[i + 1] - a;
            let len_sq = ab.norm_squared();
            let s = if len_sq > 0.0 {
                ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dist = (a + ab * s - point).norm();
            if dist < best.0 {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 + s;
                best = (dist, t);
            }
        }
        best.1
    }
}
