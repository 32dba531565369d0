//! Pairwise intersection of curves and surfaces.
//!
//! Every routine returns the full list of loci it found or a
//! [`Diagnostic`] saying why the answer could not be trusted. Analytic
//! solutions are used where the pair admits one; everything else is
//! sampled and refined with bounded iterations.

mod curve_curve;
mod curve_surface;
mod roots;
mod surface_surface;

pub use curve_curve::intersect_curves;
pub use curve_surface::{intersect_curve_surface, line_hits};
pub use surface_surface::intersect_surfaces;

use crate::geometry::curve::CurveGeom;
use crate::math::Point3;

use super::report::Diagnostic;

/// Parameters of a locus point on one input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Curve(f64),
    Surface(f64, f64),
}

impl Param {
    /// The curve parameter, if the input was a curve.
    #[must_use]
    pub fn curve(self) -> Option<f64> {
        match self {
            Self::Curve(t) => Some(t),
            Self::Surface(..) => None,
        }
    }
}

/// One connected piece of an intersection.
#[derive(Debug, Clone)]
pub enum Locus {
    /// An isolated point. `tangent` is set when the inputs touch without
    /// crossing.
    Point {
        point: Point3,
        first: Param,
        second: Param,
        tangent: bool,
    },
    /// A curve along which two surfaces cross, valid over `range`.
    Curve {
        curve: CurveGeom,
        range: (f64, f64),
        closed: bool,
    },
    /// The inputs coincide. Curve inputs carry the parameter interval of
    /// the overlap; surface inputs carry `None`.
    Coincident {
        first: Option<(f64, f64)>,
        second: Option<(f64, f64)>,
    },
}

/// Outcome of a pairwise intersection.
pub type IntersectResult = std::result::Result<Vec<Locus>, Diagnostic>;

/// Fewest intervals a sampled curve is cut into before roots are searched.
const MIN_INTERVALS: usize = 16;

/// Splits every interval evenly so the whole range has at least
/// [`MIN_INTERVALS`] of them.
fn densify(params: &[f64]) -> Vec<f64> {
    let intervals = params.len().saturating_sub(1).max(1);
    let per = MIN_INTERVALS.div_ceil(intervals).max(1);
    let mut out = Vec::with_capacity(intervals * per + 1);
    for pair in params.windows(2) {
        for k in 0..per {
            #[allow(clippy::cast_precision_loss)]
            out.push(pair[0] + (pair[1] - pair[0]) * k as f64 / per as f64);
        }
    }
    if let Some(&last) = params.last() {
        out.push(last);
    }
    out
}

fn locus_parameter(locus: &Locus) -> f64 {
    match locus {
        Locus::Point { first, .. } => first.curve().unwrap_or(0.0),
        Locus::Coincident { first, .. } => first.map_or(0.0, |r| r.0),
        Locus::Curve { range, .. } => range.0,
    }
}

fn sort_by_parameter(loci: &mut [Locus]) {
    loci.sort_by(|a, b| locus_parameter(a).total_cmp(&locus_parameter(b)));
}

/// Drops points that repeat an earlier point or fall inside a coincident
/// interval.
fn dedup_points(loci: &mut Vec<Locus>, tolerance: f64) {
    let intervals: Vec<(f64, f64)> = loci
        .iter()
        .filter_map(|l| match l {
            Locus::Coincident { first: Some(r), .. } => Some(*r),
            _ => None,
        })
        .collect();
    let mut seen: Vec<Point3> = Vec::new();
    loci.retain(|l| match l {
        Locus::Point { point, first, .. } => {
            let t = first.curve().unwrap_or(f64::NAN);
            if intervals.iter().any(|&(a, b)| t >= a.min(b) && t <= a.max(b)) {
                return false;
            }
            if seen.iter().any(|q| (q - point).norm() <= tolerance) {
                return false;
            }
            seen.push(*point);
            true
        }
        _ => true,
    });
}
