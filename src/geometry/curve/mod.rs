mod circle;
mod ellipse;
mod line;
mod polyline;

pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;
pub use polyline::Polyline;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }

    /// Rejects `t` outside the domain (with a small relative slack).
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`] when `t` is outside.
    pub fn check(&self, t: f64) -> Result<()> {
        let slack = 1e-9 * (self.t_max - self.t_min).abs().max(1.0);
        if t < self.t_min - slack || t > self.t_max + slack || t.is_nan() {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "t",
                value: t,
                min: self.t_min,
                max: self.t_max,
            }
            .into());
        }
        Ok(())
    }
}

/// Point and derivatives of a curve at one parameter.
#[derive(Debug, Clone, Copy)]
pub struct CurveDerivatives {
    /// Position.
    pub point: Point3,
    /// First derivative with respect to the parameter.
    pub d1: Vector3,
    /// Second derivative with respect to the parameter.
    pub d2: Vector3,
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the point and its first two derivatives at `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if `t` is outside the domain of a non-periodic curve.
    fn derivatives(&self, t: f64) -> Result<CurveDerivatives>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;

    /// Returns the parameter of the point on the curve closest to `point`.
    fn parameter_of(&self, point: &Point3) -> f64;

    /// Returns the period for periodic curves.
    fn period(&self) -> Option<f64> {
        None
    }

    /// Returns whether the parametrization wraps around.
    fn is_periodic(&self) -> bool {
        self.period().is_some()
    }

    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if `t` is outside the domain of a non-periodic curve.
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.derivatives(t)?.point)
    }

    /// Computes the unit tangent at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Vector3> {
        let d1 = self.derivatives(t)?.d1;
        let len = d1.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(d1 / len)
    }
}

/// The closed set of curve families an edge can carry.
#[derive(Debug, Clone)]
pub enum CurveGeom {
    /// An infinite line, parametrized by arc length.
    Line(Line),
    /// A full circle, `t` in radians.
    Circle(Circle),
    /// A full ellipse, `t` in radians.
    Ellipse(Ellipse),
    /// A piecewise-linear curve, used for intersection curves.
    Polyline(Polyline),
}

impl Curve for CurveGeom {
    fn derivatives(&self, t: f64) -> Result<CurveDerivatives> {
        match self {
            Self::Line(c) => c.derivatives(t),
            Self::Circle(c) => c.derivatives(t),
            Self::Ellipse(c) => c.derivatives(t),
            Self::Polyline(c) => c.derivatives(t),
        }
    }

    fn domain(&self) -> CurveDomain {
        match self {
            Self::Line(c) => c.domain(),
            Self::Circle(c) => c.domain(),
            Self::Ellipse(c) => c.domain(),
            Self::Polyline(c) => c.domain(),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Line(c) => c.is_closed(),
            Self::Circle(c) => c.is_closed(),
            Self::Ellipse(c) => c.is_closed(),
            Self::Polyline(c) => c.is_closed(),
        }
    }

    fn parameter_of(&self, point: &Point3) -> f64 {
        match self {
            Self::Line(c) => c.parameter_of(point),
            Self::Circle(c) => c.parameter_of(point),
            Self::Ellipse(c) => c.parameter_of(point),
            Self::Polyline(c) => c.parameter_of(point),
        }
    }

    fn period(&self) -> Option<f64> {
        match self {
            Self::Line(c) => c.period(),
            Self::Circle(c) => c.period(),
            Self::Ellipse(c) => c.period(),
            Self::Polyline(c) => c.period(),
        }
    }
}

impl CurveGeom {
    /// Parameter of the point closest to `point`, shifted by whole periods
    /// into `[t_start, t_start + period)` for periodic curves.
    #[must_use]
    pub fn parameter_in_range(&self, point: &Point3, t_start: f64, t_end: f64) -> f64 {
        let t = self.parameter_of(point);
        match self.period() {
            Some(period) => {
                let shifted = t_start + (t - t_start).rem_euclid(period);
                // A point at the closing vertex of a full-period range maps to
                // t_start; prefer the end when it is nearer.
                if (shifted - t_start).abs() < 1e-12 && (t_end - t_start - period).abs() < 1e-9 {
                    let to_start = self.evaluate(t_start).map_or(f64::INFINITY, |p| (p - point).norm());
                    let to_end = self.evaluate(t_end).map_or(f64::INFINITY, |p| (p - point).norm());
                    if to_end < to_start {
                        return t_end;
                    }
                }
                shifted
            }
            None => t,
        }
    }

    /// Samples `[t0, t1]` so that chords deviate at most `deflection` from
    /// the curve. Always returns at least the two end samples.
    #[must_use]
    pub fn sample_params(&self, t0: f64, t1: f64, deflection: f64) -> Vec<f64> {
        let n = match self {
            Self::Line(_) => 1,
            Self::Circle(c) => arc_chords(c.radius(), (t1 - t0).abs(), deflection),
            Self::Ellipse(e) => arc_chords(e.semi_major(), (t1 - t0).abs(), deflection),
            Self::Polyline(pl) => {
                return pl.breakpoints_between(t0, t1);
            }
        };
        #[allow(clippy::cast_precision_loss)]
        (0..=n)
            .map(|i| t0 + (t1 - t0) * (i as f64) / (n as f64))
            .collect()
    }
}

fn arc_chords(radius: f64, sweep: f64, deflection: f64) -> usize {
    let ratio = (1.0 - deflection / radius.max(deflection * 2.0)).clamp(-1.0, 1.0);
    let step = (2.0 * ratio.acos()).max(1e-3);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (sweep / step).ceil() as usize;
    // A closed circle needs enough chords for a non-degenerate polygon.
    let floor = if sweep > std::f64::consts::PI { 8 } else { 2 };
    n.clamp(floor, 512)
}
