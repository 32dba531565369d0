use crate::error::Result;
use crate::geometry::curve::{Curve, CurveGeom};
use crate::math::Point3;

use super::vertex::{VertexId, DEFAULT_VERTEX_TOLERANCE};

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// Data associated with a topological edge.
///
/// An edge connects two vertices and carries the curve and the parameter
/// range `[t_start, t_end]` bounding it. A closed edge (full circle) has
/// `start == end`.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: CurveGeom,
    /// Parameter on the curve corresponding to the start vertex.
    pub t_start: f64,
    /// Parameter on the curve corresponding to the end vertex.
    pub t_end: f64,
    /// Maximum deviation between the curve and the true edge locus.
    pub tolerance: f64,
}

impl EdgeData {
    /// Creates an edge with the default tolerance.
    #[must_use]
    pub fn new(start: VertexId, end: VertexId, curve: CurveGeom, t_start: f64, t_end: f64) -> Self {
        Self {
            start,
            end,
            curve,
            t_start,
            t_end,
            tolerance: DEFAULT_VERTEX_TOLERANCE,
        }
    }

    /// Evaluates the edge curve at `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if `t` is outside the curve domain.
    pub fn point_at(&self, t: f64) -> Result<Point3> {
        self.curve.evaluate(t)
    }

    /// Point at the middle of the parameter range.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated.
    pub fn midpoint(&self) -> Result<Point3> {
        self.curve.evaluate(0.5 * (self.t_start + self.t_end))
    }

    /// Returns `true` for an edge whose two ends are the same vertex.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.start == self.end
    }
}
