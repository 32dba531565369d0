use crate::error::Result;
use crate::math::{Point3, ToleranceConfig};
use crate::operations::boolean::{classify_point_in_solid, PointClassification};
use crate::topology::{Shape, TopologyStore};

/// Classifies a point against a solid or a compound of solids.
pub struct PointInSolid {
    shape: Shape,
    point: Point3,
    tol: ToleranceConfig,
}

impl PointInSolid {
    #[must_use]
    pub fn new(shape: impl Into<Shape>, point: Point3) -> Self {
        Self {
            shape: shape.into(),
            point,
            tol: ToleranceConfig::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tol: ToleranceConfig) -> Self {
        self.tol = tol;
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if a face of the shape cannot be sampled.
    pub fn execute(&self, store: &TopologyStore) -> Result<PointClassification> {
        classify_point_in_solid(store, &self.point, self.shape, &self.tol)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeBox;

    #[test]
    fn centre_of_a_box_is_inside() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let inside = PointInSolid::new(solid, Point3::new(0.5, 0.5, 0.5)).execute(&store).unwrap();
        assert_eq!(inside, PointClassification::Inside);
        let outside = PointInSolid::new(solid, Point3::new(2.0, 0.5, 0.5)).execute(&store).unwrap();
        assert_eq!(outside, PointClassification::Outside);
    }
}
