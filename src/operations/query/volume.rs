use crate::error::Result;
use crate::tessellation::{TessellateShape, TessellationParams};
use crate::topology::{Shape, TopologyStore};

/// Computes the volume enclosed by the faces of a shape.
///
/// The faces are triangulated in their parameter space and the signed
/// tetrahedra of the triangles against the origin are summed. Void shells
/// face inward and subtract themselves. A compound encloses what its
/// solids enclose; free shells in it count for nothing.
pub struct Volume {
    shape: Shape,
    params: TessellationParams,
}

impl Volume {
    /// Creates a new `Volume` query with default tessellation parameters.
    #[must_use]
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            params: TessellationParams::default(),
        }
    }

    /// Sets custom tessellation parameters for higher accuracy.
    #[must_use]
    pub fn with_params(mut self, params: TessellationParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the query. Shapes without faces have zero volume.
    ///
    /// # Errors
    ///
    /// Returns an error if a face cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<f64> {
        if !matches!(self.shape, Shape::Compound(_)) {
            let mesh = TessellateShape::new(self.shape, self.params).execute(store)?;
            return Ok(mesh.signed_volume());
        }
        let mut total = 0.0;
        for solid in store.solids_of(self.shape) {
            let mesh = TessellateShape::new(Shape::Solid(solid), self.params).execute(store)?;
            total += mesh.signed_volume();
        }
        Ok(total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point3, Vector3};
    use crate::operations::creation::{MakeBox, MakeCylinder};
    use crate::topology::CompoundData;
    use std::f64::consts::PI;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_volume() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 3.0, 4.0)).execute(&mut store).unwrap();
        let volume = Volume::new(solid).execute(&store).unwrap();
        assert!((volume - 24.0).abs() < 1e-9);
    }

    #[test]
    fn free_shells_of_a_compound_enclose_nothing() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let other = MakeBox::new(p(3.0, 0.0, 0.0), p(5.0, 2.0, 2.0)).execute(&mut store).unwrap();
        let shell = store.solid(other).unwrap().outer_shell;
        let both = store.add_compound(CompoundData::of([Shape::Solid(solid), Shape::Shell(shell)]));
        let volume = Volume::new(Shape::Compound(both)).execute(&store).unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
        let alone = Volume::new(Shape::Shell(shell)).execute(&store).unwrap();
        assert!((alone - 8.0).abs() < 1e-9);
        let only_shells = store.add_compound(CompoundData::of([Shape::Shell(shell)]));
        let none = Volume::new(Shape::Compound(only_shells)).execute(&store).unwrap();
        assert!(none.abs() < 1e-12);
    }

    #[test]
    fn cylinder_volume_within_deflection() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 2.0)
            .execute(&mut store)
            .unwrap();
        let volume = Volume::new(solid).execute(&store).unwrap();
        assert!((volume - 2.0 * PI).abs() < 2e-2, "volume {volume}");
    }
}
