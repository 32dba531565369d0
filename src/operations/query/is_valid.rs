use std::collections::HashSet;

use crate::geometry::Curve;
use crate::math::ToleranceConfig;
use crate::topology::{EdgeId, FaceId, Shape, ShapeKind, ShellId, SolidId, TopologyStore, WireId};

use super::Volume;

/// A defect found by [`IsValid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidity {
    /// A referenced entity does not exist.
    Missing(String),
    /// A shell of a solid is open or uses an edge more than twice.
    OpenShell(ShellId),
    /// Consecutive edges of a wire do not share their vertex.
    BrokenWire(WireId),
    /// An edge curve ends farther from its vertex than the tolerances allow.
    VertexOffCurve(EdgeId),
    /// A face has no outer loop.
    EmptyFace(FaceId),
    /// A solid encloses no positive volume; its shells face the wrong way.
    InvertedSolid(SolidId),
    /// A compound holds a shell that bounds no solid.
    FreeShell(ShellId),
}

/// Validates the topological and geometric consistency of a shape.
///
/// Checked are closed manifold shells of every solid enclosing a positive
/// volume, compounds without loose shells, wires that chain vertex to
/// vertex, and edge curves that start and end within the tolerance of
/// their vertices.
pub struct IsValid {
    shape: Shape,
    tol: ToleranceConfig,
}

impl IsValid {
    /// Creates a new `IsValid` query.
    #[must_use]
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            tol: ToleranceConfig::default(),
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tol: ToleranceConfig) -> Self {
        self.tol = tol;
        self
    }

    /// Executes the validation, returning `true` if the shape is valid.
    #[must_use]
    pub fn execute(&self, store: &TopologyStore) -> bool {
        self.problems(store).is_empty()
    }

    /// Lists every defect found.
    #[must_use]
    pub fn problems(&self, store: &TopologyStore) -> Vec<Invalidity> {
        let mut found = Vec::new();
        if !store.contains(self.shape) {
            found.push(Invalidity::Missing(format!("{:?}", self.shape)));
            return found;
        }

        let mut bounding: HashSet<ShellId> = HashSet::new();
        for solid in store.solids_of(self.shape) {
            let Ok(data) = store.solid(solid) else {
                found.push(Invalidity::Missing(format!("{solid:?}")));
                continue;
            };
            let mut closed_all = true;
            for shell in data.shells() {
                bounding.insert(shell);
                let closed = store
                    .shell(shell)
                    .ok()
                    .and_then(|s| store.is_closed_shell(&s.faces).ok());
                if closed != Some(true) {
                    closed_all = false;
                    found.push(Invalidity::OpenShell(shell));
                }
            }
            if closed_all
                && Volume::new(solid)
                    .execute(store)
                    .is_ok_and(|volume| volume <= 0.0)
            {
                found.push(Invalidity::InvertedSolid(solid));
            }
        }

        if matches!(self.shape, Shape::Compound(_)) {
            for shell in store.explore(self.shape, ShapeKind::Shell) {
                if let Shape::Shell(id) = shell {
                    if !bounding.contains(&id) {
                        found.push(Invalidity::FreeShell(id));
                    }
                }
            }
        }

        for face in store.faces_of(self.shape) {
            let Ok(data) = store.face(face) else {
                found.push(Invalidity::Missing(format!("{face:?}")));
                continue;
            };
            for wire in data.wires() {
                match self.wire_chains(store, wire) {
                    Some(true) => {}
                    Some(false) => found.push(Invalidity::BrokenWire(wire)),
                    None => found.push(Invalidity::EmptyFace(face)),
                }
            }
        }

        for edge in store.edges_of(self.shape) {
            if !self.edge_meets_vertices(store, edge) {
                found.push(Invalidity::VertexOffCurve(edge));
            }
        }
        found
    }

    /// `None` when the wire is missing or empty.
    fn wire_chains(&self, store: &TopologyStore, wire: WireId) -> Option<bool> {
        let data = store.wire(wire).ok()?;
        if data.edges.is_empty() {
            return None;
        }
        let mut ends = Vec::with_capacity(data.edges.len());
        for &oe in &data.edges {
            ends.push(store.oriented_ends(oe).ok()?);
        }
        let n = ends.len();
        let open = usize::from(!data.is_closed);
        Some((0..n - open).all(|i| ends[i].1 == ends[(i + 1) % n].0))
    }

    fn edge_meets_vertices(&self, store: &TopologyStore, edge: EdgeId) -> bool {
        let Ok(data) = store.edge(edge) else {
            return false;
        };
        [(data.start, data.t_start), (data.end, data.t_end)]
            .into_iter()
            .all(|(v, t)| {
                let (Ok(vertex), Ok(p)) = (store.vertex(v), data.curve.evaluate(t)) else {
                    return false;
                };
                let reach = self.tol.linear(vertex.tolerance.max(data.tolerance));
                (p - vertex.point).norm() <= reach + self.tol.confusion
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point3, Vector3};
    use crate::operations::creation::{MakeBox, MakeCylinder};
    use crate::topology::{CompoundData, ShellData};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn primitives_are_valid() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0)).execute(&mut store).unwrap();
        assert!(IsValid::new(solid).execute(&store));
        let cylinder = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 1.0)
            .execute(&mut store)
            .unwrap();
        assert_eq!(IsValid::new(cylinder).problems(&store), Vec::new());
    }

    #[test]
    fn missing_face_opens_the_shell() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let outer = store.solid(solid).unwrap().outer_shell;
        let mut faces = store.shell(outer).unwrap().faces.clone();
        faces.pop();
        *store.shell_mut(outer).unwrap() = ShellData {
            faces,
            is_closed: true,
        };
        assert_eq!(IsValid::new(solid).problems(&store), vec![Invalidity::OpenShell(outer)]);
    }

    #[test]
    fn inverted_solid_is_flagged() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let outer = store.solid(solid).unwrap().outer_shell;
        for face in store.shell(outer).unwrap().faces.clone() {
            let wires: Vec<WireId> = store.face(face).unwrap().wires().collect();
            for wire in wires {
                let data = store.wire_mut(wire).unwrap();
                data.edges = data.edges.iter().rev().map(|oe| oe.reversed()).collect();
            }
            let data = store.face_mut(face).unwrap();
            data.same_sense = !data.same_sense;
        }
        assert_eq!(
            IsValid::new(solid).problems(&store),
            vec![Invalidity::InvertedSolid(solid)]
        );
    }

    #[test]
    fn loose_shell_in_a_compound_is_flagged() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let other = MakeBox::new(p(3.0, 0.0, 0.0), p(4.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let mut faces = store.shell(store.solid(other).unwrap().outer_shell).unwrap().faces.clone();
        faces.truncate(3);
        let loose = store.add_shell(ShellData {
            faces,
            is_closed: false,
        });
        let compound =
            store.add_compound(CompoundData::of([Shape::Solid(solid), Shape::Shell(loose)]));
        assert_eq!(
            IsValid::new(Shape::Compound(compound)).problems(&store),
            vec![Invalidity::FreeShell(loose)]
        );
        assert!(IsValid::new(Shape::Shell(loose)).execute(&store));
    }
}
