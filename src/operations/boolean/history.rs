use std::collections::{HashMap, HashSet};

use crate::topology::{OrientedEdge, Shape, ShapeCopy, TopologyStore};

use super::ds::BopDs;

/// What became of the sub-shapes of the arguments.
///
/// Queries take the shapes the caller passed in, even when an argument
/// was copied internally before the run.
#[derive(Debug, Clone, Default)]
pub struct History {
    modified: HashMap<Shape, Vec<Shape>>,
    generated: HashMap<Shape, Vec<Shape>>,
    deleted: HashSet<Shape>,
}

impl History {
    /// Collects the history of `inputs` against the shapes `ds` flags as
    /// kept.
    ///
    /// Each input comes with the copy it was replaced by, if any.
    pub(crate) fn collect(
        store: &TopologyStore,
        ds: &BopDs,
        inputs: &[(Shape, Option<&ShapeCopy>)],
    ) -> Self {
        let mut history = Self::default();
        for &(root, copy) in inputs {
            let subs = store
                .vertices_of(root)
                .into_iter()
                .map(Shape::Vertex)
                .chain(store.edges_of(root).into_iter().map(Shape::Edge))
                .chain(store.faces_of(root).into_iter().map(Shape::Face));
            for shape in subs {
                let internal = copy
                    .and_then(|c| c.map.get(&shape).copied())
                    .unwrap_or(shape);
                let mut modified: Vec<Shape> = ds
                    .modified(internal)
                    .iter()
                    .map(|&s| resolve(ds, s))
                    .filter(|s| *s != internal && ds.is_kept(*s))
                    .collect();
                let mut generated: Vec<Shape> = ds
                    .generated(internal)
                    .iter()
                    .map(|&s| resolve(ds, s))
                    .filter(|s| ds.is_kept(*s))
                    .collect();
                modified.sort();
                modified.dedup();
                generated.sort();
                generated.dedup();
                if !ds.is_kept(internal) && modified.is_empty() {
                    history.deleted.insert(shape);
                }
                if !modified.is_empty() {
                    history.modified.insert(shape, modified);
                }
                if !generated.is_empty() {
                    history.generated.insert(shape, generated);
                }
            }
        }
        history
    }

    /// Shapes of the result that `shape` was split or merged into.
    ///
    /// Empty when the shape went into the result unchanged or was
    /// deleted.
    #[must_use]
    pub fn modified(&self, shape: Shape) -> &[Shape] {
        self.modified.get(&shape).map_or(&[], Vec::as_slice)
    }

    /// Shapes of lower dimension in the result that `shape` gave rise to,
    /// such as the section edges of a face.
    #[must_use]
    pub fn generated(&self, shape: Shape) -> &[Shape] {
        self.generated.get(&shape).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if neither `shape` nor any image of it is in the
    /// result.
    #[must_use]
    pub fn is_deleted(&self, shape: Shape) -> bool {
        self.deleted.contains(&shape)
    }

    #[must_use]
    pub fn has_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    #[must_use]
    pub fn has_generated(&self) -> bool {
        !self.generated.is_empty()
    }

    #[must_use]
    pub fn has_deleted(&self) -> bool {
        !self.deleted.is_empty()
    }
}

/// The shape standing for `shape` after vertex merging and edge sharing.
fn resolve(ds: &BopDs, shape: Shape) -> Shape {
    match shape {
        Shape::Vertex(v) => Shape::Vertex(ds.real(v)),
        Shape::Edge(e) => Shape::Edge(ds.image(OrientedEdge::new(e, true)).edge),
        other => other,
    }
}
