use std::collections::HashSet;

use super::compound::CompoundId;
use super::edge::EdgeId;
use super::face::FaceId;
use super::shell::ShellId;
use super::solid::SolidId;
use super::vertex::VertexId;
use super::wire::WireId;
use super::TopologyStore;

/// A typed handle to any entity in the [`TopologyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    Vertex(VertexId),
    Edge(EdgeId),
    Wire(WireId),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
    Compound(CompoundId),
}

/// The kind of a [`Shape`], ordered from leaves to containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    Compound,
}

impl Shape {
    /// Returns the kind of this shape.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Vertex(_) => ShapeKind::Vertex,
            Self::Edge(_) => ShapeKind::Edge,
            Self::Wire(_) => ShapeKind::Wire,
            Self::Face(_) => ShapeKind::Face,
            Self::Shell(_) => ShapeKind::Shell,
            Self::Solid(_) => ShapeKind::Solid,
            Self::Compound(_) => ShapeKind::Compound,
        }
    }
}

impl From<VertexId> for Shape {
    fn from(id: VertexId) -> Self {
        Self::Vertex(id)
    }
}

impl From<EdgeId> for Shape {
    fn from(id: EdgeId) -> Self {
        Self::Edge(id)
    }
}

impl From<FaceId> for Shape {
    fn from(id: FaceId) -> Self {
        Self::Face(id)
    }
}

impl From<SolidId> for Shape {
    fn from(id: SolidId) -> Self {
        Self::Solid(id)
    }
}

impl From<ShellId> for Shape {
    fn from(id: ShellId) -> Self {
        Self::Shell(id)
    }
}

impl From<CompoundId> for Shape {
    fn from(id: CompoundId) -> Self {
        Self::Compound(id)
    }
}

/// Lazy depth-first traversal yielding every distinct sub-shape of one kind.
///
/// Missing ids are skipped. The traversal can be restarted by calling
/// [`TopologyStore::explore`] again.
pub struct Explorer<'a> {
    store: &'a TopologyStore,
    kind: ShapeKind,
    stack: Vec<Shape>,
    seen: HashSet<Shape>,
}

impl<'a> Explorer<'a> {
    pub(super) fn new(store: &'a TopologyStore, root: Shape, kind: ShapeKind) -> Self {
        Self {
            store,
            kind,
            stack: vec![root],
            seen: HashSet::new(),
        }
    }

    fn push_children(&mut self, shape: Shape) {
        let store = self.store;
        let start = self.stack.len();
        match shape {
            Shape::Vertex(_) => {}
            Shape::Edge(id) => {
                if let Ok(e) = store.edge(id) {
                    self.stack.push(Shape::Vertex(e.start));
                    self.stack.push(Shape::Vertex(e.end));
                }
            }
            Shape::Wire(id) => {
                if let Ok(w) = store.wire(id) {
                    self.stack.extend(w.edges.iter().map(|oe| Shape::Edge(oe.edge)));
                }
            }
            Shape::Face(id) => {
                if let Ok(f) = store.face(id) {
                    self.stack.extend(f.wires().map(Shape::Wire));
                }
            }
            Shape::Shell(id) => {
                if let Ok(s) = store.shell(id) {
                    self.stack.extend(s.faces.iter().copied().map(Shape::Face));
                }
            }
            Shape::Solid(id) => {
                if let Ok(s) = store.solid(id) {
                    self.stack.extend(s.shells().map(Shape::Shell));
                }
            }
            Shape::Compound(id) => {
                if let Ok(c) = store.compound(id) {
                    self.stack.extend(c.children.iter().map(|(s, _)| *s));
                }
            }
        }
        // Keep document order: the first child is visited first.
        self.stack[start..].reverse();
    }
}

impl Iterator for Explorer<'_> {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        while let Some(shape) = self.stack.pop() {
            if !self.seen.insert(shape) {
                continue;
            }
            let kind = shape.kind();
            if kind == self.kind {
                return Some(shape);
            }
            if kind > self.kind {
                self.push_children(shape);
            }
        }
        None
    }
}
