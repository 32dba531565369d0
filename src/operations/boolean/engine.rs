use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::error::{OperationError, Result};
use crate::geometry::Curve;
use crate::math::{Point3, ToleranceConfig};
use crate::operations::query::Volume;
use crate::tessellation::{FaceDomain, PointState};
use crate::topology::{Shape, ShapeCopy, TopologyStore, VertexId};

use super::assemble::{assemble_result, assemble_section};
use super::classify::SolidClassifier;
use super::ds::{BopDs, Operand};
use super::history::History;
use super::intersect::{intersect_surfaces, Locus};
use super::merge::simplify_result;
use super::options::BooleanOptions;
use super::pave::{check_cancelled, map_items, PaveFiller};
use super::report::Warning;
use super::select::{fragment_state, should_keep_fragment, BooleanOp, FragmentState, KeepDecision};
use super::split::{split_face, FaceFragment};

/// Progress of a [`BooleanOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    NotStarted,
    InputsChecked,
    Intersected,
    Classified,
    Built,
    Done,
    Failed,
}

/// Outcome of a successful boolean run.
#[derive(Debug, Clone)]
pub struct BooleanResult {
    /// A solid, or a compound when the result has several parts or none.
    pub shape: Shape,
    pub warnings: Vec<Warning>,
    pub history: History,
}

/// Runs one boolean operation and keeps its progress.
///
/// All working state lives in the call to [`BooleanOperation::perform`];
/// the object only remembers how far the last run got and which warnings
/// it recorded, so they stay readable after a failure.
#[derive(Debug, Clone)]
pub struct BooleanOperation {
    op: BooleanOp,
    options: BooleanOptions,
    state: OperationState,
    warnings: Vec<Warning>,
}

impl BooleanOperation {
    #[must_use]
    pub fn new(op: BooleanOp, options: BooleanOptions) -> Self {
        Self {
            op,
            options,
            state: OperationState::NotStarted,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn op(&self) -> BooleanOp {
        self.op
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == OperationState::Done
    }

    /// Warnings of the last run, including a failed one.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Computes the operation on `a` and `b`, adding the result to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for missing, empty or
    /// mismatched operands, [`OperationError::NonManifoldOperand`] or
    /// [`OperationError::SelfIntersecting`] for bad solids, and
    /// [`OperationError::Cancelled`] when the cancel token fires. Any
    /// error leaves the operation in [`OperationState::Failed`].
    #[instrument(skip_all, fields(op = ?self.op))]
    pub fn perform(
        &mut self,
        store: &mut TopologyStore,
        a: Shape,
        b: Shape,
    ) -> Result<BooleanResult> {
        self.state = OperationState::NotStarted;
        self.warnings.clear();
        let outcome = self.run(store, a, b);
        match outcome {
            Ok(result) => {
                self.state = OperationState::Done;
                info!(warnings = result.warnings.len(), "boolean done");
                Ok(result)
            }
            Err(e) => {
                self.state = OperationState::Failed;
                info!(error = %e, "boolean failed");
                Err(e)
            }
        }
    }

    fn run(&mut self, store: &mut TopologyStore, a: Shape, b: Shape) -> Result<BooleanResult> {
        self.check_inputs(store, a, b)?;
        let fuzzy = self
            .options
            .fuzzy
            .unwrap_or_else(|| max_vertex_tolerance(store, a).min(max_vertex_tolerance(store, b)));
        let tol = self.options.tolerance.with_fuzzy(fuzzy);
        if self.options.check_self_intersection {
            for operand in [a, b] {
                check_self_intersection(store, operand, &tol, self.options.run_parallel)?;
            }
        }
        self.state = OperationState::InputsChecked;

        let shared: HashSet<VertexId> = store.vertices_of(a).into_iter().collect();
        let (b_run, copy) = if store.vertices_of(b).iter().any(|v| shared.contains(v)) {
            debug!("operands share records, copying the second one");
            let (copied, map) = ShapeCopy::run(store, b)?;
            (copied, Some(map))
        } else {
            (b, None)
        };

        let mut ds = BopDs::new(store, a, b_run, tol)?;
        let built = self.build(store, &mut ds);
        self.warnings = ds.warnings().to_vec();
        let shape = built?;

        for v in store.vertices_of(shape) {
            ds.mark_kept(Shape::Vertex(v), true);
        }
        for e in store.edges_of(shape) {
            ds.mark_kept(Shape::Edge(e), true);
        }
        for f in store.faces_of(shape) {
            ds.mark_kept(Shape::Face(f), true);
        }
        let history = History::collect(store, &ds, &[(a, None), (b, copy.as_ref())]);
        Ok(BooleanResult {
            shape,
            warnings: ds.take_warnings(),
            history,
        })
    }

    fn check_inputs(&self, store: &TopologyStore, a: Shape, b: Shape) -> Result<()> {
        for operand in [a, b] {
            if !store.contains(operand) {
                return Err(
                    OperationError::InvalidInput(format!("{operand:?} does not exist")).into(),
                );
            }
            if store.faces_of(operand).is_empty() {
                return Err(OperationError::InvalidInput(format!("{operand:?} has no faces")).into());
            }
        }
        let (dim_a, dim_b) = (dimension(store, a), dimension(store, b));
        if self.op == BooleanOp::Fuse && dim_a != dim_b {
            return Err(OperationError::InvalidInput(format!(
                "cannot fuse operands of dimension {dim_a} and {dim_b}"
            ))
            .into());
        }
        if self.op != BooleanOp::Section && (dim_a < 3 || dim_b < 3) {
            return Err(OperationError::InvalidInput("operands must be solids".into()).into());
        }
        for operand in [a, b] {
            for solid in store.solids_of(operand) {
                let shells: Vec<_> = store.solid(solid)?.shells().collect();
                for shell in shells {
                    let faces = &store.shell(shell)?.faces;
                    if !store.is_closed_shell(faces)? {
                        return Err(OperationError::NonManifoldOperand(format!(
                            "a shell of {solid:?} is open or non-manifold"
                        ))
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    fn build(&mut self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<Shape> {
        let options = &self.options;
        let mut filler = PaveFiller::new(store, ds, options)?;
        filler.perform(store, ds)?;
        self.state = OperationState::Intersected;
        info!(
            interferences = ds.interferences().len(),
            sections = ds.all_section_edges().len(),
            "intersection done"
        );

        if self.op == BooleanOp::Section {
            self.state = OperationState::Classified;
            let shape = assemble_section(store, ds);
            self.state = OperationState::Built;
            return Ok(shape);
        }

        let decided = self.classify(store, ds)?;
        self.state = OperationState::Classified;
        info!(
            fragments = decided.len(),
            kept = decided.iter().filter(|(_, d)| *d != KeepDecision::Discard).count(),
            "classification done"
        );

        let bound = volume_bound(store, ds, self.op)?;
        let shape = assemble_result(store, ds, &decided, bound)?;
        if self.options.simplify {
            simplify_result(store, ds, shape)?;
        }
        self.state = OperationState::Built;
        Ok(shape)
    }

    /// Splits every face of both operands and decides which fragments
    /// the result keeps.
    fn classify(
        &self,
        store: &TopologyStore,
        ds: &mut BopDs,
    ) -> Result<Vec<(FaceFragment, KeepDecision)>> {
        let options = &self.options;
        let parallel = options.run_parallel;
        let jobs: Vec<_> = ds
            .faces(Operand::A)
            .iter()
            .map(|&f| (f, Operand::A))
            .chain(ds.faces(Operand::B).iter().map(|&f| (f, Operand::B)))
            .collect();

        let splits = {
            let ds: &BopDs = ds;
            map_items(parallel, &jobs, |&(face, side)| {
                check_cancelled(options, ds)?;
                split_face(store, ds, face, side)
            })
        };
        let mut fragments = Vec::new();
        for split in splits {
            let split = split?;
            for w in split.warnings {
                ds.warn(w);
            }
            fragments.extend(split.fragments);
        }
        check_cancelled(options, ds)?;
        debug!(fragments = fragments.len(), "faces split");

        let tol = *ds.tol();
        let root = |side| {
            ds.root(side)
                .ok_or_else(|| OperationError::Failed(format!("operand {side:?} missing")))
        };
        let classifier_a = SolidClassifier::new(store, root(Operand::A)?, &tol)?;
        let classifier_b = SolidClassifier::new(store, root(Operand::B)?, &tol)?;
        let states = {
            let ds: &BopDs = ds;
            map_items(parallel, &fragments, |frag| -> Result<Result<FragmentState>> {
                check_cancelled(options, ds)?;
                let other = match frag.source {
                    Operand::A => &classifier_b,
                    Operand::B => &classifier_a,
                };
                Ok(fragment_state(store, other, frag))
            })
        };

        let mut decided = Vec::with_capacity(fragments.len());
        for (frag, state) in fragments.into_iter().zip(states) {
            let state = settle_state(ds, &frag, state?);
            let decision = should_keep_fragment(frag.source, state, self.op);
            decided.push((frag, decision));
        }
        Ok(decided)
    }
}

/// State of a fragment. A fragment that could not be classified counts as
/// outside, with an `Undetermined` warning at its center.
fn settle_state(
    ds: &mut BopDs,
    frag: &FaceFragment,
    state: Result<FragmentState>,
) -> FragmentState {
    match state {
        Ok(state) => state,
        Err(e) => {
            debug!(error = %e, face = ?frag.source_face, "fragment state undetermined");
            ds.warn(Warning::Undetermined {
                near: frag.domain.bbox().center(),
            });
            FragmentState::Out
        }
    }
}

/// Largest volume the result of `op` can enclose. Unbounded when an
/// operand holds no solid.
fn volume_bound(store: &TopologyStore, ds: &BopDs, op: BooleanOp) -> Result<f64> {
    let volume = |side: Operand| -> Result<f64> {
        match ds.root(side) {
            Some(root) if !store.solids_of(root).is_empty() => Volume::new(root).execute(store),
            _ => Ok(f64::INFINITY),
        }
    };
    let (a, b) = (volume(Operand::A)?, volume(Operand::B)?);
    Ok(match op {
        BooleanOp::Fuse => a + b,
        BooleanOp::Common => a.min(b),
        BooleanOp::Cut => a,
        BooleanOp::Cut21 => b,
        BooleanOp::Section => f64::INFINITY,
    })
}

/// Largest vertex tolerance of a shape.
fn max_vertex_tolerance(store: &TopologyStore, shape: Shape) -> f64 {
    store
        .vertices_of(shape)
        .into_iter()
        .filter_map(|v| store.vertex(v).ok())
        .map(|v| v.tolerance)
        .fold(0.0, f64::max)
}

fn dimension(store: &TopologyStore, shape: Shape) -> u8 {
    if !store.solids_of(shape).is_empty() {
        3
    } else if !store.faces_of(shape).is_empty() {
        2
    } else if !store.edges_of(shape).is_empty() {
        1
    } else {
        0
    }
}

/// Fails if two faces of `shape` that share no vertex cross each other.
fn check_self_intersection(
    store: &TopologyStore,
    shape: Shape,
    tol: &ToleranceConfig,
    parallel: bool,
) -> Result<()> {
    let faces = store.faces_of(shape);
    let domains = faces
        .iter()
        .map(|&f| FaceDomain::new(store, f, tol))
        .collect::<Result<Vec<_>>>()?;
    let boxes: Vec<_> = domains.iter().map(|d| d.surface_bbox(8)).collect();
    let vertices: Vec<HashSet<VertexId>> = faces
        .iter()
        .map(|&f| store.vertices_of(Shape::Face(f)).into_iter().collect())
        .collect();

    let mut pairs = Vec::new();
    for i in 0..faces.len() {
        for j in (i + 1)..faces.len() {
            if boxes[i].overlaps(&boxes[j]) && vertices[i].is_disjoint(&vertices[j]) {
                pairs.push((i, j));
            }
        }
    }
    let crossing = map_items(parallel, &pairs, |&(i, j)| {
        faces_cross(&domains[i], &domains[j], tol)
    });
    if let Some(&(i, j)) = pairs.iter().zip(crossing).find(|(_, c)| *c).map(|(p, _)| p) {
        return Err(OperationError::SelfIntersecting(format!(
            "faces {:?} and {:?} cross",
            faces[i], faces[j]
        ))
        .into());
    }
    Ok(())
}

fn faces_cross(a: &FaceDomain, b: &FaceDomain, tol: &ToleranceConfig) -> bool {
    let Ok(loci) = intersect_surfaces(a, b, tol.confusion, tol) else {
        return false;
    };
    let inside_both = |p: &Point3| {
        a.classify_point(p) == PointState::Inside && b.classify_point(p) == PointState::Inside
    };
    loci.iter().any(|locus| match locus {
        Locus::Point { point, tangent, .. } => !tangent && inside_both(point),
        Locus::Curve { curve, range, .. } => (0..=8).any(|k| {
            let t = range.0 + (range.1 - range.0) * f64::from(k) / 8.0;
            curve.evaluate(t).is_ok_and(|p| inside_both(&p))
        }),
        Locus::Coincident { .. } => false,
    })
}
