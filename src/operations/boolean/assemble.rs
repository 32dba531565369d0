use std::collections::HashMap;
use std::f64::consts::TAU;

use tracing::{debug, warn};

use crate::error::Result;
use crate::geometry::Curve;
use crate::math::{any_perpendicular, ToleranceConfig, Vector3};
use crate::tessellation::{
    interior_point, FaceDomain, TessellateFace, TessellationParams, TriangleMesh, UvMap,
};
use crate::topology::{
    CompoundData, EdgeId, FaceData, FaceId, OrientedEdge, Shape, ShellData, ShellId, SolidData,
    TopologyStore, WireData,
};

use super::classify::{PointClassification, SolidClassifier};
use super::ds::BopDs;
use super::report::Warning;
use super::select::KeepDecision;
use super::split::FaceFragment;

/// Turns kept fragments into faces, stitches them into shells and the
/// shells into solids.
///
/// The result is a single solid when exactly one closed shell bounds it,
/// and a compound otherwise (empty when nothing is kept).
///
/// `bound` is the largest volume the result may enclose. Closed shells
/// that together exceed it, or that enclose no volume, do not become
/// solids and are emitted as free shells.
///
/// # Errors
///
/// Returns an error if the store is inconsistent or a shell cannot be
/// tessellated to measure its volume.
pub fn assemble_result(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    fragments: &[(FaceFragment, KeepDecision)],
    bound: f64,
) -> Result<Shape> {
    let tol = *ds.tol();
    let mut faces: Vec<FaceId> = Vec::new();
    for (frag, decision) in fragments {
        let face = match decision {
            KeepDecision::Discard => continue,
            KeepDecision::Keep if frag.unchanged => frag.source_face,
            KeepDecision::Keep => create_face(store, ds, frag, false)?,
            KeepDecision::KeepFlipped => create_face(store, ds, frag, true)?,
        };
        faces.push(face);
    }
    if faces.is_empty() {
        return Ok(Shape::Compound(store.add_compound(CompoundData::default())));
    }

    let components = stitch(store, &faces, &tol)?;
    let mut outers: Vec<(Vec<FaceId>, f64)> = Vec::new();
    let mut voids: Vec<(Vec<FaceId>, f64)> = Vec::new();
    let mut open: Vec<ShellId> = Vec::new();
    for component in components {
        if !store.is_closed_shell(&component)? {
            warn!(faces = component.len(), "result shell is not closed");
            ds.warn(Warning::NonManifoldResult {
                faces: component.len(),
            });
            open.push(store.add_shell(ShellData {
                faces: component,
                is_closed: false,
            }));
            continue;
        }
        let volume = shell_volume(store, &component, &tol)?;
        if volume >= 0.0 {
            outers.push((component, volume));
        } else {
            voids.push((component, volume));
        }
    }

    let mut inner_of: Vec<Vec<ShellId>> = vec![Vec::new(); outers.len()];
    let mut net: Vec<f64> = outers.iter().map(|(_, v)| *v).collect();
    let classifiers = outers
        .iter()
        .map(|(f, _)| SolidClassifier::from_faces(store, f, &tol))
        .collect::<Result<Vec<_>>>()?;
    for (void, volume) in voids {
        let sample = {
            let domain = FaceDomain::new(store, void[0], &tol)?;
            domain.map().point(&interior_point(&domain)?)?
        };
        let mut host: Option<(usize, f64)> = None;
        for (i, classifier) in classifiers.iter().enumerate() {
            if classifier.classify(store, &sample)? == PointClassification::Inside
                && host.map_or(true, |(_, v)| outers[i].1 < v)
            {
                host = Some((i, outers[i].1));
            }
        }
        let faces = void.len();
        let shell = store.add_shell(ShellData {
            faces: void,
            is_closed: true,
        });
        match host {
            Some((i, _)) => {
                inner_of[i].push(shell);
                net[i] += volume;
            }
            None => {
                warn!(faces, "void shell has no host");
                ds.warn(Warning::NonManifoldResult { faces });
                open.push(shell);
            }
        }
    }

    let trusted = trusted_outers(&net, bound, &tol);
    let mut solids = Vec::with_capacity(outers.len());
    for (((component, _), inner_shells), keep) in outers.into_iter().zip(inner_of).zip(trusted) {
        let faces = component.len();
        let outer_shell = store.add_shell(ShellData {
            faces: component,
            is_closed: true,
        });
        if keep {
            solids.push(store.add_solid(SolidData {
                outer_shell,
                inner_shells,
            }));
        } else {
            warn!(faces, "closed shell does not bound a solid");
            ds.warn(Warning::NonManifoldResult { faces });
            open.push(outer_shell);
            open.extend(inner_shells);
        }
    }
    debug!(solids = solids.len(), open = open.len(), "assembled result");

    if solids.len() == 1 && open.is_empty() {
        return Ok(Shape::Solid(solids[0]));
    }
    let children = solids
        .into_iter()
        .map(Shape::Solid)
        .chain(open.into_iter().map(Shape::Shell));
    Ok(Shape::Compound(store.add_compound(CompoundData::of(children))))
}

/// Collects the section result: section edges, edges shared by both
/// operands and edges of one operand lying inside faces of the other.
pub fn assemble_section(store: &mut TopologyStore, ds: &BopDs) -> Shape {
    let mut edges: Vec<EdgeId> = Vec::new();
    for e in ds
        .all_section_edges()
        .into_iter()
        .chain(ds.common_edges())
        .chain(ds.all_in_edges())
    {
        let e = ds.image(OrientedEdge::new(e, true)).edge;
        if !edges.contains(&e) {
            edges.push(e);
        }
    }
    Shape::Compound(store.add_compound(CompoundData::of(edges.into_iter().map(Shape::Edge))))
}

fn create_face(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    frag: &FaceFragment,
    flip: bool,
) -> Result<FaceId> {
    let source = store.face(frag.source_face)?.clone();
    let mut wires = Vec::with_capacity(frag.loops.len());
    for lp in &frag.loops {
        let edges: Vec<OrientedEdge> = if flip {
            lp.iter().rev().map(|oe| oe.reversed()).collect()
        } else {
            lp.clone()
        };
        wires.push(store.add_wire(WireData {
            edges,
            is_closed: true,
        }));
    }
    let outer = wires.remove(0);
    let mut data = FaceData::new(source.surface, outer, wires, source.same_sense != flip);
    data.tolerance = source.tolerance;
    let face = ds.new_face(store, data);
    ds.record_modified(Shape::Face(frag.source_face), Shape::Face(face));
    Ok(face)
}

/// One use of an edge by a face, seen across the edge.
struct EdgeUse {
    face: usize,
    forward: bool,
    /// Angle of the direction pointing into the face, around the edge.
    angle: f64,
    /// `+1` if the face material lies at increasing angles.
    sense: f64,
}

/// Groups faces into connected shells.
///
/// Edges used by two faces in opposite directions join them. Edges used
/// more often are resolved by pairing each use with its angular neighbour
/// on the material side.
fn stitch(
    store: &TopologyStore,
    faces: &[FaceId],
    tol: &ToleranceConfig,
) -> Result<Vec<Vec<FaceId>>> {
    let mut uses: HashMap<EdgeId, Vec<(usize, bool)>> = HashMap::new();
    for (i, &f) in faces.iter().enumerate() {
        for lp in store.face_loops(f)? {
            for oe in lp {
                uses.entry(oe.edge).or_default().push((i, oe.is_forward()));
            }
        }
    }

    let mut parent: Vec<usize> = (0..faces.len()).collect();
    let join = |parent: &mut Vec<usize>, a: usize, b: usize| {
        let (ra, rb) = (find(parent, a), find(parent, b));
        if ra != rb {
            parent[ra] = rb;
        }
    };

    let mut edges: Vec<&EdgeId> = uses.keys().collect();
    edges.sort();
    for e in edges {
        let list = &uses[e];
        match list.as_slice() {
            [] | [_] => {}
            [(a, fa), (b, fb)] => {
                if fa != fb {
                    join(&mut parent, *a, *b);
                }
            }
            _ => {
                for (a, b) in pair_by_angle(store, faces, *e, list, tol)? {
                    join(&mut parent, a, b);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<FaceId>> = HashMap::new();
    let mut order = Vec::new();
    for (i, &f) in faces.iter().enumerate() {
        let root = find(&mut parent, i);
        if !groups.contains_key(&root) {
            order.push(root);
        }
        groups.entry(root).or_default().push(f);
    }
    Ok(order.into_iter().filter_map(|r| groups.remove(&r)).collect())
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn pair_by_angle(
    store: &TopologyStore,
    faces: &[FaceId],
    edge: EdgeId,
    list: &[(usize, bool)],
    tol: &ToleranceConfig,
) -> Result<Vec<(usize, usize)>> {
    let data = store.edge(edge)?;
    let tm = 0.5 * (data.t_start + data.t_end);
    let mid = data.curve.evaluate(tm)?;
    let mut axis = data.curve.tangent(tm)?;
    if data.t_end < data.t_start {
        axis = -axis;
    }
    let e1 = any_perpendicular(&axis);
    let e2 = axis.cross(&e1);

    let mut around = Vec::with_capacity(list.len());
    for &(face, forward) in list {
        let map = UvMap::of_face(store.face(faces[face])?);
        let normal = map.normal(&map.project(&mid))?;
        let along: Vector3 = if forward { axis } else { -axis };
        let inward = normal.cross(&along);
        let sense = if axis.cross(&inward).dot(&(-normal)) > 0.0 { 1.0 } else { -1.0 };
        around.push(EdgeUse {
            face,
            forward,
            angle: inward.dot(&e2).atan2(inward.dot(&e1)),
            sense,
        });
    }

    let partner = |i: usize| -> Option<usize> {
        let u = &around[i];
        around
            .iter()
            .enumerate()
            .filter(|(j, v)| *j != i && v.forward != u.forward)
            .map(|(j, v)| {
                let mut gap = ((v.angle - u.angle) * u.sense).rem_euclid(TAU);
                if gap < tol.angular {
                    gap += TAU;
                }
                (j, gap)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(j, _)| j)
    };
    let mut pairs = Vec::new();
    for i in 0..around.len() {
        if let Some(j) = partner(i) {
            if i < j && partner(j) == Some(i) {
                pairs.push((around[i].face, around[j].face));
            }
        }
    }
    Ok(pairs)
}

/// Relative disagreement tolerated between two tessellated volumes.
const VOLUME_SLACK: f64 = 1e-2;

/// Which outer shells may become solids, given the net volume each one
/// encloses after its voids.
///
/// Shells enclosing no volume never do; the rest only while their total
/// stays within `bound`.
fn trusted_outers(net: &[f64], bound: f64, tol: &ToleranceConfig) -> Vec<bool> {
    let mut keep: Vec<bool> = net.iter().map(|&v| v > tol.confusion).collect();
    let total: f64 = net.iter().zip(&keep).filter(|(_, k)| **k).map(|(v, _)| v).sum();
    if total > bound * (1.0 + VOLUME_SLACK) + tol.confusion {
        keep.fill(false);
    }
    keep
}

/// Signed volume enclosed by a closed set of faces.
fn shell_volume(store: &TopologyStore, faces: &[FaceId], tol: &ToleranceConfig) -> Result<f64> {
    let params = TessellationParams {
        deflection: tol.deflection,
        ..TessellationParams::default()
    };
    let mut mesh = TriangleMesh::default();
    for &f in faces {
        mesh.merge(&TessellateFace::new(f, params).execute(store)?);
    }
    Ok(mesh.signed_volume())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::boolean::ds::Operand;
    use crate::operations::boolean::options::BooleanOptions;
    use crate::operations::boolean::pave::PaveFiller;
    use crate::operations::boolean::split::split_face;
    use crate::operations::creation::MakeBox;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    /// Two disjoint boxes, filled, with every fragment of both.
    fn apart(store: &mut TopologyStore) -> (BopDs, Vec<FaceFragment>) {
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(store).unwrap();
        let b = MakeBox::new(p(3.0, 0.0, 0.0), p(4.0, 1.0, 1.0)).execute(store).unwrap();
        let options = BooleanOptions::default().with_parallel(false);
        let mut ds = BopDs::new(store, a.into(), b.into(), ToleranceConfig::default()).unwrap();
        let mut filler = PaveFiller::new(store, &ds, &options).unwrap();
        filler.perform(store, &mut ds).unwrap();
        let mut fragments = Vec::new();
        for side in [Operand::A, Operand::B] {
            for &f in ds.faces(side) {
                fragments.extend(split_face(store, &ds, f, side).unwrap().fragments);
            }
        }
        (ds, fragments)
    }

    fn children(store: &TopologyStore, shape: Shape) -> Vec<Shape> {
        let Shape::Compound(id) = shape else {
            panic!("expected a compound, got {shape:?}");
        };
        store.compound(id).unwrap().children.iter().map(|(s, _)| *s).collect()
    }

    #[test]
    fn lone_fragment_becomes_a_free_shell() {
        let mut store = TopologyStore::new();
        let (mut ds, fragments) = apart(&mut store);
        let first = fragments.into_iter().next().unwrap();
        let shape =
            assemble_result(&mut store, &mut ds, &[(first, KeepDecision::Keep)], f64::INFINITY)
                .unwrap();
        let kids = children(&store, shape);
        assert_eq!(kids.len(), 1);
        assert!(matches!(kids[0], Shape::Shell(_)));
        assert_eq!(ds.warnings(), &[Warning::NonManifoldResult { faces: 1 }]);
    }

    #[test]
    fn closed_shells_beyond_the_bound_stay_free() {
        let keep_a_and_one_of_b = |fragments: Vec<FaceFragment>| {
            let mut kept: Vec<(FaceFragment, KeepDecision)> = Vec::new();
            let mut took_b = false;
            for frag in fragments {
                if frag.source == Operand::A || !took_b {
                    took_b |= frag.source == Operand::B;
                    kept.push((frag, KeepDecision::Keep));
                }
            }
            kept
        };

        let mut store = TopologyStore::new();
        let (mut ds, fragments) = apart(&mut store);
        let kept = keep_a_and_one_of_b(fragments);
        let shape = assemble_result(&mut store, &mut ds, &kept, 1.0).unwrap();
        let kids = children(&store, shape);
        assert_eq!(kids.iter().filter(|s| matches!(s, Shape::Solid(_))).count(), 1);
        assert_eq!(kids.iter().filter(|s| matches!(s, Shape::Shell(_))).count(), 1);

        let mut store = TopologyStore::new();
        let (mut ds, fragments) = apart(&mut store);
        let kept = keep_a_and_one_of_b(fragments);
        let shape = assemble_result(&mut store, &mut ds, &kept, 0.5).unwrap();
        let kids = children(&store, shape);
        assert_eq!(kids.len(), 2);
        assert!(kids.iter().all(|s| matches!(s, Shape::Shell(_))));
        assert!(ds.warnings().contains(&Warning::NonManifoldResult { faces: 6 }));
        assert!(ds.warnings().contains(&Warning::NonManifoldResult { faces: 1 }));
    }

    #[test]
    fn empty_or_inverted_outers_are_never_trusted() {
        let tol = ToleranceConfig::default();
        assert_eq!(trusted_outers(&[1.0, 0.0, -2.0], 1.0, &tol), vec![true, false, false]);
        assert_eq!(trusted_outers(&[1.0, 0.5], 1.5, &tol), vec![true, true]);
        assert_eq!(trusted_outers(&[1.0, 0.5], 1.2, &tol), vec![false, false]);
        assert_eq!(trusted_outers(&[1.0], f64::INFINITY, &tol), vec![true]);
    }

    #[test]
    fn box_faces_stitch_into_one_shell() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let faces = store.faces_of(solid.into());
        let shells = stitch(&store, &faces, &ToleranceConfig::default()).unwrap();
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].len(), 6);
        let volume = shell_volume(&store, &shells[0], &ToleranceConfig::default()).unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn separate_boxes_stay_separate() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let b = MakeBox::new(p(3.0, 0.0, 0.0), p(4.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let mut faces = store.faces_of(a.into());
        faces.extend(store.faces_of(b.into()));
        let shells = stitch(&store, &faces, &ToleranceConfig::default()).unwrap();
        assert_eq!(shells.len(), 2);
    }
}
