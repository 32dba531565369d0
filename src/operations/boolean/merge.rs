//! Post-processing of a boolean result: faces split only by the boolean
//! that lie on the same plane are merged back, then collinear line edges
//! meeting at a vertex nothing else uses are fused.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::geometry::{CurveGeom, Line};
use crate::math::polygon_2d::signed_area;
use crate::math::{Point2, ToleranceConfig, Vector3};
use crate::tessellation::{sample_oriented_edge, UvMap};
use crate::topology::{
    EdgeData, EdgeId, FaceData, FaceId, OrientedEdge, Shape, TopologyStore, VertexId, WireData,
};

use super::ds::BopDs;

/// Simplifies every closed shell of `shape` in place.
///
/// Input faces are never edited: a face that needs new boundaries is
/// replaced by a new record and the replacement is recorded in `ds`.
///
/// # Errors
///
/// Returns an error if the store is inconsistent.
pub fn simplify_result(store: &mut TopologyStore, ds: &mut BopDs, shape: Shape) -> Result<()> {
    let tol = *ds.tol();
    for solid in store.solids_of(shape) {
        let shells: Vec<_> = store.solid(solid)?.shells().collect();
        for shell in shells {
            let mut faces = store.shell(shell)?.faces.clone();
            let before = faces.len();
            merge_coplanar_faces(store, ds, &mut faces, &tol)?;
            merge_collinear_edges(store, ds, &mut faces, &tol)?;
            debug!(before, after = faces.len(), "simplified shell");
            store.shell_mut(shell)?.faces = faces;
        }
    }
    Ok(())
}

/// Plane of a face with its outward normal.
struct PlaneInfo {
    normal: Vector3,
    offset: f64,
}

fn plane_info(face: &FaceData) -> Option<PlaneInfo> {
    let plane = face.surface.as_plane()?;
    let normal = if face.same_sense {
        *plane.plane_normal()
    } else {
        -plane.plane_normal()
    };
    Some(PlaneInfo {
        normal,
        offset: plane.origin().coords.dot(&normal),
    })
}

fn merge_coplanar_faces(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    faces: &mut Vec<FaceId>,
    tol: &ToleranceConfig,
) -> Result<()> {
    let mut infos = Vec::with_capacity(faces.len());
    for &f in faces.iter() {
        infos.push(plane_info(store.face(f)?));
    }

    let mut uses: HashMap<EdgeId, Vec<(usize, bool)>> = HashMap::new();
    for (i, &f) in faces.iter().enumerate() {
        for lp in store.face_loops(f)? {
            for oe in lp {
                uses.entry(oe.edge).or_default().push((i, oe.is_forward()));
            }
        }
    }

    // Faces are adjacent when a manifold edge joins them and they share
    // a plane and a normal.
    let mut adjacent: Vec<HashSet<usize>> = vec![HashSet::new(); faces.len()];
    for list in uses.values() {
        let [(a, fa), (b, fb)] = list.as_slice() else {
            continue;
        };
        if a == b || fa == fb {
            continue;
        }
        let (Some(pa), Some(pb)) = (&infos[*a], &infos[*b]) else {
            continue;
        };
        if pa.normal.dot(&pb.normal) > 1.0 - tol.angular.max(1e-9)
            && (pa.offset - pb.offset).abs() <= tol.confusion
        {
            adjacent[*a].insert(*b);
            adjacent[*b].insert(*a);
        }
    }

    let mut visited = vec![false; faces.len()];
    let mut replaced: Vec<(Vec<usize>, FaceId)> = Vec::new();
    for start in 0..faces.len() {
        if visited[start] || adjacent[start].is_empty() {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(curr) = queue.pop_front() {
            for &next in &adjacent[curr] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        let ids: Vec<FaceId> = component.iter().map(|&i| faces[i]).collect();
        if let Some(face) = merge_component(store, ds, &ids, tol)? {
            replaced.push((component, face));
        }
    }

    if replaced.is_empty() {
        return Ok(());
    }
    let mut consumed = HashSet::new();
    let mut result = Vec::with_capacity(faces.len());
    for (component, face) in replaced {
        consumed.extend(component);
        result.push(face);
    }
    result.extend(
        faces
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed.contains(i))
            .map(|(_, &f)| f),
    );
    *faces = result;
    Ok(())
}

/// Merges a connected set of coplanar faces into one.
///
/// Returns `None` when the remaining boundary does not form exactly one
/// outer loop.
fn merge_component(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    component: &[FaceId],
    tol: &ToleranceConfig,
) -> Result<Option<FaceId>> {
    let mut boundary: Vec<OrientedEdge> = Vec::new();
    let mut count: HashMap<EdgeId, usize> = HashMap::new();
    for &f in component {
        for lp in store.face_loops(f)? {
            for oe in lp {
                *count.entry(oe.edge).or_default() += 1;
                boundary.push(oe);
            }
        }
    }
    boundary.retain(|oe| count[&oe.edge] == 1);

    let Some(loops) = chain_into_loops(store, &boundary)? else {
        debug!("merged boundary does not close");
        return Ok(None);
    };

    let first = store.face(component[0])?.clone();
    let map = UvMap::of_face(&first);
    let mut outer = None;
    let mut inner = Vec::new();
    for lp in loops {
        let mut uv: Vec<Point2> = Vec::new();
        for &oe in &lp {
            let points = sample_oriented_edge(store, oe, tol.deflection)?;
            uv.extend(points.iter().skip(1).map(|p| map.project(p)));
        }
        if signed_area(&uv) > 0.0 {
            if outer.is_some() {
                return Ok(None);
            }
            outer = Some(lp);
        } else {
            inner.push(lp);
        }
    }
    let Some(outer) = outer else {
        return Ok(None);
    };

    let outer_wire = store.add_wire(WireData {
        edges: outer,
        is_closed: true,
    });
    let inner_wires = inner
        .into_iter()
        .map(|edges| {
            store.add_wire(WireData {
                edges,
                is_closed: true,
            })
        })
        .collect();
    let mut data = FaceData::new(first.surface, outer_wire, inner_wires, first.same_sense);
    data.tolerance = first.tolerance;
    for &f in &component[1..] {
        data.tolerance = data.tolerance.max(store.face(f)?.tolerance);
    }
    let face = ds.new_face(store, data);
    for &f in component {
        ds.substitute(Shape::Face(f), Shape::Face(face));
    }
    Ok(Some(face))
}

/// Chains oriented edges into closed loops by their vertices.
fn chain_into_loops(
    store: &TopologyStore,
    edges: &[OrientedEdge],
) -> Result<Option<Vec<Vec<OrientedEdge>>>> {
    let mut ends = Vec::with_capacity(edges.len());
    let mut by_start: HashMap<VertexId, Vec<usize>> = HashMap::new();
    for (i, &oe) in edges.iter().enumerate() {
        let (s, e) = store.oriented_ends(oe)?;
        ends.push((s, e));
        by_start.entry(s).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();
    for seed in 0..edges.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let origin = ends[seed].0;
        let mut chain = vec![edges[seed]];
        let mut current = ends[seed].1;
        while current != origin {
            let next = by_start
                .get(&current)
                .and_then(|candidates| candidates.iter().copied().find(|&i| !used[i]));
            let Some(i) = next else {
                return Ok(None);
            };
            used[i] = true;
            chain.push(edges[i]);
            current = ends[i].1;
        }
        loops.push(chain);
    }
    Ok(Some(loops))
}

fn merge_collinear_edges(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    faces: &mut [FaceId],
    tol: &ToleranceConfig,
) -> Result<()> {
    loop {
        let Some((first, second)) = find_collinear_pair(store, faces, tol)? else {
            return Ok(());
        };
        let (start, _) = store.oriented_ends(first)?;
        let (_, end) = store.oriented_ends(second)?;
        let (a, b) = (store.point(start)?, store.point(end)?);
        let line = Line::through(a, b)?;
        let mut data = EdgeData::new(start, end, CurveGeom::Line(line), 0.0, (b - a).norm());
        data.tolerance = store.edge(first.edge)?.tolerance.max(store.edge(second.edge)?.tolerance);
        let fused = ds.new_edge(store, data);

        for slot in faces.iter_mut() {
            let loops = store.face_loops(*slot)?;
            let mut changed = false;
            let rewritten: Vec<Vec<OrientedEdge>> = loops
                .into_iter()
                .map(|lp| {
                    let out = replace_pair(&lp, first, second, fused);
                    changed |= out.len() != lp.len();
                    out
                })
                .collect();
            if changed {
                *slot = rewrite_face(store, ds, *slot, rewritten)?;
            }
        }
        ds.substitute(Shape::Edge(first.edge), Shape::Edge(fused));
        ds.substitute(Shape::Edge(second.edge), Shape::Edge(fused));
    }
}

/// Finds two consecutive line edges of a loop that continue each other
/// through a vertex used by no other edge.
fn find_collinear_pair(
    store: &TopologyStore,
    faces: &[FaceId],
    tol: &ToleranceConfig,
) -> Result<Option<(OrientedEdge, OrientedEdge)>> {
    let mut at_vertex: HashMap<VertexId, HashSet<EdgeId>> = HashMap::new();
    let mut loops = Vec::new();
    for &f in faces {
        for lp in store.face_loops(f)? {
            for &oe in &lp {
                let (s, e) = store.oriented_ends(oe)?;
                at_vertex.entry(s).or_default().insert(oe.edge);
                at_vertex.entry(e).or_default().insert(oe.edge);
            }
            loops.push(lp);
        }
    }

    for lp in &loops {
        if lp.len() < 4 {
            continue;
        }
        for i in 0..lp.len() {
            let (x, y) = (lp[i], lp[(i + 1) % lp.len()]);
            if x.edge == y.edge {
                continue;
            }
            let (_, joint) = store.oriented_ends(x)?;
            if at_vertex.get(&joint).map_or(0, HashSet::len) != 2 {
                continue;
            }
            let (ex, ey) = (store.edge(x.edge)?, store.edge(y.edge)?);
            let (CurveGeom::Line(lx), CurveGeom::Line(ly)) = (&ex.curve, &ey.curve) else {
                continue;
            };
            if lx.direction().cross(ly.direction()).norm() <= tol.angular.max(1e-9) {
                return Ok(Some((x, y)));
            }
        }
    }
    Ok(None)
}

/// Replaces `first, second` (or their reversal) by `fused` in a loop.
fn replace_pair(
    lp: &[OrientedEdge],
    first: OrientedEdge,
    second: OrientedEdge,
    fused: EdgeId,
) -> Vec<OrientedEdge> {
    let n = lp.len();
    for i in 0..n {
        let (x, y) = (lp[i], lp[(i + 1) % n]);
        let replacement = if x == first && y == second {
            OrientedEdge::new(fused, true)
        } else if x == second.reversed() && y == first.reversed() {
            OrientedEdge::new(fused, false)
        } else {
            continue;
        };
        let mut out = Vec::with_capacity(n - 1);
        out.push(replacement);
        out.extend((2..n).map(|k| lp[(i + k) % n]));
        return out;
    }
    lp.to_vec()
}

/// Gives a face new loops, copying it first unless the run created it.
fn rewrite_face(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    face: FaceId,
    loops: Vec<Vec<OrientedEdge>>,
) -> Result<FaceId> {
    let mut wires = loops
        .into_iter()
        .map(|edges| {
            store.add_wire(WireData {
                edges,
                is_closed: true,
            })
        })
        .collect::<Vec<_>>();
    let outer = wires.remove(0);
    if ds.is_created(Shape::Face(face)) {
        let data = store.face_mut(face)?;
        data.outer_wire = outer;
        data.inner_wires = wires;
        return Ok(face);
    }
    let source = store.face(face)?.clone();
    let mut data = FaceData::new(source.surface, outer, wires, source.same_sense);
    data.tolerance = source.tolerance;
    let copy = ds.new_face(store, data);
    ds.substitute(Shape::Face(face), Shape::Face(copy));
    Ok(copy)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeFace, MakeWire};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn replace_pair_handles_both_directions() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 1.0, 0.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let lp = store.wire(wire).unwrap().edges.clone();
        let fused = store.wire(wire).unwrap().edges[3].edge;

        let forward = replace_pair(&lp, lp[0], lp[1], fused);
        assert_eq!(forward.len(), 3);
        assert_eq!(forward[0], OrientedEdge::new(fused, true));

        let reversed: Vec<OrientedEdge> = lp.iter().rev().map(|oe| oe.reversed()).collect();
        let backward = replace_pair(&reversed, lp[0], lp[1], fused);
        assert_eq!(backward.len(), 3);
        assert!(backward.contains(&OrientedEdge::new(fused, false)));
    }

    #[test]
    fn chains_a_face_boundary_into_one_loop() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let face = MakeFace::new(wire, vec![]).execute(&mut store).unwrap();
        let mut edges = store.face_loops(face).unwrap().remove(0);
        edges.swap(0, 2);
        let loops = chain_into_loops(&store, &edges).unwrap().unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }
}
