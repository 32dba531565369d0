use crate::error::{Result, TopologyError};
use crate::geometry::curve::CurveGeom;
use crate::geometry::surface::{Surface, SurfaceGeom};
use crate::math::polygon_2d::{distance_to_polygon, winding_number};
use crate::math::{Aabb, Point2, Point3, ToleranceConfig, Vector3};
use crate::topology::{FaceData, FaceId, OrientedEdge, TopologyStore};

/// Where a point lies relative to a bounded face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointState {
    Inside,
    Boundary,
    Outside,
}

/// The parametrization of a face seen from its outer side.
///
/// Coordinates are `(u, s * v)` with `s = -1` when the face normal opposes
/// the surface normal, so that boundary loops always run counter-clockwise
/// around material and holes clockwise.
#[derive(Debug, Clone)]
pub struct UvMap {
    surface: SurfaceGeom,
    sign: f64,
}

impl UvMap {
    /// Creates a map for `surface` oriented by `same_sense`.
    #[must_use]
    pub fn new(surface: SurfaceGeom, same_sense: bool) -> Self {
        Self {
            surface,
            sign: if same_sense { 1.0 } else { -1.0 },
        }
    }

    /// The map of a face record.
    #[must_use]
    pub fn of_face(face: &FaceData) -> Self {
        Self::new(face.surface.clone(), face.same_sense)
    }

    /// The underlying surface.
    #[must_use]
    pub fn surface(&self) -> &SurfaceGeom {
        &self.surface
    }

    /// Returns `true` if the face normal agrees with the surface normal.
    #[must_use]
    pub fn same_sense(&self) -> bool {
        self.sign > 0.0
    }

    /// Period of the first coordinate, if any.
    #[must_use]
    pub fn u_period(&self) -> Option<f64> {
        self.surface.u_period()
    }

    /// Period of the second coordinate, if any.
    #[must_use]
    pub fn v_period(&self) -> Option<f64> {
        self.surface.v_period()
    }

    /// Face coordinates of the surface point closest to `p`, with periodic
    /// values in the surface's base range.
    #[must_use]
    pub fn project(&self, p: &Point3) -> Point2 {
        let (u, v) = self.surface.inverse(p);
        Point2::new(u, self.sign * v)
    }

    /// Shifts `uv` by whole periods so it lies within half a period of
    /// `reference`.
    #[must_use]
    pub fn unwrap_near(&self, uv: Point2, reference: &Point2) -> Point2 {
        let shift = |value: f64, target: f64, period: Option<f64>| match period {
            Some(p) => value + ((target - value) / p).round() * p,
            None => value,
        };
        Point2::new(
            shift(uv.x, reference.x, self.u_period()),
            shift(uv.y, reference.y, self.v_period()),
        )
    }

    /// Surface point at face coordinates `uv`.
    ///
    /// # Errors
    ///
    /// Returns an error if `uv` is outside a non-periodic surface domain.
    pub fn point(&self, uv: &Point2) -> Result<Point3> {
        self.surface.evaluate(uv.x, self.sign * uv.y)
    }

    /// Outward face normal at face coordinates `uv`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is degenerate at `uv`.
    pub fn normal(&self, uv: &Point2) -> Result<Vector3> {
        Ok(self.surface.normal(uv.x, self.sign * uv.y)? * self.sign)
    }

    /// Returns `true` where the `u` coordinate does not determine the point,
    /// as at a sphere pole or a cone apex.
    fn is_singular(&self, uv: &Point2) -> bool {
        self.surface
            .derivatives(uv.x, self.sign * uv.y)
            .map_or(true, |d| d.du.norm() < 1e-9)
    }

    /// Projects a connected sequence of points, unwrapping periodic
    /// coordinates so consecutive samples stay close. The first sample is
    /// placed near `start` when given.
    #[must_use]
    pub fn project_polyline(&self, points: &[Point3], start: Option<&Point2>) -> Vec<Point2> {
        let mut raw: Vec<Point2> = points.iter().map(|p| self.project(p)).collect();
        let singular: Vec<bool> = raw.iter().map(|uv| self.is_singular(uv)).collect();
        // A singular sample takes its `u` from the closest regular neighbour.
        for i in 0..raw.len() {
            if singular[i] {
                let neighbour = (0..i)
                    .rev()
                    .find(|&j| !singular[j])
                    .or_else(|| (i + 1..raw.len()).find(|&j| !singular[j]));
                if let Some(j) = neighbour {
                    raw[i].x = raw[j].x;
                }
            }
        }

        let mut out: Vec<Point2> = Vec::with_capacity(raw.len());
        for uv in raw {
            let placed = match out.last() {
                Some(prev) => self.unwrap_near(uv, prev),
                None => match start {
                    Some(s) => self.unwrap_near(uv, s),
                    None => uv,
                },
            };
            out.push(placed);
        }
        out
    }
}

/// Samples an oriented edge in traversal order, both ends included.
///
/// # Errors
///
/// Returns an error if the edge is missing or its curve cannot be evaluated.
pub fn sample_oriented_edge(
    store: &TopologyStore,
    oe: OrientedEdge,
    deflection: f64,
) -> Result<Vec<Point3>> {
    use crate::geometry::curve::Curve;
    let edge = store.edge(oe.edge)?;
    let mut params = edge.curve.sample_params(edge.t_start, edge.t_end, deflection);
    if !oe.is_forward() {
        params.reverse();
    }
    let mut points = params
        .iter()
        .map(|&t| edge.curve.evaluate(t))
        .collect::<Result<Vec<_>>>()?;
    // Snap the ends onto the vertices the topology says they are.
    let (start, end) = store.oriented_ends(oe)?;
    if let Some(first) = points.first_mut() {
        *first = store.point(start)?;
    }
    if let Some(last) = points.last_mut() {
        *last = store.point(end)?;
    }
    Ok(points)
}

/// The bounded region of a face: its boundary loops sampled in face
/// coordinates and in 3D.
#[derive(Debug, Clone)]
pub struct FaceDomain {
    map: UvMap,
    loops: Vec<Vec<Point2>>,
    loops_3d: Vec<Vec<Point3>>,
    bbox: Aabb,
    uv_min: Point2,
    uv_max: Point2,
    band: f64,
}

impl FaceDomain {
    /// Samples the boundary of a stored face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or a loop does not close in
    /// parameter space.
    pub fn new(store: &TopologyStore, face: FaceId, tol: &ToleranceConfig) -> Result<Self> {
        let data = store.face(face)?;
        let map = UvMap::of_face(data);
        let tolerance = tol.linear(data.tolerance);
        Self::from_edge_loops(store, map, &store.face_loops(face)?, tolerance, tol)
    }

    /// Samples loops of oriented edges lying on the surface of `map`.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing or a loop does not close in
    /// parameter space.
    pub fn from_edge_loops(
        store: &TopologyStore,
        map: UvMap,
        loops: &[Vec<OrientedEdge>],
        tolerance: f64,
        tol: &ToleranceConfig,
    ) -> Result<Self> {
        let mut uv_loops = Vec::with_capacity(loops.len());
        let mut loops_3d = Vec::with_capacity(loops.len());
        let mut curved = false;

        for lp in loops {
            let mut points = Vec::new();
            for &oe in lp {
                curved |= !matches!(store.edge(oe.edge)?.curve, CurveGeom::Line(_));
                let mut samples = sample_oriented_edge(store, oe, tol.deflection)?;
                samples.pop();
                points.extend(samples);
            }
            let uv = map.project_polyline(&points, None);
            if let (Some(first), Some(last)) = (uv.first(), uv.last()) {
                let closes = map.unwrap_near(*last, first);
                if (closes - last).norm() > 1e-6 {
                    return Err(TopologyError::InvalidTopology(
                        "face loop does not close in parameter space".into(),
                    )
                    .into());
                }
            }
            uv_loops.push(uv);
            loops_3d.push(points);
        }

        let band = tolerance + if curved { tol.deflection } else { 0.0 };
        Ok(Self::from_parts(map, uv_loops, loops_3d, band))
    }

    /// Assembles a domain from already sampled loops.
    #[must_use]
    pub fn from_parts(
        map: UvMap,
        loops: Vec<Vec<Point2>>,
        loops_3d: Vec<Vec<Point3>>,
        band: f64,
    ) -> Self {
        let bbox = Aabb::from_points(loops_3d.iter().flatten()).expanded(band);
        let mut uv_min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut uv_max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for uv in loops.iter().flatten() {
            uv_min = uv_min.inf(uv);
            uv_max = uv_max.sup(uv);
        }
        Self {
            map,
            loops,
            loops_3d,
            bbox,
            uv_min,
            uv_max,
            band,
        }
    }

    /// The face parametrization.
    #[must_use]
    pub fn map(&self) -> &UvMap {
        &self.map
    }

    /// Boundary loops in face coordinates, outer loops counter-clockwise.
    #[must_use]
    pub fn loops(&self) -> &[Vec<Point2>] {
        &self.loops
    }

    /// Bounding box of the boundary, grown by the boundary band.
    ///
    /// Only valid as a bound of the whole face for faces whose interior
    /// does not bulge past their boundary; curved faces use
    /// [`FaceDomain::surface_bbox`].
    #[must_use]
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// Lower corner of the face-coordinate box.
    #[must_use]
    pub fn uv_min(&self) -> Point2 {
        self.uv_min
    }

    /// Upper corner of the face-coordinate box.
    #[must_use]
    pub fn uv_max(&self) -> Point2 {
        self.uv_max
    }

    /// Distance within which a point counts as on the boundary.
    #[must_use]
    pub fn band(&self) -> f64 {
        self.band
    }

    /// Bounding box of the face surface over its parameter box, sampled on
    /// a grid of `n x n` cells.
    #[must_use]
    pub fn surface_bbox(&self, n: usize) -> Aabb {
        let mut bbox = self.bbox;
        if self.map.surface().as_plane().is_some() {
            return bbox;
        }
        for uv in self.grid(n) {
            if let Ok(p) = self.map.point(&uv) {
                bbox.include(&p);
            }
        }
        // Chords of the sampling grid can cut inside the surface.
        let span = bbox.diagonal();
        #[allow(clippy::cast_precision_loss)]
        let n = n.max(2) as f64;
        bbox.expanded(self.band + span / n.powi(2))
    }

    /// Bounding box of the face itself, with no band added: the sampled
    /// boundary plus the points of an `n x n` surface grid that fall
    /// inside the face.
    #[must_use]
    pub fn tight_bbox(&self, n: usize) -> Aabb {
        let mut bbox = Aabb::from_points(self.loops_3d.iter().flatten());
        if self.map.surface().as_plane().is_some() {
            return bbox;
        }
        for uv in self.grid(n) {
            if self.classify_uv(&uv) != PointState::Inside {
                continue;
            }
            if let Ok(p) = self.map.point(&uv) {
                bbox.include(&p);
            }
        }
        bbox
    }

    /// Nodes of an `n x n` grid over the face-coordinate box.
    fn grid(&self, n: usize) -> impl Iterator<Item = Point2> + '_ {
        let n = n.max(2);
        (0..=n).flat_map(move |i| {
            (0..=n).map(move |j| {
                #[allow(clippy::cast_precision_loss)]
                let (fi, fj, steps) = (i as f64, j as f64, n as f64);
                Point2::new(
                    self.uv_min.x + (self.uv_max.x - self.uv_min.x) * fi / steps,
                    self.uv_min.y + (self.uv_max.y - self.uv_min.y) * fj / steps,
                )
            })
        })
    }

    /// Classifies face coordinates against the boundary loops, trying
    /// whole-period shifts on periodic surfaces.
    #[must_use]
    pub fn classify_uv(&self, uv: &Point2) -> PointState {
        let shifts = |period: Option<f64>| -> Vec<f64> {
            match period {
                Some(p) => vec![0.0, -p, p],
                None => vec![0.0],
            }
        };
        for du in shifts(self.map.u_period()) {
            for dv in shifts(self.map.v_period()) {
                let q = Point2::new(uv.x + du, uv.y + dv);
                let winding: i32 = self.loops.iter().map(|lp| winding_number(&q, lp)).sum();
                if winding != 0 {
                    return PointState::Inside;
                }
            }
        }
        PointState::Outside
    }

    /// Classifies a 3D point assumed to lie on the surface.
    #[must_use]
    pub fn classify_point(&self, p: &Point3) -> PointState {
        if !self.bbox.contains(p) {
            return PointState::Outside;
        }
        if self.boundary_distance(p) <= self.band {
            return PointState::Boundary;
        }
        self.classify_uv(&self.map.project(p))
    }

    /// Distance from `p` to the sampled boundary.
    #[must_use]
    pub fn boundary_distance(&self, p: &Point3) -> f64 {
        self.loops_3d
            .iter()
            .flat_map(|lp| {
                let n = lp.len();
                (0..n).map(move |i| segment_distance(p, &lp[i], &lp[(i + 1) % n]))
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Distance in face coordinates from `uv` to the boundary loops.
    #[must_use]
    pub fn uv_boundary_distance(&self, uv: &Point2) -> f64 {
        self.loops
            .iter()
            .map(|lp| distance_to_polygon(uv, lp))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Distance from `p` to the segment `[a, b]` in 3D.
fn segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::{MakeBox, MakeCylinder};
    use crate::topology::Shape;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn top_face(store: &TopologyStore, root: Shape, z: f64) -> FaceId {
        store
            .faces_of(root)
            .into_iter()
            .find(|&f| {
                let n = store.face_normal(f, 0.0, 0.0).unwrap();
                let plane = store.face(f).unwrap().surface.as_plane().cloned();
                plane.is_some_and(|pl| n.z > 0.5 && (pl.origin().z - z).abs() < 1e-12)
            })
            .unwrap()
    }

    #[test]
    fn box_face_loops_are_counter_clockwise() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let tol = ToleranceConfig::default();
        for f in store.faces_of(Shape::Solid(solid)) {
            let domain = FaceDomain::new(&store, f, &tol).unwrap();
            let area = crate::math::polygon_2d::signed_area(&domain.loops()[0]);
            assert!((area - 1.0).abs() < 1e-9, "area {area}");
        }
    }

    #[test]
    fn classify_points_on_a_box_face() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let face = top_face(&store, Shape::Solid(solid), 2.0);
        let domain = FaceDomain::new(&store, face, &ToleranceConfig::default()).unwrap();
        assert_eq!(domain.classify_point(&p(1.0, 1.0, 2.0)), PointState::Inside);
        assert_eq!(domain.classify_point(&p(2.0, 1.0, 2.0)), PointState::Boundary);
        assert_eq!(domain.classify_point(&p(3.0, 1.0, 2.0)), PointState::Outside);
    }

    #[test]
    fn tight_box_has_no_band() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let face = top_face(&store, Shape::Solid(solid), 2.0);
        let domain = FaceDomain::new(&store, face, &ToleranceConfig::default()).unwrap();
        let tight = domain.tight_bbox(8);
        assert!((tight.min - p(0.0, 0.0, 2.0)).norm() < 1e-12);
        assert!((tight.max - p(2.0, 2.0, 2.0)).norm() < 1e-12);
        assert!(domain.bbox().min.x < 0.0);
        assert!(domain.surface_bbox(8).max.z > 2.0);
    }

    #[test]
    fn cylinder_lateral_loop_unwraps_across_the_seam() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 2.0)
            .execute(&mut store)
            .unwrap();
        let lateral = store
            .faces_of(Shape::Solid(solid))
            .into_iter()
            .find(|&f| store.face(f).unwrap().surface.as_plane().is_none())
            .unwrap();
        let domain = FaceDomain::new(&store, lateral, &ToleranceConfig::default()).unwrap();
        let area = crate::math::polygon_2d::signed_area(&domain.loops()[0]);
        assert!((area - std::f64::consts::TAU * 2.0).abs() < 1e-6, "area {area}");
        assert_eq!(domain.classify_point(&p(-1.0, 0.0, 1.0)), PointState::Inside);
        assert_eq!(domain.classify_point(&p(0.0, 1.0, 2.0)), PointState::Boundary);
    }

    #[test]
    fn unwrap_near_moves_by_whole_periods() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 1.0)
            .execute(&mut store)
            .unwrap();
        let lateral = store
            .faces_of(Shape::Solid(solid))
            .into_iter()
            .find(|&f| store.face(f).unwrap().surface.as_plane().is_none())
            .unwrap();
        let map = UvMap::of_face(store.face(lateral).unwrap());
        let q = map.unwrap_near(Point2::new(0.1, 0.5), &Point2::new(6.2, 0.5));
        assert!((q.x - (0.1 + std::f64::consts::TAU)).abs() < 1e-12);
    }
}
