use super::{Point3, Vector3};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Returns a box that contains nothing; including any point makes it valid.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Builds the smallest box containing every point.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include(p);
        }
        aabb
    }

    /// Returns `true` if no point has been included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grows the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grows the box to contain `other`.
    pub fn merge(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.include(&other.min);
            self.include(&other.max);
        }
    }

    /// Returns a copy enlarged by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            min: Point3::new(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: Point3::new(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    /// Returns `true` if the two boxes share at least one point.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns `true` if `p` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Length of the box diagonal, zero when empty.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            (self.max - self.min).norm()
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// The common part of two boxes, empty when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Aabb) -> Self {
        if !self.overlaps(other) {
            return Self::empty();
        }
        Self {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        }
    }

    /// Parameter interval over which `origin + t * dir` stays in the box.
    #[must_use]
    pub fn clip_line(&self, origin: &Point3, dir: &Vector3) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);
        for k in 0..3 {
            if dir[k].abs() < 1e-15 {
                if origin[k] < self.min[k] || origin[k] > self.max[k] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[k] - origin[k]) / dir[k];
            let t2 = (self.max[k] - origin[k]) / dir[k];
            lo = lo.max(t1.min(t2));
            hi = hi.min(t1.max(t2));
        }
        (lo <= hi).then_some((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn empty_box_overlaps_nothing() {
        let a = Aabb::empty();
        let b = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        assert!(a.is_empty());
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0)]);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn expanded_box_reaches_neighbor() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[p(1.5, 0.0, 0.0), p(2.0, 1.0, 1.0)]);
        assert!(!a.overlaps(&b));
        assert!(a.expanded(0.6).overlaps(&b));
    }

    #[test]
    fn diagonal_of_unit_cube() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        assert!((a.diagonal() - 3.0_f64.sqrt()).abs() < 1e-12);
        assert!((a.center() - p(0.5, 0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn line_is_clipped_to_the_box() {
        let b = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(2.0, 1.0, 1.0)]);
        let (lo, hi) = b
            .clip_line(&p(-1.0, 0.5, 0.5), &Vector3::x())
            .unwrap_or((f64::NAN, f64::NAN));
        assert!((lo - 1.0).abs() < 1e-12 && (hi - 3.0).abs() < 1e-12);
        assert!(b.clip_line(&p(-1.0, 2.0, 0.5), &Vector3::x()).is_none());
    }

    #[test]
    fn intersection_of_overlapping_boxes() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0)]);
        let b = Aabb::from_points(&[p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0)]);
        let c = a.intersection(&b);
        assert_eq!(c.min, p(1.0, 1.0, 1.0));
        assert_eq!(c.max, p(2.0, 2.0, 2.0));
        let far = Aabb::from_points(&[p(5.0, 5.0, 5.0)]);
        assert!(a.intersection(&far).is_empty());
    }
}
