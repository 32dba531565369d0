pub mod curve;
pub mod surface;

pub use curve::{Circle, Curve, CurveDomain, CurveGeom, Ellipse, Line, Polyline};
pub use surface::{Cone, Cylinder, Plane, Sphere, Surface, SurfaceDomain, SurfaceGeom, Torus};
