mod make_box;
mod make_cylinder;
mod make_face;
mod make_prism;
mod make_solid;
mod make_wire;
mod polyhedron;

pub use make_box::MakeBox;
pub use make_cylinder::MakeCylinder;
pub use make_face::MakeFace;
pub use make_prism::MakePrism;
pub use make_solid::MakeSolid;
pub use make_wire::MakeWire;
