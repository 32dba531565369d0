use crate::error::{OperationError, Result};
use crate::topology::{FaceId, ShellData, ShellId, SolidData, SolidId, TopologyStore};

/// Creates a solid from shells.
pub struct MakeSolid {
    outer_shell: ShellId,
    inner_shells: Vec<ShellId>,
}

impl MakeSolid {
    /// Creates a new `MakeSolid` operation.
    #[must_use]
    pub fn new(outer_shell: ShellId, inner_shells: Vec<ShellId>) -> Self {
        Self {
            outer_shell,
            inner_shells,
        }
    }

    /// Wraps `faces` into a shell, recording whether it closes up, and
    /// returns a solid bounded by it.
    ///
    /// # Errors
    ///
    /// Returns an error if a face is missing or the list is empty.
    pub fn from_faces(store: &mut TopologyStore, faces: Vec<FaceId>) -> Result<SolidId> {
        if faces.is_empty() {
            return Err(OperationError::InvalidInput("solid needs at least one face".into()).into());
        }
        let is_closed = store.is_closed_shell(&faces)?;
        let shell = store.add_shell(ShellData { faces, is_closed });
        Self::new(shell, vec![]).execute(store)
    }

    /// Executes the operation, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a shell does not exist.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        for &shell in std::iter::once(&self.outer_shell).chain(&self.inner_shells) {
            store.shell(shell)?;
        }
        Ok(store.add_solid(SolidData {
            outer_shell: self.outer_shell,
            inner_shells: self.inner_shells.clone(),
        }))
    }
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
    fn loose_faces_make_an_open_shell() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], true)
            .execute(&mut store)
            .unwrap();
        let face = MakeFace::new(wire, vec![]).execute(&mut store).unwrap();
        let solid = MakeSolid::from_faces(&mut store, vec![face]).unwrap();
        let shell = store.solid(solid).unwrap().outer_shell;
        assert!(!store.shell(shell).unwrap().is_closed);
    }

    #[test]
    fn empty_face_list_is_rejected() {
        let mut store = TopologyStore::new();
        assert!(MakeSolid::from_faces(&mut store, vec![]).is_err());
    }
}
