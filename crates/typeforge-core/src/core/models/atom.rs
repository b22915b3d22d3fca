use super::element::Element;
use super::ids::ResidueId;
use crate::core::forcefield::params::NonbondedParam;
use nalgebra::Point3;

/// Represents an atom in a molecular structure.
///
/// Before a forcefield is applied only the identity fields (`name`, `element`,
/// `position`, `residue_id`) are meaningful. Applying a forcefield fills in
/// `atom_type`, `nonbonded` and replaces `mass` with the forcefield value.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "C1", "H3").
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The 3D coordinates of the atom.
    pub position: Point3<f64>,
    /// The forcefield atom type (e.g., "opls_135"); `None` until typed.
    pub atom_type: Option<String>,
    /// Atomic mass in daltons.
    pub mass: f64,
    /// Charge and Lennard-Jones parameters; `None` until typed.
    pub nonbonded: Option<NonbondedParam>,
}

impl Atom {
    /// Creates a new, untyped `Atom`.
    ///
    /// The residue ID is a placeholder until the atom is inserted into a
    /// [`Structure`](super::structure::Structure), which sets it. The mass defaults to
    /// the standard atomic mass of the element.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `element` - The chemical element.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, element: Element, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element,
            residue_id: ResidueId::default(),
            position,
            atom_type: None,
            mass: element.mass(),
            nonbonded: None,
        }
    }

    /// Partial charge assigned by the forcefield, or zero for untyped atoms.
    pub fn charge(&self) -> f64 {
        self.nonbonded.as_ref().map_or(0.0, |p| p.charge)
    }

    pub fn is_typed(&self) -> bool {
        self.atom_type.is_some()
    }
}
