//! # Core Models Module
//!
//! Data structures used to represent molecular structures before and after a forcefield
//! has been applied.
//!
//! ## Key Components
//!
//! - [`element`] - Chemical elements with symbols, atomic numbers and masses
//! - [`atom`] - Individual atoms with coordinates and, once typed, their forcefield type
//! - [`residue`] - Named groups of atoms
//! - [`topology`] - Bonds, angles and dihedrals together with their assigned parameters
//! - [`structure`] - The owning container for all of the above plus periodic box vectors
//! - [`ids`] - Stable identifiers for atoms and residues
//!
//! ## Usage
//!
//! ```ignore
//! use typeforge::core::models::{atom::Atom, element::Element, structure::Structure};
//! use nalgebra::Point3;
//!
//! let mut structure = Structure::new();
//! let residue_id = structure.add_residue("MET", 1, 'A');
//! let c = structure.add_atom(residue_id, Atom::new("C", Element::C, Point3::origin()))?;
//! ```

pub mod atom;
pub mod element;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod ids;
pub mod residue;
pub mod structure;
pub mod topology;
