use super::ids::AtomId;
use crate::core::forcefield::params::{AngleParam, BondParam, TorsionParam};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single = 1,
    Double = 2,
    Triple = 3,
    Aromatic = 4,
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub atom1_id: AtomId,          // ID of the first atom
    pub atom2_id: AtomId,          // ID of the second atom
    pub order: BondOrder,          // Bond order (e.g., single, double, etc.)
    pub param: Option<BondParam>,  // Assigned stretching parameters
}

impl Bond {
    pub fn new(atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Self {
        Self {
            atom1_id,
            atom2_id,
            order,
            param: None,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    /// Returns the partner of `atom_id` in this bond, if `atom_id` takes part in it.
    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.atom1_id == atom_id {
            Some(self.atom2_id)
        } else if self.atom2_id == atom_id {
            Some(self.atom1_id)
        } else {
            None
        }
    }
}

/// A bending term `atom1 - atom2 - atom3` centered on `atom2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Angle {
    pub atom1_id: AtomId,
    pub atom2_id: AtomId,
    pub atom3_id: AtomId,
    pub param: Option<AngleParam>,
}

impl Angle {
    pub fn new(atom1_id: AtomId, atom2_id: AtomId, atom3_id: AtomId) -> Self {
        Self {
            atom1_id,
            atom2_id,
            atom3_id,
            param: None,
        }
    }
}

/// A four-atom torsional term.
///
/// For proper dihedrals the atoms form the chain `1-2-3-4`. For impropers the
/// position of the central atom follows the forcefield's declared convention
/// (see [`ImproperCenter`](crate::core::forcefield::params::ImproperCenter)).
#[derive(Debug, Clone, PartialEq)]
pub struct Dihedral {
    pub atom_ids: [AtomId; 4],
    pub improper: bool,
    pub param: Option<TorsionParam>,
}

impl Dihedral {
    pub fn proper(atom_ids: [AtomId; 4]) -> Self {
        Self {
            atom_ids,
            improper: false,
            param: None,
        }
    }

    pub fn improper(atom_ids: [AtomId; 4]) -> Self {
        Self {
            atom_ids,
            improper: true,
            param: None,
        }
    }

    /// True for proper dihedrals parameterized with a Ryckaert-Bellemans series.
    pub fn is_rb_torsion(&self) -> bool {
        !self.improper && matches!(self.param, Some(TorsionParam::RyckaertBellemans { .. }))
    }
}
