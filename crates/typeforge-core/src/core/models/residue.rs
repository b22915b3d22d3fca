use super::ids::AtomId;

/// Name of the residue that collects atoms not claimed by any requested residue label.
pub const DEFAULT_RESIDUE_NAME: &str = "RES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub name: String,              // Name of the residue (e.g., "CH3", "HOH")
    pub number: isize,             // Residue sequence number
    pub chain: char,               // Chain identifier, used by file formats
    pub(crate) atoms: Vec<AtomId>, // Atoms in insertion order
}

impl Residue {
    pub(crate) fn new(name: &str, number: isize, chain: char) -> Self {
        Self {
            name: name.to_string(),
            number,
            chain,
            atoms: Vec::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
