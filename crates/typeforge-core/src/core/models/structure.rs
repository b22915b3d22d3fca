use super::atom::Atom;
use super::ids::{AtomId, ResidueId};
use super::residue::{DEFAULT_RESIDUE_NAME, Residue};
use super::topology::{Angle, Bond, BondOrder, Dihedral};
use nalgebra::Matrix3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

/// A complete molecular structure: atoms, residues, bonded terms and the periodic box.
///
/// Atoms and residues live in slot maps so their IDs stay stable, while explicit order
/// vectors keep iteration deterministic. Atom order is the order in which atoms were
/// added; it defines the integer indices used by the typing engine.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Atom IDs in insertion order.
    atom_order: Vec<AtomId>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Residue IDs in insertion order.
    residue_order: Vec<ResidueId>,
    /// List of all bonds in the structure.
    bonds: Vec<Bond>,
    /// Bending terms, populated when a forcefield is applied.
    angles: Vec<Angle>,
    /// Proper and improper torsions, populated when a forcefield is applied.
    dihedrals: Vec<Dihedral>,
    /// Periodic box vectors, one per row.
    box_vectors: Option<Matrix3<f64>>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl Structure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in insertion order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order.iter().map(|&id| (id, &self.atoms[id]))
    }

    /// Atom IDs in insertion order; position `i` is the engine index of the atom.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    pub fn atom_count(&self) -> usize {
        self.atom_order.len()
    }

    /// Retrieves an immutable reference to a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Returns an iterator over all residues in insertion order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order.iter().map(|&id| (id, &self.residues[id]))
    }

    pub fn residue_count(&self) -> usize {
        self.residue_order.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Mutable access to existing bonds, e.g. to attach parameters.
    ///
    /// Connectivity itself can only change through [`Structure::add_bond`].
    pub fn bonds_mut(&mut self) -> &mut [Bond] {
        &mut self.bonds
    }

    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    pub fn dihedrals(&self) -> &[Dihedral] {
        &self.dihedrals
    }

    pub fn set_angles(&mut self, angles: Vec<Angle>) {
        self.angles = angles;
    }

    pub fn set_dihedrals(&mut self, dihedrals: Vec<Dihedral>) {
        self.dihedrals = dihedrals;
    }

    /// Proper dihedrals parameterized with Ryckaert-Bellemans series.
    pub fn rb_torsions(&self) -> impl Iterator<Item = &Dihedral> {
        self.dihedrals.iter().filter(|d| d.is_rb_torsion())
    }

    pub fn impropers(&self) -> impl Iterator<Item = &Dihedral> {
        self.dihedrals.iter().filter(|d| d.improper)
    }

    pub fn box_vectors(&self) -> Option<&Matrix3<f64>> {
        self.box_vectors.as_ref()
    }

    pub fn set_box_vectors(&mut self, box_vectors: Option<Matrix3<f64>>) {
        self.box_vectors = box_vectors;
    }

    /// Adds a new residue and returns its ID.
    ///
    /// # Arguments
    ///
    /// * `name` - The residue name.
    /// * `number` - The residue sequence number.
    /// * `chain` - The chain identifier used by file formats.
    pub fn add_residue(&mut self, name: &str, number: isize, chain: char) -> ResidueId {
        let residue_id = self.residues.insert(Residue::new(name, number, chain));
        self.residue_order.push(residue_id);
        residue_id
    }

    /// Adds an atom to a specific residue.
    ///
    /// The atom's `residue_id` field is overwritten with `residue_id`.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` if successful, otherwise `None` (the residue doesn't exist).
    pub fn add_atom(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;

        let atom_id = self.atoms.insert(atom);
        self.atom_order.push(atom_id);
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.residues[residue_id].add_atom(atom_id);

        Some(atom_id)
    }

    /// Adds a bond between two atoms.
    ///
    /// Adding an existing bond succeeds without creating a duplicate.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if successful, otherwise `None` (unknown atoms or a self-bond).
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if self.bond_adjacency[atom1_id].contains(&atom2_id) {
            return Some(());
        }

        self.insert_bond(Bond::new(atom1_id, atom2_id, order));
        Some(())
    }

    fn insert_bond(&mut self, bond: Bond) {
        self.bond_adjacency[bond.atom1_id].push(bond.atom2_id);
        self.bond_adjacency[bond.atom2_id].push(bond.atom1_id);
        self.bonds.push(bond);
    }

    /// Retrieves the bonded neighbors of an atom in bond insertion order.
    pub fn bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Returns a copy of this structure with residues regrouped by name.
    ///
    /// Residues whose name appears in `labels` are kept as they are; every other atom is
    /// collected into a single residue named [`DEFAULT_RESIDUE_NAME`]. Atom order, bonds,
    /// bonded terms and box vectors are preserved, and residues are renumbered from 1.
    pub fn regroup_residues<S: AsRef<str>>(&self, labels: &[S]) -> Structure {
        let mut regrouped = Structure {
            box_vectors: self.box_vectors,
            ..Default::default()
        };
        let mut residue_map: HashMap<ResidueId, ResidueId> = HashMap::new();
        let mut default_residue: Option<ResidueId> = None;
        let mut atom_map: HashMap<AtomId, AtomId> = HashMap::new();

        for &atom_id in &self.atom_order {
            let atom = &self.atoms[atom_id];
            let residue = &self.residues[atom.residue_id];
            let keep = labels.iter().any(|label| label.as_ref() == residue.name);

            let target = if keep {
                *residue_map.entry(atom.residue_id).or_insert_with(|| {
                    let number = regrouped.residue_count() as isize + 1;
                    regrouped.add_residue(&residue.name, number, residue.chain)
                })
            } else {
                *default_residue.get_or_insert_with(|| {
                    let number = regrouped.residue_count() as isize + 1;
                    regrouped.add_residue(DEFAULT_RESIDUE_NAME, number, residue.chain)
                })
            };

            if let Some(new_id) = regrouped.add_atom(target, atom.clone()) {
                atom_map.insert(atom_id, new_id);
            }
        }

        regrouped.copy_terms_from(self, &atom_map);
        regrouped
    }

    /// Appends a copy of `other` (atoms, residues and bonded terms) to this structure.
    ///
    /// Appended residues are renumbered after the existing ones; this structure's box
    /// vectors are kept.
    pub fn append(&mut self, other: &Structure) {
        let mut residue_map: HashMap<ResidueId, ResidueId> = HashMap::new();
        let mut atom_map: HashMap<AtomId, AtomId> = HashMap::new();

        for &atom_id in &other.atom_order {
            let atom = &other.atoms[atom_id];
            let residue = &other.residues[atom.residue_id];
            let target = *residue_map.entry(atom.residue_id).or_insert_with(|| {
                let number = self.residue_count() as isize + 1;
                self.add_residue(&residue.name, number, residue.chain)
            });
            if let Some(new_id) = self.add_atom(target, atom.clone()) {
                atom_map.insert(atom_id, new_id);
            }
        }

        self.copy_terms_from(other, &atom_map);
    }

    fn copy_terms_from(&mut self, other: &Structure, atom_map: &HashMap<AtomId, AtomId>) {
        for bond in &other.bonds {
            let ids = (atom_map.get(&bond.atom1_id), atom_map.get(&bond.atom2_id));
            if let (Some(&a1), Some(&a2)) = ids {
                self.insert_bond(Bond {
                    atom1_id: a1,
                    atom2_id: a2,
                    ..bond.clone()
                });
            }
        }

        for angle in &other.angles {
            let ids = [angle.atom1_id, angle.atom2_id, angle.atom3_id].map(|id| atom_map.get(&id));
            if let [Some(&a1), Some(&a2), Some(&a3)] = ids {
                self.angles.push(Angle {
                    atom1_id: a1,
                    atom2_id: a2,
                    atom3_id: a3,
                    param: angle.param.clone(),
                });
            }
        }

        for dihedral in &other.dihedrals {
            let ids = dihedral.atom_ids.map(|id| atom_map.get(&id).copied());
            if let [Some(a1), Some(a2), Some(a3), Some(a4)] = ids {
                self.dihedrals.push(Dihedral {
                    atom_ids: [a1, a2, a3, a4],
                    ..dihedral.clone()
                });
            }
        }
    }
}
