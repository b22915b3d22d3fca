use super::error::TopologyError;
use crate::core::forcefield::rules::AtomGraph;
use crate::core::models::element::Element;
use crate::core::models::ids::AtomId;
use crate::core::models::residue::DEFAULT_RESIDUE_NAME;
use crate::core::models::structure::Structure;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyAtom {
    pub element: Element,
    /// Index into [`Topology::residues`].
    pub residue: usize,
    /// Size of the smallest ring through this atom.
    pub ring_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyResidue {
    pub name: String,
    /// Member atom indices in ascending order.
    pub atoms: Vec<usize>,
}

/// Index-based molecular graph used by the typing engine.
///
/// Atoms are numbered `0..n`; adjacency lists are sorted ascending and bonds keep
/// the order in which they were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    atoms: Vec<TopologyAtom>,
    adjacency: Vec<Vec<usize>>,
    bonds: Vec<(usize, usize)>,
    residues: Vec<TopologyResidue>,
}

/// Maps topology indices back onto the structure they were built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyMetadata {
    /// Atom ID of each topology index.
    pub atom_ids: Vec<AtomId>,
}

impl Topology {
    /// Builds a topology from raw parts.
    ///
    /// `residues` pairs a name with member atom indices. Atoms that no residue
    /// claims are collected into a trailing residue named `RES`; with no residues
    /// at all, that residue covers every atom.
    pub fn from_parts(
        elements: Vec<Element>,
        bonds: &[(usize, usize)],
        residues: Vec<(String, Vec<usize>)>,
    ) -> Result<Self, TopologyError> {
        let n = elements.len();
        let mut adjacency = vec![Vec::new(); n];
        let mut seen = HashSet::new();
        for &(a, b) in bonds {
            if a >= n || b >= n {
                return Err(TopologyError::UnknownAtom);
            }
            if a == b {
                return Err(TopologyError::SelfBond { index: a });
            }
            if !seen.insert((a.min(b), a.max(b))) {
                return Err(TopologyError::DuplicateBond {
                    first: a.min(b),
                    second: a.max(b),
                });
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        let mut owner: Vec<Option<usize>> = vec![None; n];
        let mut topology_residues = Vec::with_capacity(residues.len() + 1);
        for (name, mut members) in residues {
            members.sort_unstable();
            members.dedup();
            for &atom in &members {
                if atom >= n {
                    return Err(TopologyError::UnknownAtom);
                }
                owner[atom] = Some(topology_residues.len());
            }
            topology_residues.push(TopologyResidue {
                name,
                atoms: members,
            });
        }
        // Later residues claim shared atoms; drop them from earlier member lists.
        for (index, residue) in topology_residues.iter_mut().enumerate() {
            residue.atoms.retain(|&atom| owner[atom] == Some(index));
        }
        let orphans: Vec<usize> = (0..n).filter(|&atom| owner[atom].is_none()).collect();
        if !orphans.is_empty() {
            for &atom in &orphans {
                owner[atom] = Some(topology_residues.len());
            }
            topology_residues.push(TopologyResidue {
                name: DEFAULT_RESIDUE_NAME.to_string(),
                atoms: orphans,
            });
        }

        let ring_sizes = smallest_rings(&adjacency);
        let atoms = elements
            .into_iter()
            .zip(owner)
            .zip(ring_sizes)
            .map(|((element, residue), ring_size)| TopologyAtom {
                element,
                residue: residue.unwrap_or_default(),
                ring_size,
            })
            .collect();

        Ok(Self {
            atoms,
            adjacency,
            bonds: bonds.to_vec(),
            residues: topology_residues,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[TopologyAtom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> &TopologyAtom {
        &self.atoms[index]
    }

    pub fn bonds(&self) -> &[(usize, usize)] {
        &self.bonds
    }

    pub fn residues(&self) -> &[TopologyResidue] {
        &self.residues
    }

    /// First bond joining two different residues, if any.
    pub fn inter_residue_bond(&self) -> Option<(usize, usize)> {
        self.bonds
            .iter()
            .copied()
            .find(|&(a, b)| self.atoms[a].residue != self.atoms[b].residue)
    }
}

impl AtomGraph for Topology {
    fn element(&self, atom: usize) -> Element {
        self.atoms[atom].element
    }

    fn neighbors(&self, atom: usize) -> &[usize] {
        &self.adjacency[atom]
    }

    fn smallest_ring(&self, atom: usize) -> Option<usize> {
        self.atoms[atom].ring_size
    }
}

/// Smallest ring size through every atom, by breadth-first search from each atom.
///
/// Every visited atom is labelled with the root neighbor its shortest path leaves
/// through; an edge between two atoms with different labels closes a ring of length
/// `dist[u] + dist[w] + 1` through the root.
fn smallest_rings(adjacency: &[Vec<usize>]) -> Vec<Option<usize>> {
    let n = adjacency.len();
    let mut result = vec![None; n];
    let mut dist = vec![usize::MAX; n];
    let mut branch = vec![usize::MAX; n];
    let mut touched = Vec::new();

    for root in 0..n {
        if adjacency[root].len() < 2 {
            continue;
        }
        for &atom in &touched {
            dist[atom] = usize::MAX;
            branch[atom] = usize::MAX;
        }
        touched.clear();

        let mut queue = VecDeque::new();
        dist[root] = 0;
        touched.push(root);
        for &first in &adjacency[root] {
            dist[first] = 1;
            branch[first] = first;
            touched.push(first);
            queue.push_back(first);
        }

        let mut best: Option<usize> = None;
        while let Some(u) = queue.pop_front() {
            if best.is_some_and(|b| 2 * dist[u] + 1 > b) {
                break;
            }
            for &w in &adjacency[u] {
                if w == root {
                    continue;
                }
                if dist[w] == usize::MAX {
                    dist[w] = dist[u] + 1;
                    branch[w] = branch[u];
                    touched.push(w);
                    queue.push_back(w);
                } else if branch[w] != branch[u] {
                    let length = dist[u] + dist[w] + 1;
                    best = Some(best.map_or(length, |b| b.min(length)));
                }
            }
        }
        result[root] = best;
    }
    result
}

/// Builds the index-based topology of `structure`.
///
/// Atom indices follow the structure's atom order; residues follow its residue
/// order.
pub fn build_topology(structure: &Structure) -> Result<(Topology, TopologyMetadata), TopologyError> {
    let atom_ids: Vec<AtomId> = structure.atom_ids().to_vec();
    let index_of: HashMap<AtomId, usize> = atom_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();

    let elements = structure.atoms_iter().map(|(_, atom)| atom.element).collect();
    let bonds = structure
        .bonds()
        .iter()
        .map(|bond| {
            match (index_of.get(&bond.atom1_id), index_of.get(&bond.atom2_id)) {
                (Some(&a), Some(&b)) => Ok((a, b)),
                _ => Err(TopologyError::UnknownAtom),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut residues = Vec::with_capacity(structure.residue_count());
    for (_, residue) in structure.residues_iter() {
        let members = residue
            .atoms()
            .iter()
            .map(|id| index_of.get(id).copied().ok_or(TopologyError::UnknownAtom))
            .collect::<Result<Vec<_>, _>>()?;
        residues.push((residue.name.clone(), members));
    }

    let topology = Topology::from_parts(elements, &bonds, residues)?;
    let metadata = TopologyMetadata { atom_ids };
    Ok((topology, metadata))
}

/// True when no bond joins atoms of two different residues.
pub fn check_independent_residues(topology: &Topology) -> bool {
    topology.inter_residue_bond().is_none()
}
