use super::error::ParameterError;
use super::graph::Topology;
use crate::core::forcefield::definition::{
    ForcefieldDefinition, angle_key, bond_key, improper_key, proper_key,
};
use crate::core::forcefield::params::{
    AngleParam, BondParam, ImproperCenter, ImproperDetection, NonbondedParam, ProperPolicy,
    TorsionParam,
};
use crate::core::forcefield::rules::AtomGraph;
use itertools::Itertools;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct BondTerm {
    pub atoms: [usize; 2],
    pub param: BondParam,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngleTerm {
    /// End, center, end.
    pub atoms: [usize; 3],
    pub param: AngleParam,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DihedralTerm {
    pub atoms: [usize; 4],
    pub improper: bool,
    pub param: TorsionParam,
}

/// A topology with every atom typed and every bonded term parameterized.
///
/// Per-atom vectors are indexed like the source [`Topology`]. Dihedrals list the
/// proper torsions first, then the impropers.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTopology {
    pub types: Vec<String>,
    pub classes: Vec<String>,
    pub nonbonded: Vec<NonbondedParam>,
    pub masses: Vec<f64>,
    pub bonds: Vec<BondTerm>,
    pub angles: Vec<AngleTerm>,
    pub dihedrals: Vec<DihedralTerm>,
}

impl TypedTopology {
    pub fn propers(&self) -> impl Iterator<Item = &DihedralTerm> {
        self.dihedrals.iter().filter(|d| !d.improper)
    }

    pub fn impropers(&self) -> impl Iterator<Item = &DihedralTerm> {
        self.dihedrals.iter().filter(|d| d.improper)
    }
}

/// Template lookups memoized by canonical class key.
struct TemplateCache<'d> {
    definition: &'d ForcefieldDefinition,
    bonds: HashMap<[String; 2], Option<&'d BondParam>>,
    angles: HashMap<[String; 3], Option<&'d AngleParam>>,
    propers: HashMap<[String; 4], Option<&'d TorsionParam>>,
    impropers: HashMap<[String; 4], Option<&'d TorsionParam>>,
}

impl<'d> TemplateCache<'d> {
    fn new(definition: &'d ForcefieldDefinition) -> Self {
        Self {
            definition,
            bonds: HashMap::new(),
            angles: HashMap::new(),
            propers: HashMap::new(),
            impropers: HashMap::new(),
        }
    }

    fn bond(&mut self, a: &str, b: &str) -> Option<&'d BondParam> {
        let definition = self.definition;
        *self
            .bonds
            .entry(bond_key(a, b))
            .or_insert_with(|| definition.bond_param(a, b))
    }

    fn angle(&mut self, a: &str, center: &str, c: &str) -> Option<&'d AngleParam> {
        let definition = self.definition;
        *self
            .angles
            .entry(angle_key(a, center, c))
            .or_insert_with(|| definition.angle_param(a, center, c))
    }

    fn proper(&mut self, classes: [&str; 4]) -> Option<&'d TorsionParam> {
        let definition = self.definition;
        *self
            .propers
            .entry(proper_key(classes))
            .or_insert_with(|| definition.proper_param(classes))
    }

    fn improper(&mut self, center: &str, outer: [&str; 3]) -> Option<&'d TorsionParam> {
        let definition = self.definition;
        *self
            .impropers
            .entry(improper_key(center, outer))
            .or_insert_with(|| definition.improper_param(center, outer))
    }
}

fn missing<const N: usize>(kind: &'static str, classes: &[String], atoms: [usize; N]) -> ParameterError {
    ParameterError::MissingParameter {
        kind,
        classes: atoms.iter().map(|&a| classes[a].clone()).collect(),
        atoms: atoms.to_vec(),
    }
}

/// Attaches nonbonded parameters to every atom and generates all bonded terms.
///
/// Bonds follow the topology's bond order. Angles are enumerated per center atom
/// over sorted neighbor pairs; proper dihedrals per bond `j-k` over
/// `i in N(j) \ {k}` and `l in N(k) \ {j}`, skipping three-membered rings.
/// Impropers follow the definition's [`Generation`] conventions.
///
/// [`Generation`]: crate::core::forcefield::params::Generation
pub fn assign_parameters(
    topology: &Topology,
    types: Vec<String>,
    definition: &ForcefieldDefinition,
) -> Result<TypedTopology, ParameterError> {
    let generation = definition.generation();
    let mut cache = TemplateCache::new(definition);

    let classes: Vec<String> = types
        .iter()
        .map(|t| definition.rule(t).map_or_else(|| t.clone(), |r| r.class.clone()))
        .collect();

    let mut nonbonded = Vec::with_capacity(types.len());
    let mut masses = Vec::with_capacity(types.len());
    for (atom, type_name) in types.iter().enumerate() {
        let param = definition
            .nonbonded(type_name)
            .ok_or_else(|| ParameterError::MissingNonbonded {
                type_name: type_name.clone(),
            })?;
        nonbonded.push(*param);
        masses.push(param.mass.unwrap_or_else(|| topology.element(atom).mass()));
    }

    let mut bonds = Vec::with_capacity(topology.bonds().len());
    for &(a, b) in topology.bonds() {
        let param = cache
            .bond(&classes[a], &classes[b])
            .ok_or_else(|| missing("bond", &classes, [a, b]))?;
        bonds.push(BondTerm {
            atoms: [a, b],
            param: *param,
        });
    }

    let mut angles = Vec::new();
    for center in 0..topology.atom_count() {
        for (first, last) in topology.neighbors(center).iter().copied().tuple_combinations() {
            let atoms = [first, center, last];
            let param = cache
                .angle(&classes[first], &classes[center], &classes[last])
                .ok_or_else(|| missing("angle", &classes, atoms))?;
            angles.push(AngleTerm {
                atoms,
                param: *param,
            });
        }
    }

    let mut dihedrals = Vec::new();
    let mut dropped_propers = 0usize;
    for &(j, k) in topology.bonds() {
        for &i in topology.neighbors(j).iter().filter(|&&i| i != k) {
            for &l in topology.neighbors(k).iter().filter(|&&l| l != j && l != i) {
                let atoms = [i, j, k, l];
                let key = atoms.map(|a| classes[a].as_str());
                match (cache.proper(key), generation.propers) {
                    (Some(param), _) => dihedrals.push(DihedralTerm {
                        atoms,
                        improper: false,
                        param: param.clone(),
                    }),
                    (None, ProperPolicy::Templated) => dropped_propers += 1,
                    (None, ProperPolicy::Required) => {
                        return Err(missing("proper torsion", &classes, atoms));
                    }
                }
            }
        }
    }

    let mut dropped_impropers = 0usize;
    for center in 0..topology.atom_count() {
        let neighbors = topology.neighbors(center);
        let triples: Vec<(usize, usize, usize)> = match generation.impropers {
            ImproperDetection::None => break,
            ImproperDetection::Trigonal if neighbors.len() != 3 => continue,
            ImproperDetection::Trigonal
            | ImproperDetection::Combinations
            | ImproperDetection::Templated => {
                neighbors.iter().copied().tuple_combinations().collect()
            }
        };
        for (a, b, c) in triples {
            let outer = [a, b, c];
            let atoms = match generation.improper_center {
                ImproperCenter::First => [center, outer[0], outer[1], outer[2]],
                ImproperCenter::Third => [outer[0], outer[1], center, outer[2]],
            };
            let outer_classes = outer.map(|a| classes[a].as_str());
            match cache.improper(&classes[center], outer_classes) {
                Some(param) => dihedrals.push(DihedralTerm {
                    atoms,
                    improper: true,
                    param: param.clone(),
                }),
                None if generation.impropers == ImproperDetection::Templated => {
                    dropped_impropers += 1;
                }
                None => return Err(missing("improper", &classes, atoms)),
            }
        }
    }

    if dropped_propers > 0 || dropped_impropers > 0 {
        debug!(
            propers = dropped_propers,
            impropers = dropped_impropers,
            "Dropped dihedrals without matching templates"
        );
    }

    Ok(TypedTopology {
        types,
        classes,
        nonbonded,
        masses,
        bonds,
        angles,
        dihedrals,
    })
}
