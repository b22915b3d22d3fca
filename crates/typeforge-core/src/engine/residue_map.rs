use super::config::SpecificityPolicy;
use super::error::TypingError;
use super::graph::{Topology, TopologyResidue};
use super::matcher::TypeMatcher;
use super::progress::{Progress, ProgressReporter};
use crate::core::forcefield::definition::ForcefieldDefinition;
use crate::core::forcefield::rules::AtomGraph;
use crate::core::models::element::Element;
use std::collections::HashMap;
use tracing::debug;

/// Identity of a residue's internal graph: name, member elements and bonds,
/// with atoms numbered by their position inside the residue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResidueTemplate {
    name: String,
    elements: Vec<Element>,
    bonds: Vec<(usize, usize)>,
}

impl ResidueTemplate {
    fn of(topology: &Topology, residue: &TopologyResidue) -> Self {
        let position: HashMap<usize, usize> = residue
            .atoms
            .iter()
            .enumerate()
            .map(|(pos, &atom)| (atom, pos))
            .collect();
        let elements = residue.atoms.iter().map(|&a| topology.element(a)).collect();
        let mut bonds = Vec::new();
        for (pos, &atom) in residue.atoms.iter().enumerate() {
            for neighbor in topology.neighbors(atom) {
                if let Some(&other) = position.get(neighbor) {
                    if other > pos {
                        bonds.push((pos, other));
                    }
                }
            }
        }
        bonds.sort_unstable();
        Self {
            name: residue.name.clone(),
            elements,
            bonds,
        }
    }
}

/// Types `topology` by typing one representative of each distinct residue and
/// copying its types onto every identical residue.
///
/// Only valid when no bond crosses a residue boundary; otherwise the atoms of a
/// residue could see different environments in different copies, and a
/// [`TypingError::ResidueIndependence`] naming the first offending pair is returned.
pub fn type_with_residue_map(
    topology: &Topology,
    definition: &ForcefieldDefinition,
    policy: SpecificityPolicy,
) -> Result<Vec<String>, TypingError> {
    type_with_residue_map_with_progress(topology, definition, policy, &ProgressReporter::new())
}

/// [`type_with_residue_map`], reporting one task step per residue.
///
/// Nothing is reported when the residues turn out not to be independent.
pub fn type_with_residue_map_with_progress(
    topology: &Topology,
    definition: &ForcefieldDefinition,
    policy: SpecificityPolicy,
    reporter: &ProgressReporter,
) -> Result<Vec<String>, TypingError> {
    if let Some((a, b)) = topology.inter_residue_bond() {
        let residues = topology.residues();
        return Err(TypingError::ResidueIndependence {
            first: residues[topology.atom(a).residue].name.clone(),
            second: residues[topology.atom(b).residue].name.clone(),
        });
    }

    let matcher = TypeMatcher::new(definition, policy);
    let mut templates: HashMap<ResidueTemplate, Vec<String>> = HashMap::new();
    let mut types = vec![String::new(); topology.atom_count()];

    reporter.report(Progress::TaskStart {
        total_steps: topology.residues().len() as u64,
    });
    for residue in topology.residues() {
        let key = ResidueTemplate::of(topology, residue);
        if !templates.contains_key(&key) {
            let typed = residue
                .atoms
                .iter()
                .map(|&atom| matcher.type_atom(topology, atom).map(str::to_string))
                .collect::<Result<Vec<_>, _>>();
            let typed = match typed {
                Ok(typed) => typed,
                Err(e) => {
                    reporter.report(Progress::TaskFinish);
                    return Err(e);
                }
            };
            templates.insert(key.clone(), typed);
        }
        let template_types = &templates[&key];
        for (&atom, type_name) in residue.atoms.iter().zip(template_types) {
            types[atom].clone_from(type_name);
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    debug!(
        residues = topology.residues().len(),
        templates = templates.len(),
        "Typed atoms through the residue map"
    );
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::definition::ForcefieldSource;
    use crate::core::models::fixtures;
    use crate::core::models::structure::Structure;
    use crate::engine::graph::build_topology;
    use crate::engine::matcher::match_types;

    fn oplsaa() -> ForcefieldDefinition {
        ForcefieldDefinition::load([ForcefieldSource::builtin("oplsaa")]).unwrap()
    }

    fn two_ethanes() -> Structure {
        let mut s = fixtures::ethane();
        s.append(&fixtures::ethane());
        s
    }

    #[test]
    fn residue_map_agrees_with_full_typing() {
        let ff = oplsaa();
        let (topology, _) = build_topology(&two_ethanes()).unwrap();
        assert_eq!(topology.residues().len(), 2);

        let mapped = type_with_residue_map(&topology, &ff, SpecificityPolicy::default()).unwrap();
        let full = match_types(&topology, &ff, SpecificityPolicy::default()).unwrap();
        assert_eq!(mapped, full);
        assert_eq!(mapped.iter().filter(|t| *t == "opls_135").count(), 4);
    }

    #[test]
    fn distinct_residues_get_their_own_templates() {
        let ff = oplsaa();
        let mut s = fixtures::ethane();
        s.append(&fixtures::ethanol());
        s.append(&fixtures::ethane());
        let (topology, _) = build_topology(&s).unwrap();

        let mapped = type_with_residue_map(&topology, &ff, SpecificityPolicy::default()).unwrap();
        let full = match_types(&topology, &ff, SpecificityPolicy::default()).unwrap();
        assert_eq!(mapped, full);
        assert!(mapped.iter().any(|t| t == "opls_154"));
    }

    #[test]
    fn bonded_residues_are_rejected() {
        let (topology, _) = build_topology(&fixtures::ethane_two_methyls()).unwrap();
        let err =
            type_with_residue_map(&topology, &oplsaa(), SpecificityPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            TypingError::ResidueIndependence {
                first: "CH3".into(),
                second: "CH3".into()
            }
        );
    }

    #[test]
    fn template_key_uses_relative_bonds() {
        let (single, _) = build_topology(&fixtures::ethane()).unwrap();
        let (double, _) = build_topology(&two_ethanes()).unwrap();
        let first = ResidueTemplate::of(&single, &single.residues()[0]);
        let second = ResidueTemplate::of(&double, &double.residues()[1]);
        assert_eq!(first, second);
        assert_eq!(first.bonds.len(), 7);
    }
}
