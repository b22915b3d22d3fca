use super::config::SpecificityPolicy;
use super::error::TypingError;
use super::graph::Topology;
use super::progress::{Progress, ProgressReporter};
use crate::core::forcefield::definition::{ForcefieldDefinition, TypeRule};
use crate::core::forcefield::rules::AtomGraph;
use crate::core::models::element::Element;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Assigns atom types by evaluating a definition's rules against a graph.
///
/// Rules are indexed by element once; rules without an element are tried on every
/// atom. Candidates are always evaluated in type-name order.
pub struct TypeMatcher<'d> {
    policy: SpecificityPolicy,
    by_element: HashMap<Element, Vec<&'d TypeRule>>,
    any_element: Vec<&'d TypeRule>,
}

impl<'d> TypeMatcher<'d> {
    pub fn new(definition: &'d ForcefieldDefinition, policy: SpecificityPolicy) -> Self {
        let mut by_element: HashMap<Element, Vec<&'d TypeRule>> = HashMap::new();
        let mut any_element = Vec::new();
        for rule in definition.atom_types() {
            match rule.element {
                Some(element) => by_element.entry(element).or_default().push(rule),
                None => any_element.push(rule),
            }
        }
        Self {
            policy,
            by_element,
            any_element,
        }
    }

    /// Rules whose pattern embeds at `atom`, sorted by type name.
    pub fn matching_rules<G: AtomGraph + ?Sized>(&self, graph: &G, atom: usize) -> Vec<&'d TypeRule> {
        let element = graph.element(atom);
        let mut matched: Vec<&'d TypeRule> = self
            .by_element
            .get(&element)
            .into_iter()
            .flatten()
            .chain(&self.any_element)
            .copied()
            .filter(|rule| rule.definition.matches_at(graph, atom))
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched
    }

    /// Selects the single type of `atom`.
    ///
    /// Candidates overridden by another matching candidate are removed first; with
    /// [`SpecificityPolicy::PatternSize`] only the highest-scoring rules survive.
    pub fn type_atom<G: AtomGraph + ?Sized>(
        &self,
        graph: &G,
        atom: usize,
    ) -> Result<&'d str, TypingError> {
        let element = graph.element(atom);
        let matched = self.matching_rules(graph, atom);
        if matched.is_empty() {
            return Err(TypingError::UntypedAtom {
                index: atom,
                element,
            });
        }

        let overridden: BTreeSet<&str> = matched
            .iter()
            .flat_map(|rule| rule.overrides.iter().map(String::as_str))
            .collect();
        let mut survivors: Vec<&'d TypeRule> = matched
            .iter()
            .copied()
            .filter(|rule| !overridden.contains(rule.name.as_str()))
            .collect();

        if self.policy == SpecificityPolicy::PatternSize {
            if let Some(best) = survivors.iter().map(|r| r.definition.specificity()).max() {
                survivors.retain(|rule| rule.definition.specificity() == best);
            }
        }

        match survivors.as_slice() {
            [winner] => {
                let winner: &'d TypeRule = *winner;
                Ok(winner.name.as_str())
            }
            [] => Err(TypingError::AmbiguousType {
                index: atom,
                element,
                candidates: matched.iter().map(|r| r.name.clone()).collect(),
            }),
            tied => Err(TypingError::AmbiguousType {
                index: atom,
                element,
                candidates: tied.iter().map(|r| r.name.clone()).collect(),
            }),
        }
    }
}

/// Types every atom of `topology`, returning one type name per atom index.
pub fn match_types(
    topology: &Topology,
    definition: &ForcefieldDefinition,
    policy: SpecificityPolicy,
) -> Result<Vec<String>, TypingError> {
    match_types_with_progress(topology, definition, policy, &ProgressReporter::new())
}

/// [`match_types`], reporting one task step per typed atom.
pub fn match_types_with_progress(
    topology: &Topology,
    definition: &ForcefieldDefinition,
    policy: SpecificityPolicy,
    reporter: &ProgressReporter,
) -> Result<Vec<String>, TypingError> {
    let matcher = TypeMatcher::new(definition, policy);
    reporter.report(Progress::TaskStart {
        total_steps: topology.atom_count() as u64,
    });
    let types = (0..topology.atom_count())
        .map(|atom| {
            let type_name = matcher.type_atom(topology, atom).map(str::to_string);
            reporter.report(Progress::TaskIncrement);
            type_name
        })
        .collect::<Result<Vec<_>, _>>();
    reporter.report(Progress::TaskFinish);
    let types = types?;
    debug!(atoms = types.len(), "Typed all atoms individually");
    Ok(types)
}
