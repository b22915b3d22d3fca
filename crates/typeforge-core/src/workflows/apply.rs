use crate::core::forcefield::definition::{ForcefieldDefinition, ForcefieldError, ForcefieldSource};
use crate::core::io::references::{collect_citations, write_references};
use crate::core::models::structure::Structure;
use crate::core::models::topology::{Angle, Dihedral};
use crate::engine::assigner::{TypedTopology, assign_parameters};
use crate::engine::config::{ApplyOptions, ResidueMapPolicy};
use crate::engine::error::{ApplyError, TypingError};
use crate::engine::graph::{Topology, TopologyMetadata, build_topology};
use crate::engine::matcher::match_types_with_progress;
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use crate::engine::residue_map::type_with_residue_map_with_progress;
use std::path::Path;
use tracing::{info, instrument, warn};

/// A loaded forcefield, ready to be applied to any number of structures.
///
/// The underlying definition is immutable; a `Forcefield` can be shared by
/// reference across threads.
#[derive(Debug, Clone)]
pub struct Forcefield {
    definition: ForcefieldDefinition,
}

impl Forcefield {
    pub fn new(definition: ForcefieldDefinition) -> Self {
        Self { definition }
    }

    /// Loads a forcefield shipped with the library, e.g. `"oplsaa"`.
    pub fn from_name(name: &str) -> Result<Self, ForcefieldError> {
        Self::load([ForcefieldSource::builtin(name)])
    }

    /// Loads and merges forcefield files in order.
    pub fn from_files<I, P>(paths: I) -> Result<Self, ForcefieldError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::load(
            paths
                .into_iter()
                .map(|path| ForcefieldSource::path(path.as_ref())),
        )
    }

    pub fn load<I>(sources: I) -> Result<Self, ForcefieldError>
    where
        I: IntoIterator<Item = ForcefieldSource>,
    {
        let definition = ForcefieldDefinition::load(sources)?;
        info!(
            sources = ?definition.sources(),
            atom_types = definition.atom_type_count(),
            templates = definition.bonded_template_count(),
            "Loaded forcefield"
        );
        Ok(Self::new(definition))
    }

    pub fn definition(&self) -> &ForcefieldDefinition {
        &self.definition
    }

    /// Types and parameterizes a copy of `structure`.
    pub fn apply(&self, structure: &Structure, options: &ApplyOptions) -> Result<Structure, ApplyError> {
        self.apply_with_progress(structure, options, &ProgressReporter::new())
    }

    /// As [`Forcefield::apply`], reporting each phase to `reporter`.
    ///
    /// The returned structure keeps the input's atom order, bonds and box vectors;
    /// every atom carries a type and nonbonded parameters, every bond a parameter,
    /// and generated angles and dihedrals replace any the input had.
    #[instrument(skip_all, name = "apply_forcefield")]
    pub fn apply_with_progress(
        &self,
        structure: &Structure,
        options: &ApplyOptions,
        reporter: &ProgressReporter,
    ) -> Result<Structure, ApplyError> {
        info!(
            atoms = structure.atom_count(),
            residues = structure.residue_count(),
            "Applying forcefield"
        );

        let working = reporter.phase(Phase::RegroupResidues, || match &options.residues {
            Some(labels) => structure.regroup_residues(labels),
            None => structure.clone(),
        });

        let (topology, metadata) =
            reporter.phase(Phase::BuildTopology, || build_topology(&working))?;

        let typed = self.parameterize(&topology, options, reporter)?;

        if let Some(path) = &options.references_file {
            reporter.phase(Phase::WriteReferences, || {
                let citations =
                    collect_citations(&self.definition, typed.types.iter().map(String::as_str));
                write_references(path, &citations).map_err(|source| ApplyError::Io {
                    path: path.display().to_string(),
                    source,
                })
            })?;
        }

        let result = write_back(working, &metadata, &typed);
        info!(
            bonds = result.bonds().len(),
            angles = result.angles().len(),
            dihedrals = result.dihedrals().len(),
            "Forcefield applied"
        );
        Ok(result)
    }

    /// Types and parameterizes an already built topology without producing a
    /// structure.
    ///
    /// With `use_residue_map`, residues must be independent; a bonded pair of
    /// residues is reported as [`TypingError::ResidueIndependence`].
    pub fn create_system(
        &self,
        topology: &Topology,
        use_residue_map: bool,
    ) -> Result<TypedTopology, ApplyError> {
        let options = ApplyOptions {
            use_residue_map,
            residue_map_policy: ResidueMapPolicy::Strict,
            ..ApplyOptions::default()
        };
        self.parameterize(topology, &options, &ProgressReporter::new())
    }

    fn parameterize(
        &self,
        topology: &Topology,
        options: &ApplyOptions,
        reporter: &ProgressReporter,
    ) -> Result<TypedTopology, ApplyError> {
        let types = reporter.phase(Phase::AssignTypes, || {
            self.assign_types(topology, options, reporter)
        })?;
        let typed = reporter.phase(Phase::AssignParameters, || {
            assign_parameters(topology, types, &self.definition)
        })?;
        Ok(typed)
    }

    fn assign_types(
        &self,
        topology: &Topology,
        options: &ApplyOptions,
        reporter: &ProgressReporter,
    ) -> Result<Vec<String>, TypingError> {
        if options.use_residue_map {
            self.type_by_residue(topology, options, reporter)
        } else {
            match_types_with_progress(topology, &self.definition, options.specificity, reporter)
        }
    }

    fn type_by_residue(
        &self,
        topology: &Topology,
        options: &ApplyOptions,
        reporter: &ProgressReporter,
    ) -> Result<Vec<String>, TypingError> {
        let specificity = options.specificity;
        match type_with_residue_map_with_progress(topology, &self.definition, specificity, reporter)
        {
            Err(TypingError::ResidueIndependence { first, second })
                if options.residue_map_policy == ResidueMapPolicy::FallBack =>
            {
                warn!(
                    first = %first,
                    second = %second,
                    "Residues are bonded to each other; typing every atom individually"
                );
                reporter.report(Progress::Message(format!(
                    "Residues {first} and {second} are bonded; typing atoms individually"
                )));
                match_types_with_progress(topology, &self.definition, specificity, reporter)
            }
            other => other,
        }
    }
}

/// Copies types and parameters from `typed` onto the structure it was built from.
fn write_back(mut structure: Structure, metadata: &TopologyMetadata, typed: &TypedTopology) -> Structure {
    let ids = &metadata.atom_ids;
    for (index, &atom_id) in ids.iter().enumerate() {
        if let Some(atom) = structure.atom_mut(atom_id) {
            atom.atom_type = Some(typed.types[index].clone());
            atom.nonbonded = Some(typed.nonbonded[index]);
            atom.mass = typed.masses[index];
        }
    }

    for (bond, term) in structure.bonds_mut().iter_mut().zip(&typed.bonds) {
        bond.param = Some(term.param);
    }

    let angles = typed
        .angles
        .iter()
        .map(|term| {
            let [a, b, c] = term.atoms.map(|i| ids[i]);
            Angle {
                param: Some(term.param),
                ..Angle::new(a, b, c)
            }
        })
        .collect();
    structure.set_angles(angles);

    let dihedrals = typed
        .dihedrals
        .iter()
        .map(|term| Dihedral {
            atom_ids: term.atoms.map(|i| ids[i]),
            improper: term.improper,
            param: Some(term.param.clone()),
        })
        .collect();
    structure.set_dihedrals(dihedrals);

    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::fixtures;
    use crate::engine::config::ApplyOptionsBuilder;
    use crate::engine::error::ParameterError;
    use nalgebra::Matrix3;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const CUSTOM_ALKANE: &str = r#"
        [[atom-types]]
        name = "C3"
        class = "CT"
        def = "[C;X4](C)(H)(H)H"
        doi = "10.1000/custom"

        [[atom-types]]
        name = "Hb"
        class = "HC"
        def = "[H]C"

        [nonbonded.C3]
        charge = -0.18
        sigma = 0.35
        epsilon = 0.276144

        [nonbonded.Hb]
        charge = 0.06
        sigma = 0.25
        epsilon = 0.12552

        [[bonds]]
        classes = ["CT", "CT"]
        length = 0.1529
        k = 224262.4

        [[bonds]]
        classes = ["CT", "HC"]
        length = 0.109
        k = 284512.0

        [[angles]]
        classes = ["CT", "CT", "HC"]
        angle = 1.932
        k = 313.8

        [[angles]]
        classes = ["HC", "CT", "HC"]
        angle = 1.8814
        k = 276.144

        [[rb-torsions]]
        classes = ["HC", "CT", "CT", "HC"]
        c = [0.6276, 1.8828, 0.0, -2.5104, 0.0, 0.0]
    "#;

    const AROMATIC_IMPROPERS: &str = r#"
        [generation]
        impropers = "trigonal"
        propers = "templated"

        [[atom-types]]
        name = "CA"
        def = "[C;X3;r6]"

        [[atom-types]]
        name = "HC"
        def = "[H][C;X3]"

        [nonbonded.CA]
        charge = -0.115
        sigma = 0.355
        epsilon = 0.29288

        [nonbonded.HC]
        charge = 0.115
        sigma = 0.242
        epsilon = 0.12552

        [[bonds]]
        classes = ["CA", "CA"]
        length = 0.14
        k = 392459.2

        [[bonds]]
        classes = ["CA", "HC"]
        length = 0.108
        k = 307105.6

        [[angles]]
        classes = ["CA", "CA", "CA"]
        angle = 2.0944
        k = 527.184

        [[angles]]
        classes = ["CA", "CA", "HC"]
        angle = 2.0944
        k = 292.88

        [[rb-torsions]]
        classes = ["HC", "CA", "CA", "CA"]
        c = [30.334, 0.0, -30.334, 0.0, 0.0, 0.0]

        [[impropers]]
        classes = ["CA", "", "", ""]
        form = "periodic"
        terms = [{ periodicity = 2, phase = 3.141592653589793, k = 4.6024 }]
    "#;

    fn oplsaa() -> Forcefield {
        Forcefield::from_name("oplsaa").unwrap()
    }

    fn inline(content: &str) -> Forcefield {
        Forcefield::load([ForcefieldSource::inline("test", content)]).unwrap()
    }

    fn type_counts(structure: &Structure) -> std::collections::BTreeMap<String, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for (_, atom) in structure.atoms_iter() {
            *counts.entry(atom.atom_type.clone().unwrap()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn ethane_with_oplsaa_is_fully_parameterized() {
        let typed = oplsaa()
            .apply(&fixtures::ethane(), &ApplyOptions::default())
            .unwrap();

        let counts = type_counts(&typed);
        assert_eq!(counts["opls_135"], 2);
        assert_eq!(counts["opls_140"], 6);
        assert_eq!(typed.bonds().len(), 7);
        assert_eq!(typed.angles().len(), 12);
        assert_eq!(typed.dihedrals().len(), 9);
        assert_eq!(typed.rb_torsions().count(), 9);
        assert!(typed.bonds().iter().all(|b| b.param.is_some()));
        assert!(typed.angles().iter().all(|a| a.param.is_some()));
        assert!(typed.atoms_iter().all(|(_, a)| a.nonbonded.is_some()));
    }

    #[test]
    fn input_structure_is_left_untouched() {
        let ethane = fixtures::ethane();
        oplsaa().apply(&ethane, &ApplyOptions::default()).unwrap();
        assert!(ethane.atoms_iter().all(|(_, a)| !a.is_typed()));
        assert!(ethane.angles().is_empty());
    }

    #[test]
    fn box_vectors_and_residue_names_are_preserved() {
        let mut ethane = fixtures::ethane();
        let box_vectors = Matrix3::new(3.0, 0.0, 0.0, 0.0, 3.5, 0.0, 0.0, 0.0, 4.0);
        ethane.set_box_vectors(Some(box_vectors));

        let typed = oplsaa().apply(&ethane, &ApplyOptions::default()).unwrap();
        assert_eq!(typed.box_vectors(), Some(&box_vectors));
        let names: Vec<_> = typed.residues_iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(names, ["ETH"]);
    }

    #[test]
    fn listed_residues_survive_regrouping() {
        let options = ApplyOptionsBuilder::new().residues(["CH3"]).build().unwrap();
        let typed = oplsaa()
            .apply(&fixtures::ethane_two_methyls(), &options)
            .unwrap();

        let names: Vec<_> = typed.residues_iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(names, ["CH3", "CH3"]);
        assert_eq!(type_counts(&typed)["opls_135"], 2);
    }

    #[test]
    fn unlisted_residues_are_merged() {
        let options = ApplyOptionsBuilder::new().residues(["HOH"]).build().unwrap();
        let typed = oplsaa()
            .apply(&fixtures::ethane_two_methyls(), &options)
            .unwrap();
        let names: Vec<_> = typed.residues_iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(names, ["RES"]);
    }

    #[test]
    fn custom_rule_set_types_ethane() {
        let typed = inline(CUSTOM_ALKANE)
            .apply(&fixtures::ethane(), &ApplyOptions::default())
            .unwrap();
        let counts = type_counts(&typed);
        assert_eq!(counts["C3"], 2);
        assert_eq!(counts["Hb"], 6);
    }

    #[test]
    fn benzene_gets_trigonal_impropers_and_templated_propers() {
        let typed = inline(AROMATIC_IMPROPERS)
            .apply(&fixtures::benzene(), &ApplyOptions::default())
            .unwrap();
        assert_eq!(typed.dihedrals().len(), 18);
        assert_eq!(typed.impropers().count(), 6);
        assert_eq!(typed.dihedrals().iter().filter(|d| !d.improper).count(), 12);
    }

    #[test]
    fn references_file_lists_cited_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        let options = ApplyOptionsBuilder::new()
            .references_file(path.clone())
            .build()
            .unwrap();

        inline(CUSTOM_ALKANE)
            .apply(&fixtures::ethane(), &options)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("@article{10.1000/custom,"));
        assert!(content.contains("Parameters for atom types: C3"));
        assert!(!content.contains("Hb"));
    }

    #[test]
    fn references_file_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("refs.bib");
        let options = ApplyOptionsBuilder::new()
            .references_file(path)
            .build()
            .unwrap();
        let err = oplsaa()
            .apply(&fixtures::ethane(), &options)
            .unwrap_err();
        assert!(matches!(err, ApplyError::Io { .. }));
    }

    #[test]
    fn bonded_residues_fall_back_to_full_typing() {
        let typed = oplsaa()
            .apply(&fixtures::butane_fragments(), &ApplyOptions::default())
            .unwrap();
        let counts = type_counts(&typed);
        assert_eq!(counts["opls_135"], 2);
        assert_eq!(counts["opls_136"], 2);
    }

    #[test]
    fn strict_residue_policy_rejects_bonded_residues() {
        let options = ApplyOptionsBuilder::new()
            .residue_map_policy(ResidueMapPolicy::Strict)
            .build()
            .unwrap();
        let err = oplsaa()
            .apply(&fixtures::butane_fragments(), &options)
            .unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Typing {
                source: TypingError::ResidueIndependence { .. }
            }
        ));

        let without_map = ApplyOptionsBuilder::new()
            .use_residue_map(false)
            .residue_map_policy(ResidueMapPolicy::Strict)
            .build()
            .unwrap();
        assert!(oplsaa().apply(&fixtures::butane_fragments(), &without_map).is_ok());
    }

    #[test]
    fn missing_parameters_surface_as_apply_errors() {
        let content = CUSTOM_ALKANE.replace("classes = [\"HC\", \"CT\", \"HC\"]", "classes = [\"HC\", \"CT\", \"XX\"]");
        let err = inline(&content)
            .apply(&fixtures::ethane(), &ApplyOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Parameter {
                source: ParameterError::MissingParameter { kind: "angle", .. }
            }
        ));
    }

    #[test]
    fn create_system_matches_full_typing_for_independent_residues() {
        let mut two = fixtures::ethane();
        two.append(&fixtures::ethane());
        let (topology, _) = build_topology(&two).unwrap();
        let ff = oplsaa();

        let mapped = ff.create_system(&topology, true).unwrap();
        let full = ff.create_system(&topology, false).unwrap();
        assert_eq!(mapped.types, full.types);
        assert_eq!(mapped.bonds, full.bonds);
        for atom in 0..topology.atom_count() {
            let partner_types = |typed: &TypedTopology| -> Vec<(usize, String)> {
                crate::core::forcefield::rules::AtomGraph::neighbors(&topology, atom)
                    .iter()
                    .map(|&n| (n, typed.types[n].clone()))
                    .collect()
            };
            assert_eq!(partner_types(&mapped), partner_types(&full));
        }
    }

    #[test]
    fn progress_reports_every_phase() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { phase } = event {
                phases.lock().unwrap().push(phase);
            }
        }));
        oplsaa()
            .apply_with_progress(&fixtures::ethane(), &ApplyOptions::default(), &reporter)
            .unwrap();
        drop(reporter);
        assert_eq!(
            phases.into_inner().unwrap(),
            [
                Phase::RegroupResidues,
                Phase::BuildTopology,
                Phase::AssignTypes,
                Phase::AssignParameters
            ]
        );
    }

    fn task_events(structure: &Structure, options: &ApplyOptions) -> Vec<String> {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if !matches!(event, Progress::PhaseStart { .. } | Progress::PhaseFinish) {
                events.lock().unwrap().push(format!("{event:?}"));
            }
        }));
        oplsaa()
            .apply_with_progress(structure, options, &reporter)
            .unwrap();
        drop(reporter);
        events.into_inner().unwrap()
    }

    #[test]
    fn residue_map_typing_advances_once_per_residue() {
        let mut two = fixtures::ethane();
        two.append(&fixtures::ethane());
        let events = task_events(&two, &ApplyOptions::default());
        assert_eq!(
            events,
            [
                "TaskStart { total_steps: 2 }",
                "TaskIncrement",
                "TaskIncrement",
                "TaskFinish"
            ]
        );
    }

    #[test]
    fn full_typing_advances_once_per_atom() {
        let options = ApplyOptionsBuilder::new()
            .use_residue_map(false)
            .build()
            .unwrap();
        let events = task_events(&fixtures::ethane(), &options);
        assert_eq!(events.first().map(String::as_str), Some("TaskStart { total_steps: 8 }"));
        assert_eq!(events.iter().filter(|e| *e == "TaskIncrement").count(), 8);
        assert_eq!(events.last().map(String::as_str), Some("TaskFinish"));
    }

    #[test]
    fn fallback_to_full_typing_is_announced() {
        let events = task_events(&fixtures::butane_fragments(), &ApplyOptions::default());
        assert!(events[0].starts_with("Message("));
        assert!(events[0].contains("CH3"));
        assert_eq!(events[1], "TaskStart { total_steps: 14 }");
        assert_eq!(events.iter().filter(|e| *e == "TaskIncrement").count(), 14);
    }
}
