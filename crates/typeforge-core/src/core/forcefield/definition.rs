use super::builtin::builtin_source;
use super::params::{
    AngleParam, BondParam, Generation, ImproperCenter, ImproperDetection, NonbondedParam,
    PeriodicTerm, ProperPolicy, TorsionParam,
};
use super::rules::{Pattern, PatternError};
use crate::core::models::element::Element;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Class name that matches any class in torsion and improper templates.
pub const WILDCARD_CLASS: &str = "";

#[derive(Debug, Error)]
pub enum ForcefieldError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown built-in forcefield '{0}'")]
    UnknownBuiltin(String),
    #[error("Atom type '{type_name}' from '{source_label}' conflicts with an existing definition")]
    DuplicateType {
        type_name: String,
        source_label: String,
    },
    #[error("Conflicting {kind} parameters for '{key}' from '{source_label}'")]
    ConflictingParameter {
        kind: &'static str,
        key: String,
        source_label: String,
    },
    #[error("Conflicting generation policy '{key}': '{first}' vs '{second}'")]
    ConflictingPolicy {
        key: &'static str,
        first: String,
        second: String,
    },
    #[error("Invalid definition for atom type '{type_name}': {message}")]
    RuleSyntax { type_name: String, message: String },
    #[error("Atom type '{type_name}' overrides unknown type '{target}'")]
    UnknownOverride { type_name: String, target: String },
}

/// Where a forcefield definition comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForcefieldSource {
    /// A forcefield shipped with the library, by case-insensitive name.
    Builtin(String),
    /// A TOML file on disk.
    Path(PathBuf),
    /// TOML content held in memory; `label` names it in error messages.
    Inline { label: String, content: String },
}

impl ForcefieldSource {
    pub fn builtin(name: &str) -> Self {
        Self::Builtin(name.to_string())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn inline(label: &str, content: &str) -> Self {
        Self::Inline {
            label: label.to_string(),
            content: content.to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Builtin(name) => name.to_ascii_lowercase(),
            Self::Path(path) => path.to_string_lossy().to_string(),
            Self::Inline { label, .. } => label.clone(),
        }
    }

    fn read(&self) -> Result<String, ForcefieldError> {
        match self {
            Self::Builtin(name) => builtin_source(name)
                .map(str::to_string)
                .ok_or_else(|| ForcefieldError::UnknownBuiltin(name.clone())),
            Self::Path(path) => read_file(path),
            Self::Inline { content, .. } => Ok(content.clone()),
        }
    }
}

impl From<&Path> for ForcefieldSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

fn read_file(path: &Path) -> Result<String, ForcefieldError> {
    std::fs::read_to_string(path).map_err(|e| ForcefieldError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct ForcefieldFile {
    #[serde(default)]
    meta: Option<MetaSection>,
    #[serde(default)]
    generation: GenerationSection,
    #[serde(default)]
    atom_types: Vec<AtomTypeEntry>,
    #[serde(default)]
    nonbonded: BTreeMap<String, NonbondedParam>,
    #[serde(default)]
    bonds: Vec<BondEntry>,
    #[serde(default)]
    angles: Vec<AngleEntry>,
    #[serde(default)]
    rb_torsions: Vec<RbTorsionEntry>,
    #[serde(default)]
    periodic_torsions: Vec<PeriodicTorsionEntry>,
    #[serde(default)]
    impropers: Vec<ImproperEntry>,
}

#[derive(Debug, Deserialize)]
struct MetaSection {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct GenerationSection {
    impropers: Option<ImproperDetection>,
    improper_center: Option<ImproperCenter>,
    propers: Option<ProperPolicy>,
}

#[derive(Debug, Deserialize)]
struct AtomTypeEntry {
    name: String,
    class: Option<String>,
    element: Option<String>,
    def: String,
    #[serde(default)]
    overrides: Vec<String>,
    desc: Option<String>,
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BondEntry {
    classes: [String; 2],
    #[serde(flatten)]
    param: BondParam,
}

#[derive(Debug, Deserialize)]
struct AngleEntry {
    classes: [String; 3],
    #[serde(flatten)]
    param: AngleParam,
}

#[derive(Debug, Deserialize)]
struct RbTorsionEntry {
    classes: [String; 4],
    c: [f64; 6],
}

#[derive(Debug, Deserialize)]
struct PeriodicTorsionEntry {
    classes: [String; 4],
    terms: Vec<PeriodicTerm>,
}

#[derive(Debug, Deserialize)]
struct ImproperEntry {
    classes: [String; 4],
    #[serde(flatten)]
    param: TorsionParam,
}

/// A typing rule: the SMARTS-like definition that assigns one atom type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRule {
    pub name: String,
    /// Class used by bonded templates; defaults to the type name.
    pub class: String,
    /// Element of the typed atom; `None` lets the rule compete for every element.
    pub element: Option<Element>,
    pub definition: Pattern,
    /// Types this rule takes precedence over, sorted.
    pub overrides: Vec<String>,
    pub description: Option<String>,
    pub doi: Option<String>,
}

impl TypeRule {
    fn from_entry(entry: AtomTypeEntry) -> Result<Self, ForcefieldError> {
        let syntax = |message: String| ForcefieldError::RuleSyntax {
            type_name: entry.name.clone(),
            message,
        };
        let definition =
            Pattern::parse(&entry.def).map_err(|e: PatternError| syntax(e.to_string()))?;

        let declared = entry
            .element
            .as_deref()
            .map(|symbol| {
                symbol
                    .parse::<Element>()
                    .map_err(|e| syntax(e.to_string()))
            })
            .transpose()?;
        let element = match (declared, definition.root_element()) {
            (Some(declared), Some(root)) if declared != root => {
                return Err(syntax(format!(
                    "element '{declared}' disagrees with pattern root '{root}'"
                )));
            }
            (declared, root) => declared.or(root),
        };

        let mut overrides = entry.overrides;
        overrides.sort();
        overrides.dedup();

        Ok(Self {
            class: entry.class.unwrap_or_else(|| entry.name.clone()),
            name: entry.name,
            element,
            definition,
            overrides,
            description: entry.desc,
            doi: entry.doi,
        })
    }
}

/// Policies collected across sources before defaults are applied.
#[derive(Debug, Clone, Copy, Default)]
struct DeclaredGeneration {
    impropers: Option<ImproperDetection>,
    improper_center: Option<ImproperCenter>,
    propers: Option<ProperPolicy>,
}

fn merge_policy<T: Copy + PartialEq + fmt::Debug>(
    slot: &mut Option<T>,
    value: Option<T>,
    key: &'static str,
) -> Result<(), ForcefieldError> {
    match (*slot, value) {
        (Some(first), Some(second)) if first != second => Err(ForcefieldError::ConflictingPolicy {
            key,
            first: format!("{first:?}"),
            second: format!("{second:?}"),
        }),
        (None, Some(value)) => {
            *slot = Some(value);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn insert_unique<K: Ord + fmt::Debug, V: PartialEq>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    kind: &'static str,
    source_label: &str,
) -> Result<(), ForcefieldError> {
    match map.get(&key) {
        Some(existing) if *existing != value => Err(ForcefieldError::ConflictingParameter {
            kind,
            key: format!("{key:?}"),
            source_label: source_label.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            map.insert(key, value);
            Ok(())
        }
    }
}

/// Canonical key of a bond template: classes in sorted order.
pub fn bond_key(a: &str, b: &str) -> [String; 2] {
    if a <= b {
        [a.to_string(), b.to_string()]
    } else {
        [b.to_string(), a.to_string()]
    }
}

/// Canonical key of an angle template: center fixed, ends sorted.
pub fn angle_key(a: &str, center: &str, c: &str) -> [String; 3] {
    let (lo, hi) = if a <= c { (a, c) } else { (c, a) };
    [lo.to_string(), center.to_string(), hi.to_string()]
}

/// Canonical key of a proper torsion: the smaller of the forward and reversed order.
pub fn proper_key(classes: [&str; 4]) -> [String; 4] {
    let mut reversed = classes;
    reversed.reverse();
    classes.min(reversed).map(str::to_string)
}

/// Canonical key of an improper: center fixed, outer classes sorted.
pub fn improper_key(center: &str, outer: [&str; 3]) -> [String; 4] {
    let mut outer = outer;
    outer.sort();
    [center, outer[0], outer[1], outer[2]].map(str::to_string)
}

fn wildcard_count(classes: &[String]) -> usize {
    classes.iter().filter(|c| c.as_str() == WILDCARD_CLASS).count()
}

fn slot_matches(template: &str, class: &str) -> bool {
    template == WILDCARD_CLASS || template == class
}

/// An immutable, merged forcefield: typing rules, nonbonded and bonded templates.
#[derive(Debug, Clone, Default)]
pub struct ForcefieldDefinition {
    name: Option<String>,
    sources: Vec<String>,
    atom_types: BTreeMap<String, TypeRule>,
    nonbonded: BTreeMap<String, NonbondedParam>,
    bonds: BTreeMap<[String; 2], BondParam>,
    angles: BTreeMap<[String; 3], AngleParam>,
    propers: BTreeMap<[String; 4], TorsionParam>,
    impropers: BTreeMap<[String; 4], TorsionParam>,
    declared: DeclaredGeneration,
}

impl ForcefieldDefinition {
    /// Loads and merges forcefield sources in order.
    ///
    /// Identical re-definitions merge silently; a type name, bonded template or
    /// nonbonded entry defined twice with different content is an error, as are
    /// disagreeing generation policies.
    pub fn load<I>(sources: I) -> Result<Self, ForcefieldError>
    where
        I: IntoIterator<Item = ForcefieldSource>,
    {
        let mut definition = Self::default();
        for source in sources {
            let label = source.label();
            let content = source.read()?;
            definition.merge_str(&content, &label)?;
        }
        definition.validate_overrides()?;
        Ok(definition)
    }

    /// Parses a single TOML document.
    pub fn from_toml_str(content: &str, label: &str) -> Result<Self, ForcefieldError> {
        Self::load([ForcefieldSource::inline(label, content)])
    }

    fn merge_str(&mut self, content: &str, label: &str) -> Result<(), ForcefieldError> {
        let file: ForcefieldFile = toml::from_str(content).map_err(|e| ForcefieldError::Toml {
            path: label.to_string(),
            source: e,
        })?;
        self.merge_file(file, label)?;
        self.sources.push(label.to_string());
        debug!(
            source = label,
            atom_types = self.atom_types.len(),
            "Merged forcefield source"
        );
        Ok(())
    }

    fn merge_file(&mut self, file: ForcefieldFile, label: &str) -> Result<(), ForcefieldError> {
        if self.name.is_none() {
            self.name = file.meta.and_then(|m| m.name);
        }

        merge_policy(
            &mut self.declared.impropers,
            file.generation.impropers,
            "impropers",
        )?;
        merge_policy(
            &mut self.declared.improper_center,
            file.generation.improper_center,
            "improper-center",
        )?;
        merge_policy(
            &mut self.declared.propers,
            file.generation.propers,
            "propers",
        )?;

        for entry in file.atom_types {
            let rule = TypeRule::from_entry(entry)?;
            match self.atom_types.get(&rule.name) {
                Some(existing) if *existing != rule => {
                    return Err(ForcefieldError::DuplicateType {
                        type_name: rule.name,
                        source_label: label.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.atom_types.insert(rule.name.clone(), rule);
                }
            }
        }

        for (type_name, param) in file.nonbonded {
            insert_unique(&mut self.nonbonded, type_name, param, "nonbonded", label)?;
        }
        for entry in file.bonds {
            let [a, b] = &entry.classes;
            insert_unique(&mut self.bonds, bond_key(a, b), entry.param, "bond", label)?;
        }
        for entry in file.angles {
            let [a, b, c] = &entry.classes;
            insert_unique(&mut self.angles, angle_key(a, b, c), entry.param, "angle", label)?;
        }
        for entry in file.rb_torsions {
            let key = proper_key(entry.classes.each_ref().map(String::as_str));
            let param = TorsionParam::RyckaertBellemans { c: entry.c };
            insert_unique(&mut self.propers, key, param, "proper torsion", label)?;
        }
        for entry in file.periodic_torsions {
            let key = proper_key(entry.classes.each_ref().map(String::as_str));
            let param = TorsionParam::Periodic {
                terms: entry.terms,
            };
            insert_unique(&mut self.propers, key, param, "proper torsion", label)?;
        }
        for entry in file.impropers {
            let [center, a, b, c] = entry.classes.each_ref().map(String::as_str);
            let key = improper_key(center, [a, b, c]);
            insert_unique(&mut self.impropers, key, entry.param, "improper", label)?;
        }
        Ok(())
    }

    fn validate_overrides(&self) -> Result<(), ForcefieldError> {
        for rule in self.atom_types.values() {
            if let Some(target) = rule
                .overrides
                .iter()
                .find(|t| !self.atom_types.contains_key(t.as_str()))
            {
                return Err(ForcefieldError::UnknownOverride {
                    type_name: rule.name.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Name from the first source's `[meta]` table, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Labels of the merged sources in load order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Typing rules in sorted type-name order.
    pub fn atom_types(&self) -> impl Iterator<Item = &TypeRule> {
        self.atom_types.values()
    }

    pub fn atom_type_count(&self) -> usize {
        self.atom_types.len()
    }

    pub fn rule(&self, type_name: &str) -> Option<&TypeRule> {
        self.atom_types.get(type_name)
    }

    pub fn nonbonded(&self, type_name: &str) -> Option<&NonbondedParam> {
        self.nonbonded.get(type_name)
    }

    pub fn bonded_template_count(&self) -> usize {
        self.bonds.len() + self.angles.len() + self.propers.len() + self.impropers.len()
    }

    /// Effective generation conventions, defaults filled in.
    ///
    /// Without a declared improper rule, impropers are generated only where a
    /// template matches, and not at all when the definition has no improper templates.
    pub fn generation(&self) -> Generation {
        let undeclared_impropers = if self.impropers.is_empty() {
            ImproperDetection::None
        } else {
            ImproperDetection::Templated
        };
        Generation {
            impropers: self.declared.impropers.unwrap_or(undeclared_impropers),
            improper_center: self.declared.improper_center.unwrap_or_default(),
            propers: self.declared.propers.unwrap_or_default(),
        }
    }

    pub fn bond_param(&self, a: &str, b: &str) -> Option<&BondParam> {
        self.bonds.get(&bond_key(a, b))
    }

    pub fn angle_param(&self, a: &str, center: &str, c: &str) -> Option<&AngleParam> {
        self.angles.get(&angle_key(a, center, c))
    }

    /// Looks up a proper torsion template for the class chain `classes`.
    ///
    /// Templates match in either direction. An exact template wins; otherwise the
    /// matching template with the fewest wildcards is used.
    pub fn proper_param(&self, classes: [&str; 4]) -> Option<&TorsionParam> {
        if let Some(exact) = self.propers.get(&proper_key(classes)) {
            return Some(exact);
        }
        let mut reversed = classes;
        reversed.reverse();
        self.propers
            .iter()
            .filter(|(key, _)| {
                let fits = |order: &[&str; 4]| {
                    key.iter().zip(order).all(|(t, c)| slot_matches(t, c))
                };
                fits(&classes) || fits(&reversed)
            })
            .min_by_key(|(key, _)| wildcard_count(&key[..]))
            .map(|(_, param)| param)
    }

    /// Looks up an improper template: the center class must match, the outer
    /// classes match as an unordered set.
    pub fn improper_param(&self, center: &str, outer: [&str; 3]) -> Option<&TorsionParam> {
        if let Some(exact) = self.impropers.get(&improper_key(center, outer)) {
            return Some(exact);
        }
        self.impropers
            .iter()
            .filter(|(key, _)| {
                slot_matches(&key[0], center)
                    && outer.into_iter().permutations(3).any(|order| {
                        key[1..]
                            .iter()
                            .zip(order)
                            .all(|(template, class)| slot_matches(template, class))
                    })
            })
            .min_by_key(|(key, _)| wildcard_count(&key[..]))
            .map(|(_, param)| param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SMALL: &str = r#"
        [[atom-types]]
        name = "C3"
        class = "CT"
        element = "C"
        def = "[C;X4](C)(H)(H)H"
        doi = "10.1000/alkanes"

        [[atom-types]]
        name = "Hb"
        class = "HC"
        def = "[H]C"

        [nonbonded.C3]
        charge = -0.18
        sigma = 0.35
        epsilon = 0.276

        [[bonds]]
        classes = ["HC", "CT"]
        length = 0.109
        k = 284512.0

        [[angles]]
        classes = ["HC", "CT", "CT"]
        angle = 1.93
        k = 313.8

        [[rb-torsions]]
        classes = ["HC", "CT", "CT", "HC"]
        c = [0.6276, 1.8828, 0.0, -2.5104, 0.0, 0.0]

        [[periodic-torsions]]
        classes = ["", "CT", "CT", ""]
        terms = [{ periodicity = 3, phase = 0.0, k = 1.0 }]
    "#;

    #[test]
    fn loads_inline_definition() {
        let ff = ForcefieldDefinition::from_toml_str(SMALL, "small").unwrap();
        assert_eq!(ff.atom_type_count(), 2);
        assert_eq!(ff.sources(), ["small"]);

        let hb = ff.rule("Hb").unwrap();
        assert_eq!(hb.element, Some(Element::H));
        assert_eq!(hb.class, "HC");
        assert_eq!(ff.rule("C3").unwrap().doi.as_deref(), Some("10.1000/alkanes"));
        assert_eq!(
            ff.generation(),
            Generation {
                impropers: ImproperDetection::None,
                improper_center: ImproperCenter::First,
                propers: ProperPolicy::Required,
            }
        );
        assert_eq!(ff.nonbonded("C3").unwrap().charge, -0.18);
        assert!(ff.nonbonded("Hb").is_none());
    }

    #[test]
    fn class_defaults_to_type_name() {
        let ff = ForcefieldDefinition::from_toml_str(
            "[[atom-types]]\nname = \"OW\"\ndef = \"[O]\"\n",
            "water",
        )
        .unwrap();
        assert_eq!(ff.rule("OW").unwrap().class, "OW");
    }

    #[test]
    fn bond_and_angle_lookups_are_order_independent() {
        let ff = ForcefieldDefinition::from_toml_str(SMALL, "small").unwrap();
        assert_eq!(ff.bond_param("CT", "HC").unwrap().length, 0.109);
        assert_eq!(ff.bond_param("HC", "CT").unwrap().length, 0.109);
        assert!(ff.angle_param("CT", "CT", "HC").is_some());
        assert!(ff.angle_param("HC", "CT", "CT").is_some());
        assert!(ff.angle_param("CT", "HC", "CT").is_none());
    }

    #[test]
    fn proper_lookup_prefers_exact_over_wildcard() {
        let ff = ForcefieldDefinition::from_toml_str(SMALL, "small").unwrap();
        assert!(matches!(
            ff.proper_param(["HC", "CT", "CT", "HC"]),
            Some(TorsionParam::RyckaertBellemans { .. })
        ));
        assert!(matches!(
            ff.proper_param(["OH", "CT", "CT", "HC"]),
            Some(TorsionParam::Periodic { .. })
        ));
        assert!(ff.proper_param(["CT", "OH", "CT", "HC"]).is_none());
    }

    #[test]
    fn improper_lookup_matches_outer_classes_in_any_order() {
        let ff = ForcefieldDefinition::from_toml_str(
            r#"
            [[impropers]]
            classes = ["CA", "CA", "HA", ""]
            form = "harmonic"
            k = 10.0
            psi0 = 0.0
            "#,
            "impropers",
        )
        .unwrap();
        assert!(ff.improper_param("CA", ["HA", "CA", "CA"]).is_some());
        assert!(ff.improper_param("CA", ["CA", "OH", "HA"]).is_some());
        assert!(ff.improper_param("CA", ["OH", "OH", "HA"]).is_none());
        assert!(ff.improper_param("HA", ["CA", "CA", "HA"]).is_none());
    }

    #[test]
    fn loading_the_same_source_twice_is_idempotent() {
        let once = ForcefieldDefinition::load([ForcefieldSource::builtin("oplsaa")]).unwrap();
        let twice = ForcefieldDefinition::load([
            ForcefieldSource::builtin("oplsaa"),
            ForcefieldSource::builtin("OPLS-AA"),
        ])
        .unwrap();
        assert_eq!(once.atom_type_count(), twice.atom_type_count());
        assert_eq!(once.bonded_template_count(), twice.bonded_template_count());
        assert_eq!(once.name(), Some("oplsaa"));
    }

    #[test]
    fn differing_redefinition_fails_with_duplicate_type() {
        let changed = SMALL.replace("[H]C", "[H][C;X4]");
        let result = ForcefieldDefinition::load([
            ForcefieldSource::inline("first", SMALL),
            ForcefieldSource::inline("second", &changed),
        ]);
        match result {
            Err(ForcefieldError::DuplicateType {
                type_name,
                source_label,
            }) => {
                assert_eq!(type_name, "Hb");
                assert_eq!(source_label, "second");
            }
            other => panic!("expected DuplicateType, got {other:?}"),
        }
    }

    #[test]
    fn differing_parameters_fail_with_conflict() {
        let changed = SMALL.replace("length = 0.109", "length = 0.110");
        let result = ForcefieldDefinition::load([
            ForcefieldSource::inline("first", SMALL),
            ForcefieldSource::inline("second", &changed),
        ]);
        assert!(matches!(
            result,
            Err(ForcefieldError::ConflictingParameter { kind: "bond", .. })
        ));
    }

    #[test]
    fn disagreeing_generation_policies_fail() {
        let result = ForcefieldDefinition::load([
            ForcefieldSource::inline("a", "[generation]\nimpropers = \"trigonal\"\n"),
            ForcefieldSource::inline("b", "[generation]\nimpropers = \"none\"\n"),
        ]);
        assert!(matches!(
            result,
            Err(ForcefieldError::ConflictingPolicy { key: "impropers", .. })
        ));

        let merged = ForcefieldDefinition::load([
            ForcefieldSource::inline("a", "[generation]\npropers = \"templated\"\n"),
            ForcefieldSource::inline("b", "[generation]\nimpropers = \"none\"\n"),
        ])
        .unwrap();
        assert_eq!(merged.generation().propers, ProperPolicy::Templated);
        assert_eq!(merged.generation().impropers, ImproperDetection::None);
    }

    #[test]
    fn malformed_rules_fail_at_load_time() {
        let bad = "[[atom-types]]\nname = \"X\"\ndef = \"[C;X4\"\n";
        assert!(matches!(
            ForcefieldDefinition::from_toml_str(bad, "bad"),
            Err(ForcefieldError::RuleSyntax { .. })
        ));

        let mismatch = "[[atom-types]]\nname = \"X\"\nelement = \"O\"\ndef = \"[C]\"\n";
        assert!(matches!(
            ForcefieldDefinition::from_toml_str(mismatch, "bad"),
            Err(ForcefieldError::RuleSyntax { .. })
        ));

        let unknown = "[[atom-types]]\nname = \"X\"\nelement = \"Xx\"\ndef = \"[*]\"\n";
        assert!(matches!(
            ForcefieldDefinition::from_toml_str(unknown, "bad"),
            Err(ForcefieldError::RuleSyntax { .. })
        ));
    }

    #[test]
    fn unknown_override_target_fails() {
        let content = r#"
            [[atom-types]]
            name = "A"
            def = "[C]"
            overrides = ["B"]
        "#;
        assert!(matches!(
            ForcefieldDefinition::from_toml_str(content, "ovr"),
            Err(ForcefieldError::UnknownOverride { .. })
        ));
    }

    #[test]
    fn load_from_path_reports_io_and_toml_errors() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("small.toml");
        fs::write(&good, SMALL).unwrap();
        let ff = ForcefieldDefinition::load([ForcefieldSource::from(good.as_path())]).unwrap();
        assert_eq!(ff.atom_type_count(), 2);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ForcefieldDefinition::load([ForcefieldSource::path(&missing)]),
            Err(ForcefieldError::Io { .. })
        ));

        let malformed = dir.path().join("malformed.toml");
        fs::write(&malformed, "this is not toml").unwrap();
        assert!(matches!(
            ForcefieldDefinition::load([ForcefieldSource::path(&malformed)]),
            Err(ForcefieldError::Toml { .. })
        ));

        assert!(matches!(
            ForcefieldDefinition::load([ForcefieldSource::builtin("nope")]),
            Err(ForcefieldError::UnknownBuiltin(_))
        ));
    }

    #[test]
    fn undeclared_improper_rule_follows_the_templates() {
        let plain = ForcefieldDefinition::from_toml_str(SMALL, "small").unwrap();
        assert_eq!(plain.generation().impropers, ImproperDetection::None);

        let with_template = format!(
            "{SMALL}\n[[impropers]]\nclasses = [\"CT\", \"\", \"\", \"\"]\nform = \"harmonic\"\nk = 1.0\npsi0 = 0.0\n"
        );
        let templated = ForcefieldDefinition::from_toml_str(&with_template, "small").unwrap();
        assert_eq!(templated.generation().impropers, ImproperDetection::Templated);

        let declared = ForcefieldDefinition::load([ForcefieldSource::builtin("oplsaa")]).unwrap();
        assert_eq!(declared.generation().impropers, ImproperDetection::Trigonal);
    }

    #[test]
    fn definition_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForcefieldDefinition>();
    }

    #[test]
    fn builtin_oplsaa_is_well_formed() {
        let ff = ForcefieldDefinition::load([ForcefieldSource::builtin("oplsaa")]).unwrap();
        for rule in ff.atom_types() {
            assert!(ff.nonbonded(&rule.name).is_some(), "{} lacks nonbonded", rule.name);
        }
        assert_eq!(ff.generation().impropers, ImproperDetection::Trigonal);
        assert!(ff.improper_param("CA", ["HA", "CA", "CA"]).is_some());
    }
}
