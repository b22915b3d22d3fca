use serde::Deserialize;

/// Harmonic bond stretching parameters.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BondParam {
    /// Equilibrium length in nm.
    pub length: f64,
    /// Force constant in kJ/mol/nm^2.
    pub k: f64,
}

/// Harmonic angle bending parameters.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AngleParam {
    /// Equilibrium angle in radians.
    pub angle: f64,
    /// Force constant in kJ/mol/rad^2.
    pub k: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PeriodicTerm {
    pub periodicity: u32,
    pub phase: f64,
    pub k: f64,
}

/// Parameters of a four-atom torsional term.
///
/// In forcefield files the variant is selected by a `form` key; proper
/// Ryckaert-Bellemans torsions come from the dedicated `[[rb-torsions]]` table.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "form", rename_all = "kebab-case")]
pub enum TorsionParam {
    RyckaertBellemans { c: [f64; 6] },
    Periodic { terms: Vec<PeriodicTerm> },
    Harmonic { k: f64, psi0: f64 },
}

/// Charge and Lennard-Jones parameters of an atom type.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct NonbondedParam {
    pub charge: f64,
    /// Lennard-Jones sigma in nm.
    pub sigma: f64,
    /// Lennard-Jones epsilon in kJ/mol.
    pub epsilon: f64,
    /// Overrides the element's standard mass when present.
    #[serde(default)]
    pub mass: Option<f64>,
}

/// Which atoms receive improper torsions.
///
/// A forcefield that declares no rule gets `Templated` when it carries improper
/// templates and `None` otherwise.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ImproperDetection {
    None,
    /// One improper per atom with exactly three bonded neighbors.
    Trigonal,
    /// One improper per 3-combination of neighbors around atoms of degree >= 3.
    Combinations,
    /// As `Combinations`, keeping only terms that match a template.
    Templated,
}

/// Position of the central atom in an improper's atom list.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImproperCenter {
    #[default]
    First,
    Third,
}

/// Whether every proper dihedral must find a template.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProperPolicy {
    #[default]
    Required,
    /// Unmatched proper dihedrals are dropped.
    Templated,
}

/// Term generation conventions of a forcefield, defaults resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    pub impropers: ImproperDetection,
    pub improper_center: ImproperCenter,
    pub propers: ProperPolicy,
}
