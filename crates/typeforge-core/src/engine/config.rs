use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Residue label list contains an empty name")]
    EmptyResidueLabel,
    #[error("Residue label '{0}' is listed more than once")]
    DuplicateResidueLabel(String),
}

/// How the matcher chooses between several matching typing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecificityPolicy {
    /// After override resolution, the rule with the largest pattern wins.
    #[default]
    PatternSize,
    /// Only explicit `overrides` decide; any remaining tie is an error.
    OverridesOnly,
}

/// What to do when residue-map typing is requested but residues are bonded to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidueMapPolicy {
    /// Log a warning and type every atom individually.
    #[default]
    FallBack,
    /// Fail with a residue-independence error.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOptions {
    /// Residue names to keep; all other atoms are merged into one residue.
    pub residues: Option<Vec<String>>,
    pub use_residue_map: bool,
    pub references_file: Option<PathBuf>,
    pub specificity: SpecificityPolicy,
    pub residue_map_policy: ResidueMapPolicy,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            residues: None,
            use_residue_map: true,
            references_file: None,
            specificity: SpecificityPolicy::default(),
            residue_map_policy: ResidueMapPolicy::default(),
        }
    }
}

#[derive(Default)]
pub struct ApplyOptionsBuilder {
    residues: Option<Vec<String>>,
    use_residue_map: Option<bool>,
    references_file: Option<PathBuf>,
    specificity: Option<SpecificityPolicy>,
    residue_map_policy: Option<ResidueMapPolicy>,
}

impl ApplyOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn residues<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.residues = Some(labels.into_iter().map(Into::into).collect());
        self
    }
    pub fn use_residue_map(mut self, enabled: bool) -> Self {
        self.use_residue_map = Some(enabled);
        self
    }
    pub fn references_file(mut self, path: PathBuf) -> Self {
        self.references_file = Some(path);
        self
    }
    pub fn specificity(mut self, policy: SpecificityPolicy) -> Self {
        self.specificity = Some(policy);
        self
    }
    pub fn residue_map_policy(mut self, policy: ResidueMapPolicy) -> Self {
        self.residue_map_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<ApplyOptions, ConfigError> {
        if let Some(labels) = &self.residues {
            let mut seen = std::collections::HashSet::new();
            for label in labels {
                if label.trim().is_empty() {
                    return Err(ConfigError::EmptyResidueLabel);
                }
                if !seen.insert(label.as_str()) {
                    return Err(ConfigError::DuplicateResidueLabel(label.clone()));
                }
            }
        }

        let defaults = ApplyOptions::default();
        Ok(ApplyOptions {
            residues: self.residues,
            use_residue_map: self.use_residue_map.unwrap_or(defaults.use_residue_map),
            references_file: self.references_file,
            specificity: self.specificity.unwrap_or(defaults.specificity),
            residue_map_policy: self
                .residue_map_policy
                .unwrap_or(defaults.residue_map_policy),
        })
    }
}
