use crate::core::models::element::Element;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TopologyError {
    #[error("Bond references an atom that is not part of the structure")]
    UnknownAtom,
    #[error("Atom {index} is bonded to itself")]
    SelfBond { index: usize },
    #[error("Atoms {first} and {second} are bonded more than once")]
    DuplicateBond { first: usize, second: usize },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TypingError {
    #[error("No atom type matches atom {index} ({element})")]
    UntypedAtom { index: usize, element: Element },

    #[error("Atom {index} ({element}) matches several atom types equally well: {candidates:?}")]
    AmbiguousType {
        index: usize,
        element: Element,
        candidates: Vec<String>,
    },

    #[error("Residues '{first}' and '{second}' are bonded to each other")]
    ResidueIndependence { first: String, second: String },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParameterError {
    #[error("No {kind} parameters for classes {classes:?} (atoms {atoms:?})")]
    MissingParameter {
        kind: &'static str,
        classes: Vec<String>,
        atoms: Vec<usize>,
    },

    #[error("Atom type '{type_name}' has no nonbonded parameters")]
    MissingNonbonded { type_name: String },
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Invalid topology: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Atom typing failed: {source}")]
    Typing {
        #[from]
        source: TypingError,
    },

    #[error("Parameter assignment failed: {source}")]
    Parameter {
        #[from]
        source: ParameterError,
    },

    #[error("Failed to write references file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
