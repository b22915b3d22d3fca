//! Provides input/output functionality for molecular file formats.
//!
//! Structures are read and written through the [`traits::MolecularFile`] interface;
//! [`bgf`] implements it for the BIOGRAF format. [`references`] writes the
//! bibliography of the forcefield types used in a typing run.

pub mod bgf;
pub mod references;
pub mod traits;
