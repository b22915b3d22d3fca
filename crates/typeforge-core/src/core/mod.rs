//! # Core Module
//!
//! The foundation layer of typeforge: data structures describing molecular structures,
//! the forcefield definition store and file I/O.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, bonded terms and the
//!   owning [`models::structure::Structure`]
//! - **Forcefield Definitions** ([`forcefield`]) - Typing rules, bonded and nonbonded
//!   parameters, loading and merging of definition sources
//! - **File I/O** ([`io`]) - BGF structure files and citation (references) files
//!
//! Everything in this layer is free of typing logic; the [`crate::engine`] layer consumes
//! these types to run the typing pipeline.

pub mod forcefield;
pub mod io;
pub mod models;
