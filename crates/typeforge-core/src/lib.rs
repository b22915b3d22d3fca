//! # typeforge Core Library
//!
//! A forcefield application engine for molecular mechanics. Given an untyped molecular
//! structure and one or more forcefield definitions, it assigns an atom type to every atom
//! from SMARTS-like typing rules and attaches bond, angle, proper dihedral, improper
//! dihedral and nonbonded parameters, producing a structure ready for simulation.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Atom`, `Residue`),
//!   the forcefield definition store with its rule language, and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The typing pipeline: topology building, rule matching,
//!   parameter assignment and the residue-map optimizer, together with configuration,
//!   progress reporting and error types.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::apply::Forcefield`] handle which ties
//!   definitions and engine together behind a single `apply` call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use typeforge::engine::config::ApplyOptions;
//! use typeforge::workflows::apply::Forcefield;
//!
//! let oplsaa = Forcefield::from_name("oplsaa")?;
//! let typed = oplsaa.apply(&structure, &ApplyOptions::default())?;
//! assert!(typed.atoms_iter().all(|(_, atom)| atom.atom_type.is_some()));
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
