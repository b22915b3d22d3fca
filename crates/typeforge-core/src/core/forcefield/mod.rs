//! # Forcefield Module
//!
//! Forcefield definitions: atom-typing rules, nonbonded parameters and bonded
//! templates, loaded from TOML sources and merged into an immutable
//! [`definition::ForcefieldDefinition`].
//!
//! ## Key Components
//!
//! - [`definition`] - Source loading, merging and class-signature template lookup
//! - [`rules`] - The SMARTS-like rule language and its graph matcher
//! - [`params`] - Parameter value types and term-generation conventions
//! - [`builtin`] - Forcefields embedded in the library
//!
//! ## Usage
//!
//! ```ignore
//! use typeforge::core::forcefield::definition::{ForcefieldDefinition, ForcefieldSource};
//!
//! let definition = ForcefieldDefinition::load([
//!     ForcefieldSource::builtin("oplsaa"),
//!     ForcefieldSource::path("extra.toml"),
//! ])?;
//! println!("{} atom types", definition.atom_type_count());
//! ```

pub mod builtin;
pub mod definition;
pub mod params;
pub mod rules;
