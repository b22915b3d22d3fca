//! # Engine Module
//!
//! The typing pipeline of typeforge: it turns a [`crate::core::models::structure::Structure`]
//! and a [`crate::core::forcefield::definition::ForcefieldDefinition`] into a fully typed,
//! fully parameterized topology.
//!
//! ## Architecture
//!
//! - **Topology** ([`graph`]) - Index-based molecular graph with ring perception and
//!   residue membership
//! - **Rule Matching** ([`matcher`]) - Candidate evaluation, override resolution and
//!   specificity ranking
//! - **Residue Map** ([`residue_map`]) - Types one representative per distinct residue and
//!   reuses the result for identical copies
//! - **Parameter Assignment** ([`assigner`]) - Nonbonded parameters and bonded term
//!   generation with template lookup
//! - **Configuration** ([`config`]) - Options of an apply run
//! - **Progress Monitoring** ([`progress`]) - Phase and task events for front ends
//! - **Error Handling** ([`error`]) - Topology, typing and parameter errors

pub mod assigner;
pub mod config;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod progress;
pub mod residue_map;
