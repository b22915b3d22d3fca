//! # Workflows Module
//!
//! High-level entry points of typeforge. A workflow owns the whole pipeline, from
//! residue regrouping through topology building, typing and parameter assignment
//! to writing the references file, and reports progress along the way.
//!
//! - **Forcefield Application** ([`apply`]) - The [`apply::Forcefield`] handle and its
//!   `apply` / `create_system` operations.

pub mod apply;
