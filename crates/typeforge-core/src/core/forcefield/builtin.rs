use phf::{Map, phf_map};

const OPLSAA: &str = include_str!("data/oplsaa.toml");

/// Built-in forcefield definitions keyed by lowercase name or alias.
static BUILTIN_FORCEFIELDS: Map<&'static str, &'static str> = phf_map! {
    "oplsaa" => OPLSAA,
    "opls-aa" => OPLSAA,
};

/// Canonical names of the built-in forcefields, without aliases.
pub const BUILTIN_NAMES: &[&str] = &["oplsaa"];

/// Returns the TOML source of a built-in forcefield; names are case-insensitive.
pub fn builtin_source(name: &str) -> Option<&'static str> {
    BUILTIN_FORCEFIELDS
        .get(name.trim().to_ascii_lowercase().as_str())
        .copied()
}
