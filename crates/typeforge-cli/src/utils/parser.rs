use std::path::Path;
use thiserror::Error;
use typeforge::core::forcefield::builtin::{BUILTIN_NAMES, builtin_source};
use typeforge::core::forcefield::definition::ForcefieldSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Forcefield name cannot be empty.")]
    EmptyForcefield,

    #[error(
        "Unknown forcefield '{name}'. Expected an existing TOML file or one of the built-in names: {builtins}."
    )]
    UnknownForcefield { name: String, builtins: String },
}

/// Resolves a `--forcefield` value: an existing file wins over a built-in of the
/// same name, and anything ending in `.toml` is treated as a path.
pub fn parse_forcefield_source(value: &str) -> Result<ForcefieldSource, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::EmptyForcefield);
    }

    let path = Path::new(value);
    if path.is_file() {
        return Ok(ForcefieldSource::path(path));
    }
    if builtin_source(value).is_some() {
        return Ok(ForcefieldSource::builtin(value));
    }
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
    {
        return Ok(ForcefieldSource::path(path));
    }

    Err(ParseError::UnknownForcefield {
        name: value.to_string(),
        builtins: BUILTIN_NAMES.join(", "),
    })
}
