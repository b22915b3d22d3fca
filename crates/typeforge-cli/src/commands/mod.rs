pub mod apply;
pub mod builtins;
pub mod check;

use crate::cli::ForcefieldArgs;
use crate::error::Result;
use crate::utils::parser::parse_forcefield_source;
use tracing::info;
use typeforge::workflows::apply::Forcefield;

fn load_forcefield(args: &ForcefieldArgs) -> Result<Forcefield> {
    let sources = args
        .sources
        .iter()
        .map(|value| parse_forcefield_source(value))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Loading {} forcefield source(s)...", sources.len());
    Ok(Forcefield::load(sources)?)
}
