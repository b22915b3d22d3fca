use super::load_forcefield;
use crate::cli::CheckArgs;
use crate::error::Result;
use typeforge::core::forcefield::definition::ForcefieldDefinition;

pub fn run(args: CheckArgs) -> Result<()> {
    let forcefield = load_forcefield(&args.forcefields)?;
    print!("{}", summarize(forcefield.definition()));
    println!("✓ Forcefield definitions are consistent.");
    Ok(())
}

fn summarize(definition: &ForcefieldDefinition) -> String {
    let generation = definition.generation();
    let cited = definition
        .atom_types()
        .filter(|rule| rule.doi.is_some())
        .count();

    let lines = [
        format!("Forcefield: {}", definition.name().unwrap_or("(unnamed)")),
        format!("Sources:    {}", definition.sources().join(", ")),
        format!(
            "Atom types: {} ({} with citations)",
            definition.atom_type_count(),
            cited
        ),
        format!("Templates:  {}", definition.bonded_template_count()),
        format!(
            "Generation: impropers={:?}, improper-center={:?}, propers={:?}",
            generation.impropers, generation.improper_center, generation.propers
        ),
    ];
    lines.iter().map(|line| format!("{line}\n")).collect()
}
