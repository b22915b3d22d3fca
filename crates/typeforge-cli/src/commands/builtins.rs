use crate::error::Result;
use typeforge::core::forcefield::builtin::BUILTIN_NAMES;
use typeforge::workflows::apply::Forcefield;

pub fn run() -> Result<()> {
    println!("Built-in forcefields:");
    for line in builtin_lines()? {
        println!("  {line}");
    }
    Ok(())
}

fn builtin_lines() -> Result<Vec<String>> {
    BUILTIN_NAMES
        .iter()
        .map(|&name| {
            let forcefield = Forcefield::from_name(name)?;
            Ok(format!(
                "{name:<12} {} atom types",
                forcefield.definition().atom_type_count()
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_listed_with_its_type_count() {
        let lines = builtin_lines().unwrap();
        assert_eq!(lines.len(), BUILTIN_NAMES.len());
        assert!(lines[0].starts_with("oplsaa"));
        assert!(lines[0].ends_with("11 atom types"));
    }
}
