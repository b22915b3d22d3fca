use super::load_forcefield;
use crate::cli::ApplyArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use tracing::info;
use typeforge::{
    core::io::{bgf::BgfFile, traits::MolecularFile},
    engine::config::{ApplyOptions, ApplyOptionsBuilder, ResidueMapPolicy, SpecificityPolicy},
    engine::progress::ProgressReporter,
};

pub fn run(args: ApplyArgs) -> Result<()> {
    let forcefield = load_forcefield(&args.forcefields)?;
    let options = build_options(&args)?;

    info!("Loading input structure from {:?}", &args.input);
    let (structure, metadata) =
        BgfFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Applying forcefield to {} atoms in {} residue(s)...",
        structure.atom_count(),
        structure.residue_count()
    );
    let typed = forcefield.apply_with_progress(&structure, &options, &reporter)?;

    BgfFile::write_to_path(&typed, &metadata, &args.output).map_err(|e| CliError::FileParsing {
        path: args.output.clone(),
        source: e.into(),
    })?;

    println!(
        "✓ Typed structure written to: {} ({} bonds, {} angles, {} dihedrals)",
        args.output.display(),
        typed.bonds().len(),
        typed.angles().len(),
        typed.dihedrals().len()
    );
    if let Some(path) = &options.references_file {
        println!("✓ References written to: {}", path.display());
    }
    Ok(())
}

fn build_options(args: &ApplyArgs) -> Result<ApplyOptions> {
    let mut builder = ApplyOptionsBuilder::new()
        .use_residue_map(!args.no_residue_map)
        .residue_map_policy(if args.strict_residues {
            ResidueMapPolicy::Strict
        } else {
            ResidueMapPolicy::FallBack
        })
        .specificity(if args.overrides_only {
            SpecificityPolicy::OverridesOnly
        } else {
            SpecificityPolicy::PatternSize
        });
    if !args.residues.is_empty() {
        builder = builder.residues(args.residues.iter().cloned());
    }
    if let Some(path) = &args.references {
        builder = builder.references_file(path.clone());
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ForcefieldArgs;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const METHANOL_BGF: &str = "\
BIOGRF  332
DESCRP methanol
FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)
HETATM     1 C     MOH A     1  -0.04700   0.66400   0.00000 C_3    4 0  0.00000
HETATM     2 O     MOH A     1  -0.04700  -0.75600   0.00000 O_3    2 0  0.00000
HETATM     3 H1    MOH A     1  -1.08600   0.97500   0.00000 H_     1 0  0.00000
HETATM     4 H2    MOH A     1   0.43300   1.07500   0.88700 H_     1 0  0.00000
HETATM     5 H3    MOH A     1   0.43300   1.07500  -0.88700 H_     1 0  0.00000
HETATM     6 HO    MOH A     1   0.87700  -1.04800   0.00000 H_     1 0  0.00000
FORMAT CONECT (a6,12i6)
CONECT     1     2     3     4     5
CONECT     2     1     6
CONECT     3     1
CONECT     4     1
CONECT     5     1
CONECT     6     2
END
";

    fn args(input: &Path, output: &Path) -> ApplyArgs {
        ApplyArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            forcefields: ForcefieldArgs {
                sources: vec!["oplsaa".into()],
            },
            residues: Vec::new(),
            no_residue_map: false,
            strict_residues: false,
            references: None,
            overrides_only: false,
        }
    }

    #[test]
    fn build_options_maps_every_flag() {
        let mut apply_args = args(Path::new("in.bgf"), Path::new("out.bgf"));
        let defaults = build_options(&apply_args).unwrap();
        assert_eq!(defaults, ApplyOptions::default());

        apply_args.residues = vec!["MOH".into()];
        apply_args.strict_residues = true;
        apply_args.overrides_only = true;
        apply_args.references = Some("refs.bib".into());
        let options = build_options(&apply_args).unwrap();
        assert_eq!(options.residues, Some(vec!["MOH".to_string()]));
        assert_eq!(options.residue_map_policy, ResidueMapPolicy::Strict);
        assert_eq!(options.specificity, SpecificityPolicy::OverridesOnly);
        assert!(options.references_file.is_some());
    }

    #[test]
    fn duplicate_residue_labels_are_rejected() {
        let mut apply_args = args(Path::new("in.bgf"), Path::new("out.bgf"));
        apply_args.residues = vec!["MOH".into(), "MOH".into()];
        assert!(matches!(
            build_options(&apply_args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn run_writes_typed_bgf_and_references() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("methanol.bgf");
        let output = dir.path().join("typed.bgf");
        let refs = dir.path().join("refs.bib");
        fs::write(&input, METHANOL_BGF).unwrap();

        let mut apply_args = args(&input, &output);
        apply_args.references = Some(refs.clone());
        run(apply_args).unwrap();

        let typed = fs::read_to_string(&output).unwrap();
        assert!(typed.contains("opls_154"));
        assert!(typed.contains("opls_155"));
        assert!(typed.contains("DESCRP methanol"));
        let references = fs::read_to_string(&refs).unwrap();
        assert!(references.contains("10.1021/ja9621760"));
    }

    #[test]
    fn unreadable_input_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing.bgf");
        let output = dir.path().join("out.bgf");
        assert!(matches!(
            run(args(&input, &output)),
            Err(CliError::FileParsing { .. })
        ));
    }
}
