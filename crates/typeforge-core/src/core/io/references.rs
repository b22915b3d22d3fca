use crate::core::forcefield::definition::ForcefieldDefinition;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// DOI -> names of the matched atom types that cite it.
pub type Citations = BTreeMap<String, BTreeSet<String>>;

/// Collects the DOIs cited by the given atom types.
///
/// Types without a DOI, and names unknown to the definition, are skipped.
pub fn collect_citations<'a, I>(definition: &ForcefieldDefinition, types: I) -> Citations
where
    I: IntoIterator<Item = &'a str>,
{
    let mut citations = Citations::new();
    for type_name in types {
        if let Some(doi) = definition.rule(type_name).and_then(|r| r.doi.as_deref()) {
            citations
                .entry(doi.to_string())
                .or_default()
                .insert(type_name.to_string());
        }
    }
    citations
}

/// Writes one BibTeX `@article` entry per DOI.
pub fn write_citations(citations: &Citations, writer: &mut impl Write) -> io::Result<()> {
    for (index, (doi, types)) in citations.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        let names: Vec<&str> = types.iter().map(String::as_str).collect();
        writeln!(writer, "@article{{{},", doi)?;
        writeln!(writer, "  doi = {{{}}},", doi)?;
        writeln!(writer, "  note = {{Parameters for atom types: {}}}", names.join(", "))?;
        writeln!(writer, "}}")?;
    }
    Ok(())
}

/// Writes the references file; an empty citation set produces an empty file.
pub fn write_references(path: &Path, citations: &Citations) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_citations(citations, &mut writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CITED: &str = r#"
        [[atom-types]]
        name = "C3"
        def = "[C]"
        doi = "10.1000/carbon"

        [[atom-types]]
        name = "C2"
        def = "[C;X3]"
        doi = "10.1000/carbon"
        overrides = ["C3"]

        [[atom-types]]
        name = "Hb"
        def = "[H]"
        doi = "10.1000/hydrogen"

        [[atom-types]]
        name = "Ow"
        def = "[O]"
    "#;

    #[test]
    fn groups_type_names_by_doi() {
        let ff = ForcefieldDefinition::from_toml_str(CITED, "cited").unwrap();
        let citations = collect_citations(&ff, ["Hb", "C3", "C2", "C3", "Ow", "unknown"]);
        assert_eq!(citations.len(), 2);
        let carbon: Vec<_> = citations["10.1000/carbon"].iter().collect();
        assert_eq!(carbon, ["C2", "C3"]);
    }

    #[test]
    fn writes_bibtex_entries() {
        let ff = ForcefieldDefinition::from_toml_str(CITED, "cited").unwrap();
        let citations = collect_citations(&ff, ["C3", "Hb", "C2"]);
        let mut buffer = Vec::new();
        write_citations(&citations, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(text.matches("@article").count(), 2);
        assert!(text.contains("@article{10.1000/carbon,"));
        assert!(text.contains("note = {Parameters for atom types: C2, C3}"));
        assert!(text.find("10.1000/carbon").unwrap() < text.find("10.1000/hydrogen").unwrap());
    }

    #[test]
    fn uncited_run_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        write_references(&path, &Citations::new()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
