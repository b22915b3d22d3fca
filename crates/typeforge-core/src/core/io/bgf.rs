use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::structure::Structure;
use crate::core::models::topology::BondOrder;
use nalgebra::{Matrix3, Point3, Vector3};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Width of the force-field type field in the standard atom record.
const DEFAULT_TYPE_WIDTH: usize = 5;
/// First column of the force-field type field.
const TYPE_COLUMN: usize = 61;
const CONECT_FORMAT: &str = "FORMAT CONECT (a6,12i6)";

fn atom_format(type_width: usize) -> String {
    format!(
        "FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a{type_width},i3,i2,1x,f8.5)"
    )
}

/// Reads the width of the force-field type field from a `FORMAT ATOM` line.
fn type_field_width(format_line: &str) -> Option<usize> {
    let (_, rest) = format_line.split_once("3f10.5,1x,a")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|&width| width > 0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BgfMetadata {
    /// Header records (`BIOGRF`, `DESCRP`, `REMARK`, ...) in file order.
    pub header_lines: Vec<String>,
    /// Force-field type column of each atom, in atom order.
    pub atom_types: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BgfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: BgfParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum BgfParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 60 chars)")]
    LineTooShort,
    #[error("Cannot determine element for atom '{name}' (type '{ff_type}')")]
    UnknownElement { name: String, ff_type: String },
    #[error("{record} line requires an atom serial and at least one value")]
    InvalidConnectivity { record: String },
    #[error("CRYSTX line requires six numeric values")]
    InvalidCrystx,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_float(line_num: usize, value: &str, columns: &str) -> Result<f64, BgfError> {
    value.parse().map_err(|_| BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidFloat {
            columns: columns.into(),
            value: value.into(),
        },
    })
}

fn parse_serials(line_num: usize, record: &str, line: &str) -> Result<Vec<usize>, BgfError> {
    let serials = line
        .split_whitespace()
        .skip(1)
        .map(|field| {
            field.parse::<usize>().map_err(|_| BgfError::Parse {
                line: line_num,
                kind: BgfParseErrorKind::InvalidInt {
                    columns: record.into(),
                    value: field.into(),
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if serials.len() < 2 {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::InvalidConnectivity {
                record: record.into(),
            },
        });
    }
    Ok(serials)
}

/// Infers the element from the force-field type prefix (`C_3`, `Cl`), falling back
/// to the leading letters of the atom name (`C12`, `Cl1`, `HW`).
fn infer_element(name: &str, ff_type: &str) -> Option<Element> {
    let prefix = ff_type.split('_').next().unwrap_or_default();
    if let Some(element) = Element::from_symbol_exact(prefix) {
        return Some(element);
    }
    let letters: String = name.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    letters
        .get(..2)
        .and_then(Element::from_symbol_exact)
        .or_else(|| letters.get(..1).and_then(Element::from_symbol_exact))
}

/// Converts CRYSTX lengths and angles (degrees) into box vectors, one per row.
pub fn box_from_crystx(params: [f64; 6]) -> Matrix3<f64> {
    let [a, b, c, alpha, beta, gamma] = params;
    let (alpha, beta, gamma) = (alpha.to_radians(), beta.to_radians(), gamma.to_radians());
    let bx = b * gamma.cos();
    let by = b * gamma.sin();
    let cx = c * beta.cos();
    let cy = c * (alpha.cos() - beta.cos() * gamma.cos()) / gamma.sin();
    let cz = (c * c - cx * cx - cy * cy).max(0.0).sqrt();
    Matrix3::new(a, 0.0, 0.0, bx, by, 0.0, cx, cy, cz)
}

/// Converts box vectors (rows) into CRYSTX lengths and angles in degrees.
pub fn crystx_from_box(box_vectors: &Matrix3<f64>) -> [f64; 6] {
    let rows: Vec<Vector3<f64>> = (0..3).map(|i| box_vectors.row(i).transpose()).collect();
    let angle = |u: &Vector3<f64>, v: &Vector3<f64>| u.angle(v).to_degrees();
    [
        rows[0].norm(),
        rows[1].norm(),
        rows[2].norm(),
        angle(&rows[1], &rows[2]),
        angle(&rows[0], &rows[2]),
        angle(&rows[0], &rows[1]),
    ]
}

pub struct BgfFile;

impl MolecularFile for BgfFile {
    type Metadata = BgfMetadata;
    type Error = BgfError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut structure = Structure::new();
        let mut metadata = BgfMetadata::default();
        let mut serial_to_id: HashMap<usize, AtomId> = HashMap::new();
        let mut current_residue: Option<(char, isize, String, ResidueId)> = None;

        let mut partners: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut orders: HashMap<(usize, usize), BondOrder> = HashMap::new();
        let mut last_conect: Vec<usize> = Vec::new();
        let mut type_width = DEFAULT_TYPE_WIDTH;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "" => continue,
                "ATOM" | "HETATM" => {
                    if line.len() < 60 {
                        return Err(BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::LineTooShort,
                        });
                    }

                    let serial_str = slice_and_trim(&line, 7, 12);
                    let name = slice_and_trim(&line, 13, 18);
                    let res_name = slice_and_trim(&line, 19, 22);
                    let chain_id: char = slice_and_trim(&line, 23, 24).chars().next().unwrap_or('A');
                    let res_id_str = slice_and_trim(&line, 25, 30);
                    let x = parse_float(line_num, slice_and_trim(&line, 30, 40), "31-40")?;
                    let y = parse_float(line_num, slice_and_trim(&line, 40, 50), "41-50")?;
                    let z = parse_float(line_num, slice_and_trim(&line, 50, 60), "51-60")?;
                    let ff_type = slice_and_trim(&line, TYPE_COLUMN, TYPE_COLUMN + type_width);

                    if name.is_empty() {
                        return Err(BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::MissingRequiredField {
                                columns: "14-18".into(),
                            },
                        });
                    }
                    let serial: usize = serial_str.parse().map_err(|_| BgfError::Parse {
                        line: line_num,
                        kind: BgfParseErrorKind::InvalidInt {
                            columns: "8-12".into(),
                            value: serial_str.into(),
                        },
                    })?;
                    if serial_to_id.contains_key(&serial) {
                        return Err(BgfError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }
                    let res_id: isize = res_id_str.parse().map_err(|_| BgfError::Parse {
                        line: line_num,
                        kind: BgfParseErrorKind::InvalidInt {
                            columns: "26-30".into(),
                            value: res_id_str.into(),
                        },
                    })?;
                    let element =
                        infer_element(name, ff_type).ok_or_else(|| BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::UnknownElement {
                                name: name.into(),
                                ff_type: ff_type.into(),
                            },
                        })?;

                    let same_residue = current_residue
                        .as_ref()
                        .filter(|(chain, number, rname, _)| {
                            *chain == chain_id && *number == res_id && rname == res_name
                        })
                        .map(|(_, _, _, id)| *id);
                    let residue_id = match same_residue {
                        Some(id) => id,
                        None => {
                            let id = structure.add_residue(res_name, res_id, chain_id);
                            current_residue = Some((chain_id, res_id, res_name.to_string(), id));
                            id
                        }
                    };
                    let atom = Atom::new(name, element, Point3::new(x, y, z));
                    let atom_id = structure.add_atom(residue_id, atom).ok_or_else(|| {
                        BgfError::Inconsistency(format!("Residue for atom {serial} vanished"))
                    })?;
                    serial_to_id.insert(serial, atom_id);
                    metadata.atom_types.push(ff_type.to_string());
                }
                "CONECT" => {
                    let serials = parse_serials(line_num, "CONECT", &line)?;
                    partners
                        .entry(serials[0])
                        .or_default()
                        .extend_from_slice(&serials[1..]);
                    last_conect = serials;
                }
                "ORDER" => {
                    let fields: Vec<&str> = line.split_whitespace().skip(1).collect();
                    let Some((first, values)) = fields.split_first() else {
                        return Err(BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::InvalidConnectivity {
                                record: "ORDER".into(),
                            },
                        });
                    };
                    let serial: usize = first.parse().map_err(|_| BgfError::Parse {
                        line: line_num,
                        kind: BgfParseErrorKind::InvalidInt {
                            columns: "ORDER".into(),
                            value: first.to_string(),
                        },
                    })?;
                    if last_conect.first() == Some(&serial) {
                        for (&other, value) in last_conect[1..].iter().zip(values) {
                            let order: BondOrder = value.parse().map_err(|_| BgfError::Parse {
                                line: line_num,
                                kind: BgfParseErrorKind::InvalidInt {
                                    columns: "ORDER".into(),
                                    value: value.to_string(),
                                },
                            })?;
                            orders.insert((serial.min(other), serial.max(other)), order);
                        }
                    }
                }
                "CRYSTX" => {
                    let values: Vec<f64> = line
                        .split_whitespace()
                        .skip(1)
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|_| BgfError::Parse {
                            line: line_num,
                            kind: BgfParseErrorKind::InvalidCrystx,
                        })?;
                    let params: [f64; 6] = values.try_into().map_err(|_| BgfError::Parse {
                        line: line_num,
                        kind: BgfParseErrorKind::InvalidCrystx,
                    })?;
                    structure.set_box_vectors(Some(box_from_crystx(params)));
                }
                "FORMAT" => {
                    if line.split_whitespace().nth(1) == Some("ATOM") {
                        type_width = type_field_width(&line).unwrap_or(DEFAULT_TYPE_WIDTH);
                    }
                }
                "END" => break,
                _ => metadata.header_lines.push(line.clone()),
            }
        }

        if serial_to_id.is_empty() {
            return Err(BgfError::MissingRecord("ATOM/HETATM records".into()));
        }

        for (&serial, conns) in &partners {
            for &other in conns {
                let ids = (serial_to_id.get(&serial), serial_to_id.get(&other));
                let (Some(&a1), Some(&a2)) = ids else {
                    return Err(BgfError::Inconsistency(format!(
                        "CONECT references unknown atom serial {} or {}",
                        serial, other
                    )));
                };
                if a1 == a2 {
                    return Err(BgfError::Inconsistency(format!(
                        "Atom {} is bonded to itself",
                        serial
                    )));
                }
                let order = orders
                    .get(&(serial.min(other), serial.max(other)))
                    .copied()
                    .unwrap_or_default();
                structure.add_bond(a1, a2, order);
            }
        }

        Ok((structure, metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        if let Some(box_vectors) = structure.box_vectors() {
            let [a, b, c, alpha, beta, gamma] = crystx_from_box(box_vectors);
            writeln!(
                writer,
                "CRYSTX {:>11.5}{:>11.5}{:>11.5}{:>11.5}{:>11.5}{:>11.5}",
                a, b, c, alpha, beta, gamma
            )?;
        }
        let ff_types: Vec<&str> = structure
            .atoms_iter()
            .enumerate()
            .map(|(index, (_, atom))| {
                atom.atom_type
                    .as_deref()
                    .or_else(|| {
                        metadata
                            .atom_types
                            .get(index)
                            .map(String::as_str)
                            .filter(|t| !t.is_empty())
                    })
                    .unwrap_or(atom.element.symbol())
            })
            .collect();
        let type_width = ff_types
            .iter()
            .map(|t| t.len())
            .max()
            .unwrap_or(0)
            .max(DEFAULT_TYPE_WIDTH);
        writeln!(writer, "{}", atom_format(type_width))?;

        let mut serials: HashMap<AtomId, usize> = HashMap::new();
        for (index, (atom_id, atom)) in structure.atoms_iter().enumerate() {
            let serial = index + 1;
            serials.insert(atom_id, serial);
            let residue = structure.residue(atom.residue_id).ok_or_else(|| {
                BgfError::Inconsistency(format!("Atom '{}' has no residue", atom.name))
            })?;
            let bond_count = structure.bonded_neighbors(atom_id).map_or(0, <[_]>::len);
            writeln!(
                writer,
                "{:<6} {:>5} {:<5} {:<3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<type_width$}{:>3}{:>2} {:>8.5}",
                "HETATM",
                serial,
                atom.name,
                residue.name,
                residue.chain,
                residue.number,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                ff_types[index],
                bond_count,
                0,
                atom.charge()
            )?;
        }

        writeln!(writer, "{}", CONECT_FORMAT)?;
        for (atom_id, _) in structure.atoms_iter() {
            let Some(neighbors) = structure.bonded_neighbors(atom_id) else {
                continue;
            };
            if neighbors.is_empty() {
                continue;
            }
            let serial = serials[&atom_id];
            let mut conns: Vec<(usize, BondOrder)> = structure
                .bonds()
                .iter()
                .filter_map(|bond| {
                    bond.partner(atom_id)
                        .and_then(|other| serials.get(&other))
                        .map(|&other| (other, bond.order))
                })
                .collect();
            conns.sort_by_key(|&(other, _)| other);

            write!(writer, "CONECT{:>6}", serial)?;
            for (other, _) in &conns {
                write!(writer, "{:>6}", other)?;
            }
            writeln!(writer)?;
            if conns.iter().any(|(_, order)| *order != BondOrder::Single) {
                write!(writer, "ORDER {:>6}", serial)?;
                for (_, order) in &conns {
                    write!(writer, "{:>6}", *order as u8)?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_structure_to(
        structure: &Structure,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let default_metadata = BgfMetadata {
            header_lines: vec![
                "BIOGRF  332".to_string(),
                "REMARK Generated by typeforge".to_string(),
            ],
            ..Default::default()
        };
        Self::write_to(structure, &default_metadata, writer)
    }
}
