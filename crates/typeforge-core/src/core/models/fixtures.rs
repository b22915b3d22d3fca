//! Small molecules shared by unit tests across the crate.

use super::atom::Atom;
use super::element::Element;
use super::ids::{AtomId, ResidueId};
use super::structure::Structure;
use super::topology::BondOrder;
use nalgebra::Point3;

fn push(
    structure: &mut Structure,
    residue_id: ResidueId,
    name: &str,
    element: Element,
    xyz: [f64; 3],
) -> AtomId {
    structure
        .add_atom(
            residue_id,
            Atom::new(name, element, Point3::new(xyz[0], xyz[1], xyz[2])),
        )
        .unwrap()
}

fn bond(structure: &mut Structure, a: AtomId, b: AtomId) {
    structure.add_bond(a, b, BondOrder::Single).unwrap();
}

/// Ethane as a single residue `ETH`; atoms ordered C1, C2, H11..H13, H21..H23.
pub fn ethane() -> Structure {
    let mut s = Structure::new();
    let res = s.add_residue("ETH", 1, 'A');
    let c1 = push(&mut s, res, "C1", Element::C, [0.0, 0.0, 0.0]);
    let c2 = push(&mut s, res, "C2", Element::C, [1.54, 0.0, 0.0]);
    let h11 = push(&mut s, res, "H11", Element::H, [-0.36, 1.03, 0.0]);
    let h12 = push(&mut s, res, "H12", Element::H, [-0.36, -0.51, -0.89]);
    let h13 = push(&mut s, res, "H13", Element::H, [-0.36, -0.51, 0.89]);
    let h21 = push(&mut s, res, "H21", Element::H, [1.90, 1.03, 0.0]);
    let h22 = push(&mut s, res, "H22", Element::H, [1.90, -0.51, -0.89]);
    let h23 = push(&mut s, res, "H23", Element::H, [1.90, -0.51, 0.89]);
    bond(&mut s, c1, c2);
    for h in [h11, h12, h13] {
        bond(&mut s, c1, h);
    }
    for h in [h21, h22, h23] {
        bond(&mut s, c2, h);
    }
    s
}

/// Ethane built from two `CH3` residues joined by the C-C bond.
pub fn ethane_two_methyls() -> Structure {
    let mut s = Structure::new();
    let mut carbons = Vec::new();
    for (n, x) in [(1, 0.0), (2, 1.54)] {
        let res = s.add_residue("CH3", n, 'A');
        let sign = if n == 1 { -1.0 } else { 1.0 };
        let c = push(&mut s, res, "C", Element::C, [x, 0.0, 0.0]);
        for (k, (y, z)) in [(1.03, 0.0), (-0.51, -0.89), (-0.51, 0.89)].into_iter().enumerate() {
            let h = push(
                &mut s,
                res,
                &format!("H{}", k + 1),
                Element::H,
                [x + sign * 0.36, y, z],
            );
            bond(&mut s, c, h);
        }
        carbons.push(c);
    }
    bond(&mut s, carbons[0], carbons[1]);
    s
}

/// n-Butane built from residues `CH3`, `CH2`, `CH2`, `CH3`.
pub fn butane_fragments() -> Structure {
    let mut s = Structure::new();
    let mut carbons = Vec::new();
    let layout = [("CH3", 3), ("CH2", 2), ("CH2", 2), ("CH3", 3)];
    for (i, (name, hydrogens)) in layout.into_iter().enumerate() {
        let res = s.add_residue(name, i as isize + 1, 'A');
        let x = 1.54 * i as f64;
        let c = push(&mut s, res, "C", Element::C, [x, 0.0, 0.0]);
        for k in 0..hydrogens {
            let h = push(
                &mut s,
                res,
                &format!("H{}", k + 1),
                Element::H,
                [x, 1.0, k as f64],
            );
            bond(&mut s, c, h);
        }
        carbons.push(c);
    }
    for pair in carbons.windows(2) {
        bond(&mut s, pair[0], pair[1]);
    }
    s
}

/// Benzene as a single residue `BEN`; carbons 0..6 in ring order, then hydrogens.
pub fn benzene() -> Structure {
    let mut s = Structure::new();
    let res = s.add_residue("BEN", 1, 'A');
    let mut carbons = Vec::new();
    for i in 0..6 {
        let angle = (i as f64) * std::f64::consts::PI / 3.0;
        carbons.push(push(
            &mut s,
            res,
            &format!("C{}", i + 1),
            Element::C,
            [1.4 * angle.cos(), 1.4 * angle.sin(), 0.0],
        ));
    }
    for i in 0..6 {
        let angle = (i as f64) * std::f64::consts::PI / 3.0;
        let h = push(
            &mut s,
            res,
            &format!("H{}", i + 1),
            Element::H,
            [2.48 * angle.cos(), 2.48 * angle.sin(), 0.0],
        );
        bond(&mut s, carbons[i], h);
    }
    for i in 0..6 {
        s.add_bond(carbons[i], carbons[(i + 1) % 6], BondOrder::Aromatic)
            .unwrap();
    }
    s
}

/// Ethanol as a single residue `ETO`: C1 (methyl), C2, O, then hydrogens.
pub fn ethanol() -> Structure {
    let mut s = Structure::new();
    let res = s.add_residue("ETO", 1, 'A');
    let c1 = push(&mut s, res, "C1", Element::C, [-1.270, 0.248, 0.000]);
    let c2 = push(&mut s, res, "C2", Element::C, [0.139, -0.308, 0.000]);
    let o = push(&mut s, res, "O", Element::O, [1.036, 0.789, 0.000]);
    bond(&mut s, c1, c2);
    bond(&mut s, c2, o);
    for (name, xyz) in [
        ("H11", [-1.317, 0.885, 0.883]),
        ("H12", [-1.317, 0.885, -0.883]),
        ("H13", [-2.030, -0.533, 0.000]),
    ] {
        let h = push(&mut s, res, name, Element::H, xyz);
        bond(&mut s, c1, h);
    }
    for (name, xyz) in [("H21", [0.358, -0.920, 0.876]), ("H22", [0.358, -0.920, -0.876])] {
        let h = push(&mut s, res, name, Element::H, xyz);
        bond(&mut s, c2, h);
    }
    let ho = push(&mut s, res, "HO", Element::H, [1.939, 0.473, 0.000]);
    bond(&mut s, o, ho);
    s
}
