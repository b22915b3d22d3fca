use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements understood by the typing engine.
///
/// The set covers organic chemistry, common halogens and the ions and metals that
/// typically appear in condensed-phase simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    // --- Core Organic ---
    H, // Hydrogen
    C, // Carbon
    N, // Nitrogen
    O, // Oxygen
    P, // Phosphorus
    S, // Sulfur

    // --- Halogens ---
    F,  // Fluorine
    Cl, // Chlorine
    Br, // Bromine
    I,  // Iodine

    // --- Alkali & Alkaline Earth Metals ---
    Li, // Lithium
    Na, // Sodium
    K,  // Potassium
    Mg, // Magnesium
    Ca, // Calcium

    // --- Transition Metals ---
    Mn, // Manganese
    Fe, // Iron
    Co, // Cobalt
    Ni, // Nickel
    Cu, // Copper
    Zn, // Zinc

    // --- Metalloids & Others ---
    B,  // Boron
    Al, // Aluminum
    Si, // Silicon
    Se, // Selenium
}

const ALL_ELEMENTS: [Element; 25] = [
    Element::H,
    Element::C,
    Element::N,
    Element::O,
    Element::P,
    Element::S,
    Element::F,
    Element::Cl,
    Element::Br,
    Element::I,
    Element::Li,
    Element::Na,
    Element::K,
    Element::Mg,
    Element::Ca,
    Element::Mn,
    Element::Fe,
    Element::Co,
    Element::Ni,
    Element::Cu,
    Element::Zn,
    Element::B,
    Element::Al,
    Element::Si,
    Element::Se,
];

impl Element {
    /// Returns the element symbol with conventional capitalization (e.g. `"Cl"`).
    pub fn symbol(self) -> &'static str {
        match self {
            Self::H => "H",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::P => "P",
            Self::S => "S",
            Self::F => "F",
            Self::Cl => "Cl",
            Self::Br => "Br",
            Self::I => "I",
            Self::Li => "Li",
            Self::Na => "Na",
            Self::K => "K",
            Self::Mg => "Mg",
            Self::Ca => "Ca",
            Self::Mn => "Mn",
            Self::Fe => "Fe",
            Self::Co => "Co",
            Self::Ni => "Ni",
            Self::Cu => "Cu",
            Self::Zn => "Zn",
            Self::B => "B",
            Self::Al => "Al",
            Self::Si => "Si",
            Self::Se => "Se",
        }
    }

    pub fn atomic_number(self) -> u8 {
        match self {
            Self::H => 1,
            Self::Li => 3,
            Self::B => 5,
            Self::C => 6,
            Self::N => 7,
            Self::O => 8,
            Self::F => 9,
            Self::Na => 11,
            Self::Mg => 12,
            Self::Al => 13,
            Self::Si => 14,
            Self::P => 15,
            Self::S => 16,
            Self::Cl => 17,
            Self::K => 19,
            Self::Ca => 20,
            Self::Mn => 25,
            Self::Fe => 26,
            Self::Co => 27,
            Self::Ni => 28,
            Self::Cu => 29,
            Self::Zn => 30,
            Self::Se => 34,
            Self::Br => 35,
            Self::I => 53,
        }
    }

    /// Standard atomic mass in daltons.
    pub fn mass(self) -> f64 {
        match self {
            Self::H => 1.008,
            Self::Li => 6.94,
            Self::B => 10.81,
            Self::C => 12.011,
            Self::N => 14.007,
            Self::O => 15.999,
            Self::F => 18.998,
            Self::Na => 22.990,
            Self::Mg => 24.305,
            Self::Al => 26.982,
            Self::Si => 28.085,
            Self::P => 30.974,
            Self::S => 32.06,
            Self::Cl => 35.45,
            Self::K => 39.098,
            Self::Ca => 40.078,
            Self::Mn => 54.938,
            Self::Fe => 55.845,
            Self::Co => 58.933,
            Self::Ni => 58.693,
            Self::Cu => 63.546,
            Self::Zn => 65.38,
            Self::Se => 78.971,
            Self::Br => 79.904,
            Self::I => 126.904,
        }
    }

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        ALL_ELEMENTS
            .iter()
            .copied()
            .find(|e| e.atomic_number() == number)
    }

    /// Looks up an element by its exact, case-sensitive symbol (`"Cl"`, not `"CL"`).
    ///
    /// The rule language relies on case to tell `C` followed by a primitive apart from a
    /// two-letter symbol, so it cannot use the lenient [`FromStr`] implementation.
    pub fn from_symbol_exact(symbol: &str) -> Option<Self> {
        ALL_ELEMENTS.iter().copied().find(|e| e.symbol() == symbol)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    /// Parses an element symbol case-insensitively; isotope labels of hydrogen
    /// (`D`, `T`, `2H`, ...) map to [`Element::H`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        match symbol.to_ascii_uppercase().as_str() {
            "1H" | "D" | "2H" | "T" | "3H" => return Ok(Self::H),
            _ => {}
        }
        ALL_ELEMENTS
            .iter()
            .copied()
            .find(|e| e.symbol().eq_ignore_ascii_case(symbol))
            .ok_or_else(|| ParseElementError(symbol.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
