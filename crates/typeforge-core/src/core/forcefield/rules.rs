//! SMARTS-like typing rules.
//!
//! A rule definition describes the typed atom and its bonded surroundings as a tree:
//! the first atom of the pattern is the atom being typed, nested branches `( ... )`
//! and chained atoms describe its neighbors. Supported atom primitives are element
//! symbols, `#n`, `*`, `Xn`/`Dn`, `R`/`R0`, `rn` and `Hn`, combined with `!`, `&`
//! (or juxtaposition), `,` and `;`. Bonds may be written as `-` or `~` and are not
//! constrained. Ring closures are not supported.

use crate::core::models::element::Element;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Read-only view of a molecular graph that patterns are evaluated against.
pub trait AtomGraph {
    fn element(&self, atom: usize) -> Element;
    fn neighbors(&self, atom: usize) -> &[usize];
    /// Size of the smallest ring containing `atom`, or `None` for acyclic atoms.
    fn smallest_ring(&self, atom: usize) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomPrimitive {
    Element(Element),
    AtomicNum(u8),
    Wildcard,
    /// Number of bonded neighbors (`X3`, `D3`).
    Connectivity(u8),
    RingMember,
    /// Size of the smallest ring through the atom (`r6`).
    RingSize(u8),
    /// Number of bonded hydrogens (`H2`).
    HydrogenCount(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    Prim(AtomPrimitive),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
}

impl AtomExpr {
    pub fn matches<G: AtomGraph + ?Sized>(&self, graph: &G, atom: usize) -> bool {
        match self {
            Self::Prim(prim) => prim.matches(graph, atom),
            Self::And(terms) => terms.iter().all(|t| t.matches(graph, atom)),
            Self::Or(terms) => terms.iter().any(|t| t.matches(graph, atom)),
            Self::Not(inner) => !inner.matches(graph, atom),
        }
    }

    fn primitive_count(&self) -> usize {
        match self {
            Self::Prim(_) => 1,
            Self::And(terms) | Self::Or(terms) => terms.iter().map(Self::primitive_count).sum(),
            Self::Not(inner) => inner.primitive_count(),
        }
    }

    /// The element this expression requires unconditionally, if any.
    fn required_element(&self) -> Option<Element> {
        match self {
            Self::Prim(AtomPrimitive::Element(e)) => Some(*e),
            Self::Prim(AtomPrimitive::AtomicNum(n)) => Element::from_atomic_number(*n),
            Self::And(terms) => terms.iter().find_map(Self::required_element),
            _ => None,
        }
    }
}

impl AtomPrimitive {
    fn matches<G: AtomGraph + ?Sized>(&self, graph: &G, atom: usize) -> bool {
        match *self {
            Self::Element(element) => graph.element(atom) == element,
            Self::AtomicNum(n) => graph.element(atom).atomic_number() == n,
            Self::Wildcard => true,
            Self::Connectivity(n) => graph.neighbors(atom).len() == n as usize,
            Self::RingMember => graph.smallest_ring(atom).is_some(),
            Self::RingSize(n) => graph.smallest_ring(atom) == Some(n as usize),
            Self::HydrogenCount(n) => {
                graph
                    .neighbors(atom)
                    .iter()
                    .filter(|&&nb| graph.element(nb) == Element::H)
                    .count()
                    == n as usize
            }
        }
    }
}

/// One atom of a pattern tree together with the atoms bonded below it.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternAtom {
    pub expr: AtomExpr,
    pub children: Vec<PatternAtom>,
}

impl PatternAtom {
    fn atom_count(&self) -> usize {
        1 + self.children.iter().map(Self::atom_count).sum::<usize>()
    }

    fn primitive_count(&self) -> usize {
        self.expr.primitive_count()
            + self
                .children
                .iter()
                .map(Self::primitive_count)
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct PatternError {
    pub position: usize,
    pub message: String,
}

/// A parsed typing rule definition rooted at the typed atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    source: String,
    root: PatternAtom,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let root = PatternParser::new(source).parse()?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &PatternAtom {
        &self.root
    }

    /// Element required of the typed atom, if the root expression pins one down.
    pub fn root_element(&self) -> Option<Element> {
        self.root.expr.required_element()
    }

    /// Specificity score: pattern atoms plus primitive constraints.
    pub fn specificity(&self) -> usize {
        self.root.atom_count() + self.root.primitive_count()
    }

    /// Tests whether the pattern embeds into `graph` with its root on `atom`.
    ///
    /// Distinct pattern atoms always map onto distinct graph atoms.
    pub fn matches_at<G: AtomGraph + ?Sized>(&self, graph: &G, atom: usize) -> bool {
        if !self.root.expr.matches(graph, atom) {
            return false;
        }
        let mut used = vec![atom];
        let mut pending: Vec<(&PatternAtom, usize)> =
            self.root.children.iter().map(|c| (c, atom)).collect();
        embed(graph, &mut pending, &mut used)
    }
}

fn embed<'p, G: AtomGraph + ?Sized>(
    graph: &G,
    pending: &mut Vec<(&'p PatternAtom, usize)>,
    used: &mut Vec<usize>,
) -> bool {
    let Some((node, parent)) = pending.pop() else {
        return true;
    };

    for &candidate in graph.neighbors(parent) {
        if used.contains(&candidate) || !node.expr.matches(graph, candidate) {
            continue;
        }
        used.push(candidate);
        let mark = pending.len();
        pending.extend(node.children.iter().map(|c| (c, candidate)));
        if embed(graph, pending, used) {
            return true;
        }
        pending.truncate(mark);
        used.pop();
    }

    pending.push((node, parent));
    false
}

impl FromStr for Pattern {
    type Err = PatternError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct PatternParser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<(AtomExpr, Option<usize>)>,
    branches: Vec<usize>,
    prev_atom: Option<usize>,
}

impl<'a> PatternParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            branches: Vec::new(),
            prev_atom: None,
        }
    }

    fn error(&self, message: impl Into<String>) -> PatternError {
        PatternError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn parse(mut self) -> Result<PatternAtom, PatternError> {
        while let Some(ch) = self.peek() {
            match ch {
                b'(' => {
                    let prev = self
                        .prev_atom
                        .ok_or_else(|| self.error("branch without a preceding atom"))?;
                    self.advance();
                    self.branches.push(prev);
                }
                b')' => {
                    let open = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.error("unmatched ')'"))?;
                    if self.prev_atom == Some(open) {
                        return Err(self.error("empty branch"));
                    }
                    self.advance();
                    self.prev_atom = Some(open);
                }
                b'-' | b'~' => {
                    if self.prev_atom.is_none() {
                        return Err(self.error("bond without a preceding atom"));
                    }
                    self.advance();
                }
                b'[' => {
                    self.advance();
                    let expr = self.parse_low_and()?;
                    if self.advance() != Some(b']') {
                        return Err(self.error("expected ']'"));
                    }
                    self.push_atom(expr);
                }
                b'*' => {
                    self.advance();
                    self.push_atom(AtomExpr::Prim(AtomPrimitive::Wildcard));
                }
                b'0'..=b'9' | b'%' => return Err(self.error("ring closures are not supported")),
                ch if ch.is_ascii_uppercase() => {
                    let element = self.parse_element()?;
                    self.push_atom(AtomExpr::Prim(AtomPrimitive::Element(element)));
                }
                ch => return Err(self.error(format!("unexpected character '{}'", ch as char))),
            }
        }

        if !self.branches.is_empty() {
            return Err(self.error("unclosed branch"));
        }
        if self.atoms.is_empty() {
            return Err(self.error("empty pattern"));
        }
        Ok(build_tree(self.atoms))
    }

    fn push_atom(&mut self, expr: AtomExpr) {
        let index = self.atoms.len();
        self.atoms.push((expr, self.prev_atom));
        self.prev_atom = Some(index);
    }

    // low_and  = or_expr (';' or_expr)*
    // or_expr  = high_and (',' high_and)*
    // high_and = not_expr (('&' | implicit) not_expr)*
    // not_expr = '!'* primitive

    fn parse_low_and(&mut self) -> Result<AtomExpr, PatternError> {
        let mut terms = vec![self.parse_or()?];
        while self.peek() == Some(b';') {
            self.advance();
            terms.push(self.parse_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_or(&mut self) -> Result<AtomExpr, PatternError> {
        let mut terms = vec![self.parse_high_and()?];
        while self.peek() == Some(b',') {
            self.advance();
            terms.push(self.parse_high_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    fn parse_high_and(&mut self) -> Result<AtomExpr, PatternError> {
        let start = self.pos;
        let mut terms = vec![self.parse_not(start)?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.advance();
                    terms.push(self.parse_not(start)?);
                }
                Some(b']' | b',' | b';') | None => break,
                Some(_) => terms.push(self.parse_not(start)?),
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_not(&mut self, term_start: usize) -> Result<AtomExpr, PatternError> {
        if self.peek() == Some(b'!') {
            self.advance();
            let inner = self.parse_not(term_start)?;
            return Ok(AtomExpr::Not(Box::new(inner)));
        }
        self.parse_primitive(term_start)
    }

    fn parse_primitive(&mut self, term_start: usize) -> Result<AtomExpr, PatternError> {
        let bracket_start = self.pos == term_start && self.input.get(self.pos - 1) == Some(&b'[');
        let prim = match self.peek() {
            Some(b'#') => {
                self.advance();
                let n = self.parse_number()?;
                if Element::from_atomic_number(n).is_none() {
                    return Err(self.error(format!("unsupported atomic number {n}")));
                }
                AtomPrimitive::AtomicNum(n)
            }
            Some(b'*') => {
                self.advance();
                AtomPrimitive::Wildcard
            }
            Some(b'X' | b'D') => {
                self.advance();
                AtomPrimitive::Connectivity(self.parse_optional_number()?.unwrap_or(1))
            }
            Some(b'R') => {
                self.advance();
                match self.parse_optional_number()? {
                    None => AtomPrimitive::RingMember,
                    Some(0) => {
                        return Ok(AtomExpr::Not(Box::new(AtomExpr::Prim(
                            AtomPrimitive::RingMember,
                        ))));
                    }
                    Some(n) => return Err(self.error(format!("ring count R{n} is not supported"))),
                }
            }
            Some(b'r') => {
                self.advance();
                match self.parse_optional_number()? {
                    Some(n) => AtomPrimitive::RingSize(n),
                    None => AtomPrimitive::RingMember,
                }
            }
            Some(b'H') => {
                let next_is_digit = self
                    .input
                    .get(self.pos + 1)
                    .is_some_and(|c| c.is_ascii_digit());
                if bracket_start && !next_is_digit {
                    self.advance();
                    AtomPrimitive::Element(Element::H)
                } else {
                    self.advance();
                    AtomPrimitive::HydrogenCount(self.parse_optional_number()?.unwrap_or(1))
                }
            }
            Some(ch) if ch.is_ascii_uppercase() => AtomPrimitive::Element(self.parse_element()?),
            Some(ch) => return Err(self.error(format!("unsupported primitive '{}'", ch as char))),
            None => return Err(self.error("unexpected end of pattern")),
        };
        Ok(AtomExpr::Prim(prim))
    }

    fn parse_element(&mut self) -> Result<Element, PatternError> {
        let start = self.pos;
        let Some(first) = self.advance() else {
            return Err(self.error("expected element symbol"));
        };
        if let Some(second) = self.peek().filter(u8::is_ascii_lowercase) {
            let two = [first, second];
            if let Some(element) = std::str::from_utf8(&two)
                .ok()
                .and_then(Element::from_symbol_exact)
            {
                self.advance();
                return Ok(element);
            }
        }
        Element::from_symbol_exact(&(first as char).to_string()).ok_or(PatternError {
            position: start,
            message: format!("unknown element '{}'", first as char),
        })
    }

    fn parse_number(&mut self) -> Result<u8, PatternError> {
        self.parse_optional_number()?
            .ok_or_else(|| self.error("expected number"))
    }

    fn parse_optional_number(&mut self) -> Result<Option<u8>, PatternError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        digits.parse::<u8>().map(Some).map_err(|_| PatternError {
            position: start,
            message: format!("number '{digits}' out of range"),
        })
    }
}

fn collapse(mut terms: Vec<AtomExpr>, join: fn(Vec<AtomExpr>) -> AtomExpr) -> AtomExpr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

fn build_tree(atoms: Vec<(AtomExpr, Option<usize>)>) -> PatternAtom {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); atoms.len()];
    for (index, (_, parent)) in atoms.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(index);
        }
    }
    let mut exprs: Vec<Option<AtomExpr>> = atoms.into_iter().map(|(e, _)| Some(e)).collect();
    assemble(0, &children, &mut exprs)
}

fn assemble(index: usize, children: &[Vec<usize>], exprs: &mut [Option<AtomExpr>]) -> PatternAtom {
    let expr = exprs[index]
        .take()
        .unwrap_or(AtomExpr::Prim(AtomPrimitive::Wildcard));
    PatternAtom {
        expr,
        children: children[index]
            .iter()
            .map(|&child| assemble(child, children, exprs))
            .collect(),
    }
}
