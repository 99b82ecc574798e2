//! Generators and the arena that owns them.
//!
//! A Generator is the method table of an object (or scope) together with
//! its delegation links. Generators refer to each other by GeneratorId, so
//! cyclic structures (a generator wrapping the root, scopes pointing back at
//! their definers) never need owning pointers.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::attribute::Attribute;
use super::object::AgoraObject;
use crate::error::{Error, ErrorKind};
use crate::pattern::Pattern;


/// Guards against runaway delegation through malformed parent links.
const MAX_DELEGATION_DEPTH: usize = 4096;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct GeneratorId(usize);

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CellId(usize);

/// Pattern -> Attribute bindings, stored as a sequence of pairs since
/// Patterns cannot key a serialized map.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(
    from = "Vec<(Pattern, Attribute)>",
    into = "Vec<(Pattern, Attribute)>"
)]
pub struct Table(BTreeMap<Pattern, Attribute>);

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Generator {
    Empty,
    Internal {
        table: Table,
        parent: GeneratorId,
        /// Table consulted first by lookups that start from the private view.
        private: Option<GeneratorId>,
    },
    /// Forwards every lookup to the public view of `identity`.
    Wrapping { identity: AgoraObject },
}

/// Outcome of a successful lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub attribute: Attribute,
    /// Internal generator whose public or private table held the binding.
    pub holder: GeneratorId,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Heap {
    generators: Vec<Generator>,
    cells: Vec<AgoraObject>,
    /// Open activation scopes, innermost last.
    #[serde(skip)]
    scopes: Vec<ScopeMark>,
}

/// Arena lengths when a scope was entered.
///
/// A scope escapes once something allocated before it refers to something
/// allocated inside it; an escaped scope is kept whole.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ScopeMark {
    generators: usize,
    cells: usize,
    escaped: bool,
}


impl Table {
    pub fn get(&self, pattern: &Pattern) -> Option<&Attribute> {
        self.0.get(pattern)
    }

    pub fn insert(&mut self, pattern: Pattern, attribute: Attribute) -> Option<Attribute> {
        self.0.insert(pattern, attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &Attribute)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(Pattern, Attribute)>> for Table {
    fn from(pairs: Vec<(Pattern, Attribute)>) -> Self {
        Self(pairs.into_iter().collect())
    }
}

impl From<Table> for Vec<(Pattern, Attribute)> {
    fn from(table: Table) -> Self {
        table.0.into_iter().collect()
    }
}


impl Generator {
    pub fn internal(parent: GeneratorId, private: Option<GeneratorId>) -> Self {
        Generator::Internal {
            table: Table::default(),
            parent,
            private,
        }
    }

    pub fn with_table(table: Table, parent: GeneratorId, private: Option<GeneratorId>) -> Self {
        Generator::Internal {
            table,
            parent,
            private,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            Generator::Internal { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<GeneratorId> {
        match self {
            Generator::Internal { parent, .. } => Some(*parent),
            _ => None,
        }
    }

    pub fn private(&self) -> Option<GeneratorId> {
        match self {
            Generator::Internal { private, .. } => *private,
            _ => None,
        }
    }
}


impl Heap {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn alloc(&mut self, generator: Generator) -> GeneratorId {
        self.generators.push(generator);
        GeneratorId(self.generators.len() - 1)
    }

    pub fn alloc_cell(&mut self, value: AgoraObject) -> CellId {
        self.cells.push(value);
        CellId(self.cells.len() - 1)
    }

    pub fn get(&self, id: GeneratorId) -> Result<&Generator, Error> {
        match self.generators.get(id.0) {
            Some(generator) => Ok(generator),
            None => err_nost!(ErrorKind::ProgramError(
                format!("Dangling generator {}", id).into()
            )),
        }
    }

    fn get_mut(&mut self, id: GeneratorId) -> Result<&mut Generator, Error> {
        match self.generators.get_mut(id.0) {
            Some(generator) => Ok(generator),
            None => err_nost!(ErrorKind::ProgramError(
                format!("Dangling generator {}", id).into()
            )),
        }
    }

    pub fn cell(&self, id: CellId) -> Result<&AgoraObject, Error> {
        match self.cells.get(id.0) {
            Some(value) => Ok(value),
            None => err_nost!(ErrorKind::ProgramError(
                format!("Dangling cell {}", id).into()
            )),
        }
    }

    pub fn set_cell(&mut self, id: CellId, value: AgoraObject) -> Result<(), Error> {
        let referent = value.generator().0;
        for mark in self.scopes.iter_mut() {
            if id.0 < mark.cells && referent >= mark.generators {
                mark.escaped = true;
            }
        }
        match self.cells.get_mut(id.0) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => err_nost!(ErrorKind::ProgramError(
                format!("Dangling cell {}", id).into()
            )),
        }
    }

    /// Inserts or replaces a binding in one internal generator's table.
    pub fn install(
        &mut self,
        generator: GeneratorId,
        pattern: Pattern,
        attribute: Attribute,
    ) -> Result<(), Error> {
        if let Some(cell) = attribute.cell() {
            for mark in self.scopes.iter_mut() {
                if generator.0 < mark.generators && cell.0 >= mark.cells {
                    mark.escaped = true;
                }
            }
        }
        match self.get_mut(generator)? {
            Generator::Internal { table, .. } => {
                debug!("Installing {} -> {} in {}", pattern, attribute, generator);
                if let Some(old) = table.insert(pattern.clone(), attribute) {
                    warn!("Replaced {} ({}) in {}", pattern, old, generator);
                }
                Ok(())
            }
            _ => err_nost!(ErrorKind::ProgramError(
                format!("Cannot install {} into non-internal {}", pattern, generator).into()
            )),
        }
    }

    /// Exact match in the table of `generator` only.
    pub fn lookup(&self, generator: GeneratorId, pattern: &Pattern) -> Option<&Attribute> {
        match self.generators.get(generator.0) {
            Some(Generator::Internal { table, .. }) => table.get(pattern),
            _ => None,
        }
    }

    /// Walks the delegation chain from `start`.
    ///
    /// At each internal generator the private table (when `from_private`)
    /// is consulted before the generator's own table. Crossing a Wrapping
    /// generator drops to the public view of the wrapped identity.
    pub fn resolve(
        &self,
        start: GeneratorId,
        pattern: &Pattern,
        from_private: bool,
    ) -> Result<Option<Resolution>, Error> {
        let mut current = start;
        let mut from_private = from_private;
        for _ in 0..MAX_DELEGATION_DEPTH {
            match self.get(current)? {
                Generator::Empty => return Ok(None),
                Generator::Wrapping { identity } => {
                    current = identity.generator();
                    from_private = false;
                }
                Generator::Internal {
                    table,
                    parent,
                    private,
                } => {
                    if from_private {
                        if let Some(private) = private {
                            if let Some(attribute) = self.lookup(*private, pattern) {
                                return Ok(Some(Resolution {
                                    attribute: attribute.clone(),
                                    holder: current,
                                }));
                            }
                        }
                    }
                    if let Some(attribute) = table.get(pattern) {
                        return Ok(Some(Resolution {
                            attribute: attribute.clone(),
                            holder: current,
                        }));
                    }
                    current = *parent;
                }
            }
        }
        err_nost!(ErrorKind::ProgramError(
            format!("Delegation chain from {} too deep", start).into()
        ))
    }

    /// Copy of an internal generator with fresh cells behind its variables.
    ///
    /// Attributes sharing a cell in the source share one new cell in the
    /// copy.
    pub fn duplicate(
        &mut self,
        source: GeneratorId,
        private: Option<GeneratorId>,
    ) -> Result<GeneratorId, Error> {
        let (table, parent) = match self.get(source)? {
            Generator::Internal { table, parent, .. } => (table.clone(), *parent),
            _ => {
                return err_nost!(ErrorKind::ProgramError(
                    format!("Cannot duplicate non-internal {}", source).into()
                ))
            }
        };

        let mut remapped = BTreeMap::<CellId, CellId>::new();
        let mut copy = Table::default();
        for (pattern, attribute) in table.iter() {
            let attribute = match attribute.cell() {
                Some(cell) => {
                    let fresh = match remapped.get(&cell) {
                        Some(fresh) => *fresh,
                        None => {
                            let value = self.cell(cell)?.clone();
                            let fresh = self.alloc_cell(value);
                            remapped.insert(cell, fresh);
                            fresh
                        }
                    };
                    attribute.with_cell(fresh)
                }
                None => attribute.clone(),
            };
            copy.insert(pattern.clone(), attribute);
        }
        Ok(self.alloc(Generator::with_table(copy, parent, private)))
    }

    /// Opens a scope for the allocations of one activation.
    pub fn enter(&mut self) {
        self.scopes.push(ScopeMark {
            generators: self.generators.len(),
            cells: self.cells.len(),
            escaped: false,
        });
    }

    /// Closes the innermost scope, releasing what it allocated unless it
    /// escaped or `retained` (what the scope answers) points into it.
    pub fn leave(&mut self, retained: &[&AgoraObject]) {
        let mark = match self.scopes.pop() {
            Some(mark) => mark,
            None => {
                warn!("Ignoring leave without an open scope");
                return;
            }
        };
        if mark.escaped {
            return;
        }
        if retained
            .iter()
            .any(|object| object.generator().0 >= mark.generators)
        {
            return;
        }
        debug!(
            "Releasing {} generators and {} cells",
            self.generators.len() - mark.generators,
            self.cells.len() - mark.cells
        );
        self.generators.truncate(mark.generators);
        self.cells.truncate(mark.cells);
    }

    /// Keeps `generator` alive past every open scope it was allocated in.
    pub fn pin(&mut self, generator: GeneratorId) {
        for mark in self.scopes.iter_mut() {
            if generator.0 >= mark.generators {
                mark.escaped = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}


impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}


#[cfg(test)]
#[path = "./generator_test.rs"]
mod generator_test;
