//! Identifier interning.
//!
//! Identifiers are compared and hashed constantly during name resolution
//! and type checking (scope lookups, duplicate-member checks), so names are
//! interned once into a flat table and referred to everywhere else by a
//! small [`Symbol`] index rather than by `String`.

use ahash::AHashMap;

/// Index into an [`Interner`]'s table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns the canonical spelling of every identifier seen during scanning.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&symbol) = self.lookup.get(text) {
            return symbol;
        }
        let symbol = Symbol(self.strings.len() as u32);
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, symbol);
        symbol
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        &self.strings[symbol.index()]
    }

    /// Looks up an already-interned string without interning it, used to
    /// find well-known names (`main`) without mutating the table.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.lookup.get(text).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_text_returns_the_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("x");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "x");
    }

    #[test]
    fn distinct_text_yields_distinct_symbols() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
    }
}
