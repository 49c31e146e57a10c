//! The macro table: insertion-ordered definitions with first-match lookup.

use std::fmt;

use crate::token::{Token, TokenKind};

/// Whether uses of a macro take a parenthesized argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// Expands to the same replacement tokens at every use.
    Value,
    /// Requires `(` comma-separated arguments `)` at each use.
    Parameterized,
}

/// One stored definition. Immutable once inserted.
#[derive(Debug, Clone)]
pub struct Macro<'src> {
    pub kind: MacroKind,
    pub name: Token<'src>,
    /// Declared parameter names, in declaration order. Empty for value
    /// macros.
    pub params: Vec<Token<'src>>,
    /// Replacement tokens, stored unexpanded.
    pub body: Vec<Token<'src>>,
}

impl Macro<'_> {
    /// Ordinal of the first declared parameter spelled like `token`.
    /// Duplicate parameter names resolve to the earliest declaration.
    pub fn parameter_index(&self, token: &Token<'_>) -> Option<usize> {
        self.params.iter().position(|param| param.same_text(token))
    }
}

impl fmt::Display for Macro<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.text)?;
        if self.kind == MacroKind::Parameterized {
            f.write_str("(")?;
            for (index, param) in self.params.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(param.text)?;
            }
            f.write_str(")")?;
        }
        f.write_str(" => ")?;
        for token in &self.body {
            f.write_str(token.text)?;
        }
        Ok(())
    }
}

/// Append-only, insertion-ordered collection of definitions.
#[derive(Debug, Default, Clone)]
pub struct MacroTable<'src> {
    macros: Vec<Macro<'src>>,
}

impl<'src> MacroTable<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. Existing definitions are never replaced, so a
    /// redefined name keeps resolving to its earliest definition.
    pub fn define(&mut self, mac: Macro<'src>) {
        self.macros.push(mac);
    }

    /// First definition whose name is spelled like `token`. Only `Text`
    /// tokens can name a macro.
    pub fn find_by_name(&self, token: &Token<'_>) -> Option<&Macro<'src>> {
        if token.kind != TokenKind::Text {
            return None;
        }
        self.macros.iter().find(|mac| mac.name.same_text(token))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro<'src>> {
        self.macros.iter()
    }
}
