//! Error records shared by every pass (§6, §7).
//!
//! Each pass accumulates a [`Diagnostics`] log instead of short-circuiting
//! on the first problem, so a single run can report every undeclared name,
//! every type mismatch, and so on in one pass.

use std::fmt;

use crate::span::SourceRegion;

/// A single note attached to a diagnostic, e.g. pointing at a parameter
/// declaration when reporting an argument type mismatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub message: String,
    pub region: SourceRegion,
}

/// One error record: a message, the primary region it concerns, and zero
/// or more supporting notes (each with its own message and region).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub region: SourceRegion,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, region: SourceRegion) -> Self {
        Self { message: message.into(), region, notes: Vec::new() }
    }

    #[must_use]
    pub fn with_note(mut self, message: impl Into<String>, region: SourceRegion) -> Self {
        self.notes.push(Note { message: message.into(), region });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note.message)?;
        }
        Ok(())
    }
}

/// Accumulated diagnostics for one pass. Never short-circuits: a pass
/// keeps going after recording an error so it can report as much as
/// possible in one run (§4.1, §4.2).
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, region: SourceRegion) {
        self.push(Diagnostic::new(message, region));
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileTable;

    #[test]
    fn accumulates_in_order() {
        let mut files = FileTable::new();
        let f = files.intern("a.carbon");
        let mut diags = Diagnostics::new();
        diags.error("first", SourceRegion::empty(f, 0));
        diags.error("second", SourceRegion::empty(f, 1));
        assert_eq!(diags.len(), 2);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
