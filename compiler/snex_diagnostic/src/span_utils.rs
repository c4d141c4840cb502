//! Line/column resolution for diagnostics.
//!
//! [`LineOffsetTable`] pre-computes the line starts of a source so each
//! lookup is a binary search. [`LocatedDiagnostic`] pairs a diagnostic with
//! its resolved [`SourceLocation`] for consumers that have no access to the
//! source text (the debug channel, an editor overlay).

use std::fmt;
use std::sync::Arc;

use snex_ir::Span;

use crate::Diagnostic;

/// Pre-computed line offset table for efficient line/column lookup.
#[derive(Clone, Debug, Default)]
pub struct LineOffsetTable {
    /// Byte offset of each line start. `offsets[0] == 0`.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                offsets.push((i + 1) as u32);
            }
        }
        LineOffsetTable { offsets }
    }

    /// 1-based line containing `offset`.
    #[inline]
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let line_idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        (line_idx as u32) + 1
    }

    /// 1-based (line, column); the column counts characters, not bytes.
    pub fn offset_to_line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_from_offset(offset);
        let line_start = self.offsets.get((line - 1) as usize).copied().unwrap_or(0) as usize;
        let end = (offset as usize).min(source.len());
        let col = source
            .get(line_start..end)
            .map_or(0, |text| text.chars().count());
        let col = u32::try_from(col).unwrap_or(u32::MAX - 1) + 1;
        (line, col)
    }

    /// Byte offset of a 1-based line start.
    pub fn line_start_offset(&self, line: u32) -> Option<u32> {
        if line == 0 {
            return None;
        }
        self.offsets.get((line - 1) as usize).copied()
    }

    /// Text of a 1-based line without its newline.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let start = self.line_start_offset(line)? as usize;
        let end = self
            .line_start_offset(line + 1)
            .map_or(source.len(), |next| next as usize);
        source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Resolve a span start into a [`SourceLocation`] in `file`.
    pub fn locate(&self, file: &Arc<str>, source: &str, span: Span) -> SourceLocation {
        let (line, column) = self.offset_to_line_col(source, span.start);
        SourceLocation {
            file: Arc::clone(file),
            line,
            column,
        }
    }
}

/// A resolved 1-based source position.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A diagnostic with its primary location resolved.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct LocatedDiagnostic {
    pub diagnostic: Diagnostic,
    pub location: SourceLocation,
}

impl LocatedDiagnostic {
    /// Resolve `diagnostic` against `source`.
    ///
    /// Diagnostics without a primary label are placed at line 1, column 1.
    pub fn resolve(
        diagnostic: Diagnostic,
        file: &Arc<str>,
        table: &LineOffsetTable,
        source: &str,
    ) -> Self {
        let span = diagnostic.primary_span().unwrap_or(Span::DUMMY);
        let location = table.locate(file, source, span);
        LocatedDiagnostic {
            diagnostic,
            location,
        }
    }

    /// Resolve a whole batch against the same source.
    pub fn resolve_all(
        diagnostics: impl IntoIterator<Item = Diagnostic>,
        file: &Arc<str>,
        source: &str,
    ) -> Vec<Self> {
        let table = LineOffsetTable::build(source);
        diagnostics
            .into_iter()
            .map(|d| Self::resolve(d, file, &table, source))
            .collect()
    }
}

impl fmt::Display for LocatedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]: {}",
            self.location, self.diagnostic.severity, self.diagnostic.code, self.diagnostic.message
        )
    }
}

#[cfg(test)]
mod tests;
