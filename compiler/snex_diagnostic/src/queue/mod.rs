//! Diagnostic queue for collecting, deduplicating, and sorting diagnostics.
//!
//! - Error limit so a broken unit cannot flood the output
//! - Same-line syntax error deduplication
//! - Follow-on error filtering
//! - `ErrorGuaranteed` proof that errors were emitted

use std::hash::{Hash, Hasher};

use snex_ir::Span;

use crate::span_utils::LineOffsetTable;
use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// Number of characters used for message prefix deduplication.
const MESSAGE_PREFIX_LEN: usize = 30;

#[inline]
fn message_prefix_hash(msg: &str) -> u64 {
    let byte_end = msg
        .char_indices()
        .nth(MESSAGE_PREFIX_LEN)
        .map_or(msg.len(), |(idx, _)| idx);
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    msg[..byte_end].hash(&mut hasher);
    hasher.finish()
}

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors kept (0 = unlimited).
    pub error_limit: usize,
    /// Drop errors mentioning the error type, which only echo earlier ones.
    pub filter_follow_on: bool,
    /// Drop diagnostics with same line and similar content.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 50,
            filter_follow_on: true,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            filter_follow_on: false,
            deduplicate: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct QueuedDiagnostic {
    diagnostic: Diagnostic,
    line: u32,
    column: u32,
    /// Insertion order, keeps the sort stable for equal positions.
    seq: usize,
}

/// Collects the diagnostics of one compilation unit.
///
/// The lexer, parser and analyzer each hand back plain `Vec<Diagnostic>`;
/// the driver pushes them here so the unit's final list is ordered by
/// position and free of duplicates.
#[derive(Clone, Debug)]
pub struct DiagnosticQueue {
    diagnostics: Vec<QueuedDiagnostic>,
    error_count: usize,
    warning_count: usize,
    suppressed: usize,
    last_syntax_line: Option<u32>,
    last_error: Option<(u32, u64)>,
    limit_reported: bool,
    config: DiagnosticConfig,
    table: LineOffsetTable,
}

impl DiagnosticQueue {
    /// Queue positioned against `source`.
    pub fn new(source: &str) -> Self {
        Self::with_config(source, DiagnosticConfig::default())
    }

    pub fn with_config(source: &str, config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            suppressed: 0,
            last_syntax_line: None,
            last_error: None,
            limit_reported: false,
            config,
            table: LineOffsetTable::build(source),
        }
    }

    /// Add a diagnostic; the position is computed from its primary span.
    ///
    /// Returns `true` if it was kept.
    pub fn add(&mut self, source: &str, diag: Diagnostic) -> bool {
        let (line, column) = match diag.primary_span() {
            Some(span) => self.table.offset_to_line_col(source, span.start),
            None => (1, 1),
        };

        if diag.is_error() && self.limit_reached() {
            self.suppressed += 1;
            if !self.limit_reported {
                self.limit_reported = true;
                let span = diag.primary_span().unwrap_or(Span::DUMMY);
                self.push(too_many_errors(self.config.error_limit, span), line, column);
            }
            return false;
        }

        if self.config.filter_follow_on && Self::is_follow_on(&diag) {
            self.suppressed += 1;
            return false;
        }

        if self.config.deduplicate && self.is_duplicate(&diag, line) {
            self.suppressed += 1;
            return false;
        }

        if diag.is_error() {
            if diag.code.is_parser_error() {
                self.last_syntax_line = Some(line);
            } else {
                self.last_error = Some((line, message_prefix_hash(&diag.message)));
            }
            self.error_count += 1;
        } else if diag.is_warning() {
            self.warning_count += 1;
        }

        self.push(diag, line, column);
        true
    }

    /// Add a unit-fatal error. Bypasses the limit and the filters, so the
    /// error is always reported.
    pub fn add_fatal(&mut self, source: &str, diag: Diagnostic) -> ErrorGuaranteed {
        let (line, column) = match diag.primary_span() {
            Some(span) => self.table.offset_to_line_col(source, span.start),
            None => (1, 1),
        };
        self.error_count += 1;
        self.push(diag, line, column);
        ErrorGuaranteed::new()
    }

    pub fn extend(&mut self, source: &str, diags: impl IntoIterator<Item = Diagnostic>) {
        for diag in diags {
            self.add(source, diag);
        }
    }

    fn push(&mut self, diagnostic: Diagnostic, line: u32, column: u32) {
        let seq = self.diagnostics.len();
        self.diagnostics.push(QueuedDiagnostic {
            diagnostic,
            line,
            column,
            seq,
        });
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Diagnostics dropped by the limit, dedup or follow-on filters.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    /// `Some` if at least one error was kept.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Sorted diagnostics; the queue is left empty.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.line, d.column, d.seq));
        self.error_count = 0;
        self.warning_count = 0;
        self.last_syntax_line = None;
        self.last_error = None;
        self.limit_reported = false;
        self.diagnostics.drain(..).map(|d| d.diagnostic).collect()
    }

    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|d| &d.diagnostic)
    }

    fn is_follow_on(diag: &Diagnostic) -> bool {
        diag.is_error() && diag.message.contains("<error>")
    }

    fn is_duplicate(&self, diag: &Diagnostic, line: u32) -> bool {
        if !diag.is_error() {
            return false;
        }
        if diag.code.is_parser_error() {
            return self.last_syntax_line == Some(line);
        }
        matches!(
            self.last_error,
            Some((last_line, last_hash))
                if last_line == line && message_prefix_hash(&diag.message) == last_hash
        )
    }
}

/// "Too many errors" diagnostic appended once when the limit is hit.
#[cold]
pub fn too_many_errors(limit: usize, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9002)
        .with_message(format!("aborting after {limit} errors"))
        .with_label(span, "error limit reached here")
}

#[cfg(test)]
mod tests;
