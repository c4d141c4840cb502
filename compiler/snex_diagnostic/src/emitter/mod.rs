//! Human-readable diagnostic output.
//!
//! The terminal emitter renders `file:line:col`, the offending source line
//! and a caret underline, with optional ANSI colors.

use std::io::{self, Write};
use std::sync::Arc;

use crate::span_utils::LineOffsetTable;
use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const INFO: &str = "\x1b[1;36m";
    pub const HELP: &str = "\x1b[1;32m";
    pub const BOLD: &str = "\x1b[1m";
    pub const SECONDARY: &str = "\x1b[1;34m";
    pub const RESET: &str = "\x1b[0m";
}

#[inline]
fn plural_s(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Color output mode for terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Trait for emitting diagnostics.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic);

    fn emit_all(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            self.emit(diag);
        }
    }

    fn flush(&mut self);

    /// Emit a summary of errors/warnings.
    fn emit_summary(&mut self, error_count: usize, warning_count: usize);
}

/// Terminal emitter bound to one source file.
pub struct TerminalEmitter<'src, W: Write> {
    writer: W,
    colors: bool,
    file: Arc<str>,
    source: &'src str,
    table: LineOffsetTable,
}

impl<'src, W: Write> TerminalEmitter<'src, W> {
    pub fn new(writer: W, mode: ColorMode, is_tty: bool, file: &str, source: &'src str) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
            file: Arc::from(file),
            source,
            table: LineOffsetTable::build(source),
        }
    }

    /// Consume the emitter and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_colored(&mut self, text: &str, color: &str) {
        if self.colors {
            let _ = write!(self.writer, "{color}{text}{}", colors::RESET);
        } else {
            let _ = write!(self.writer, "{text}");
        }
    }

    fn severity_color(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Info => colors::INFO,
        }
    }

    fn write_snippet(&mut self, start: u32, end: u32, primary: bool, message: &str) {
        let (line, column) = self.table.offset_to_line_col(self.source, start);
        let Some(text) = self.table.line_text(self.source, line) else {
            return;
        };
        let gutter = line.to_string();
        let pad = " ".repeat(gutter.len());
        let _ = writeln!(self.writer, "{pad} |");
        let _ = writeln!(self.writer, "{gutter} | {text}");

        let line_chars = text.chars().count() as u32;
        let start_col = column.saturating_sub(1).min(line_chars);
        let (_, end_col) = self.table.offset_to_line_col(self.source, end);
        let width = end_col
            .saturating_sub(column)
            .max(1)
            .min(line_chars.saturating_sub(start_col).max(1));
        let marker = if primary { "^" } else { "-" };
        let underline = marker.repeat(width as usize);
        let _ = write!(
            self.writer,
            "{pad} | {}",
            " ".repeat(start_col as usize)
        );
        let color = if primary { colors::ERROR } else { colors::SECONDARY };
        self.write_colored(&format!("{underline} {message}"), color);
        let _ = writeln!(self.writer);
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<'_, W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        let color = Self::severity_color(diagnostic.severity);
        self.write_colored(&diagnostic.severity.to_string(), color);
        if self.colors {
            let _ = write!(
                self.writer,
                "{}[{}]{}",
                colors::BOLD,
                diagnostic.code,
                colors::RESET
            );
        } else {
            let _ = write!(self.writer, "[{}]", diagnostic.code);
        }
        let _ = writeln!(self.writer, ": {}", diagnostic.message);

        if let Some(span) = diagnostic.primary_span() {
            let (line, column) = self.table.offset_to_line_col(self.source, span.start);
            let _ = writeln!(self.writer, "  --> {}:{line}:{column}", self.file);
        }

        for label in &diagnostic.labels {
            self.write_snippet(label.span.start, label.span.end, label.is_primary, &label.message);
        }

        for note in &diagnostic.notes {
            let _ = writeln!(self.writer, "  = note: {note}");
        }

        for suggestion in &diagnostic.suggestions {
            let _ = write!(self.writer, "  = ");
            self.write_colored("help", colors::HELP);
            let _ = writeln!(self.writer, ": {suggestion}");
        }

        let _ = writeln!(self.writer);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        if error_count > 0 {
            self.write_colored("error", colors::ERROR);
            let _ = writeln!(
                self.writer,
                ": aborting due to {error_count} error{}; {warning_count} warning{} emitted",
                plural_s(error_count),
                plural_s(warning_count)
            );
        } else if warning_count > 0 {
            self.write_colored("warning", colors::WARNING);
            let _ = writeln!(
                self.writer,
                ": {warning_count} warning{} emitted",
                plural_s(warning_count)
            );
        }
    }
}

/// Render diagnostics to a string without colors.
pub fn render_plain(file: &str, source: &str, diagnostics: &[Diagnostic]) -> String {
    let mut emitter = TerminalEmitter::new(Vec::new(), ColorMode::Never, false, file, source);
    emitter.emit_all(diagnostics);
    String::from_utf8_lossy(&emitter.into_inner()).into_owned()
}

/// Stderr emitter, colors when `is_tty`.
pub fn stderr<'src>(file: &str, source: &'src str, is_tty: bool) -> TerminalEmitter<'src, io::Stderr> {
    TerminalEmitter::new(io::stderr(), ColorMode::Auto, is_tty, file, source)
}

#[cfg(test)]
mod tests;
