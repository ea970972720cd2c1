use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// Malformed template syntax, with the byte span inside the syntax text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    pub message: String,
    /// Name of the template being compiled.
    pub template: String,
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl GrammarError {
    pub fn new(message: impl Into<String>, template: impl Into<String>, span: Range<usize>) -> Self {
        GrammarError {
            message: message.into(),
            template: template.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic against the template's syntax text.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(format!("template `{}`: {}", self.template, self.message))
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "template `{}`: {} (at {}..{})",
            self.template, self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for GrammarError {}

/// A quoted string in an input line was opened and never closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    /// From the opening quote to the end of the line.
    pub span: Range<usize>,
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unterminated quoted string starting at byte {}", self.span.start)
    }
}

impl std::error::Error for TokenizeError {}

/// A typed accessor could not produce the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    Invalid { text: String, target: &'static str },
    OutOfRange { text: String, target: &'static str },
    MissingArgument(usize),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Invalid { text, target } => {
                write!(f, "cannot convert \"{}\" to {}", text, target)
            }
            ConversionError::OutOfRange { text, target } => {
                write!(f, "\"{}\" is out of range for {}", text, target)
            }
            ConversionError::MissingArgument(idx) => {
                write!(f, "argument index {} out of bounds", idx)
            }
        }
    }
}

impl std::error::Error for ConversionError {}
