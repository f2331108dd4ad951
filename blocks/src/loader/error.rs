use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// Load errors with source location information.
#[derive(Debug, Clone)]
pub struct LoadError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl LoadError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        LoadError {
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    /// Locate a serde_json error (1-based line/column) in the source.
    pub fn from_json(error: &serde_json::Error, source: &str, file_id: usize) -> Self {
        let offset = line_column_to_offset(source, error.line(), error.column());
        let end = (offset + 1).min(source.len());
        LoadError::error(format!("invalid program: {}", error), offset..end, file_id)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

fn line_column_to_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_point_into_the_source() {
        let source = "{\n  \"workspaces\": [,]\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let load = LoadError::from_json(&err, source, 3);
        assert_eq!(load.file_id, 3);
        // The offending comma sits on the second line.
        assert_eq!(source[..load.span.start].matches('\n').count(), 1);
        assert!(load.message.contains("line 2"));
    }

    #[test]
    fn offsets_clamp_to_source() {
        assert_eq!(line_column_to_offset("ab", 5, 5), 2);
        assert_eq!(line_column_to_offset("ab\ncd", 2, 2), 4);
    }
}
