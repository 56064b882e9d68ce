//! Ariadne-based diagnostic rendering for type errors.
//!
//! Each `TypeError` variant has a stable code, a labelled primary span and,
//! where one applies, a short help line. JSON mode prints the same content
//! as a single line for editors and build tools.

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use nar_common::LineIndex;
use serde::Serialize;

use crate::error::TypeError;

/// Controls diagnostic output format.
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

impl DiagnosticOptions {
    /// Plain text without ANSI escapes, for tests and logs.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// Assign a unique error code to each TypeError variant.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::TypeMismatch { .. } => "E0001",
        TypeError::MissingField { .. } => "E0002",
        TypeError::ConstraintViolation { .. } => "E0003",
        TypeError::NotNumeric { .. } => "E0004",
        TypeError::InfiniteType { .. } => "E0005",
        TypeError::UnresolvedLocal { .. } => "E0006",
        TypeError::UnresolvedDefinition { .. } => "E0007",
        TypeError::UnresolvedReference { .. } => "E0008",
        TypeError::FailedToInfer { .. } => "E0009",
        TypeError::TooManyArguments { .. } => "E0010",
        TypeError::NonExhaustive { .. } => "E0011",
        TypeError::RedundantPattern { .. } => "E0012",
        TypeError::Internal { .. } => "E0999",
    }
}

fn label_message(err: &TypeError) -> String {
    match err {
        TypeError::TypeMismatch {
            expected, found, ..
        } => format!("expected `{}`, found `{}`", expected, found),
        TypeError::MissingField { field, .. } => format!("`{}` is required here", field),
        TypeError::ConstraintViolation { left, right, .. } => {
            format!("`{}` and `{}` constraints meet here", left, right)
        }
        TypeError::NotNumeric { ty, .. } => format!("`{}` is not numeric", ty),
        TypeError::InfiniteType { .. } => "recursive type here".to_string(),
        TypeError::UnresolvedLocal { name, .. } => format!("`{}` is not in scope", name),
        TypeError::UnresolvedDefinition { name, .. } | TypeError::UnresolvedReference { name, .. } => {
            format!("`{}` referenced here", name)
        }
        TypeError::FailedToInfer { .. } => "type unknown".to_string(),
        TypeError::TooManyArguments { count, .. } => format!("{} given", count),
        TypeError::NonExhaustive { .. } => "not every value is matched".to_string(),
        TypeError::RedundantPattern { .. } => "this case is never reached".to_string(),
        TypeError::Internal { .. } => "while checking this".to_string(),
    }
}

fn help(err: &TypeError) -> Option<String> {
    match err {
        TypeError::InfiniteType { .. } => {
            Some("a value cannot have a type that refers to itself".to_string())
        }
        TypeError::NotNumeric { .. } => Some("only `Int` and `Float` are numeric".to_string()),
        TypeError::FailedToInfer { .. } => Some("add a type annotation".to_string()),
        TypeError::TooManyArguments { .. } => Some("at most 255 are allowed".to_string()),
        TypeError::NonExhaustive { missing, .. } if !missing.is_empty() => {
            Some(format!("add cases for: {}", missing.join(", ")))
        }
        TypeError::RedundantPattern { .. } => Some("remove this case".to_string()),
        _ => None,
    }
}

// ── JSON Output ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonSpan {
    start: usize,
    end: usize,
    /// 1-based position of `start`.
    line: u32,
    column: u32,
    label: String,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'static str,
    severity: &'static str,
    message: String,
    file: &'a str,
    spans: Vec<JsonSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render a type error for `source` (the text of `filename`).
pub fn render_diagnostic(error: &TypeError, source: &str, filename: &str, options: &DiagnosticOptions) -> String {
    let source_len = source.len();
    let location = error.location();

    // Clamp to the source; ariadne needs at least one character.
    let span: Range<usize> = {
        let s = (location.start() as usize).min(source_len);
        let e = (location.end() as usize).min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let code = error_code(error);
    let message = error.to_string();
    let label = label_message(error);
    let help = help(error);

    if options.json {
        let (line, column) = LineIndex::new(source).position(span.start as u32);
        let diagnostic = JsonDiagnostic {
            code,
            severity: "error",
            message,
            file: filename,
            spans: vec![JsonSpan {
                start: span.start,
                end: span.end,
                line,
                column,
                label,
            }],
            help,
        };
        return serde_json::to_string(&diagnostic).unwrap_or_else(|_| error.to_string());
    }

    let config = Config::default()
        .with_color(options.color)
        .with_index_type(IndexType::Byte);
    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(code)
        .with_message(&message)
        .with_config(config)
        .with_label(Label::new(span).with_message(label).with_color(Color::Red));
    if let Some(help) = help {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}", code, message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Ty;
    use nar_common::{FileId, Location};

    #[test]
    fn codes_are_unique() {
        let loc = Location::default();
        let errors = [
            TypeError::FailedToInfer { location: loc },
            TypeError::RedundantPattern { location: loc },
            TypeError::NonExhaustive {
                missing: vec![],
                location: loc,
            },
            TypeError::NotNumeric {
                ty: Ty::string(),
                location: loc,
            },
        ];
        let mut codes: Vec<_> = errors.iter().map(error_code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn span_past_the_end_is_clamped() {
        let err = TypeError::FailedToInfer {
            location: Location::new(FileId(0), 40, 90),
        };
        let out = render_diagnostic(&err, "def x = y", "main.nar", &DiagnosticOptions::json_mode());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["spans"][0]["start"], 9);
        assert_eq!(parsed["spans"][0]["end"], 9);
        assert_eq!(parsed["spans"][0]["line"], 1);
        assert_eq!(parsed["spans"][0]["column"], 10);
        assert_eq!(parsed["help"], "add a type annotation");
    }
}
