//! Rendering of errors found by a full check, and the solver trace.

mod support;

use nar_common::ConstValue;
use nar_typeck::diagnostics::DiagnosticOptions;
use nar_typeck::error::TypeError;
use nar_typeck::expr::Expr;
use nar_typeck::trace::SolveAction;
use nar_typeck::ty::Ty;
use nar_typeck::{check, CheckOptions};

use support::*;

const SOURCE: &str = "def bad: Int = \"s\"";

/// `def bad: Int = "s"`, with the literal at 15..18.
fn mismatched() -> Session {
    let mut s = Session::new();
    let bad = s.reserve("bad");
    s.declare(bad, Ty::int());
    s.fill(bad, |ctx| {
        let text = Expr::constant(ctx, loc(15, 18), ConstValue::String("s".into()));
        (vec![], text)
    });
    s
}

#[test]
fn mismatch_renders_as_text() {
    let mut s = mismatched();
    let result = s.check();
    assert!(result.has_errors());
    assert!(matches!(result.errors[0], TypeError::TypeMismatch { .. }));

    let rendered = result.render_errors(SOURCE, "main.nar", &DiagnosticOptions::colorless());
    assert_eq!(rendered.len(), 1);
    let text = &rendered[0];
    assert!(text.contains("E0001"), "{}", text);
    assert!(text.contains("cannot match"), "{}", text);
    assert!(text.contains("Nar.Base.Math.Int"), "{}", text);
    assert!(text.contains("Nar.Base.String.String"), "{}", text);
}

#[test]
fn mismatch_renders_as_json() {
    let mut s = mismatched();
    let result = s.check();
    let rendered = result.render_errors(SOURCE, "main.nar", &DiagnosticOptions::json_mode());
    let parsed: serde_json::Value = serde_json::from_str(&rendered[0]).unwrap();

    assert_eq!(parsed["code"], "E0001");
    assert_eq!(parsed["severity"], "error");
    assert_eq!(parsed["file"], "main.nar");
    assert_eq!(parsed["spans"][0]["start"], 15);
    assert_eq!(parsed["spans"][0]["end"], 18);
    assert_eq!(parsed["spans"][0]["line"], 1);
    assert_eq!(parsed["spans"][0]["column"], 16);
    assert!(parsed.get("help").is_none());
}

#[test]
fn trace_is_off_by_default() {
    let mut s = mismatched();
    assert!(s.check().trace.is_none());
}

#[test]
fn trace_records_the_failing_step() {
    let mut s = mismatched();
    let result = check(&mut s.program, &CheckOptions { trace: true });
    let trace = result.trace.expect("tracing was requested");

    let steps: Vec<_> = trace.for_definition("Main.bad").collect();
    assert!(!steps.is_empty());
    assert!(steps
        .iter()
        .any(|step| matches!(step.action, SolveAction::Error { .. })));
    assert!(steps.windows(2).all(|w| w[0].step < w[1].step));

    let json = trace.to_json().unwrap();
    assert!(json.contains("specialize"), "{}", json);
    assert!(json.contains("Main.bad"), "{}", json);
}

#[test]
fn trace_covers_dependencies() {
    let mut s = Session::new();
    let inner = s.define("inner", |ctx| (vec![], Expr::constant(ctx, at(), ConstValue::Char('c'))));
    s.define("outer", |ctx| (vec![], global(ctx, "inner", inner)));

    let result = check(&mut s.program, &CheckOptions { trace: true });
    assert_no_errors(&result);
    let trace = result.trace.expect("tracing was requested");
    assert!(trace.for_definition("Main.inner").next().is_some());
    assert!(trace.for_definition("Main.outer").next().is_some());
    assert!(trace
        .for_definition("Nar.Base.Basics.True")
        .any(|step| step.action == SolveAction::Specialize));
}

#[test]
fn json_positions_count_lines() {
    let source = "def ok: Int = 1\ndef bad: Int = \"s\"";
    let err = TypeError::NotNumeric {
        ty: Ty::string(),
        location: loc(31, 34),
    };
    let out = nar_typeck::diagnostics::render_diagnostic(&err, source, "main.nar", &DiagnosticOptions::json_mode());
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["spans"][0]["line"], 2);
    assert_eq!(parsed["spans"][0]["column"], 16);
}
