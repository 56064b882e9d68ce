//! Nar type checker: constraint-based Hindley-Milner inference with
//! row-polymorphic records and numeric literals, plus pattern coverage.
//!
//! Upstream builds a [`program::Program`] of modules and definitions whose
//! nodes carry fresh type variables. [`check`] solves every definition and
//! then proves each pattern match exhaustive and free of redundant cases.
//!
//! # Architecture
//!
//! - [`ty`]: Type representation (`Ty`, `TypeVar`, `DataTy`, `RecordTy`)
//! - [`equation`]: Type equations with their best source location
//! - [`solve`]: Per-definition solving context built on union-find groups
//! - [`solver`]: On-demand definition solving and instantiation
//! - [`expr`], [`pattern`], [`definition`], [`program`]: The typed tree
//! - [`exhaustiveness`]: Maranget usefulness for coverage checking
//! - [`emit`]: Operation order handed to the bytecode generator
//! - [`error`], [`diagnostics`]: Type errors and their rendering
//! - [`trace`]: Optional record of every solver step

pub mod definition;
pub mod diagnostics;
pub mod emit;
pub mod equation;
pub mod error;
pub mod exhaustiveness;
pub mod expr;
pub mod pattern;
pub mod program;
pub mod solve;
pub mod solver;
pub mod trace;
pub mod ty;

mod collect;

use crate::definition::DefinitionState;
use crate::diagnostics::{render_diagnostic, DiagnosticOptions};
use crate::error::TypeError;
use crate::program::Program;
use crate::solver::Solver;
use crate::trace::SolveTrace;

/// Options for a [`check`] run.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// Record every solver step into [`TypeckResult::trace`].
    pub trace: bool,
}

/// The result of checking a program.
///
/// Types are written back into the program itself; this holds what was
/// found along the way.
#[derive(Debug, Default)]
pub struct TypeckResult {
    /// Errors in the order they were found.
    pub errors: Vec<TypeError>,
    pub trace: Option<SolveTrace>,
}

impl TypeckResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render every error as a diagnostic.
    pub fn render_errors(&self, source: &str, filename: &str, options: &DiagnosticOptions) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| render_diagnostic(err, source, filename, options))
            .collect()
    }
}

/// Type-check every module of `program`, in order.
///
/// Each module's definitions are solved first (a failing definition does
/// not stop its siblings), then the patterns of each typed definition are
/// checked for coverage.
pub fn check(program: &mut Program, options: &CheckOptions) -> TypeckResult {
    let mut errors = Vec::new();
    let modules: Vec<Vec<_>> = program
        .modules()
        .iter()
        .map(|m| m.definitions.clone())
        .collect();

    let mut solver = Solver::new(program).with_trace(options.trace);
    for definitions in &modules {
        for &id in definitions {
            let pending = solver
                .program()
                .definition(id)
                .is_some_and(|d| d.state() == DefinitionState::Pending);
            if !pending {
                continue;
            }
            if let Err(err) = solver.solve(id) {
                errors.push(err);
            }
        }

        for &id in definitions {
            if let Some(def) = solver.program().definition(id) {
                errors.extend(exhaustiveness::check_definition(def));
            }
        }
    }

    let (nested, trace) = solver.finish();
    errors.extend(nested);
    TypeckResult { errors, trace }
}
