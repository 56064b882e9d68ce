//! Builders shared by the integration tests.
//!
//! There is no parser in this crate, so tests assemble typed trees by hand
//! the way the name-resolution pass would.

#![allow(dead_code)]

use nar_common::{FileId, Location};
use nar_typeck::error::TypeError;
use nar_typeck::expr::{Expr, SelectCase};
use nar_typeck::pattern::Pattern;
use nar_typeck::program::{DefId, ModuleId, Program};
use nar_typeck::solve::SolvingContext;
use nar_typeck::ty::Ty;
use nar_typeck::{check, CheckOptions, TypeckResult};

pub const MAIN: &str = "Main";

pub fn loc(start: u32, end: u32) -> Location {
    Location::new(FileId(0), start, end)
}

pub fn at() -> Location {
    loc(0, 0)
}

/// A program under construction with a `Main` module and the Bool options.
pub struct Session {
    pub program: Program,
    pub main: ModuleId,
    pub true_def: DefId,
    pub false_def: DefId,
}

impl Session {
    pub fn new() -> Self {
        let mut program = Program::new();
        let basics = program.add_module("Nar.Base.Basics", at());
        let true_def = program.add_definition(basics, "True", at());
        let false_def = program.add_definition(basics, "False", at());
        for id in [true_def, false_def] {
            program
                .definition_mut(id)
                .expect("definition was just added")
                .set_declared(Ty::bool());
        }
        let main = program.add_module(MAIN, at());
        Session {
            program,
            main,
            true_def,
            false_def,
        }
    }

    /// Add a definition to `Main` whose body is built later with [`Session::fill`].
    pub fn reserve(&mut self, name: &str) -> DefId {
        self.program.add_definition(self.main, name, at())
    }

    pub fn declare(&mut self, id: DefId, ty: Ty) {
        self.program
            .definition_mut(id)
            .expect("reserved definition")
            .set_declared(ty);
    }

    /// Build params and body against the definition's own context.
    pub fn fill(&mut self, id: DefId, build: impl FnOnce(&mut SolvingContext) -> (Vec<Pattern>, Expr)) {
        let ctx = self.program.context_mut(id).expect("unsolved definition");
        let (params, body) = build(ctx);
        let def = self.program.definition_mut(id).expect("reserved definition");
        def.set_params(params);
        def.set_body(body);
    }

    pub fn define(&mut self, name: &str, build: impl FnOnce(&mut SolvingContext) -> (Vec<Pattern>, Expr)) -> DefId {
        let id = self.reserve(name);
        self.fill(id, build);
        id
    }

    pub fn check(&mut self) -> TypeckResult {
        check(&mut self.program, &CheckOptions::default())
    }

    pub fn ty_of(&self, id: DefId) -> String {
        self.program
            .definition(id)
            .expect("definition exists")
            .ty()
            .to_string()
    }
}

/// `Main.name` as an expression.
pub fn global(ctx: &mut SolvingContext, name: &str, id: DefId) -> Expr {
    Expr::global(ctx, at(), MAIN, name, Some(id))
}

/// A reference to the local bound by `binder`.
pub fn local(ctx: &mut SolvingContext, name: &str, binder: &Pattern) -> Expr {
    let ty = binder.binding(name).cloned();
    Expr::local(ctx, at(), name, ty)
}

pub fn apply(ctx: &mut SolvingContext, func: Expr, args: Vec<Expr>) -> Expr {
    Expr::apply(ctx, at(), func, args).expect("argument count is small")
}

pub fn case(pattern: Pattern, body: Expr) -> SelectCase {
    SelectCase {
        location: pattern.location,
        pattern,
        body,
    }
}

pub fn assert_no_errors(result: &TypeckResult) {
    assert!(
        result.errors.is_empty(),
        "expected no errors, got: {:?}",
        result.errors
    );
}

pub fn assert_has_error<F: Fn(&TypeError) -> bool>(result: &TypeckResult, pred: F, desc: &str) {
    assert!(
        result.errors.iter().any(pred),
        "expected error matching `{}`, got errors: {:?}",
        desc,
        result.errors
    );
}

/// Missing patterns of the first non-exhaustive error.
pub fn missing_patterns(result: &TypeckResult) -> Vec<String> {
    result
        .errors
        .iter()
        .find_map(|e| match e {
            TypeError::NonExhaustive { missing, .. } => Some(missing.clone()),
            _ => None,
        })
        .unwrap_or_default()
}
