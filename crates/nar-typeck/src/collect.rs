//! Equation collection.
//!
//! Walks one definition's parameters and body and emits the equations each
//! construct implies. References to other definitions are instantiated
//! through the solver, which may solve them on demand.

use nar_common::{ident, ConstValue, Location};

use crate::equation::Equation;
use crate::error::TypeError;
use crate::expr::{Expr, ExprField, ExprKind, UpdateTarget};
use crate::pattern::{Pattern, PatternKind};
use crate::program::DefId;
use crate::solve::SolvingContext;
use crate::solver::Solver;
use crate::ty::Ty;

/// Type of a literal. Integer literals get a numeric variable so context
/// decides between Int and Float.
pub(crate) fn const_type(ctx: &mut SolvingContext, value: &ConstValue, location: Location) -> Ty {
    match value {
        ConstValue::Char(_) => Ty::char(),
        ConstValue::Int(_) => ctx.number_var(location),
        ConstValue::Float(_) => Ty::float(),
        ConstValue::String(_) => Ty::string(),
        ConstValue::Unit => Ty::unit(),
    }
}

pub(crate) struct Collector<'s, 'p> {
    solver: &'s mut Solver<'p>,
    ctx: &'s mut SolvingContext,
    equations: Vec<Equation>,
}

impl<'s, 'p> Collector<'s, 'p> {
    pub(crate) fn new(solver: &'s mut Solver<'p>, ctx: &'s mut SolvingContext) -> Self {
        Collector {
            solver,
            ctx,
            equations: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Vec<Equation> {
        self.equations
    }

    fn push(&mut self, left: &Ty, right: Ty, location: Location) {
        self.equations
            .push(Equation::new(left.clone(), right, location));
    }

    fn instantiate(&mut self, target: DefId, location: Location) -> Result<Ty, TypeError> {
        self.solver.unique_type(target, self.ctx, location)
    }

    /// `def.ty ≡ T` and `declared ≡ T`, where `T` is the body type or
    /// `(params): body` when there are params.
    pub(crate) fn definition(
        &mut self,
        def_ty: &Ty,
        declared: Option<&Ty>,
        params: &[Pattern],
        body: Option<&Expr>,
        location: Location,
    ) -> Result<(), TypeError> {
        match body {
            Some(body) => {
                let value = if params.is_empty() {
                    body.ty.clone()
                } else {
                    Ty::func(params.iter().map(|p| p.ty.clone()).collect(), body.ty.clone())
                };
                self.push(def_ty, value.clone(), location);
                if let Some(declared) = declared {
                    self.push(declared, value, location);
                }
            }
            None => {
                if let Some(declared) = declared {
                    self.push(def_ty, declared.clone(), location);
                }
            }
        }

        for param in params {
            self.pattern(param)?;
        }
        if let Some(body) = body {
            self.expr(body)?;
        }
        Ok(())
    }

    // ── Patterns ────────────────────────────────────────────────────────

    fn pattern(&mut self, p: &Pattern) -> Result<(), TypeError> {
        let loc = p.location;
        match &p.kind {
            PatternKind::Alias { nested, .. } => {
                self.push(&p.ty, nested.ty.clone(), loc);
                self.pattern(nested)?;
            }
            PatternKind::Any | PatternKind::Named { .. } => {}
            PatternKind::Cons { head, tail } => {
                self.pattern(head)?;
                self.pattern(tail)?;
                self.push(&p.ty, tail.ty.clone(), loc);
                self.push(&tail.ty, Ty::list(head.ty.clone()), loc);
            }
            PatternKind::Const(value) => {
                let ty = const_type(self.ctx, value, loc);
                self.push(&p.ty, ty, loc);
            }
            PatternKind::List { items, item_ty } => {
                for item in items {
                    self.pattern(item)?;
                    self.push(item_ty, item.ty.clone(), item.location);
                }
                self.push(&p.ty, Ty::list(item_ty.clone()), loc);
            }
            PatternKind::Option {
                name,
                definition,
                args,
            } => {
                let Some(definition) = definition else {
                    return Err(TypeError::UnresolvedDefinition {
                        name: name.clone(),
                        location: loc,
                    });
                };
                let ctor = self.instantiate(*definition, loc)?;
                for arg in args {
                    self.pattern(arg)?;
                }
                if args.is_empty() {
                    self.push(&p.ty, ctor, loc);
                } else {
                    let shape = Ty::func(args.iter().map(|a| a.ty.clone()).collect(), p.ty.clone());
                    self.push(&shape, ctor, loc);
                }
            }
            PatternKind::Record { fields } => {
                let record = Ty::record(fields.iter().map(|f| (f.name.clone(), f.ty.clone())), true);
                self.push(&p.ty, record, loc);
                for field in fields {
                    if let Some(declared) = &field.declared {
                        self.push(&field.ty, declared.clone(), field.location);
                    }
                }
            }
            PatternKind::Tuple { items } => {
                for item in items {
                    self.pattern(item)?;
                }
                self.push(&p.ty, Ty::Tuple(items.iter().map(|i| i.ty.clone()).collect()), loc);
            }
        }

        if let Some(declared) = &p.declared {
            self.push(&p.ty, declared.clone(), loc);
        }
        Ok(())
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn expr(&mut self, e: &Expr) -> Result<(), TypeError> {
        let loc = e.location;
        match &e.kind {
            ExprKind::Access { record, field } => {
                self.expr(record)?;
                let shape = Ty::record([(field.clone(), e.ty.clone())], true);
                self.push(&shape, record.ty.clone(), loc);
            }
            ExprKind::Apply { func, args } => {
                self.expr(func)?;
                for arg in args {
                    self.expr(arg)?;
                }
                let shape = Ty::func(args.iter().map(|a| a.ty.clone()).collect(), e.ty.clone());
                self.push(&func.ty, shape, loc);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.expr(arg)?;
                }
            }
            ExprKind::Const(value) => {
                let ty = const_type(self.ctx, value, loc);
                self.push(&e.ty, ty, loc);
            }
            ExprKind::Constructor { data, option, args } => {
                for arg in args {
                    self.expr(arg)?;
                }
                let found = data.option(option).ok_or_else(|| {
                    TypeError::internal(format!("`{}` is not an option of `{}`", option, data.name), loc)
                })?;
                if found.values.len() != args.len() {
                    return Err(TypeError::TypeMismatch {
                        expected: Ty::func(found.values.clone(), Ty::Data(data.clone())),
                        found: Ty::func(args.iter().map(|a| a.ty.clone()).collect(), Ty::Data(data.clone())),
                        location: loc,
                    });
                }
                for (arg, value) in args.iter().zip(&found.values) {
                    self.push(&arg.ty, value.clone(), arg.location);
                }
                self.push(&e.ty, Ty::Data(data.clone()), loc);
            }
            ExprKind::Global {
                module,
                name,
                definition,
            } => {
                let Some(definition) = definition else {
                    return Err(TypeError::UnresolvedDefinition {
                        name: ident::full_identifier(module, name),
                        location: loc,
                    });
                };
                let ty = self.instantiate(*definition, loc)?;
                self.push(&e.ty, ty, loc);
            }
            ExprKind::Let {
                pattern,
                value,
                body,
            } => {
                self.pattern(pattern)?;
                self.expr(value)?;
                self.expr(body)?;
                self.push(&e.ty, body.ty.clone(), loc);
                self.push(&pattern.ty, value.ty.clone(), pattern.location);
            }
            ExprKind::List { items, item_ty } => {
                for item in items {
                    self.expr(item)?;
                    self.push(item_ty, item.ty.clone(), item.location);
                }
                self.push(&e.ty, Ty::list(item_ty.clone()), loc);
            }
            ExprKind::Local { name, target } => {
                let Some(target) = target else {
                    return Err(TypeError::UnresolvedLocal {
                        name: name.clone(),
                        location: loc,
                    });
                };
                self.push(&e.ty, target.clone(), loc);
            }
            ExprKind::Record { fields } => {
                self.fields(fields)?;
                let record = Ty::record(fields.iter().map(|f| (f.name.clone(), f.ty.clone())), false);
                self.push(&e.ty, record, loc);
            }
            ExprKind::Select { condition, cases } => {
                self.expr(condition)?;
                for case in cases {
                    self.pattern(&case.pattern)?;
                    self.expr(&case.body)?;
                    self.push(&condition.ty, case.pattern.ty.clone(), case.pattern.location);
                    self.push(&e.ty, case.body.ty.clone(), case.body.location);
                }
            }
            ExprKind::Tuple { items } => {
                for item in items {
                    self.expr(item)?;
                }
                self.push(&e.ty, Ty::Tuple(items.iter().map(|i| i.ty.clone()).collect()), loc);
            }
            ExprKind::Update { target, fields } => {
                self.fields(fields)?;
                let shape = Ty::record(fields.iter().map(|f| (f.name.clone(), f.ty.clone())), true);
                self.push(&e.ty, shape, loc);
                let original = match target {
                    UpdateTarget::Local { name, target } => target.clone().ok_or_else(|| TypeError::UnresolvedLocal {
                        name: name.clone(),
                        location: loc,
                    })?,
                    UpdateTarget::Global {
                        module,
                        name,
                        definition,
                    } => {
                        let Some(definition) = definition else {
                            return Err(TypeError::UnresolvedDefinition {
                                name: ident::full_identifier(module, name),
                                location: loc,
                            });
                        };
                        self.instantiate(*definition, loc)?
                    }
                };
                self.push(&e.ty, original, loc);
            }
        }
        Ok(())
    }

    fn fields(&mut self, fields: &[ExprField]) -> Result<(), TypeError> {
        for field in fields {
            self.expr(&field.value)?;
            self.push(&field.ty, field.value.ty.clone(), field.location);
        }
        Ok(())
    }
}
