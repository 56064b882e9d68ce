//! Definition solver.
//!
//! Solves definitions on demand and at most once. Undeclared definitions
//! that refer to each other form a recursive group and share one solving
//! context, so every call site constrains the same variables. Inside the
//! group a reference gets the member's current type variable instead of
//! a recursive solve.

use nar_common::Location;
use rustc_hash::FxHashSet;

use crate::collect::Collector;
use crate::definition::{DefinitionParts, DefinitionState};
use crate::error::TypeError;
use crate::program::{DefId, Program};
use crate::solve::SolvingContext;
use crate::trace::SolveTrace;
use crate::ty::Ty;

pub struct Solver<'p> {
    program: &'p mut Program,
    stack: Vec<DefId>,
    errors: Vec<TypeError>,
    trace: Option<SolveTrace>,
}

impl<'p> Solver<'p> {
    pub fn new(program: &'p mut Program) -> Self {
        Solver {
            program,
            stack: Vec::new(),
            errors: Vec::new(),
            trace: None,
        }
    }

    /// Record every processed equation into a [`SolveTrace`].
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled.then(SolveTrace::default);
        self
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    /// Errors of definitions solved on demand while solving others.
    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub(crate) fn report(&mut self, error: TypeError) {
        self.errors.push(error);
    }

    pub fn finish(self) -> (Vec<TypeError>, Option<SolveTrace>) {
        (self.errors, self.trace)
    }

    fn summary(&self, id: DefId) -> Result<(DefinitionState, Ty, Location), TypeError> {
        let def = self
            .program
            .definition(id)
            .ok_or_else(|| TypeError::internal(format!("unknown definition {}", id.0), Location::default()))?;
        Ok((def.state(), def.ty().clone(), def.location()))
    }

    /// Solve a definition and return its canonical type.
    ///
    /// Solving a typed definition again returns the same type without
    /// doing any work. Undeclared definitions that reach each other are
    /// solved together, in the context of the first one.
    pub fn solve(&mut self, id: DefId) -> Result<Ty, TypeError> {
        let (state, ty, location) = self.summary(id)?;
        match state {
            DefinitionState::Typed => return Ok(ty),
            DefinitionState::Failed => {
                return Err(TypeError::UnresolvedReference {
                    name: self.program.full_name(id),
                    location,
                })
            }
            DefinitionState::Pending => {}
        }
        if self.stack.contains(&id) {
            return Ok(ty);
        }

        let members = self.recursive_group(id);
        let mut group = Vec::with_capacity(members.len());
        for &member in &members {
            match self.program.definition_mut(member).and_then(|d| d.parts.take()) {
                Some(parts) => group.push(parts),
                None => {
                    self.restore(&members, group, None);
                    return Err(TypeError::internal("definition body is missing", location));
                }
            }
        }

        let depth = self.stack.len();
        self.stack.extend(&members);
        let result = self.solve_group(&members, &mut group);
        self.stack.truncate(depth);

        self.restore(&members, group, result.as_ref().ok().map(Vec::as_slice));
        result.and_then(|types| {
            types
                .into_iter()
                .next()
                .ok_or_else(|| TypeError::internal("recursive group solved to nothing", location))
        })
    }

    /// Hand parts back to their definitions and settle them when `types`
    /// is known. Members without parts are left untouched.
    fn restore(&mut self, members: &[DefId], group: Vec<DefinitionParts>, types: Option<&[Ty]>) {
        let settled = group.len() == members.len();
        for (index, (&member, parts)) in members.iter().zip(group).enumerate() {
            let Some(def) = self.program.definition_mut(member) else {
                continue;
            };
            def.parts = Some(parts);
            if settled {
                def.settle(types.and_then(|types| types.get(index).cloned()));
            }
        }
    }

    fn solve_group(&mut self, members: &[DefId], group: &mut [DefinitionParts]) -> Result<Vec<Ty>, TypeError> {
        let mut heads = Vec::with_capacity(members.len());
        for &member in members {
            let def = self
                .program
                .definition(member)
                .ok_or_else(|| TypeError::internal("definition vanished while solving", Location::default()))?;
            heads.push((def.declared().cloned(), def.ty().clone(), def.location()));
        }

        let Some((first, rest)) = group.split_first_mut() else {
            return Err(TypeError::internal("empty recursive group", Location::default()));
        };
        first.ctx.set_tracing(self.trace.is_some());
        for other in rest.iter() {
            first.ctx.adopt(&other.ctx);
        }

        let mut collector = Collector::new(self, &mut first.ctx);
        let bodies = std::iter::once((&first.params, &first.body)).chain(rest.iter().map(|p| (&p.params, &p.body)));
        for ((declared, def_ty, location), (params, body)) in heads.iter().zip(bodies) {
            collector.definition(def_ty, declared.as_ref(), params, body.as_ref(), *location)?;
        }
        let equations = collector.finish();

        let solved = first.ctx.insert_all(equations);
        let mut subst = first.ctx.substitution();
        self.drain_trace(members[0], &mut first.ctx);
        solved?;

        let mut types = Vec::with_capacity(heads.len());
        for (_, def_ty, _) in &heads {
            types.push(def_ty.map_to(&mut subst)?);
        }
        for parts in group.iter_mut() {
            for param in &mut parts.params {
                param.map_types(&mut subst)?;
            }
            if let Some(body) = &mut parts.body {
                body.map_types(&mut subst)?;
            }
        }
        self.program.record_annotations(subst.into_successors());
        Ok(types)
    }

    /// `id` followed by every open definition it reaches that also reaches
    /// it back.
    fn recursive_group(&self, id: DefId) -> Vec<DefId> {
        let mut members = vec![id];
        for other in self.reachable(id) {
            if other != id && self.reachable(other).contains(&id) {
                members.push(other);
            }
        }
        members
    }

    fn reachable(&self, from: DefId) -> Vec<DefId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut pending = vec![from];
        while let Some(current) = pending.pop() {
            let Some(def) = self.program.definition(current) else {
                continue;
            };
            for next in def.references() {
                if self.is_open(next) && seen.insert(next) {
                    order.push(next);
                    pending.push(next);
                }
            }
        }
        order
    }

    /// Whether a reference to `id` has to be solved with its referrer:
    /// still pending, undeclared and not already being solved.
    fn is_open(&self, id: DefId) -> bool {
        self.program.definition(id).is_some_and(|d| {
            d.state() == DefinitionState::Pending
                && d.declared().is_none()
                && d.parts.is_some()
                && !self.stack.contains(&id)
        })
    }

    fn drain_trace(&mut self, id: DefId, ctx: &mut SolvingContext) {
        let Some(trace) = &mut self.trace else {
            return;
        };
        let name = self.program.full_name(id);
        for mut step in ctx.take_steps() {
            step.definition = name.clone();
            trace.steps.push(step);
        }
    }

    /// The type a reference site sees for `target`.
    ///
    /// Declared types win, then the solved type (solving on demand). Both
    /// are instantiated into `ctx`. A definition still on the visiting
    /// stack is returned as is, which is what lets recursion terminate.
    pub(crate) fn unique_type(&mut self, target: DefId, ctx: &mut SolvingContext, location: Location) -> Result<Ty, TypeError> {
        let (state, current, _) = self.summary(target)?;
        let declared = self
            .program
            .definition(target)
            .and_then(|d| d.declared().cloned());
        if let Some(declared) = declared {
            return Ok(ctx.instantiate(&declared));
        }

        let ty = match state {
            DefinitionState::Typed => current,
            DefinitionState::Failed => {
                return Err(TypeError::UnresolvedReference {
                    name: self.program.full_name(target),
                    location,
                })
            }
            DefinitionState::Pending if self.stack.contains(&target) => return Ok(current),
            DefinitionState::Pending => match self.solve(target) {
                Ok(ty) => ty,
                Err(err) => {
                    self.report(err);
                    return Err(TypeError::UnresolvedReference {
                        name: self.program.full_name(target),
                        location,
                    });
                }
            },
        };
        Ok(ctx.instantiate(&ty))
    }
}
