use std::fmt;

use nar_common::Location;

use crate::expr::{Expr, ExprKind, UpdateTarget};
use crate::pattern::{Pattern, PatternKind};
use crate::program::{DefId, ModuleId};
use crate::solve::SolvingContext;
use crate::ty::Ty;

/// Where a definition is in its solving lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DefinitionState {
    Pending,
    Typed,
    /// Solving failed; references report an unresolved reference.
    Failed,
}

/// The pieces of a definition the solver takes out while solving it.
#[derive(Debug)]
pub(crate) struct DefinitionParts {
    pub params: Vec<Pattern>,
    pub body: Option<Expr>,
    pub ctx: SolvingContext,
}

/// A top-level (or lambda-lifted) definition.
#[derive(Debug)]
pub struct Definition {
    id: DefId,
    module: ModuleId,
    name: String,
    location: Location,
    name_location: Location,
    hidden: bool,
    declared: Option<Ty>,
    /// A variable of the definition's own context until solved, then the
    /// generalized canonical type.
    ty: Ty,
    state: DefinitionState,
    /// `None` only while the definition is being solved.
    pub(crate) parts: Option<DefinitionParts>,
}

impl Definition {
    pub(crate) fn new(id: DefId, module: ModuleId, name: String, location: Location, mut ctx: SolvingContext) -> Self {
        let ty = ctx.fresh_var(location);
        Definition {
            id,
            module,
            name,
            location,
            name_location: location,
            hidden: false,
            declared: None,
            ty,
            state: DefinitionState::Pending,
            parts: Some(DefinitionParts {
                params: Vec::new(),
                body: None,
                ctx,
            }),
        }
    }

    pub fn id(&self) -> DefId {
        self.id
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn name_location(&self) -> Location {
        self.name_location
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn declared(&self) -> Option<&Ty> {
        self.declared.as_ref()
    }

    /// Canonical type once typed.
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    pub fn state(&self) -> DefinitionState {
        self.state
    }

    pub fn is_typed(&self) -> bool {
        self.state == DefinitionState::Typed
    }

    pub fn params(&self) -> &[Pattern] {
        match &self.parts {
            Some(parts) => &parts.params,
            None => &[],
        }
    }

    pub fn body(&self) -> Option<&Expr> {
        self.parts.as_ref().and_then(|p| p.body.as_ref())
    }

    /// Definitions referenced by name from the params or body, in order of
    /// appearance. Repeats are kept.
    pub fn references(&self) -> Vec<DefId> {
        let mut found = Vec::new();
        for param in self.params() {
            pattern_references(param, &mut found);
        }
        if let Some(body) = self.body() {
            body.walk(&mut |expr| match &expr.kind {
                ExprKind::Global {
                    definition: Some(id),
                    ..
                }
                | ExprKind::Update {
                    target:
                        UpdateTarget::Global {
                            definition: Some(id),
                            ..
                        },
                    ..
                } => found.push(*id),
                ExprKind::Let { pattern, .. } => pattern_references(pattern, &mut found),
                ExprKind::Select { cases, .. } => {
                    for case in cases {
                        pattern_references(&case.pattern, &mut found);
                    }
                }
                _ => {}
            });
        }
        found
    }

    pub fn context_mut(&mut self) -> Option<&mut SolvingContext> {
        self.parts.as_mut().map(|p| &mut p.ctx)
    }

    pub fn set_name_location(&mut self, location: Location) {
        self.name_location = location;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// The user-written type. Build it with this definition's context.
    pub fn set_declared(&mut self, ty: Ty) {
        self.declared = Some(ty);
    }

    pub fn set_params(&mut self, params: Vec<Pattern>) {
        if let Some(parts) = self.parts.as_mut() {
            parts.params = params;
        }
    }

    pub fn set_body(&mut self, body: Expr) {
        if let Some(parts) = self.parts.as_mut() {
            parts.body = Some(body);
        }
    }

    pub(crate) fn settle(&mut self, result: Option<Ty>) {
        match result {
            Some(ty) => {
                self.ty = ty;
                self.state = DefinitionState::Typed;
            }
            None => self.state = DefinitionState::Failed,
        }
    }
}

fn pattern_references(pattern: &Pattern, found: &mut Vec<DefId>) {
    pattern.walk(&mut |p| {
        if let PatternKind::Option {
            definition: Some(id),
            ..
        } = &p.kind
        {
            found.push(*id);
        }
    });
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def {}", self.name)?;
        let params = self.params();
        if !params.is_empty() {
            write!(f, "(")?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")?;
        }
        if let Some(declared) = &self.declared {
            write!(f, ": {}", declared)?;
        }
        if let Some(body) = self.body() {
            write!(f, " = {}", body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nar_common::{ConstValue, Location};

    use crate::expr::{Expr, SelectCase};
    use crate::pattern::Pattern;
    use crate::program::{DefId, Program};

    #[test]
    fn references_cover_params_and_nested_patterns() {
        let mut program = Program::new();
        let main = program.add_module("Main", Location::default());
        let yes = program.add_definition(main, "Yes", Location::default());
        let helper = program.add_definition(main, "helper", Location::default());
        let f = program.add_definition(main, "f", Location::default());

        let loc = Location::default();
        let ctx = program.context_mut(f).unwrap();
        let param = Pattern::option(ctx, loc, "Yes", Some(yes), vec![]).unwrap();
        let condition = Expr::global(ctx, loc, "Main", "helper", Some(helper));
        let arm = Pattern::option(ctx, loc, "Yes", Some(yes), vec![]).unwrap();
        let body = Expr::constant(ctx, loc, ConstValue::Unit);
        let select = Expr::select(
            ctx,
            loc,
            condition,
            vec![SelectCase {
                location: loc,
                pattern: arm,
                body,
            }],
        );
        let def = program.definition_mut(f).unwrap();
        def.set_params(vec![param]);
        def.set_body(select);

        let refs = program.definition(f).unwrap().references();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs.iter().filter(|&&id| id == yes).count(), 2);
        assert!(refs.contains(&helper));
        assert!(!refs.contains(&DefId(99)));
    }
}
