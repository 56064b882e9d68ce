//! Typed patterns.
//!
//! Every pattern gets a fresh annotation variable when it is built and an
//! optional user-declared type. After solving, `map_types` replaces the
//! annotation with the resolved type.

use std::fmt;

use nar_common::{ConstValue, Location};

use crate::error::TypeError;
use crate::expr::MAX_ARGS;
use crate::program::{DefId, NodeId};
use crate::solve::{SolvingContext, Substitution};
use crate::ty::Ty;

#[derive(Clone, Debug)]
pub struct Pattern {
    pub location: Location,
    pub ty: Ty,
    pub declared: Option<Ty>,
    pub kind: PatternKind,
}

/// A field of a record pattern; binds a local of the same name.
#[derive(Clone, Debug)]
pub struct PatternField {
    pub name: String,
    pub location: Location,
    pub ty: Ty,
    pub declared: Option<Ty>,
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    /// `nested as name`.
    Alias { name: String, nested: Box<Pattern> },
    /// `_`.
    Any,
    /// `head | tail`.
    Cons { head: Box<Pattern>, tail: Box<Pattern> },
    Const(ConstValue),
    List { items: Vec<Pattern>, item_ty: Ty },
    Named { name: String },
    /// A data option: `Just(x)`. `definition` is the option's constructor.
    Option {
        name: String,
        definition: Option<DefId>,
        args: Vec<Pattern>,
    },
    Record { fields: Vec<PatternField> },
    Tuple { items: Vec<Pattern> },
}

impl Pattern {
    fn new(ctx: &mut SolvingContext, location: Location, kind: PatternKind) -> Self {
        Pattern {
            location,
            ty: ctx.fresh_var(location),
            declared: None,
            kind,
        }
    }

    pub fn alias(ctx: &mut SolvingContext, location: Location, name: impl Into<String>, nested: Pattern) -> Self {
        Self::new(
            ctx,
            location,
            PatternKind::Alias {
                name: name.into(),
                nested: Box::new(nested),
            },
        )
    }

    pub fn any(ctx: &mut SolvingContext, location: Location) -> Self {
        Self::new(ctx, location, PatternKind::Any)
    }

    pub fn cons(ctx: &mut SolvingContext, location: Location, head: Pattern, tail: Pattern) -> Self {
        Self::new(
            ctx,
            location,
            PatternKind::Cons {
                head: Box::new(head),
                tail: Box::new(tail),
            },
        )
    }

    pub fn constant(ctx: &mut SolvingContext, location: Location, value: ConstValue) -> Self {
        Self::new(ctx, location, PatternKind::Const(value))
    }

    pub fn list(ctx: &mut SolvingContext, location: Location, items: Vec<Pattern>) -> Self {
        let item_ty = ctx.fresh_var(location);
        Self::new(ctx, location, PatternKind::List { items, item_ty })
    }

    pub fn named(ctx: &mut SolvingContext, location: Location, name: impl Into<String>) -> Self {
        Self::new(ctx, location, PatternKind::Named { name: name.into() })
    }

    pub fn option(
        ctx: &mut SolvingContext,
        location: Location,
        name: impl Into<String>,
        definition: Option<DefId>,
        args: Vec<Pattern>,
    ) -> Result<Self, TypeError> {
        if args.len() > MAX_ARGS {
            return Err(TypeError::TooManyArguments {
                count: args.len(),
                location,
            });
        }
        Ok(Self::new(
            ctx,
            location,
            PatternKind::Option {
                name: name.into(),
                definition,
                args,
            },
        ))
    }

    /// A record pattern; each field is `(name, location, declared type)`.
    pub fn record(
        ctx: &mut SolvingContext,
        location: Location,
        fields: Vec<(String, Location, Option<Ty>)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, location, declared)| PatternField {
                name,
                location,
                ty: ctx.fresh_var(location),
                declared,
            })
            .collect();
        Self::new(ctx, location, PatternKind::Record { fields })
    }

    pub fn tuple(ctx: &mut SolvingContext, location: Location, items: Vec<Pattern>) -> Result<Self, TypeError> {
        if items.len() > MAX_ARGS {
            return Err(TypeError::TooManyArguments {
                count: items.len(),
                location,
            });
        }
        Ok(Self::new(ctx, location, PatternKind::Tuple { items }))
    }

    /// Attach the type written next to the pattern.
    pub fn with_declared(mut self, ty: Ty) -> Self {
        self.declared = Some(ty);
        self
    }

    /// Report the pattern's resolved type to `owner`.
    pub fn with_owner(mut self, owner: NodeId) -> Self {
        if let Ty::Unbound(var) = &mut self.ty {
            var.owner = Some(owner);
        }
        self
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Type of the local `name` bound somewhere inside this pattern.
    pub fn binding(&self, name: &str) -> Option<&Ty> {
        match &self.kind {
            PatternKind::Named { name: bound } if bound == name => Some(&self.ty),
            PatternKind::Alias { name: bound, .. } if bound == name => Some(&self.ty),
            PatternKind::Alias { nested, .. } => nested.binding(name),
            PatternKind::Cons { head, tail } => head.binding(name).or_else(|| tail.binding(name)),
            PatternKind::List { items, .. }
            | PatternKind::Tuple { items }
            | PatternKind::Option { args: items, .. } => items.iter().find_map(|p| p.binding(name)),
            PatternKind::Record { fields } => fields.iter().find(|f| f.name == name).map(|f| &f.ty),
            PatternKind::Any | PatternKind::Const(_) | PatternKind::Named { .. } => None,
        }
    }

    /// Replace every type in the pattern by its solution.
    pub(crate) fn map_types(&mut self, subst: &mut Substitution) -> Result<(), TypeError> {
        self.ty = self.ty.map_to(subst)?;
        match &mut self.kind {
            PatternKind::Alias { nested, .. } => nested.map_types(subst)?,
            PatternKind::Cons { head, tail } => {
                head.map_types(subst)?;
                tail.map_types(subst)?;
            }
            PatternKind::List { items, item_ty } => {
                *item_ty = item_ty.map_to(subst)?;
                for item in items {
                    item.map_types(subst)?;
                }
            }
            PatternKind::Option { args: items, .. } | PatternKind::Tuple { items } => {
                for item in items {
                    item.map_types(subst)?;
                }
            }
            PatternKind::Record { fields } => {
                for field in fields {
                    field.ty = field.ty.map_to(subst)?;
                }
            }
            PatternKind::Any | PatternKind::Const(_) | PatternKind::Named { .. } => {}
        }
        Ok(())
    }

    /// Call `f` on this pattern and every nested pattern.
    pub fn walk(&self, f: &mut impl FnMut(&Pattern)) {
        f(self);
        match &self.kind {
            PatternKind::Alias { nested, .. } => nested.walk(f),
            PatternKind::Cons { head, tail } => {
                head.walk(f);
                tail.walk(f);
            }
            PatternKind::List { items, .. }
            | PatternKind::Tuple { items }
            | PatternKind::Option { args: items, .. } => items.iter().for_each(|p| p.walk(f)),
            PatternKind::Any
            | PatternKind::Const(_)
            | PatternKind::Named { .. }
            | PatternKind::Record { .. } => {}
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::Alias { name, nested } => write!(f, "{} as {}", nested, name)?,
            PatternKind::Any => write!(f, "_")?,
            PatternKind::Cons { head, tail } => write!(f, "({} | {})", head, tail)?,
            PatternKind::Const(value) => write!(f, "{}", value)?,
            PatternKind::List { items, .. } => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")?;
            }
            PatternKind::Named { name } => write!(f, "{}", name)?,
            PatternKind::Option { name, args, .. } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    write_items(f, args)?;
                    write!(f, ")")?;
                }
            }
            PatternKind::Record { fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field.name)?;
                }
                write!(f, "}}")?;
            }
            PatternKind::Tuple { items } => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")?;
            }
        }
        if let Some(declared) = &self.declared {
            write!(f, ": {}", declared)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_bindings() {
        let mut ctx = SolvingContext::new(DefId(0));
        let loc = Location::default();
        let head = Pattern::named(&mut ctx, loc, "x");
        let tail = Pattern::any(&mut ctx, loc);
        let cons = Pattern::cons(&mut ctx, loc, head, tail);
        let whole = Pattern::alias(&mut ctx, loc, "all", cons);

        assert_eq!(whole.to_string(), "(x | _) as all");
        assert!(whole.binding("x").is_some());
        assert_eq!(whole.binding("all"), Some(&whole.ty));
        assert!(whole.binding("y").is_none());

        let items = vec![
            Pattern::constant(&mut ctx, loc, ConstValue::Int(1)),
            Pattern::named(&mut ctx, loc, "y").with_declared(Ty::int()),
        ];
        let pair = Pattern::tuple(&mut ctx, loc, items).unwrap();
        assert_eq!(pair.to_string(), "(1, y: Nar.Base.Math.Int)");
    }

    #[test]
    fn option_arity_is_limited() {
        let mut ctx = SolvingContext::new(DefId(0));
        let loc = Location::default();
        let args = (0..256).map(|_| Pattern::any(&mut ctx, loc)).collect();
        assert!(matches!(
            Pattern::option(&mut ctx, loc, "Big", None, args),
            Err(TypeError::TooManyArguments { count: 256, .. })
        ));
    }
}
