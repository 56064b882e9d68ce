//! Typed expressions.

use std::fmt;

use nar_common::{ident, ConstValue, Location};

use crate::error::TypeError;
use crate::pattern::Pattern;
use crate::program::{DefId, NodeId};
use crate::solve::{SolvingContext, Substitution};
use crate::ty::{DataTy, Ty};

/// Most arguments, items or fields a single node may carry.
pub const MAX_ARGS: usize = 255;

#[derive(Clone, Debug)]
pub struct Expr {
    pub location: Location,
    pub ty: Ty,
    pub kind: ExprKind,
}

/// `name = value` in a record literal or update.
#[derive(Clone, Debug)]
pub struct ExprField {
    pub name: String,
    pub location: Location,
    pub ty: Ty,
    pub value: Expr,
}

#[derive(Clone, Debug)]
pub struct SelectCase {
    pub location: Location,
    pub pattern: Pattern,
    pub body: Expr,
}

/// The record a `{ target | field = value }` expression copies.
#[derive(Clone, Debug)]
pub enum UpdateTarget {
    Local {
        name: String,
        target: Option<Ty>,
    },
    Global {
        module: String,
        name: String,
        definition: Option<DefId>,
    },
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Access {
        record: Box<Expr>,
        field: String,
    },
    Apply {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Call of a native function by name.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Const(ConstValue),
    /// Construction of a data option.
    Constructor {
        data: DataTy,
        option: String,
        args: Vec<Expr>,
    },
    Global {
        module: String,
        name: String,
        definition: Option<DefId>,
    },
    Let {
        pattern: Pattern,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    List {
        items: Vec<Expr>,
        item_ty: Ty,
    },
    /// A local bound by a pattern; `target` is the binder's type.
    Local {
        name: String,
        target: Option<Ty>,
    },
    Record {
        fields: Vec<ExprField>,
    },
    Select {
        condition: Box<Expr>,
        cases: Vec<SelectCase>,
    },
    Tuple {
        items: Vec<Expr>,
    },
    Update {
        target: UpdateTarget,
        fields: Vec<ExprField>,
    },
}

fn check_count(count: usize, location: Location) -> Result<(), TypeError> {
    if count > MAX_ARGS {
        return Err(TypeError::TooManyArguments { count, location });
    }
    Ok(())
}

fn make_fields(ctx: &mut SolvingContext, fields: Vec<(String, Location, Expr)>) -> Vec<ExprField> {
    fields
        .into_iter()
        .map(|(name, location, value)| ExprField {
            name,
            location,
            ty: ctx.fresh_var(location),
            value,
        })
        .collect()
}

impl Expr {
    fn new(ctx: &mut SolvingContext, location: Location, kind: ExprKind) -> Self {
        Expr {
            location,
            ty: ctx.fresh_var(location),
            kind,
        }
    }

    pub fn access(ctx: &mut SolvingContext, location: Location, record: Expr, field: impl Into<String>) -> Self {
        Self::new(
            ctx,
            location,
            ExprKind::Access {
                record: Box::new(record),
                field: field.into(),
            },
        )
    }

    pub fn apply(ctx: &mut SolvingContext, location: Location, func: Expr, args: Vec<Expr>) -> Result<Self, TypeError> {
        check_count(args.len(), location)?;
        Ok(Self::new(
            ctx,
            location,
            ExprKind::Apply {
                func: Box::new(func),
                args,
            },
        ))
    }

    pub fn call(
        ctx: &mut SolvingContext,
        location: Location,
        name: impl Into<String>,
        args: Vec<Expr>,
    ) -> Result<Self, TypeError> {
        check_count(args.len(), location)?;
        Ok(Self::new(
            ctx,
            location,
            ExprKind::Call {
                name: name.into(),
                args,
            },
        ))
    }

    pub fn constant(ctx: &mut SolvingContext, location: Location, value: ConstValue) -> Self {
        Self::new(ctx, location, ExprKind::Const(value))
    }

    pub fn constructor(
        ctx: &mut SolvingContext,
        location: Location,
        data: DataTy,
        option: impl Into<String>,
        args: Vec<Expr>,
    ) -> Result<Self, TypeError> {
        check_count(args.len(), location)?;
        Ok(Self::new(
            ctx,
            location,
            ExprKind::Constructor {
                data,
                option: option.into(),
                args,
            },
        ))
    }

    pub fn global(
        ctx: &mut SolvingContext,
        location: Location,
        module: impl Into<String>,
        name: impl Into<String>,
        definition: Option<DefId>,
    ) -> Self {
        Self::new(
            ctx,
            location,
            ExprKind::Global {
                module: module.into(),
                name: name.into(),
                definition,
            },
        )
    }

    pub fn let_in(ctx: &mut SolvingContext, location: Location, pattern: Pattern, value: Expr, body: Expr) -> Self {
        Self::new(
            ctx,
            location,
            ExprKind::Let {
                pattern,
                value: Box::new(value),
                body: Box::new(body),
            },
        )
    }

    pub fn list(ctx: &mut SolvingContext, location: Location, items: Vec<Expr>) -> Self {
        let item_ty = ctx.fresh_var(location);
        Self::new(ctx, location, ExprKind::List { items, item_ty })
    }

    pub fn local(ctx: &mut SolvingContext, location: Location, name: impl Into<String>, target: Option<Ty>) -> Self {
        Self::new(
            ctx,
            location,
            ExprKind::Local {
                name: name.into(),
                target,
            },
        )
    }

    pub fn record(ctx: &mut SolvingContext, location: Location, values: Vec<(String, Location, Expr)>) -> Result<Self, TypeError> {
        check_count(values.len(), location)?;
        let fields = make_fields(ctx, values);
        Ok(Self::new(ctx, location, ExprKind::Record { fields }))
    }

    pub fn select(ctx: &mut SolvingContext, location: Location, condition: Expr, cases: Vec<SelectCase>) -> Self {
        Self::new(
            ctx,
            location,
            ExprKind::Select {
                condition: Box::new(condition),
                cases,
            },
        )
    }

    pub fn tuple(ctx: &mut SolvingContext, location: Location, items: Vec<Expr>) -> Result<Self, TypeError> {
        check_count(items.len(), location)?;
        Ok(Self::new(ctx, location, ExprKind::Tuple { items }))
    }

    pub fn update(
        ctx: &mut SolvingContext,
        location: Location,
        target: UpdateTarget,
        values: Vec<(String, Location, Expr)>,
    ) -> Result<Self, TypeError> {
        check_count(values.len(), location)?;
        let fields = make_fields(ctx, values);
        Ok(Self::new(ctx, location, ExprKind::Update { target, fields }))
    }

    /// Report the expression's resolved type to `owner`.
    pub fn with_owner(mut self, owner: NodeId) -> Self {
        if let Ty::Unbound(var) = &mut self.ty {
            var.owner = Some(owner);
        }
        self
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Call `f` on this expression and every nested expression.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Access { record, .. } => record.walk(f),
            ExprKind::Apply { func, args } => {
                func.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            ExprKind::Call { args, .. }
            | ExprKind::Constructor { args, .. }
            | ExprKind::List { items: args, .. }
            | ExprKind::Tuple { items: args } => args.iter().for_each(|a| a.walk(f)),
            ExprKind::Let { value, body, .. } => {
                value.walk(f);
                body.walk(f);
            }
            ExprKind::Record { fields } | ExprKind::Update { fields, .. } => {
                fields.iter().for_each(|field| field.value.walk(f))
            }
            ExprKind::Select { condition, cases } => {
                condition.walk(f);
                cases.iter().for_each(|c| c.body.walk(f));
            }
            ExprKind::Const(_) | ExprKind::Global { .. } | ExprKind::Local { .. } => {}
        }
    }

    /// Replace every type in the expression by its solution.
    pub(crate) fn map_types(&mut self, subst: &mut Substitution) -> Result<(), TypeError> {
        self.ty = self.ty.map_to(subst)?;
        match &mut self.kind {
            ExprKind::Access { record, .. } => record.map_types(subst)?,
            ExprKind::Apply { func, args } => {
                func.map_types(subst)?;
                map_all(args, subst)?;
            }
            ExprKind::Call { args, .. } | ExprKind::Tuple { items: args } => map_all(args, subst)?,
            ExprKind::Constructor { data, args, .. } => {
                if let Ty::Data(mapped) = Ty::Data(data.clone()).map_to(subst)? {
                    *data = mapped;
                }
                map_all(args, subst)?;
            }
            ExprKind::Let {
                pattern,
                value,
                body,
            } => {
                pattern.map_types(subst)?;
                value.map_types(subst)?;
                body.map_types(subst)?;
            }
            ExprKind::List { items, item_ty } => {
                *item_ty = item_ty.map_to(subst)?;
                map_all(items, subst)?;
            }
            ExprKind::Local { target, .. } => {
                if let Some(target) = target {
                    *target = target.map_to(subst)?;
                }
            }
            ExprKind::Update {
                target: UpdateTarget::Local { target, .. },
                fields,
            } => {
                if let Some(target) = target {
                    *target = target.map_to(subst)?;
                }
                map_fields(fields, subst)?;
            }
            ExprKind::Record { fields } | ExprKind::Update { fields, .. } => map_fields(fields, subst)?,
            ExprKind::Select { condition, cases } => {
                condition.map_types(subst)?;
                for case in cases {
                    case.pattern.map_types(subst)?;
                    case.body.map_types(subst)?;
                }
            }
            ExprKind::Const(_) | ExprKind::Global { .. } => {}
        }
        Ok(())
    }
}

fn map_all(exprs: &mut [Expr], subst: &mut Substitution) -> Result<(), TypeError> {
    for expr in exprs {
        expr.map_types(subst)?;
    }
    Ok(())
}

fn map_fields(fields: &mut [ExprField], subst: &mut Substitution) -> Result<(), TypeError> {
    for field in fields {
        field.ty = field.ty.map_to(subst)?;
        field.value.map_types(subst)?;
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[ExprField]) -> fmt::Result {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} = {}", field.name, field.value)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Access { record, field } => write!(f, "{}.{}", record, field),
            ExprKind::Apply { func, args } => {
                write!(f, "{}(", func)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::Call { name, args } => {
                write!(f, "native {}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            ExprKind::Const(value) => write!(f, "{}", value),
            ExprKind::Constructor { option, args, .. } => {
                write!(f, "{}", option)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    write_list(f, args)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
            ExprKind::Global { module, name, .. } => {
                write!(f, "{}", ident::full_identifier(module, name))
            }
            ExprKind::Let {
                pattern,
                value,
                body,
            } => write!(f, "let {} = {} in {}", pattern, value, body),
            ExprKind::List { items, .. } => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            ExprKind::Local { name, .. } => write!(f, "{}", name),
            ExprKind::Record { fields } => {
                write!(f, "{{ ")?;
                write_fields(f, fields)?;
                write!(f, " }}")
            }
            ExprKind::Select { condition, cases } => {
                write!(f, "select {}", condition)?;
                for case in cases {
                    write!(f, " case {} -> {}", case.pattern, case.body)?;
                }
                write!(f, " end")
            }
            ExprKind::Tuple { items } => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            ExprKind::Update { target, fields } => {
                match target {
                    UpdateTarget::Local { name, .. } => write!(f, "{{ {} | ", name)?,
                    UpdateTarget::Global { module, name, .. } => {
                        write!(f, "{{ {} | ", ident::full_identifier(module, name))?
                    }
                }
                write_fields(f, fields)?;
                write!(f, " }}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let mut ctx = SolvingContext::new(DefId(0));
        let loc = Location::default();

        let x = Expr::local(&mut ctx, loc, "x", None);
        let one = Expr::constant(&mut ctx, loc, ConstValue::Int(1));
        let add = Expr::global(&mut ctx, loc, "Nar.Base.Math", "add", None);
        let call = Expr::apply(&mut ctx, loc, add, vec![x, one]).unwrap();
        assert_eq!(call.to_string(), "Nar.Base.Math.add(x, 1)");

        let name = Expr::constant(&mut ctx, loc, ConstValue::String("n".into()));
        let rec = Expr::record(&mut ctx, loc, vec![("name".into(), loc, name)]).unwrap();
        let access = Expr::access(&mut ctx, loc, rec, "name");
        assert_eq!(access.to_string(), "{ name = \"n\" }.name");
    }

    #[test]
    fn walk_visits_nested_expressions() {
        let mut ctx = SolvingContext::new(DefId(0));
        let loc = Location::default();
        let items = (0..3)
            .map(|i| Expr::constant(&mut ctx, loc, ConstValue::Int(i)))
            .collect();
        let list = Expr::list(&mut ctx, loc, items);
        let mut count = 0;
        list.walk(&mut |_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn too_many_arguments() {
        let mut ctx = SolvingContext::new(DefId(0));
        let loc = Location::default();
        let func = Expr::local(&mut ctx, loc, "f", None);
        let args = (0..300)
            .map(|_| Expr::constant(&mut ctx, loc, ConstValue::Unit))
            .collect();
        assert!(matches!(
            Expr::apply(&mut ctx, loc, func, args),
            Err(TypeError::TooManyArguments { count: 300, .. })
        ));
    }
}
