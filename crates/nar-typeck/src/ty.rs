//! Type representation for the Nar type system.
//!
//! Defines the `Ty` enum with its six shapes and the three operations the
//! solver relies on: `merge` (shape-level unification that hands nested
//! comparisons back as new equations), `map_to` (substitution) and
//! `make_unique` (fresh instantiation).

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use nar_common::{builtins, ident, Location};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::equation::Equation;
use crate::error::TypeError;
use crate::program::{DefId, NodeId};
use crate::solve::{SolvingContext, Substitution};

/// Identity of a type variable within one compilation session.
///
/// `scope` is the definition whose solving context allocated the variable
/// and `index` is that context's own counter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId {
    pub scope: DefId,
    pub index: u32,
}

/// Restriction on the types a variable may be solved to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    #[default]
    None,
    /// Only `Int` or `Float`.
    Number,
}

impl Constraint {
    /// Constraint implied by a written type parameter name.
    pub fn for_name(name: &str) -> Constraint {
        if name.starts_with(builtins::NUMBER_PREFIX) {
            Constraint::Number
        } else {
            Constraint::None
        }
    }

    /// Constraint of a group formed by merging two groups, `None` on conflict.
    pub fn combine(self, other: Constraint) -> Option<Constraint> {
        match (self, other) {
            (Constraint::None, c) | (c, Constraint::None) => Some(c),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    /// Whether a concrete specialization satisfies the constraint.
    pub fn accepts(self, ty: &Ty) -> bool {
        match self {
            Constraint::None => true,
            Constraint::Number => match ty {
                Ty::Native(name, args) => {
                    args.is_empty() && (name == builtins::INT || name == builtins::FLOAT)
                }
                Ty::Unbound(var) => var.generic && var.constraint == Constraint::Number,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::None => write!(f, "any"),
            Constraint::Number => write!(f, "number"),
        }
    }
}

/// An unbound type variable.
///
/// Equality and hashing only look at the identity (and constraint); the
/// name, owner and location are carried for rendering and error reporting.
#[derive(Clone, Debug)]
pub struct TypeVar {
    pub id: VarId,
    pub constraint: Constraint,
    /// Name written by the user, or assigned by generalization.
    pub name: Option<String>,
    /// Upstream node to be told the variable's resolved type.
    pub owner: Option<NodeId>,
    pub location: Location,
    /// Universally quantified. Rigid inside a solve; only instantiation
    /// replaces it.
    pub generic: bool,
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.constraint == other.constraint
    }
}

impl Eq for TypeVar {}

impl Hash for TypeVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "u_{}", self.id.index),
        }
    }
}

/// One option of a data type: its short name and argument types.
#[derive(Clone, Debug, PartialEq)]
pub struct DataOption {
    pub name: String,
    pub values: Vec<Ty>,
}

impl DataOption {
    pub fn new(name: impl Into<String>, values: Vec<Ty>) -> Self {
        DataOption {
            name: name.into(),
            values,
        }
    }
}

/// A tagged union applied to type arguments.
///
/// `options` is metadata for the coverage checker. It is shared between
/// every copy of the type and is never unified, substituted or compared:
/// equality looks at the name and arguments only, which also keeps
/// self-referential option lists from being walked.
#[derive(Clone, Debug)]
pub struct DataTy {
    pub name: String,
    pub args: Vec<Ty>,
    pub options: Arc<[DataOption]>,
}

impl DataTy {
    pub fn new(name: impl Into<String>, args: Vec<Ty>, options: Vec<DataOption>) -> Self {
        DataTy {
            name: name.into(),
            args,
            options: Arc::from(options),
        }
    }

    pub fn option(&self, name: &str) -> Option<&DataOption> {
        self.options.iter().find(|o| o.name == name)
    }
}

impl PartialEq for DataTy {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

impl Eq for DataTy {}

impl Hash for DataTy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.args.hash(state);
    }
}

/// A structural record. `open` records accept extra fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordTy {
    pub fields: BTreeMap<String, Ty>,
    pub open: bool,
}

/// A Nar type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A type variable (unresolved during inference, or generic).
    Unbound(TypeVar),
    /// An opaque foreign type with arguments: `Nar.Base.List.List[a]`.
    Native(String, Vec<Ty>),
    /// A tagged union.
    Data(DataTy),
    /// A curried function type: `(params): ret`.
    Func(Vec<Ty>, Box<Ty>),
    Tuple(Vec<Ty>),
    Record(RecordTy),
}

impl Ty {
    pub fn native(name: impl Into<String>, args: Vec<Ty>) -> Ty {
        Ty::Native(name.into(), args)
    }

    pub fn int() -> Ty {
        Ty::native(builtins::INT, Vec::new())
    }

    pub fn float() -> Ty {
        Ty::native(builtins::FLOAT, Vec::new())
    }

    pub fn char() -> Ty {
        Ty::native(builtins::CHAR, Vec::new())
    }

    pub fn string() -> Ty {
        Ty::native(builtins::STRING, Vec::new())
    }

    pub fn unit() -> Ty {
        Ty::native(builtins::UNIT, Vec::new())
    }

    pub fn list(item: Ty) -> Ty {
        Ty::native(builtins::LIST, vec![item])
    }

    /// `Bool = True | False`.
    pub fn bool() -> Ty {
        Ty::Data(DataTy::new(
            builtins::BOOL,
            Vec::new(),
            vec![
                DataOption::new(builtins::TRUE, Vec::new()),
                DataOption::new(builtins::FALSE, Vec::new()),
            ],
        ))
    }

    pub fn func(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Func(params, Box::new(ret))
    }

    pub fn record<I, S>(fields: I, open: bool) -> Ty
    where
        I: IntoIterator<Item = (S, Ty)>,
        S: Into<String>,
    {
        Ty::Record(RecordTy {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            open,
        })
    }

    /// The variable, when this is a variable the solver may still bind.
    pub fn as_flexible(&self) -> Option<&TypeVar> {
        match self {
            Ty::Unbound(var) if !var.generic => Some(var),
            _ => None,
        }
    }

    /// Whether the type contains no variables the solver may still bind.
    pub fn is_resolved(&self) -> bool {
        let mut resolved = true;
        self.visit_vars(&mut |var| resolved &= var.generic);
        resolved
    }

    /// Call `f` on every variable in the type.
    pub fn visit_vars(&self, f: &mut impl FnMut(&TypeVar)) {
        match self {
            Ty::Unbound(var) => f(var),
            Ty::Native(_, args) => args.iter().for_each(|a| a.visit_vars(f)),
            Ty::Data(data) => data.args.iter().for_each(|a| a.visit_vars(f)),
            Ty::Func(params, ret) => {
                params.iter().for_each(|p| p.visit_vars(f));
                ret.visit_vars(f);
            }
            Ty::Tuple(items) => items.iter().for_each(|i| i.visit_vars(f)),
            Ty::Record(record) => record.fields.values().for_each(|t| t.visit_vars(f)),
        }
    }

    // ── Merge ───────────────────────────────────────────────────────────

    /// Unify the outer shape of two types that are not flexible variables.
    ///
    /// Nested components are not compared here; they come back as new
    /// equations so the solver can dedupe and queue them.
    pub fn merge(&self, other: &Ty, location: &Location) -> Result<Vec<Equation>, TypeError> {
        let mismatch = || TypeError::TypeMismatch {
            expected: self.clone(),
            found: other.clone(),
            location: *location,
        };

        match (self, other) {
            (Ty::Unbound(a), Ty::Unbound(b)) if a.id == b.id => Ok(Vec::new()),
            (Ty::Native(n1, a1), Ty::Native(n2, a2)) => {
                if n1 != n2 || a1.len() != a2.len() {
                    return Err(mismatch());
                }
                Ok(zip_equations(a1, a2, location))
            }
            (Ty::Data(d1), Ty::Data(d2)) => {
                if d1.name != d2.name || d1.args.len() != d2.args.len() {
                    return Err(mismatch());
                }
                Ok(zip_equations(&d1.args, &d2.args, location))
            }
            (Ty::Func(p1, r1), Ty::Func(p2, r2)) => {
                let n = p1.len().min(p2.len());
                let mut eqs = zip_equations(&p1[..n], &p2[..n], location);
                eqs.push(Equation::best(
                    split_func(p1, r1, n),
                    split_func(p2, r2, n),
                    location,
                ));
                Ok(eqs)
            }
            (Ty::Tuple(i1), Ty::Tuple(i2)) => {
                if i1.len() != i2.len() {
                    return Err(mismatch());
                }
                Ok(zip_equations(i1, i2, location))
            }
            (Ty::Record(r1), Ty::Record(r2)) => {
                let mut eqs = Vec::new();
                for (name, ty) in &r1.fields {
                    match r2.fields.get(name) {
                        Some(other_ty) => {
                            eqs.push(Equation::best(ty.clone(), other_ty.clone(), location))
                        }
                        None if !r2.open => {
                            return Err(TypeError::MissingField {
                                field: name.clone(),
                                record: other.clone(),
                                location: *location,
                            })
                        }
                        None => {}
                    }
                }
                if !r1.open {
                    if let Some(name) = r2.fields.keys().find(|k| !r1.fields.contains_key(*k)) {
                        return Err(TypeError::MissingField {
                            field: name.clone(),
                            record: self.clone(),
                            location: *location,
                        });
                    }
                }
                Ok(eqs)
            }
            _ => Err(mismatch()),
        }
    }

    // ── Substitution ────────────────────────────────────────────────────

    /// Rebuild the type with every non-generic variable replaced by its
    /// solution.
    pub fn map_to(&self, subst: &mut Substitution) -> Result<Ty, TypeError> {
        Ok(match self {
            Ty::Unbound(var) if var.generic => self.clone(),
            Ty::Unbound(var) => subst.resolve(var)?,
            Ty::Native(name, args) => Ty::Native(name.clone(), map_all(args, subst)?),
            Ty::Data(data) => Ty::Data(DataTy {
                name: data.name.clone(),
                args: map_all(&data.args, subst)?,
                options: Arc::clone(&data.options),
            }),
            Ty::Func(params, ret) => Ty::Func(map_all(params, subst)?, Box::new(ret.map_to(subst)?)),
            Ty::Tuple(items) => Ty::Tuple(map_all(items, subst)?),
            Ty::Record(record) => {
                let mut fields = BTreeMap::new();
                for (name, ty) in &record.fields {
                    fields.insert(name.clone(), ty.map_to(subst)?);
                }
                Ty::Record(RecordTy {
                    fields,
                    open: record.open,
                })
            }
        })
    }

    // ── Instantiation ───────────────────────────────────────────────────

    /// Copy the type, giving every variable not yet in `remap` a fresh
    /// identity allocated in `ctx`.
    ///
    /// Copies made with separate remap tables never share variables. Names
    /// are not copied: they belong to the definition that gave them, and a
    /// copy is named by the solve that generalizes it.
    pub fn make_unique(&self, ctx: &mut SolvingContext, remap: &mut FxHashMap<VarId, VarId>) -> Ty {
        match self {
            Ty::Unbound(var) => {
                let id = match remap.get(&var.id) {
                    Some(id) => *id,
                    None => {
                        let id = ctx.fresh_id();
                        remap.insert(var.id, id);
                        id
                    }
                };
                Ty::Unbound(ctx.register(TypeVar {
                    id,
                    constraint: var.constraint,
                    name: None,
                    owner: None,
                    location: var.location,
                    generic: false,
                }))
            }
            Ty::Native(name, args) => Ty::Native(
                name.clone(),
                args.iter().map(|a| a.make_unique(ctx, remap)).collect(),
            ),
            Ty::Data(data) => Ty::Data(DataTy {
                name: data.name.clone(),
                args: data.args.iter().map(|a| a.make_unique(ctx, remap)).collect(),
                options: Arc::clone(&data.options),
            }),
            Ty::Func(params, ret) => Ty::Func(
                params.iter().map(|p| p.make_unique(ctx, remap)).collect(),
                Box::new(ret.make_unique(ctx, remap)),
            ),
            Ty::Tuple(items) => {
                Ty::Tuple(items.iter().map(|i| i.make_unique(ctx, remap)).collect())
            }
            Ty::Record(record) => Ty::Record(RecordTy {
                fields: record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.make_unique(ctx, remap)))
                    .collect(),
                open: record.open,
            }),
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Render with names of `module` shown relative to it.
    pub fn code<'a>(&'a self, module: &'a str) -> TyCode<'a> {
        TyCode {
            ty: self,
            module: Some(module),
        }
    }
}

fn zip_equations(left: &[Ty], right: &[Ty], location: &Location) -> Vec<Equation> {
    left.iter()
        .zip(right)
        .map(|(l, r)| Equation::best(l.clone(), r.clone(), location))
        .collect()
}

/// The return side of a function once its first `n` params are consumed.
fn split_func(params: &[Ty], ret: &Ty, n: usize) -> Ty {
    if params.len() > n {
        Ty::Func(params[n..].to_vec(), Box::new(ret.clone()))
    } else {
        ret.clone()
    }
}

fn map_all(types: &[Ty], subst: &mut Substitution) -> Result<Vec<Ty>, TypeError> {
    types.iter().map(|t| t.map_to(subst)).collect()
}

/// Display adapter for [`Ty::code`].
pub struct TyCode<'a> {
    ty: &'a Ty,
    module: Option<&'a str>,
}

impl TyCode<'_> {
    fn name<'n>(&self, name: &'n str) -> &'n str {
        match self.module {
            Some(module) => ident::relative_to(name, module),
            None => name,
        }
    }

    fn nested<'t>(&'t self, ty: &'t Ty) -> TyCode<'t> {
        TyCode {
            ty,
            module: self.module,
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.nested(item))?;
        }
        Ok(())
    }

    fn write_applied(&self, f: &mut fmt::Formatter<'_>, name: &str, args: &[Ty]) -> fmt::Result {
        write!(f, "{}", self.name(name))?;
        if !args.is_empty() {
            write!(f, "[")?;
            self.write_list(f, args)?;
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl fmt::Display for TyCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Ty::Unbound(var) => write!(f, "{}", var),
            Ty::Native(name, args) => self.write_applied(f, name, args),
            Ty::Data(data) => self.write_applied(f, &data.name, &data.args),
            Ty::Func(params, ret) => {
                write!(f, "(")?;
                self.write_list(f, params)?;
                write!(f, "): {}", self.nested(ret))
            }
            Ty::Tuple(items) => {
                write!(f, "(")?;
                self.write_list(f, items)?;
                write!(f, ")")
            }
            Ty::Record(record) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, self.nested(ty))?;
                }
                if record.open {
                    if !record.fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            TyCode {
                ty: self,
                module: None
            }
        )
    }
}
