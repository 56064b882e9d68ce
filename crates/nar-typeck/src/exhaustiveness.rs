//! Maranget's usefulness algorithm for exhaustiveness and redundancy checking.
//!
//! Typed patterns are first projected onto `SimplePattern`: everything that
//! can be told apart by a finite set of constructors (data options, lists,
//! tuples, unit) becomes a `Constructor`, other constants become literals,
//! and binders, wildcards and records match anything.
//!
//! A pattern row is redundant when it is not useful against the rows before
//! it. A list of rows is exhaustive when no row of wildcards is missing from
//! it; the search for missing rows doubles as the example patterns shown in
//! the error.

use std::collections::BTreeMap;
use std::fmt;

use nar_common::{ident, ConstValue};

use crate::definition::Definition;
use crate::emit;
use crate::error::TypeError;
use crate::expr::{Expr, ExprKind};
use crate::pattern::{Pattern, PatternKind};
use crate::ty::{DataTy, Ty};

// ── Simple Patterns ─────────────────────────────────────────────────

/// The closed set of constructors a `Constructor` pattern belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum Union {
    Data(DataTy),
    /// `Nil` and `Cons(head, tail)`.
    List,
    /// A single `Only` option with one argument per item.
    Tuple(usize),
    /// A single argument-less `Only` option.
    Unit,
}

const NIL: &str = "Nil";
const CONS: &str = "Cons";
const ONLY: &str = "Only";

impl Union {
    /// Option names with their arities, in declaration order.
    fn options(&self) -> Vec<(String, usize)> {
        match self {
            Union::Data(data) => data
                .options
                .iter()
                .map(|o| (ident::short_name(&o.name).to_string(), o.values.len()))
                .collect(),
            Union::List => vec![(NIL.to_string(), 0), (CONS.to_string(), 2)],
            Union::Tuple(n) => vec![(ONLY.to_string(), *n)],
            Union::Unit => vec![(ONLY.to_string(), 0)],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimplePattern {
    Anything,
    Literal(ConstValue),
    Constructor {
        union: Union,
        name: String,
        args: Vec<SimplePattern>,
    },
}

impl SimplePattern {
    fn constructor(union: Union, name: &str, args: Vec<SimplePattern>) -> Self {
        SimplePattern::Constructor {
            union,
            name: name.to_string(),
            args,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[SimplePattern]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for SimplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimplePattern::Anything => write!(f, "_"),
            SimplePattern::Literal(value) => write!(f, "{}", value),
            SimplePattern::Constructor { union, name, args } => match union {
                Union::List if name == NIL => write!(f, "[]"),
                Union::List if args.len() == 2 => write!(f, "({} | {})", args[0], args[1]),
                Union::Tuple(_) | Union::Unit => {
                    write!(f, "(")?;
                    write_args(f, args)?;
                    write!(f, ")")
                }
                _ => {
                    write!(f, "{}", name)?;
                    if !args.is_empty() {
                        write!(f, "(")?;
                        write_args(f, args)?;
                        write!(f, ")")?;
                    }
                    Ok(())
                }
            },
        }
    }
}

/// Project a typed pattern onto its coverage shape.
///
/// Data option patterns must already carry their solved data type.
pub fn simplify(pattern: &Pattern) -> Result<SimplePattern, TypeError> {
    Ok(match &pattern.kind {
        PatternKind::Alias { nested, .. } => simplify(nested)?,
        PatternKind::Any | PatternKind::Named { .. } | PatternKind::Record { .. } => {
            SimplePattern::Anything
        }
        PatternKind::Const(ConstValue::Unit) => SimplePattern::constructor(Union::Unit, ONLY, Vec::new()),
        PatternKind::Const(value) => SimplePattern::Literal(emit::literal(value, &pattern.ty)),
        PatternKind::Cons { head, tail } => {
            SimplePattern::constructor(Union::List, CONS, vec![simplify(head)?, simplify(tail)?])
        }
        PatternKind::List { items, .. } => {
            let mut list = SimplePattern::constructor(Union::List, NIL, Vec::new());
            for item in items.iter().rev() {
                list = SimplePattern::constructor(Union::List, CONS, vec![simplify(item)?, list]);
            }
            list
        }
        PatternKind::Tuple { items } => SimplePattern::constructor(
            Union::Tuple(items.len()),
            ONLY,
            items.iter().map(simplify).collect::<Result<_, _>>()?,
        ),
        PatternKind::Option { name, args, .. } => {
            let Ty::Data(data) = &pattern.ty else {
                return Err(TypeError::internal(
                    format!("data option pattern `{}` is not of a data type", name),
                    pattern.location,
                ));
            };
            SimplePattern::constructor(
                Union::Data(data.clone()),
                ident::short_name(name),
                args.iter().map(simplify).collect::<Result<_, _>>()?,
            )
        }
    })
}

// ── Matrix Operations ───────────────────────────────────────────────

type Row = Vec<SimplePattern>;

/// Inconsistencies only a malformed typed tree can produce.
type Check<T> = Result<T, &'static str>;

fn wildcards(n: usize) -> Row {
    vec![SimplePattern::Anything; n]
}

fn prepend(first: Vec<SimplePattern>, rest: &[SimplePattern]) -> Row {
    let mut row = first;
    row.extend_from_slice(rest);
    row
}

/// Rows that match option `name`, with its arguments spliced in front.
fn specialize_by_ctor(rows: &[Row], name: &str, arity: usize) -> Check<Vec<Row>> {
    let mut out = Vec::new();
    for row in rows {
        let Some((first, rest)) = row.split_first() else {
            return Err("empty rows cannot be specialized");
        };
        match first {
            SimplePattern::Constructor { name: other, args, .. } if other == name => {
                out.push(prepend(args.clone(), rest))
            }
            SimplePattern::Constructor { .. } => {}
            SimplePattern::Anything => out.push(prepend(wildcards(arity), rest)),
            SimplePattern::Literal(_) => return Err("constructor and literal patterns in one column"),
        }
    }
    Ok(out)
}

/// Rows that match any value in the first column, without that column.
fn specialize_by_anything(rows: &[Row]) -> Vec<Row> {
    rows.iter()
        .filter_map(|row| match row.split_first() {
            Some((SimplePattern::Anything, rest)) => Some(rest.to_vec()),
            _ => None,
        })
        .collect()
}

fn specialize_by_literal(rows: &[Row], literal: &ConstValue) -> Check<Vec<Row>> {
    let mut out = Vec::new();
    for row in rows {
        let Some((first, rest)) = row.split_first() else {
            return Err("empty rows cannot be specialized");
        };
        match first {
            SimplePattern::Anything => out.push(rest.to_vec()),
            SimplePattern::Literal(value) if value == literal => out.push(rest.to_vec()),
            SimplePattern::Literal(_) => {}
            SimplePattern::Constructor { .. } => return Err("constructor and literal patterns in one column"),
        }
    }
    Ok(out)
}

/// Constructors heading the first column, keyed by option name.
fn collect_ctors(rows: &[Row]) -> BTreeMap<&str, &Union> {
    let mut ctors = BTreeMap::new();
    for row in rows {
        if let Some(SimplePattern::Constructor { union, name, .. }) = row.first() {
            ctors.insert(name.as_str(), union);
        }
    }
    ctors
}

/// The union with the most options among `ctors`. A recursive data type
/// can reach a pattern through a reference that lists no options.
fn widest<'a>(ctors: &BTreeMap<&str, &'a Union>) -> Option<&'a Union> {
    ctors.values().copied().max_by_key(|union| union.options().len())
}

/// All options of the first column's union, when every one of them appears.
fn complete_options(rows: &[Row]) -> Option<Vec<(String, usize)>> {
    let ctors = collect_ctors(rows);
    let union = widest(&ctors)?;
    let options = union.options();
    (options.len() == ctors.len()).then_some(options)
}

// ── Usefulness ──────────────────────────────────────────────────────

/// Whether `vector` matches some value none of `rows` matches.
fn is_useful(rows: &[Row], vector: &[SimplePattern]) -> Check<bool> {
    if rows.is_empty() {
        return Ok(true);
    }
    let Some((first, rest)) = vector.split_first() else {
        return Ok(false);
    };

    match first {
        SimplePattern::Constructor { union, name, args } => {
            let specialized = specialize_by_ctor(rows, name, args.len())?;
            is_useful(&specialized, &prepend(args.clone(), rest))
        }
        SimplePattern::Anything => match complete_options(rows) {
            Some(options) => {
                for (name, arity) in options {
                    let specialized = specialize_by_ctor(rows, &name, arity)?;
                    if is_useful(&specialized, &prepend(wildcards(arity), rest))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            None => is_useful(&specialize_by_anything(rows), rest),
        },
        SimplePattern::Literal(value) => is_useful(&specialize_by_literal(rows, value)?, rest),
    }
}

/// Rows of `n` columns not covered by `rows`; empty when exhaustive.
fn missing(rows: &[Row], n: usize) -> Check<Vec<Row>> {
    if rows.is_empty() {
        return Ok(vec![wildcards(n)]);
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let ctors = collect_ctors(rows);
    let Some(union) = widest(&ctors).cloned() else {
        let rest = missing(&specialize_by_anything(rows), n - 1)?;
        return Ok(rest
            .into_iter()
            .map(|row| prepend(vec![SimplePattern::Anything], &row))
            .collect());
    };
    let options = union.options();

    if ctors.len() < options.len() {
        let absent: Vec<SimplePattern> = options
            .iter()
            .filter(|(name, _)| !ctors.contains_key(name.as_str()))
            .map(|(name, arity)| SimplePattern::constructor(union.clone(), name, wildcards(*arity)))
            .collect();
        let rest = missing(&specialize_by_anything(rows), n - 1)?;
        let mut out = Vec::new();
        for row in rest {
            for ctor in &absent {
                out.push(prepend(vec![ctor.clone()], &row));
            }
        }
        return Ok(out);
    }

    let mut out = Vec::new();
    for (name, arity) in options {
        let specialized = specialize_by_ctor(rows, &name, arity)?;
        for row in missing(&specialized, arity + n - 1)? {
            let (args, rest) = row.split_at(arity.min(row.len()));
            let ctor = SimplePattern::constructor(union.clone(), &name, args.to_vec());
            out.push(prepend(vec![ctor], rest));
        }
    }
    Ok(out)
}

// ── Check Sites ─────────────────────────────────────────────────────

/// Check the patterns guarding one scrutinee, in order.
///
/// Every redundant pattern is reported at its own location; a missing
/// case is reported at the last pattern.
pub fn check_patterns(patterns: &[&Pattern]) -> Vec<TypeError> {
    let Some(last) = patterns.last() else {
        return Vec::new();
    };
    let internal = |message: &str| vec![TypeError::internal(message, last.location)];

    let mut rows: Vec<Row> = Vec::new();
    let mut errors = Vec::new();
    for pattern in patterns {
        let row = match simplify(pattern) {
            Ok(simple) => vec![simple],
            Err(err) => return vec![err],
        };
        match is_useful(&rows, &row) {
            Ok(true) => rows.push(row),
            Ok(false) => errors.push(TypeError::RedundantPattern {
                location: pattern.location,
            }),
            Err(message) => return internal(message),
        }
    }

    match missing(&rows, 1) {
        Ok(absent) if absent.is_empty() => {}
        Ok(absent) => errors.push(TypeError::NonExhaustive {
            missing: absent.iter().map(|row| render_row(row)).collect(),
            location: last.location,
        }),
        Err(message) => return internal(message),
    }
    errors
}

fn render_row(row: &[SimplePattern]) -> String {
    row.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check every parameter, `let` pattern and `select` of a typed definition.
pub fn check_definition(def: &Definition) -> Vec<TypeError> {
    if !def.is_typed() {
        return Vec::new();
    }
    let mut errors = Vec::new();
    for param in def.params() {
        errors.extend(check_patterns(&[param]));
    }
    if let Some(body) = def.body() {
        errors.extend(check_expr(body));
    }
    errors
}

fn check_expr(body: &Expr) -> Vec<TypeError> {
    let mut errors = Vec::new();
    body.walk(&mut |expr| match &expr.kind {
        ExprKind::Let { pattern, .. } => errors.extend(check_patterns(&[pattern])),
        ExprKind::Select { cases, .. } => {
            let patterns: Vec<&Pattern> = cases.iter().map(|c| &c.pattern).collect();
            errors.extend(check_patterns(&patterns));
        }
        _ => {}
    });
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use nar_common::{FileId, Location};

    use crate::program::DefId;
    use crate::solve::SolvingContext;
    use crate::ty::DataOption;

    fn loc(start: u32) -> Location {
        Location::new(FileId(0), start, start + 1)
    }

    fn option(ctx: &mut SolvingContext, at: u32, name: &str, ty: Ty, args: Vec<Pattern>) -> Pattern {
        let mut p = Pattern::option(ctx, loc(at), name, Some(DefId(9)), args).unwrap();
        p.ty = ty;
        p
    }

    fn shape() -> Ty {
        Ty::Data(DataTy::new(
            "Main.Shape",
            Vec::new(),
            vec![
                DataOption::new("Circle", vec![Ty::float()]),
                DataOption::new("Square", vec![Ty::float()]),
                DataOption::new("Point", Vec::new()),
            ],
        ))
    }

    fn missing_of(errors: &[TypeError]) -> Vec<String> {
        errors
            .iter()
            .find_map(|e| match e {
                TypeError::NonExhaustive { missing, .. } => Some(missing.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    #[test]
    fn bool_missing_false() {
        let mut ctx = SolvingContext::new(DefId(0));
        let t = option(&mut ctx, 1, "True", Ty::bool(), vec![]);
        let errors = check_patterns(&[&t]);
        assert_eq!(missing_of(&errors), vec!["False"]);
        assert_eq!(errors[0].location(), loc(1));
    }

    #[test]
    fn bool_third_arm_redundant() {
        let mut ctx = SolvingContext::new(DefId(0));
        let t = option(&mut ctx, 1, "True", Ty::bool(), vec![]);
        let f = option(&mut ctx, 2, "False", Ty::bool(), vec![]);
        let again = option(&mut ctx, 3, "True", Ty::bool(), vec![]);
        let errors = check_patterns(&[&t, &f, &again]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], TypeError::RedundantPattern { location } if location == loc(3)));
    }

    #[test]
    fn list_nil_and_cons_is_exhaustive() {
        let mut ctx = SolvingContext::new(DefId(0));
        let nil = Pattern::list(&mut ctx, loc(1), vec![]);
        let head = Pattern::named(&mut ctx, loc(2), "h");
        let tail = Pattern::named(&mut ctx, loc(3), "t");
        let cons = Pattern::cons(&mut ctx, loc(4), head, tail);
        assert!(check_patterns(&[&nil, &cons]).is_empty());
    }

    #[test]
    fn list_nil_only_misses_cons() {
        let mut ctx = SolvingContext::new(DefId(0));
        let nil = Pattern::list(&mut ctx, loc(1), vec![]);
        assert_eq!(missing_of(&check_patterns(&[&nil])), vec!["(_ | _)"]);
    }

    #[test]
    fn fixed_length_lists_leave_longer_ones() {
        let mut ctx = SolvingContext::new(DefId(0));
        let nil = Pattern::list(&mut ctx, loc(1), vec![]);
        let x = Pattern::named(&mut ctx, loc(2), "x");
        let single = Pattern::list(&mut ctx, loc(3), vec![x]);
        assert_eq!(
            missing_of(&check_patterns(&[&nil, &single])),
            vec!["(_ | (_ | _))"]
        );
    }

    #[test]
    fn every_missing_option_is_reported() {
        let mut ctx = SolvingContext::new(DefId(0));
        let r = Pattern::named(&mut ctx, loc(1), "r");
        let circle = option(&mut ctx, 2, "Main.Shape#Circle", shape(), vec![r]);
        assert_eq!(
            missing_of(&check_patterns(&[&circle])),
            vec!["Square(_)", "Point"]
        );
    }

    #[test]
    fn nested_options_report_inner_gaps() {
        let mut ctx = SolvingContext::new(DefId(0));
        let inner = option(&mut ctx, 1, "True", Ty::bool(), vec![]);
        let any = Pattern::any(&mut ctx, loc(2));
        let pair = Pattern::tuple(&mut ctx, loc(3), vec![inner, any]).unwrap();
        assert_eq!(missing_of(&check_patterns(&[&pair])), vec!["(False, _)"]);
    }

    #[test]
    fn literals_need_a_wildcard() {
        let mut ctx = SolvingContext::new(DefId(0));
        let one = Pattern::constant(&mut ctx, loc(1), ConstValue::Int(1));
        let two = Pattern::constant(&mut ctx, loc(2), ConstValue::Int(2));
        let again = Pattern::constant(&mut ctx, loc(3), ConstValue::Int(1));
        let errors = check_patterns(&[&one, &two, &again]);
        assert!(matches!(errors[0], TypeError::RedundantPattern { location } if location == loc(3)));
        assert_eq!(missing_of(&errors), vec!["_"]);

        let rest = Pattern::any(&mut ctx, loc(4));
        assert!(check_patterns(&[&one, &two, &rest]).is_empty());
    }

    #[test]
    fn int_literal_typed_float_matches_the_float() {
        let mut ctx = SolvingContext::new(DefId(0));
        let mut float = Pattern::constant(&mut ctx, loc(1), ConstValue::Float(1.0));
        float.ty = Ty::float();
        let mut int = Pattern::constant(&mut ctx, loc(2), ConstValue::Int(1));
        int.ty = Ty::float();
        let rest = Pattern::any(&mut ctx, loc(3));
        let errors = check_patterns(&[&float, &int, &rest]);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(matches!(errors[0], TypeError::RedundantPattern { location } if location == loc(2)));
    }

    #[test]
    fn options_come_from_the_widest_union() {
        let mut ctx = SolvingContext::new(DefId(0));
        let Ty::Data(full) = shape() else { unreachable!() };
        let bare = Ty::Data(DataTy::new("Main.Shape", Vec::new(), Vec::new()));
        let point = option(&mut ctx, 1, "Point", bare, vec![]);
        let any = Pattern::any(&mut ctx, loc(2));
        let circle = option(&mut ctx, 3, "Circle", Ty::Data(full), vec![any]);
        let errors = check_patterns(&[&point, &circle]);
        assert_eq!(missing_of(&errors), vec!["Square(_)"]);
    }

    #[test]
    fn wildcard_after_full_coverage_is_redundant() {
        let mut ctx = SolvingContext::new(DefId(0));
        let t = option(&mut ctx, 1, "True", Ty::bool(), vec![]);
        let f = option(&mut ctx, 2, "False", Ty::bool(), vec![]);
        let any = Pattern::any(&mut ctx, loc(3));
        let errors = check_patterns(&[&t, &f, &any]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_pattern_error());
    }

    #[test]
    fn binders_records_and_unit_are_irrefutable() {
        let mut ctx = SolvingContext::new(DefId(0));
        let named = Pattern::named(&mut ctx, loc(1), "x");
        let record = Pattern::record(&mut ctx, loc(2), vec![("x".to_string(), loc(2), None)]);
        let unit = Pattern::constant(&mut ctx, loc(3), ConstValue::Unit);
        for p in [&named, &record, &unit] {
            assert!(check_patterns(&[p]).is_empty(), "{} should be exhaustive", p);
        }
    }

    #[test]
    fn option_without_data_type_is_internal() {
        let mut ctx = SolvingContext::new(DefId(0));
        let p = Pattern::option(&mut ctx, loc(1), "Just", None, vec![]).unwrap();
        assert!(matches!(simplify(&p), Err(TypeError::Internal { .. })));
    }

    #[test]
    fn rendering() {
        let cons = SimplePattern::constructor(
            Union::List,
            CONS,
            vec![SimplePattern::Literal(ConstValue::Char('a')), SimplePattern::Anything],
        );
        assert_eq!(cons.to_string(), "('a' | _)");
        let unit = SimplePattern::constructor(Union::Unit, ONLY, Vec::new());
        assert_eq!(unit.to_string(), "()");
    }
}
