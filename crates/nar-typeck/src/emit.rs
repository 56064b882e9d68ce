//! Emission of typed definitions to a stack-machine backend.
//!
//! The bytecode generator implements [`Emitter`]; this module only decides
//! the order of operations for every node kind. Matching is expressed as
//! pattern construction followed by a conditional jump taken on mismatch.

use nar_common::{builtins, ident, ConstValue, Location};

use crate::definition::Definition;
use crate::expr::{Expr, ExprKind, UpdateTarget};
use crate::pattern::{Pattern, PatternKind};
use crate::ty::Ty;

/// A jump target handed out by [`Emitter::new_label`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

/// Which stack a constant is pushed onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackKind {
    Object,
    Pattern,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    List,
    Tuple,
    Record,
    /// A data option; its identifier is pushed as a string constant first.
    Option,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternOp {
    Alias,
    Any,
    Cons,
    Const,
    DataOption,
    List,
    Named,
    Record,
    Tuple,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwapPop {
    /// Drop the matched value, keeping the result on top.
    Both,
    /// Drop the value left by a successful match.
    Pop,
}

/// Sink for the operations of one function body.
pub trait Emitter {
    fn load_const(&mut self, value: &ConstValue, stack: StackKind, location: Location);
    fn load_local(&mut self, name: &str, location: Location);
    fn load_global(&mut self, module: &str, name: &str, location: Location);
    fn apply(&mut self, argc: u8, location: Location);
    /// Call a native function.
    fn call(&mut self, name: &str, argc: u8, location: Location);
    fn make_object(&mut self, kind: ObjectKind, count: u32, location: Location);
    fn make_pattern(&mut self, op: PatternOp, name: Option<&str>, count: u32, location: Location);
    fn access(&mut self, field: &str, location: Location);
    fn update(&mut self, field: &str, location: Location);
    fn new_label(&mut self) -> Label;
    fn jump(&mut self, label: Label, conditional: bool, location: Location);
    fn mark(&mut self, label: Label);
    fn swap_pop(&mut self, mode: SwapPop, location: Location);
}

fn is_float(ty: &Ty) -> bool {
    matches!(ty, Ty::Native(name, args) if name == builtins::FLOAT && args.is_empty())
}

/// Integer literals solved to `Float` are emitted as float constants.
pub(crate) fn literal(value: &ConstValue, ty: &Ty) -> ConstValue {
    match value {
        ConstValue::Int(i) if is_float(ty) => ConstValue::Float(*i as f64),
        other => other.clone(),
    }
}

fn count(n: usize) -> u8 {
    u8::try_from(n).unwrap_or(u8::MAX)
}

impl Definition {
    /// Emit the body of this definition. `full_name` is the name the
    /// definition is exported under.
    pub fn emit(&self, full_name: &str, out: &mut impl Emitter) {
        let Some(body) = self.body() else {
            return;
        };
        if let ExprKind::Call { name, args } = &body.kind {
            if name == full_name {
                out.call(name, count(args.len()), body.location);
                return;
            }
        }
        for param in self.params().iter().rev() {
            param.emit(out);
            let next = out.new_label();
            out.jump(next, true, param.location);
            out.mark(next);
            out.swap_pop(SwapPop::Pop, param.location);
        }
        body.emit(out);
    }
}

impl Expr {
    pub fn emit(&self, out: &mut impl Emitter) {
        let loc = self.location;
        match &self.kind {
            ExprKind::Access { record, field } => {
                record.emit(out);
                out.access(field, loc);
            }
            ExprKind::Apply { func, args } => {
                args.iter().for_each(|a| a.emit(out));
                func.emit(out);
                out.apply(count(args.len()), loc);
            }
            ExprKind::Call { name, args } => {
                args.iter().for_each(|a| a.emit(out));
                out.call(name, count(args.len()), loc);
            }
            ExprKind::Const(value) => {
                out.load_const(&literal(value, &self.ty), StackKind::Object, loc);
            }
            ExprKind::Constructor { data, option, args } => {
                args.iter().for_each(|a| a.emit(out));
                let id = ident::data_option_identifier(&data.name, option);
                out.load_const(&ConstValue::String(id), StackKind::Object, loc);
                out.make_object(ObjectKind::Option, args.len() as u32, loc);
            }
            ExprKind::Global { module, name, .. } => out.load_global(module, name, loc),
            ExprKind::Let {
                pattern,
                value,
                body,
            } => {
                value.emit(out);
                pattern.emit(out);
                let next = out.new_label();
                out.jump(next, true, loc);
                out.mark(next);
                out.swap_pop(SwapPop::Pop, loc);
                body.emit(out);
            }
            ExprKind::List { items, .. } => {
                items.iter().for_each(|i| i.emit(out));
                out.make_object(ObjectKind::List, items.len() as u32, loc);
            }
            ExprKind::Local { name, .. } => out.load_local(name, loc),
            ExprKind::Record { fields } => {
                for field in fields {
                    field.value.emit(out);
                    out.load_const(&ConstValue::String(field.name.clone()), StackKind::Object, field.location);
                }
                out.make_object(ObjectKind::Record, fields.len() as u32, loc);
            }
            ExprKind::Select { condition, cases } => {
                condition.emit(out);
                let end = out.new_label();
                for case in cases {
                    case.pattern.emit(out);
                    let next = out.new_label();
                    out.jump(next, true, case.location);
                    case.body.emit(out);
                    out.jump(end, false, case.location);
                    out.mark(next);
                }
                out.mark(end);
                out.swap_pop(SwapPop::Both, loc);
            }
            ExprKind::Tuple { items } => {
                items.iter().for_each(|i| i.emit(out));
                out.make_object(ObjectKind::Tuple, items.len() as u32, loc);
            }
            ExprKind::Update { target, fields } => {
                match target {
                    UpdateTarget::Local { name, .. } => out.load_local(name, loc),
                    UpdateTarget::Global { module, name, .. } => out.load_global(module, name, loc),
                }
                for field in fields {
                    field.value.emit(out);
                    out.update(&field.name, field.location);
                }
            }
        }
    }
}

impl Pattern {
    pub fn emit(&self, out: &mut impl Emitter) {
        let loc = self.location;
        match &self.kind {
            PatternKind::Alias { name, nested } => {
                nested.emit(out);
                out.make_pattern(PatternOp::Alias, Some(name), 0, loc);
            }
            PatternKind::Any => out.make_pattern(PatternOp::Any, None, 0, loc),
            PatternKind::Cons { head, tail } => {
                tail.emit(out);
                head.emit(out);
                out.make_pattern(PatternOp::Cons, None, 0, loc);
            }
            PatternKind::Const(value) => {
                out.load_const(&literal(value, &self.ty), StackKind::Pattern, loc);
                out.make_pattern(PatternOp::Const, None, 0, loc);
            }
            PatternKind::List { items, .. } => {
                items.iter().for_each(|i| i.emit(out));
                out.make_pattern(PatternOp::List, None, items.len() as u32, loc);
            }
            PatternKind::Named { name } => out.make_pattern(PatternOp::Named, Some(name), 0, loc),
            PatternKind::Option { name, args, .. } => {
                args.iter().for_each(|a| a.emit(out));
                let id = match &self.ty {
                    Ty::Data(data) => ident::data_option_identifier(&data.name, ident::short_name(name)),
                    _ => name.clone(),
                };
                out.make_pattern(PatternOp::DataOption, Some(&id), args.len() as u32, loc);
            }
            PatternKind::Record { fields } => {
                for field in fields {
                    out.load_const(&ConstValue::String(field.name.clone()), StackKind::Pattern, field.location);
                }
                out.make_pattern(PatternOp::Record, None, fields.len() as u32, loc);
            }
            PatternKind::Tuple { items } => {
                items.iter().for_each(|i| i.emit(out));
                out.make_pattern(PatternOp::Tuple, None, items.len() as u32, loc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::SelectCase;
    use crate::program::{DefId, Program};
    use crate::solve::SolvingContext;

    /// Records every operation as a line of text.
    #[derive(Default)]
    struct Listing {
        ops: Vec<String>,
        labels: u32,
    }

    impl Emitter for Listing {
        fn load_const(&mut self, value: &ConstValue, stack: StackKind, _: Location) {
            self.ops.push(format!("const {:?} {}", stack, value));
        }
        fn load_local(&mut self, name: &str, _: Location) {
            self.ops.push(format!("local {}", name));
        }
        fn load_global(&mut self, module: &str, name: &str, _: Location) {
            self.ops.push(format!("global {}.{}", module, name));
        }
        fn apply(&mut self, argc: u8, _: Location) {
            self.ops.push(format!("apply {}", argc));
        }
        fn call(&mut self, name: &str, argc: u8, _: Location) {
            self.ops.push(format!("call {} {}", name, argc));
        }
        fn make_object(&mut self, kind: ObjectKind, count: u32, _: Location) {
            self.ops.push(format!("object {:?} {}", kind, count));
        }
        fn make_pattern(&mut self, op: PatternOp, name: Option<&str>, count: u32, _: Location) {
            self.ops.push(format!("pattern {:?} {} {}", op, name.unwrap_or("-"), count));
        }
        fn access(&mut self, field: &str, _: Location) {
            self.ops.push(format!("access {}", field));
        }
        fn update(&mut self, field: &str, _: Location) {
            self.ops.push(format!("update {}", field));
        }
        fn new_label(&mut self) -> Label {
            self.labels += 1;
            Label(self.labels)
        }
        fn jump(&mut self, label: Label, conditional: bool, _: Location) {
            let kind = if conditional { "jump-if-mismatch" } else { "jump" };
            self.ops.push(format!("{} L{}", kind, label.0));
        }
        fn mark(&mut self, label: Label) {
            self.ops.push(format!("L{}:", label.0));
        }
        fn swap_pop(&mut self, mode: SwapPop, _: Location) {
            self.ops.push(format!("swap-pop {:?}", mode));
        }
    }

    fn loc() -> Location {
        Location::default()
    }

    #[test]
    fn float_typed_int_literal_becomes_float() {
        let mut ctx = SolvingContext::new(DefId(0));
        let mut three = Expr::constant(&mut ctx, loc(), ConstValue::Int(3));
        three.ty = Ty::float();
        let mut out = Listing::default();
        three.emit(&mut out);
        assert_eq!(out.ops, vec!["const Object 3.0"]);

        three.ty = Ty::int();
        let mut out = Listing::default();
        three.emit(&mut out);
        assert_eq!(out.ops, vec!["const Object 3"]);
    }

    #[test]
    fn select_jumps_between_cases() {
        let mut ctx = SolvingContext::new(DefId(0));
        let condition = Expr::local(&mut ctx, loc(), "xs", None);
        let nil = Pattern::list(&mut ctx, loc(), vec![]);
        let zero = Expr::constant(&mut ctx, loc(), ConstValue::Int(0));
        let head = Pattern::named(&mut ctx, loc(), "h");
        let tail = Pattern::any(&mut ctx, loc());
        let cons = Pattern::cons(&mut ctx, loc(), head, tail);
        let h = Expr::local(&mut ctx, loc(), "h", None);
        let select = Expr::select(
            &mut ctx,
            loc(),
            condition,
            vec![
                SelectCase {
                    location: loc(),
                    pattern: nil,
                    body: zero,
                },
                SelectCase {
                    location: loc(),
                    pattern: cons,
                    body: h,
                },
            ],
        );

        let mut out = Listing::default();
        select.emit(&mut out);
        insta::assert_snapshot!(out.ops.join("\n"), @r"
        local xs
        pattern List - 0
        jump-if-mismatch L2
        const Object 0
        jump L1
        L2:
        pattern Any - 0
        pattern Named h 0
        pattern Cons - 0
        jump-if-mismatch L3
        local h
        jump L1
        L3:
        L1:
        swap-pop Both
        ");
    }

    #[test]
    fn records_and_constructors() {
        let mut ctx = SolvingContext::new(DefId(0));
        let name = Expr::constant(&mut ctx, loc(), ConstValue::String("n".into()));
        let record = Expr::record(&mut ctx, loc(), vec![("name".into(), loc(), name)]).unwrap();
        let data = match Ty::bool() {
            Ty::Data(data) => data,
            _ => unreachable!(),
        };
        let yes = Expr::constructor(&mut ctx, loc(), data, "True", vec![]).unwrap();

        let mut out = Listing::default();
        record.emit(&mut out);
        yes.emit(&mut out);
        assert_eq!(
            out.ops,
            vec![
                "const Object \"n\"",
                "const Object \"name\"",
                "object Record 1",
                "const Object \"Nar.Base.Basics.Bool#True\"",
                "object Option 0",
            ]
        );
    }

    #[test]
    fn definition_binds_params_last_to_first() {
        let mut program = Program::new();
        let main = program.add_module("Main", loc());
        let id = program.add_definition(main, "first", loc());
        let ctx = program.context_mut(id).unwrap();
        let a = Pattern::named(ctx, loc(), "a");
        let b = Pattern::named(ctx, loc(), "b");
        let body = Expr::local(ctx, loc(), "a", None);
        let def = program.definition_mut(id).unwrap();
        def.set_params(vec![a, b]);
        def.set_body(body);

        let mut out = Listing::default();
        program.definition(id).unwrap().emit("Main.first", &mut out);
        assert_eq!(
            out.ops,
            vec![
                "pattern Named b 0",
                "jump-if-mismatch L1",
                "L1:",
                "swap-pop Pop",
                "pattern Named a 0",
                "jump-if-mismatch L2",
                "L2:",
                "swap-pop Pop",
                "local a",
            ]
        );
    }

    #[test]
    fn native_wrapper_is_a_single_call() {
        let mut program = Program::new();
        let main = program.add_module("Nar.Base.Math", loc());
        let id = program.add_definition(main, "add", loc());
        let ctx = program.context_mut(id).unwrap();
        let a = Pattern::named(ctx, loc(), "a");
        let b = Pattern::named(ctx, loc(), "b");
        let la = Expr::local(ctx, loc(), "a", None);
        let lb = Expr::local(ctx, loc(), "b", None);
        let body = Expr::call(ctx, loc(), "Nar.Base.Math.add", vec![la, lb]).unwrap();
        let def = program.definition_mut(id).unwrap();
        def.set_params(vec![a, b]);
        def.set_body(body);

        let mut out = Listing::default();
        program.definition(id).unwrap().emit("Nar.Base.Math.add", &mut out);
        assert_eq!(out.ops, vec!["call Nar.Base.Math.add 2"]);
    }
}
