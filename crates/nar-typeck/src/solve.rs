//! Solving context: turns one definition's equations into a substitution.
//!
//! Variables are grouped with `ena`'s union-find table. Each root key owns
//! a `TypeGroup` in a side arena holding the group's single concrete
//! specialization (if any), its constraint and the name it was given.
//! Absorbed groups are cleared from the arena when two roots are joined.

use std::collections::VecDeque;
use std::fmt;

use ena::unify::{InPlaceUnificationTable, UnifyKey};
use nar_common::{builtins, Location};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::equation::Equation;
use crate::error::TypeError;
use crate::program::{DefId, NodeId};
use crate::trace::{SolveAction, SolveStep};
use crate::ty::{Constraint, Ty, TypeVar, VarId};

/// Union-find key of a registered variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct GroupKey(u32);

impl UnifyKey for GroupKey {
    type Value = ();

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        GroupKey(u)
    }

    fn tag() -> &'static str {
        "GroupKey"
    }
}

/// Everything known about one class of variables.
#[derive(Clone, Debug)]
struct TypeGroup {
    specific: Option<Ty>,
    constraint: Constraint,
    name: Option<String>,
    location: Location,
}

/// Owns the variables of one definition's solve.
///
/// Variables allocated here get ids scoped to the owning definition.
/// Variables from other scopes (the still-solving type of a definition on
/// the visiting stack) get a group the first time an equation mentions them.
pub struct SolvingContext {
    scope: DefId,
    next_index: u32,
    table: InPlaceUnificationTable<GroupKey>,
    keys: FxHashMap<VarId, GroupKey>,
    /// Registered variables, indexed by their key.
    vars: Vec<TypeVar>,
    /// Group data, indexed by root key. Non-roots hold `None`.
    groups: Vec<Option<TypeGroup>>,
    seen: FxHashSet<(Ty, Ty)>,
    tracing: bool,
    steps: Vec<SolveStep>,
}

impl SolvingContext {
    pub fn new(scope: DefId) -> Self {
        SolvingContext {
            scope,
            next_index: 0,
            table: InPlaceUnificationTable::new(),
            keys: FxHashMap::default(),
            vars: Vec::new(),
            groups: Vec::new(),
            seen: FxHashSet::default(),
            tracing: false,
            steps: Vec::new(),
        }
    }

    pub fn scope(&self) -> DefId {
        self.scope
    }

    // ── Variable Creation ───────────────────────────────────────────────

    pub(crate) fn fresh_id(&mut self) -> VarId {
        let id = VarId {
            scope: self.scope,
            index: self.next_index,
        };
        self.next_index += 1;
        id
    }

    /// Give `var` a group of its own unless it already has one.
    pub(crate) fn register(&mut self, var: TypeVar) -> TypeVar {
        if !var.generic && !self.keys.contains_key(&var.id) {
            let key = self.table.new_key(());
            debug_assert_eq!(key.index() as usize, self.groups.len());
            self.keys.insert(var.id, key);
            self.groups.push(Some(TypeGroup {
                specific: None,
                constraint: var.constraint,
                name: var.name.clone(),
                location: var.location,
            }));
            self.vars.push(var.clone());
        }
        var
    }

    /// Register every variable of `other`, so one solve can cover the
    /// definitions of a recursive group.
    pub(crate) fn adopt(&mut self, other: &SolvingContext) {
        for var in &other.vars {
            self.register(var.clone());
        }
    }

    fn new_var(&mut self, name: Option<String>, constraint: Constraint, location: Location) -> Ty {
        let id = self.fresh_id();
        Ty::Unbound(self.register(TypeVar {
            id,
            constraint,
            name,
            owner: None,
            location,
            generic: false,
        }))
    }

    /// An anonymous variable.
    pub fn fresh_var(&mut self, location: Location) -> Ty {
        self.new_var(None, Constraint::None, location)
    }

    /// The type of an integer literal: Int or Float, decided by context.
    pub fn number_var(&mut self, location: Location) -> Ty {
        self.new_var(
            Some(builtins::NUMBER_PREFIX.to_string()),
            Constraint::Number,
            location,
        )
    }

    /// A type parameter written in an annotation, e.g. `a` or `number`.
    pub fn type_parameter(&mut self, name: &str, location: Location) -> Ty {
        self.new_var(Some(name.to_string()), Constraint::for_name(name), location)
    }

    /// A fresh copy of `ty` whose variables belong to this context.
    pub fn instantiate(&mut self, ty: &Ty) -> Ty {
        ty.make_unique(self, &mut FxHashMap::default())
    }

    // ── Tracing ─────────────────────────────────────────────────────────

    pub fn set_tracing(&mut self, enabled: bool) {
        self.tracing = enabled;
    }

    pub fn take_steps(&mut self) -> Vec<SolveStep> {
        std::mem::take(&mut self.steps)
    }

    fn record(&mut self, action: SolveAction, left: &Ty, right: &Ty, location: Location) {
        if !self.tracing {
            return;
        }
        self.steps.push(SolveStep {
            definition: String::new(),
            step: self.steps.len(),
            action,
            left: left.to_string(),
            right: right.to_string(),
            location,
        });
    }

    // ── Groups ──────────────────────────────────────────────────────────

    fn key_of(&mut self, var: &TypeVar) -> GroupKey {
        match self.keys.get(&var.id) {
            Some(key) => *key,
            None => {
                self.register(var.clone());
                self.keys[&var.id]
            }
        }
    }

    fn register_all(&mut self, ty: &Ty) {
        let mut found = Vec::new();
        ty.visit_vars(&mut |var| {
            if !var.generic {
                found.push(var.clone());
            }
        });
        for var in found {
            self.register(var);
        }
    }

    fn take_group(&mut self, root: GroupKey, location: Location) -> Result<TypeGroup, TypeError> {
        self.groups[root.index() as usize]
            .take()
            .ok_or_else(|| TypeError::internal("unification group vanished", location))
    }

    /// Current specialization of a variable's group, if any.
    pub fn specialization(&mut self, ty: &Ty) -> Option<Ty> {
        let var = ty.as_flexible()?;
        let key = *self.keys.get(&var.id)?;
        let root = self.table.find(key);
        self.groups[root.index() as usize]
            .as_ref()
            .and_then(|g| g.specific.clone())
    }

    /// Whether two variables are known to denote the same type.
    pub fn same_group(&mut self, a: &Ty, b: &Ty) -> bool {
        match (a.as_flexible(), b.as_flexible()) {
            (Some(a), Some(b)) => match (self.keys.get(&a.id), self.keys.get(&b.id)) {
                (Some(ka), Some(kb)) => {
                    let (ka, kb) = (*ka, *kb);
                    self.table.unioned(ka, kb)
                }
                _ => a.id == b.id,
            },
            _ => false,
        }
    }

    /// Number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_some()).count()
    }

    // ── Insertion ───────────────────────────────────────────────────────

    /// Process equations until no new ones appear.
    ///
    /// Equations produced while merging are appended to the same queue.
    /// Reflexive equations and pairs already processed are dropped.
    pub fn insert_all(&mut self, equations: Vec<Equation>) -> Result<(), TypeError> {
        let mut queue: VecDeque<Equation> = equations.into();
        while let Some(eq) = queue.pop_front() {
            if eq.is_reflexive() || !self.remember(&eq) {
                self.record(SolveAction::Skip, &eq.left, &eq.right, eq.location);
                continue;
            }
            self.register_all(&eq.left);
            self.register_all(&eq.right);
            match self.insert(&eq) {
                Ok(more) => queue.extend(more),
                Err(err) => {
                    self.record(
                        SolveAction::Error {
                            message: err.to_string(),
                        },
                        &eq.left,
                        &eq.right,
                        eq.location,
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn remember(&mut self, eq: &Equation) -> bool {
        let flipped = (eq.right.clone(), eq.left.clone());
        if self.seen.contains(&flipped) {
            return false;
        }
        self.seen.insert((eq.left.clone(), eq.right.clone()))
    }

    fn insert(&mut self, eq: &Equation) -> Result<Vec<Equation>, TypeError> {
        match (eq.left.as_flexible(), eq.right.as_flexible()) {
            (Some(a), Some(b)) => self.merge_groups(a, b, eq),
            (Some(a), None) => self.specialize(a, &eq.right, eq),
            (None, Some(b)) => self.specialize(b, &eq.left, eq),
            (None, None) => {
                let more = eq.left.merge(&eq.right, &eq.location)?;
                self.record(
                    SolveAction::Decompose {
                        equations: more.len(),
                    },
                    &eq.left,
                    &eq.right,
                    eq.location,
                );
                Ok(more)
            }
        }
    }

    fn merge_groups(&mut self, a: &TypeVar, b: &TypeVar, eq: &Equation) -> Result<Vec<Equation>, TypeError> {
        let ka = self.key_of(a);
        let kb = self.key_of(b);
        let ra = self.table.find(ka);
        let rb = self.table.find(kb);
        if ra == rb {
            self.record(SolveAction::Skip, &eq.left, &eq.right, eq.location);
            return Ok(Vec::new());
        }

        let ga = self.take_group(ra, eq.location)?;
        let gb = self.take_group(rb, eq.location)?;
        let constraint =
            ga.constraint
                .combine(gb.constraint)
                .ok_or(TypeError::ConstraintViolation {
                    left: ga.constraint,
                    right: gb.constraint,
                    location: eq.location,
                })?;

        let (specific, more) = match (ga.specific, gb.specific) {
            (Some(sa), Some(sb)) => {
                let (combined, more) = combine_specific(sa, &sb, &eq.location)?;
                (Some(combined), more)
            }
            (s, None) | (None, s) => (s, Vec::new()),
        };
        if let Some(ty) = &specific {
            if !constraint.accepts(ty) {
                return Err(TypeError::NotNumeric {
                    ty: ty.clone(),
                    location: eq.location,
                });
            }
        }

        self.table.union(ka, kb);
        let root = self.table.find(ka);
        self.groups[root.index() as usize] = Some(TypeGroup {
            specific,
            constraint,
            name: ga.name.or(gb.name),
            location: ga.location,
        });
        self.record(SolveAction::MergeGroups, &eq.left, &eq.right, eq.location);
        Ok(more)
    }

    fn specialize(&mut self, var: &TypeVar, ty: &Ty, eq: &Equation) -> Result<Vec<Equation>, TypeError> {
        let key = self.key_of(var);
        let root = self.table.find(key);
        let mut group = self.take_group(root, eq.location)?;
        if !group.constraint.accepts(ty) {
            return Err(TypeError::NotNumeric {
                ty: ty.clone(),
                location: eq.location,
            });
        }

        let (action, more) = match group.specific.take() {
            None => {
                group.specific = Some(ty.clone());
                (SolveAction::Specialize, Vec::new())
            }
            Some(current) => {
                let (combined, more) = combine_specific(current, ty, &eq.location)?;
                group.specific = Some(combined);
                (
                    SolveAction::Decompose {
                        equations: more.len(),
                    },
                    more,
                )
            }
        };
        self.groups[root.index() as usize] = Some(group);
        self.record(action, &eq.left, &eq.right, eq.location);
        Ok(more)
    }

    // ── Substitution ────────────────────────────────────────────────────

    /// Map every registered variable to its group's specialization.
    ///
    /// Groups left without one are generalized: they become generic
    /// variables named `a`, `b`, ... (names already given are kept and
    /// skipped; free numeric groups stay `number`).
    pub fn substitution(&mut self) -> Substitution {
        let mut used: FxHashSet<String> = self
            .groups
            .iter()
            .flatten()
            .filter_map(|g| g.name.clone())
            .collect();
        let mut counter = 0usize;
        let mut generics: FxHashMap<usize, Ty> = FxHashMap::default();

        // Groups are named in the order their first variable was registered.
        for index in 0..self.vars.len() {
            let root = self.table.find(GroupKey(index as u32)).index() as usize;
            if generics.contains_key(&root) {
                continue;
            }
            let (constraint, given, location) = match &self.groups[root] {
                Some(group) if group.specific.is_none() => {
                    (group.constraint, group.name.clone(), group.location)
                }
                _ => continue,
            };
            let name = match given {
                Some(name) => name,
                None if constraint == Constraint::Number => builtins::NUMBER_PREFIX.to_string(),
                None => loop {
                    let candidate = generated_name(counter);
                    counter += 1;
                    if used.insert(candidate.clone()) {
                        break candidate;
                    }
                },
            };
            let id = self.fresh_id();
            let var = Ty::Unbound(TypeVar {
                id,
                constraint,
                name: Some(name.clone()),
                owner: None,
                location,
                generic: true,
            });
            self.record(SolveAction::Generalize { name }, &var, &var, location);
            generics.insert(root, var);
        }

        let mut entries = FxHashMap::default();
        for index in 0..self.vars.len() {
            let root = self.table.find(GroupKey(index as u32)).index() as usize;
            let solved = match generics.get(&root) {
                Some(var) => Some(var.clone()),
                None => self.groups[root].as_ref().and_then(|g| g.specific.clone()),
            };
            if let Some(ty) = solved {
                entries.insert(self.vars[index].id, ty);
            }
        }

        Substitution {
            entries,
            successors: FxHashMap::default(),
            visiting: Vec::new(),
        }
    }
}

impl fmt::Debug for SolvingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolvingContext")
            .field("scope", &self.scope)
            .field("vars", &self.vars.len())
            .field("groups", &self.group_count())
            .finish_non_exhaustive()
    }
}

/// Unify two specializations of one group.
///
/// Records keep the most precise view: a closed record wins over an open
/// one, two open records widen to the union of their fields. Data types
/// keep the copy carrying the longer option list, since self references
/// inside options may carry none.
fn combine_specific(current: Ty, proposed: &Ty, location: &Location) -> Result<(Ty, Vec<Equation>), TypeError> {
    let more = current.merge(proposed, location)?;
    let combined = match (current, proposed) {
        (Ty::Data(data), Ty::Data(other)) if other.options.len() > data.options.len() => Ty::Data(other.clone()),
        (Ty::Record(mut record), Ty::Record(other)) => {
            for (name, ty) in &other.fields {
                record
                    .fields
                    .entry(name.clone())
                    .or_insert_with(|| ty.clone());
            }
            record.open = record.open && other.open;
            Ty::Record(record)
        }
        (current, _) => current,
    };
    Ok((combined, more))
}

/// `a`..`z`, then `a1`..`z1`, and so on.
fn generated_name(n: usize) -> String {
    let letter = (b'a' + (n % 26) as u8) as char;
    match n / 26 {
        0 => letter.to_string(),
        round => format!("{}{}", letter, round),
    }
}

/// Solved types of one definition's variables.
#[derive(Debug, Default)]
pub struct Substitution {
    entries: FxHashMap<VarId, Ty>,
    successors: FxHashMap<NodeId, Ty>,
    visiting: Vec<VarId>,
}

impl Substitution {
    pub fn get(&self, id: &VarId) -> Option<&Ty> {
        self.entries.get(id)
    }

    /// Resolved types of variables that carried an owner.
    pub fn successors(&self) -> &FxHashMap<NodeId, Ty> {
        &self.successors
    }

    pub(crate) fn into_successors(self) -> FxHashMap<NodeId, Ty> {
        self.successors
    }

    pub(crate) fn resolve(&mut self, var: &TypeVar) -> Result<Ty, TypeError> {
        if self.visiting.contains(&var.id) {
            return Err(TypeError::InfiniteType {
                var: var.to_string(),
                location: var.location,
            });
        }
        let Some(target) = self.entries.get(&var.id).cloned() else {
            return Err(TypeError::FailedToInfer {
                location: var.location,
            });
        };

        self.visiting.push(var.id);
        let mapped = target.map_to(self);
        self.visiting.pop();
        let mapped = mapped?;

        self.entries.insert(var.id, mapped.clone());
        if let Some(owner) = var.owner {
            self.successors.insert(owner, mapped.clone());
        }
        Ok(mapped)
    }
}
