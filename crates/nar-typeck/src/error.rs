//! Type errors.
//!
//! Every error carries the best location known when it was raised: the
//! node that introduced the offending equation, or the pattern that failed
//! a coverage check. Errors abort the enclosing definition only; sibling
//! definitions keep being checked so one run reports many problems.

use std::fmt;

use nar_common::Location;

use crate::ty::{Constraint, Ty};

/// A type error encountered while solving or pattern checking.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two concrete types have different shapes, names or arities.
    TypeMismatch {
        expected: Ty,
        found: Ty,
        location: Location,
    },
    /// A closed record lacks a field the other side requires.
    MissingField {
        field: String,
        record: Ty,
        location: Location,
    },
    /// Two groups with incompatible constraints were merged.
    ConstraintViolation {
        left: Constraint,
        right: Constraint,
        location: Location,
    },
    /// A numeric variable was unified with a non-numeric type.
    NotNumeric { ty: Ty, location: Location },
    /// A variable's solution mentions the variable itself.
    InfiniteType { var: String, location: Location },
    /// A local reference without a binder.
    UnresolvedLocal { name: String, location: Location },
    /// A global or constructor reference without a definition.
    UnresolvedDefinition { name: String, location: Location },
    /// A reference to a definition that failed to type check.
    UnresolvedReference { name: String, location: Location },
    /// A variable left out of every equation.
    FailedToInfer { location: Location },
    /// More than 255 arguments or items in a single node.
    TooManyArguments { count: usize, location: Location },
    /// A pattern that can never match.
    RedundantPattern { location: Location },
    /// A match that does not cover every value.
    NonExhaustive {
        missing: Vec<String>,
        location: Location,
    },
    /// An inconsistency in the typed tree handed to the checker.
    Internal { message: String, location: Location },
}

impl TypeError {
    pub fn location(&self) -> Location {
        match self {
            TypeError::TypeMismatch { location, .. }
            | TypeError::MissingField { location, .. }
            | TypeError::ConstraintViolation { location, .. }
            | TypeError::NotNumeric { location, .. }
            | TypeError::InfiniteType { location, .. }
            | TypeError::UnresolvedLocal { location, .. }
            | TypeError::UnresolvedDefinition { location, .. }
            | TypeError::UnresolvedReference { location, .. }
            | TypeError::FailedToInfer { location }
            | TypeError::TooManyArguments { location, .. }
            | TypeError::RedundantPattern { location }
            | TypeError::NonExhaustive { location, .. }
            | TypeError::Internal { location, .. } => *location,
        }
    }

    pub(crate) fn internal(message: impl Into<String>, location: Location) -> Self {
        TypeError::Internal {
            message: message.into(),
            location,
        }
    }

    /// Whether this error comes from the coverage checker.
    pub fn is_pattern_error(&self) -> bool {
        matches!(
            self,
            TypeError::RedundantPattern { .. } | TypeError::NonExhaustive { .. }
        )
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::TypeMismatch {
                expected, found, ..
            } => write!(f, "cannot match `{}` and `{}`", expected, found),
            TypeError::MissingField { field, record, .. } => {
                write!(f, "record missing field `{}` in `{}`", field, record)
            }
            TypeError::ConstraintViolation { left, right, .. } => {
                write!(f, "type constraint violation: `{}` and `{}`", left, right)
            }
            TypeError::NotNumeric { ty, .. } => {
                write!(f, "numeric type cannot hold `{}`", ty)
            }
            TypeError::InfiniteType { var, .. } => {
                write!(f, "infinite type: `{}` occurs in its own solution", var)
            }
            TypeError::UnresolvedLocal { name, .. } => {
                write!(f, "local `{}` is not bound", name)
            }
            TypeError::UnresolvedDefinition { name, .. } => {
                write!(f, "definition `{}` not found", name)
            }
            TypeError::UnresolvedReference { name, .. } => {
                write!(f, "cannot use `{}`: its type could not be inferred", name)
            }
            TypeError::FailedToInfer { .. } => write!(f, "failed to infer type"),
            TypeError::TooManyArguments { count, .. } => {
                write!(f, "too many arguments ({}), at most 255 are allowed", count)
            }
            TypeError::RedundantPattern { .. } => write!(f, "pattern matching is redundant"),
            TypeError::NonExhaustive { missing, .. } => write!(
                f,
                "pattern matching is not exhaustive, missing patterns: {}",
                missing.join(", ")
            ),
            TypeError::Internal { message, .. } => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for TypeError {}
