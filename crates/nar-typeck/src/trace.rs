//! Opt-in record of what the solver did.
//!
//! Enabled through `CheckOptions::trace`; when disabled nothing is
//! rendered or stored.

use nar_common::Location;
use serde::Serialize;

/// A single processed equation or generalization.
#[derive(Debug, Clone, Serialize)]
pub struct SolveStep {
    /// Full name of the definition being solved.
    pub definition: String,
    pub step: usize,
    pub action: SolveAction,
    pub left: String,
    pub right: String,
    pub location: Location,
}

/// What the solver did with one equation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolveAction {
    /// Equation already seen, or both sides identical.
    Skip,
    /// Two variable groups joined.
    MergeGroups,
    /// A group received its first concrete type.
    Specialize,
    /// Two concrete types compared, producing nested equations.
    Decompose { equations: usize },
    /// A free group became a generic variable.
    Generalize { name: String },
    Error { message: String },
}

/// Steps of every definition solved in one run, in solving order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SolveTrace {
    pub steps: Vec<SolveStep>,
}

impl SolveTrace {
    pub fn for_definition<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SolveStep> + 'a {
        self.steps.iter().filter(move |s| s.definition == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
